use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tracing::debug;

use warbler_db::models::MessageRow;

use crate::auth::{AppState, with_db};
use crate::error::WebError;
use crate::flash;
use crate::middleware::CurrentUser;
use crate::render::{self, Layout, Viewer};

enum Toggle {
    Liked,
    Unliked,
    OwnMessage,
    Missing,
}

/// POST /users/add_like/{message_id} — like the message, or unlike it if the
/// current user already did. Users cannot like their own messages.
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(message_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let user_id = current.require()?.id;

    let outcome = with_db(&state, move |db| {
        let Some(message) = db.get_message(message_id)? else {
            return Ok(Toggle::Missing);
        };
        if message.user_id == user_id {
            return Ok(Toggle::OwnMessage);
        }
        if db.toggle_like(user_id, message_id)? {
            Ok(Toggle::Liked)
        } else {
            Ok(Toggle::Unliked)
        }
    })
    .await?;

    match outcome {
        Toggle::Missing => Err(WebError::NotFound),
        Toggle::OwnMessage => Err(WebError::Forbidden),
        Toggle::Liked | Toggle::Unliked => {
            debug!(
                "User #{} {} message #{}",
                user_id,
                if matches!(outcome, Toggle::Liked) { "liked" } else { "unliked" },
                message_id
            );
            Ok((jar, Redirect::to("/")).into_response())
        }
    }
}

/// GET /users/{user_id}/likes — messages the user liked. Requires login.
pub async fn show_likes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
    jar: CookieJar,
) -> Result<impl IntoResponse, WebError> {
    let my_id = current.require()?.id;

    let (user, stats, liked, viewer) = with_db(&state, move |db| {
        let Some(user) = db.get_user(user_id)? else {
            return Ok(None);
        };
        let stats = db.profile_stats(user_id)?;
        let liked = db.liked_messages(user_id)?;
        Ok(Some((user, stats, liked, Viewer::load(db, my_id)?)))
    })
    .await?
    .ok_or(WebError::NotFound)?;

    let user = user.into_model();
    let liked: Vec<_> = liked.into_iter().map(MessageRow::into_model).collect();

    let (jar, flashes) = flash::take(jar);
    let content = render::message_list(&liked, Some(&viewer));
    let body = render::profile(&user, &stats, Some(&viewer), &content);
    Ok((jar, Layout::new(&current, &flashes).page("Likes", &body)))
}
