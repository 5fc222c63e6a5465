use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tracing::info;

use warbler_types::api::MessageForm;

use crate::auth::{AppState, with_db};
use crate::error::WebError;
use crate::flash;
use crate::middleware::CurrentUser;
use crate::render::{self, Layout, Viewer};

/// Messages shown on the logged-in home page.
const TIMELINE_LIMIT: u32 = 100;

/// GET / — landing page for visitors, timeline for logged-in users.
pub async fn homepage(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, WebError> {
    let (jar, flashes) = flash::take(jar);
    let layout = Layout::new(&current, &flashes);

    let Some(me) = current.get() else {
        return Ok((jar, layout.page("Warbler", &render::anon_home())));
    };

    let user_id = me.id;
    let (stats, timeline, viewer) = with_db(&state, move |db| {
        let stats = db.profile_stats(user_id)?;
        let timeline = db.home_timeline(user_id, TIMELINE_LIMIT)?;
        Ok((stats, timeline, Viewer::load(db, user_id)?))
    })
    .await?;

    let timeline: Vec<_> = timeline.into_iter().map(|m| m.into_model()).collect();
    let body = render::home(&me.clone().into_model(), &stats, &timeline, &viewer);
    Ok((jar, layout.page("Warbler", &body)))
}

/// GET /messages/new
pub async fn new_message_form(
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, WebError> {
    current.require()?;
    let (jar, flashes) = flash::take(jar);
    let body = render::message_form(&[], "");
    Ok((jar, Layout::new(&current, &flashes).page("New Message", &body)))
}

/// POST /messages/new
pub async fn add_message(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<MessageForm>,
) -> Result<Response, WebError> {
    let user_id = current.require()?.id;

    if let Err(errors) = form.validate() {
        let (jar, flashes) = flash::take(jar);
        let body = render::message_form(&errors, &form.text);
        return Ok((jar, Layout::new(&current, &flashes).page("New Message", &body)).into_response());
    }

    let text = form.text.trim().to_string();
    let message = with_db(&state, move |db| db.insert_message(user_id, &text)).await?;
    info!("User #{} posted message #{}", user_id, message.id);

    Ok((jar, Redirect::to(&format!("/users/{}", user_id))).into_response())
}

/// GET /messages/{message_id}
pub async fn show_message(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(message_id): Path<i64>,
    jar: CookieJar,
) -> Result<impl IntoResponse, WebError> {
    let viewer_id = current.id();
    let (message, viewer) = with_db(&state, move |db| {
        let message = db.get_message(message_id)?;
        Ok((message, Viewer::load_for(db, viewer_id)?))
    })
    .await?;
    let message = message.ok_or(WebError::NotFound)?.into_model();

    let (jar, flashes) = flash::take(jar);
    let body = render::message_detail(&message, viewer.as_ref());
    Ok((jar, Layout::new(&current, &flashes).page("Message", &body)))
}

/// POST /messages/{message_id}/delete — owner only.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(message_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let user_id = current.require()?.id;

    let message = with_db(&state, move |db| db.get_message(message_id))
        .await?
        .ok_or(WebError::NotFound)?;
    if message.user_id != user_id {
        return Err(WebError::Unauthorized);
    }

    with_db(&state, move |db| db.delete_message(message_id)).await?;
    info!("User #{} deleted message #{}", user_id, message_id);

    Ok((jar, Redirect::to(&format!("/users/{}", user_id))).into_response())
}
