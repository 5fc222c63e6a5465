use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tracing::{info, warn};

use warbler_db::accounts;
use warbler_db::models::{UserRow, UserUpdate};
use warbler_types::api::{Flash, ProfileForm, UserSearchQuery, non_empty};
use warbler_types::models::{ProfileStats, User};

use crate::auth::{AppState, do_logout, with_db};
use crate::error::WebError;
use crate::flash;
use crate::middleware::CurrentUser;
use crate::render::{self, Layout, Viewer};

/// GET /users — every user, or those matching `?q=`.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<UserSearchQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, WebError> {
    let term = query.term().map(str::to_string);
    let viewer_id = current.id();

    let (users, viewer) = with_db(&state, move |db| {
        let users = db.list_users(term.as_deref())?;
        Ok((users, Viewer::load_for(db, viewer_id)?))
    })
    .await?;

    let users: Vec<User> = users.into_iter().map(UserRow::into_model).collect();
    let (jar, flashes) = flash::take(jar);
    let body = render::user_cards(&users, viewer.as_ref());
    Ok((jar, Layout::new(&current, &flashes).page("Users", &body)))
}

/// Everything a profile-style page needs besides its own content.
struct ProfileContext {
    user: User,
    stats: ProfileStats,
    viewer: Option<Viewer>,
}

async fn load_profile(
    state: &AppState,
    user_id: i64,
    viewer_id: Option<i64>,
) -> Result<ProfileContext, WebError> {
    let (user, stats, viewer) = with_db(state, move |db| {
        let Some(user) = db.get_user(user_id)? else {
            return Ok((None, ProfileStats::default(), None));
        };
        let stats = db.profile_stats(user_id)?;
        Ok((Some(user), stats, Viewer::load_for(db, viewer_id)?))
    })
    .await?;

    let user = user.ok_or(WebError::NotFound)?;
    Ok(ProfileContext {
        user: user.into_model(),
        stats,
        viewer,
    })
}

/// GET /users/{user_id} — profile with the user's messages.
pub async fn show_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
    jar: CookieJar,
) -> Result<impl IntoResponse, WebError> {
    let ctx = load_profile(&state, user_id, current.id()).await?;
    let messages = with_db(&state, move |db| db.messages_for_user(user_id)).await?;
    let messages: Vec<_> = messages.into_iter().map(|m| m.into_model()).collect();

    let (jar, flashes) = flash::take(jar);
    let content = render::message_list(&messages, ctx.viewer.as_ref());
    let body = render::profile(&ctx.user, &ctx.stats, ctx.viewer.as_ref(), &content);
    Ok((jar, Layout::new(&current, &flashes).page(&ctx.user.username, &body)))
}

/// GET /users/{user_id}/following — requires login.
pub async fn show_following(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
    jar: CookieJar,
) -> Result<impl IntoResponse, WebError> {
    let me = current.require()?;
    let ctx = load_profile(&state, user_id, Some(me.id)).await?;
    let following = with_db(&state, move |db| db.following(user_id)).await?;
    let following: Vec<User> = following.into_iter().map(UserRow::into_model).collect();

    let (jar, flashes) = flash::take(jar);
    let content = render::user_cards(&following, ctx.viewer.as_ref());
    let body = render::profile(&ctx.user, &ctx.stats, ctx.viewer.as_ref(), &content);
    Ok((jar, Layout::new(&current, &flashes).page("Following", &body)))
}

/// GET /users/{user_id}/followers — requires login.
pub async fn show_followers(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
    jar: CookieJar,
) -> Result<impl IntoResponse, WebError> {
    let me = current.require()?;
    let ctx = load_profile(&state, user_id, Some(me.id)).await?;
    let followers = with_db(&state, move |db| db.followers(user_id)).await?;
    let followers: Vec<User> = followers.into_iter().map(UserRow::into_model).collect();

    let (jar, flashes) = flash::take(jar);
    let content = render::user_cards(&followers, ctx.viewer.as_ref());
    let body = render::profile(&ctx.user, &ctx.stats, ctx.viewer.as_ref(), &content);
    Ok((jar, Layout::new(&current, &flashes).page("Followers", &body)))
}

/// POST /users/follow/{follow_id} — start following, then show who the
/// current user follows.
pub async fn add_follow(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(follow_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let me = current.require()?;
    let my_id = me.id;
    let following_page = format!("/users/{}/following", my_id);

    if follow_id == my_id {
        return Ok(flash::redirect(jar, &following_page, Flash::danger("You can't follow yourself.")));
    }

    let followed = with_db(&state, move |db| {
        if db.get_user(follow_id)?.is_none() {
            return Ok(false);
        }
        if !db.is_following(my_id, follow_id)? {
            match db.follow(my_id, follow_id) {
                // Lost a race with a concurrent follow of the same user.
                Err(e) if e.is_integrity() => warn!("Duplicate follow {} -> {}", my_id, follow_id),
                other => other?,
            }
        }
        Ok(true)
    })
    .await?;

    if !followed {
        return Err(WebError::NotFound);
    }

    info!("User {} now follows {}", my_id, follow_id);
    Ok((jar, Redirect::to(&following_page)).into_response())
}

/// POST /users/stop-following/{follow_id}
pub async fn stop_following(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(follow_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let my_id = current.require()?.id;

    let removed = with_db(&state, move |db| db.unfollow(my_id, follow_id)).await?;
    if removed {
        info!("User {} stopped following {}", my_id, follow_id);
    }

    Ok((jar, Redirect::to(&format!("/users/{}/following", my_id))).into_response())
}

/// GET /users/profile
pub async fn edit_profile_form(
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, WebError> {
    let me = current.require()?;
    let (jar, flashes) = flash::take(jar);
    let body = render::profile_form(&[], me);
    Ok((jar, Layout::new(&current, &flashes).page("Edit Profile", &body)))
}

/// POST /users/profile — the current password must be supplied to save.
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> Result<Response, WebError> {
    let me = current.require()?.clone();

    let rerender = |jar: CookieJar, errors: &[&str]| {
        let (jar, flashes) = flash::take(jar);
        let body = render::profile_form(errors, &me);
        (jar, Layout::new(&current, &flashes).page("Edit Profile", &body)).into_response()
    };

    if let Err(errors) = form.validate() {
        return Ok(rerender(jar, &errors));
    }

    let update = UserUpdate {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        image_url: non_empty(&form.image_url).map(str::to_string),
        header_image_url: non_empty(&form.header_image_url).map(str::to_string),
        bio: non_empty(&form.bio).map(str::to_string),
        location: non_empty(&form.location).map(str::to_string),
    };
    let stored_hash = me.password.clone();
    let password = form.password.clone();
    let user_id = me.id;

    let result = with_db(&state, move |db| {
        if !accounts::verify_password(&stored_hash, &password) {
            return Ok(None);
        }
        db.update_user(user_id, &update).map(Some)
    })
    .await;

    match result {
        Ok(Some(user)) => {
            info!("User #{} updated their profile", user.id);
            Ok((jar, Redirect::to(&format!("/users/{}", user.id))).into_response())
        }
        Ok(None) => Ok(flash::redirect(jar, "/", Flash::danger("Wrong password, please try again."))),
        Err(WebError::Db(e)) if e.is_integrity() => {
            Ok(rerender(jar, &["Username or email already taken"]))
        }
        Err(e) => Err(e),
    }
}

/// POST /users/delete — remove the account and log out.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let me = current.require()?;
    let user_id = me.id;
    let username = me.username.clone();

    with_db(&state, move |db| db.delete_user(user_id)).await?;
    info!("Deleted user {} (#{})", username, user_id);

    let jar = do_logout(jar);
    Ok(flash::redirect(jar, "/signup", Flash::info("Your account has been deleted.")))
}
