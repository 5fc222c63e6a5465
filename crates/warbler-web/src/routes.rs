use std::path::Path;

use axum::{
    Router, middleware,
    response::Response,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::error::not_found_response;
use crate::middleware::load_current_user;
use crate::{likes, messages, users};

/// Build the full application router. `static_dir` is served under `/static`.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(messages::homepage))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/users", get(users::list_users))
        .route("/users/profile", get(users::edit_profile_form).post(users::edit_profile))
        .route("/users/delete", post(users::delete_user))
        .route("/users/{user_id}", get(users::show_user))
        .route("/users/{user_id}/following", get(users::show_following))
        .route("/users/{user_id}/followers", get(users::show_followers))
        .route("/users/{user_id}/likes", get(likes::show_likes))
        .route("/users/follow/{follow_id}", post(users::add_follow))
        .route("/users/stop-following/{follow_id}", post(users::stop_following))
        .route("/users/add_like/{message_id}", post(likes::toggle_like))
        .route("/messages/new", get(messages::new_message_form).post(messages::add_message))
        .route("/messages/{message_id}", get(messages::show_message))
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), load_current_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> Response {
    not_found_response()
}
