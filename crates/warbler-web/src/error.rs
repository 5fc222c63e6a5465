use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use thiserror::Error;
use tracing::error;

use warbler_db::DbError;
use warbler_types::api::Flash;

use crate::{flash, render};

#[derive(Debug, Error)]
pub enum WebError {
    /// No logged-in user. Rendered as a redirect home with a flashed notice,
    /// not as an error status.
    #[error("access unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => {
                // `load_current_user` rebuilds this with the request's cookies.
                let mut resp = access_denied_redirect(CookieJar::new());
                resp.extensions_mut().insert(AccessDenied);
                resp
            }
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Html(render::error_page("403", "You can't do that.")),
            )
                .into_response(),
            Self::NotFound | Self::Db(DbError::NotFound(_)) => not_found_response(),
            Self::Db(e) => {
                error!("Database error: {}", e);
                internal_error_response()
            }
            Self::Internal(msg) => {
                error!("{}", msg);
                internal_error_response()
            }
        }
    }
}

/// Marks a response produced by `WebError::Unauthorized`.
#[derive(Debug, Clone, Copy)]
pub struct AccessDenied;

/// Redirect home with "Access unauthorized." appended to the notices already
/// queued in `jar`.
pub fn access_denied_redirect(jar: CookieJar) -> Response {
    flash::redirect(jar, "/", Flash::danger("Access unauthorized."))
}

pub fn not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(render::error_page("404", "Sorry, we couldn't find that page.")),
    )
        .into_response()
}

fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(render::error_page("500", "Something went wrong.")),
    )
        .into_response()
}
