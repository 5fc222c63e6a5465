use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use warbler_db::models::UserRow;
use warbler_types::api::Claims;

use crate::auth::{AppState, with_db};
use crate::error::{AccessDenied, WebError, access_denied_redirect};

/// Name of the session cookie that identifies the logged-in user.
pub const CURR_USER_KEY: &str = "curr_user";

/// The logged-in user for this request, if any. Inserted into request
/// extensions by `load_current_user` and read by handlers through
/// `Extension<CurrentUser>`.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<UserRow>);

impl CurrentUser {
    pub fn get(&self) -> Option<&UserRow> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }

    /// The logged-in user, or `WebError::Unauthorized`.
    pub fn require(&self) -> Result<&UserRow, WebError> {
        self.0.as_ref().ok_or(WebError::Unauthorized)
    }
}

pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| debug!("Rejected session token: {}", e))
    .ok()
}

/// Resolve the `curr_user` cookie into a `CurrentUser` extension. A missing,
/// invalid, or expired token, or one naming a deleted user, yields an
/// anonymous request. Unauthorized responses are re-issued here so the
/// request's queued flash notices survive the redirect.
pub async fn load_current_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let claims = jar
        .get(CURR_USER_KEY)
        .and_then(|cookie| decode_token(&state.secret_key, cookie.value()));

    let user = match claims {
        Some(claims) => with_db(&state, move |db| db.get_user(claims.sub)).await?,
        None => None,
    };

    req.extensions_mut().insert(CurrentUser(user));
    let resp = next.run(req).await;

    if resp.extensions().get::<AccessDenied>().is_some() {
        return Ok(access_denied_redirect(jar));
    }
    Ok(resp)
}
