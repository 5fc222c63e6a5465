use std::sync::Arc;

use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use warbler_db::models::UserRow;
use warbler_db::{Database, accounts};
use warbler_types::api::{Claims, Flash, LoginForm, SignupForm, non_empty};

use crate::error::WebError;
use crate::flash;
use crate::middleware::{CURR_USER_KEY, CurrentUser};
use crate::render::{self, Layout};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub secret_key: String,
}

/// Run blocking database work off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, WebError>
where
    F: FnOnce(&Database) -> warbler_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| WebError::Internal(format!("spawn_blocking join error: {}", e)))?
        .map_err(WebError::from)
}

pub fn create_token(secret: &str, user_id: i64, username: &str) -> jsonwebtoken::errors::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Log `user` in by setting the session cookie.
pub fn do_login(jar: CookieJar, secret: &str, user: &UserRow) -> Result<CookieJar, WebError> {
    let token = create_token(secret, user.id, &user.username)
        .map_err(|e| WebError::Internal(format!("Failed to sign session token: {}", e)))?;

    Ok(jar.add(
        Cookie::build((CURR_USER_KEY, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    ))
}

pub fn do_logout(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(CURR_USER_KEY).path("/"))
}

// -- Signup --

pub async fn signup_form(
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> impl IntoResponse {
    let (jar, flashes) = flash::take(jar);
    let body = render::signup_form(&[], "", "", "");
    (jar, Layout::new(&current, &flashes).page("Sign up", &body))
}

pub async fn signup(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, WebError> {
    let rerender = |jar: CookieJar, errors: &[&str], form: &SignupForm| {
        let (jar, flashes) = flash::take(jar);
        let body = render::signup_form(
            errors,
            &form.username,
            &form.email,
            non_empty(&form.image_url).unwrap_or_default(),
        );
        (jar, Layout::new(&current, &flashes).page("Sign up", &body)).into_response()
    };

    if let Err(errors) = form.validate() {
        return Ok(rerender(jar, &errors, &form));
    }

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();
    let password = form.password.clone();
    let image_url = non_empty(&form.image_url).map(str::to_string);

    let created = with_db(&state, move |db| {
        let new_user = accounts::signup(&username, &email, &password, image_url.as_deref())?;
        db.insert_user(&new_user)
    })
    .await;

    let user = match created {
        Ok(user) => user,
        Err(WebError::Db(e)) if e.is_integrity() => {
            return Ok(rerender(jar, &["Username or email already taken"], &form));
        }
        Err(e) => return Err(e),
    };

    info!("New user registered: {} (#{})", user.username, user.id);
    let jar = do_login(jar, &state.secret_key, &user)?;
    Ok((jar, Redirect::to("/")).into_response())
}

// -- Login / logout --

pub async fn login_form(
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> impl IntoResponse {
    let (jar, flashes) = flash::take(jar);
    let body = render::login_form(&[], "");
    (jar, Layout::new(&current, &flashes).page("Log in", &body))
}

pub async fn login(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let username = form.username.clone();
    let password = form.password.clone();
    let user = with_db(&state, move |db| db.authenticate(&username, &password)).await?;

    match user {
        Some(user) => {
            let jar = do_login(jar, &state.secret_key, &user)?;
            let greeting = Flash::success(format!("Hello, {}!", user.username));
            Ok(flash::redirect(jar, "/", greeting))
        }
        None => {
            let (jar, mut flashes) = flash::take(jar);
            flashes.push(Flash::danger("Invalid credentials."));
            let body = render::login_form(&[], &form.username);
            Ok((jar, Layout::new(&current, &flashes).page("Log in", &body)).into_response())
        }
    }
}

pub async fn logout(
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Response {
    if let Some(user) = current.get() {
        info!("User {} logged out", user.username);
    }
    let jar = do_logout(jar);
    flash::redirect(jar, "/login", Flash::success("You have been logged out."))
}
