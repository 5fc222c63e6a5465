//! View tests: drive the full router in-process with a small client that
//! carries cookies and follows redirects like a browser.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use axum_extra::extract::CookieJar;
use warbler_db::{Database, accounts};
use warbler_types::api::Flash;
use warbler_web::auth::create_token;
use warbler_web::flash::{self, FLASH_COOKIE};
use warbler_web::{AppState, AppStateInner, CURR_USER_KEY};

const SECRET: &str = "test-secret";

struct TestResponse {
    status: StatusCode,
    body: String,
}

struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    fn new(app: Router) -> Self {
        Self { app, cookies: HashMap::new() }
    }

    /// Equivalent of setting `CURR_USER_KEY` in the session.
    fn login_as(&mut self, user_id: i64, username: &str) {
        let token = create_token(SECRET, user_id, username).unwrap();
        self.cookies.insert(CURR_USER_KEY.to_string(), token);
    }

    async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&mut self, uri: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = form
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.replace(' ', "+")))
            .collect::<Vec<_>>()
            .join("&");
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn send(&mut self, method: Method, uri: &str, form: Option<String>) -> TestResponse {
        let mut method = method;
        let mut uri = uri.to_string();
        let mut form = form;

        for _ in 0..5 {
            let mut builder = Request::builder().method(method.clone()).uri(&uri);
            if !self.cookies.is_empty() {
                let cookie = self
                    .cookies
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("; ");
                builder = builder.header(header::COOKIE, cookie);
            }
            let body = match form.take() {
                Some(form) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                    Body::from(form)
                }
                None => Body::empty(),
            };

            let resp = self.app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
            self.store_cookies(resp.headers());

            let status = resp.status();
            if status.is_redirection() {
                uri = resp
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap()
                    .to_string();
                method = Method::GET;
                continue;
            }

            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            return TestResponse {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            };
        }
        panic!("too many redirects");
    }

    fn store_cookies(&mut self, headers: &axum::http::HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let pair = raw.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else { continue };
            if value.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(name.trim());
            } else {
                self.cookies.insert(name.trim().to_string(), value.to_string());
            }
        }
    }
}

/// `testuser1` (#1) and `testuser2` (#2), and a client with no session.
fn setup() -> (TestClient, AppState) {
    let db = Database::open_in_memory().unwrap();

    let mut u1 = accounts::signup("testuser1", "test1@test.com", "HASHED_PASSWORD1", None).unwrap();
    u1.id = Some(1);
    let mut u2 = accounts::signup("testuser2", "test2@test.com", "HASHED_PASSWORD", None).unwrap();
    u2.id = Some(2);
    db.insert_user(&u1).unwrap();
    db.insert_user(&u2).unwrap();

    let state: AppState = Arc::new(AppStateInner {
        db,
        secret_key: SECRET.to_string(),
    });
    let app = warbler_web::app(state.clone(), Path::new("static"));
    (TestClient::new(app), state)
}

#[tokio::test]
async fn users_index() {
    let (mut client, _) = setup();
    let resp = client.get("/users").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("@testuser1"));
    assert!(resp.body.contains("@testuser2"));
}

#[tokio::test]
async fn users_search() {
    let (mut client, _) = setup();

    let resp = client.get("/users?q=test").await;
    assert!(resp.body.contains("@testuser1"));
    assert!(resp.body.contains("@testuser2"));

    let resp = client.get("/users?q=user1").await;
    assert!(resp.body.contains("@testuser1"));
    assert!(!resp.body.contains("@testuser2"));

    let resp = client.get("/users?q=nobody").await;
    assert!(resp.body.contains("no users found"));
}

#[tokio::test]
async fn user_show() {
    let (mut client, state) = setup();
    state.db.insert_message(1, "Hey everyone").unwrap();

    let resp = client.get("/users/1").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("@testuser1"));
    assert!(resp.body.contains("Hey everyone"));

    let resp = client.get("/users/999").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn show_following_requires_login() {
    let (mut client, state) = setup();
    state.db.follow(1, 2).unwrap();

    let resp = client.get("/users/1/following").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Access unauthorized"));
    assert!(!resp.body.contains("@testuser2"));

    client.login_as(1, "testuser1");
    let resp = client.get("/users/1/following").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("@testuser2"));
    assert!(!resp.body.contains("Access unauthorized"));
}

#[tokio::test]
async fn followers_page_lists_followers() {
    let (mut client, state) = setup();
    state.db.follow(1, 2).unwrap();

    client.login_as(2, "testuser2");
    let resp = client.get("/users/2/followers").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("@testuser1"));
}

#[tokio::test]
async fn follow_then_stop_following() {
    let (mut client, state) = setup();
    client.login_as(1, "testuser1");

    let resp = client.post("/users/follow/2", &[]).await;
    assert!(resp.body.contains("@testuser2"));
    assert!(state.db.is_following(1, 2).unwrap());

    // Following twice is harmless.
    let resp = client.post("/users/follow/2", &[]).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = client.post("/users/stop-following/2", &[]).await;
    assert!(!resp.body.contains("@testuser2"));
    assert!(!state.db.is_following(1, 2).unwrap());
}

#[tokio::test]
async fn follow_requires_login() {
    let (mut client, state) = setup();

    let resp = client.post("/users/follow/2", &[]).await;
    assert!(resp.body.contains("Access unauthorized"));
    assert!(!state.db.is_following(1, 2).unwrap());
}

#[tokio::test]
async fn cannot_follow_self_or_missing_user() {
    let (mut client, state) = setup();
    client.login_as(1, "testuser1");

    let resp = client.post("/users/follow/1", &[]).await;
    assert!(resp.body.contains("You can&#x27;t follow yourself."));
    assert!(!state.db.is_following(1, 1).unwrap());

    let resp = client.post("/users/follow/999", &[]).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signup_logs_the_new_user_in() {
    let (mut client, state) = setup();

    let resp = client
        .post(
            "/signup",
            &[("username", "newuser"), ("email", "new@test.com"), ("password", "secret123"), ("image_url", "")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("@newuser"));
    assert!(client.cookies.contains_key(CURR_USER_KEY));

    let stored = state.db.get_user_by_username("newuser").unwrap().unwrap();
    assert_ne!(stored.password, "secret123");
    assert!(stored.image_url.is_none());
}

#[tokio::test]
async fn signup_rejects_taken_username_and_bad_input() {
    let (mut client, _) = setup();

    let resp = client
        .post(
            "/signup",
            &[("username", "testuser1"), ("email", "fresh@test.com"), ("password", "secret123")],
        )
        .await;
    assert!(resp.body.contains("Username or email already taken"));
    assert!(!client.cookies.contains_key(CURR_USER_KEY));

    let resp = client
        .post("/signup", &[("username", "shorty"), ("email", "nope"), ("password", "123")])
        .await;
    assert!(resp.body.contains("Invalid email address."));
    assert!(resp.body.contains("Password must be at least 6 characters."));
}

#[tokio::test]
async fn login_and_logout() {
    let (mut client, _) = setup();

    let resp = client
        .post("/login", &[("username", "testuser1"), ("password", "wrongpassword")])
        .await;
    assert!(resp.body.contains("Invalid credentials."));
    assert!(!client.cookies.contains_key(CURR_USER_KEY));

    let resp = client
        .post("/login", &[("username", "testuser1"), ("password", "HASHED_PASSWORD1")])
        .await;
    assert!(resp.body.contains("Hello, testuser1!"));

    let resp = client.get("/users/1/following").await;
    assert!(!resp.body.contains("Access unauthorized"));

    let resp = client.get("/logout").await;
    assert!(resp.body.contains("You have been logged out."));
    assert!(!client.cookies.contains_key(CURR_USER_KEY));

    let resp = client.get("/users/1/following").await;
    assert!(resp.body.contains("Access unauthorized"));
}

#[tokio::test]
async fn forged_or_stale_session_is_anonymous() {
    let (mut client, state) = setup();

    client.cookies.insert(CURR_USER_KEY.to_string(), "not-a-jwt".to_string());
    let resp = client.get("/users/1/following").await;
    assert!(resp.body.contains("Access unauthorized"));

    let forged = forged_token();
    client.cookies.insert(CURR_USER_KEY.to_string(), forged);
    let resp = client.get("/users/1/following").await;
    assert!(resp.body.contains("Access unauthorized"));

    client.login_as(2, "testuser2");
    state.db.delete_user(2).unwrap();
    let resp = client.get("/users/1/following").await;
    assert!(resp.body.contains("Access unauthorized"));
}

/// A token for user #1 signed with the wrong key.
fn forged_token() -> String {
    create_token("some-other-secret", 1, "testuser1").unwrap()
}

#[tokio::test]
async fn post_and_delete_messages() {
    let (mut client, state) = setup();

    let resp = client.post("/messages/new", &[("text", "Hey everyone")]).await;
    assert!(resp.body.contains("Access unauthorized"));

    client.login_as(1, "testuser1");
    let resp = client.post("/messages/new", &[("text", "Hey everyone")]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Hey everyone"));

    let messages = state.db.messages_for_user(1).unwrap();
    assert_eq!(messages.len(), 1);
    let message_id = messages[0].id;

    let resp = client.get(&format!("/messages/{}", message_id)).await;
    assert!(resp.body.contains("Hey everyone"));

    // Someone else cannot delete it.
    client.login_as(2, "testuser2");
    let resp = client.post(&format!("/messages/{}/delete", message_id), &[]).await;
    assert!(resp.body.contains("Access unauthorized"));
    assert!(state.db.get_message(message_id).unwrap().is_some());

    client.login_as(1, "testuser1");
    client.post(&format!("/messages/{}/delete", message_id), &[]).await;
    assert!(state.db.get_message(message_id).unwrap().is_none());
}

#[tokio::test]
async fn overlong_message_is_rejected() {
    let (mut client, state) = setup();
    client.login_as(1, "testuser1");

    let text = "a".repeat(141);
    let resp = client.post("/messages/new", &[("text", text.as_str())]).await;
    assert!(resp.body.contains("limited to 140 characters"));
    assert!(state.db.messages_for_user(1).unwrap().is_empty());
}

#[tokio::test]
async fn home_timeline_shows_followed_messages() {
    let (mut client, state) = setup();
    state.db.insert_message(2, "from a friend").unwrap();

    let resp = client.get("/").await;
    assert!(resp.body.contains("Sign up now"));
    assert!(!resp.body.contains("from a friend"));

    client.login_as(1, "testuser1");
    let resp = client.get("/").await;
    assert!(!resp.body.contains("from a friend"));

    state.db.follow(1, 2).unwrap();
    let resp = client.get("/").await;
    assert!(resp.body.contains("from a friend"));
}

#[tokio::test]
async fn like_toggles() {
    let (mut client, state) = setup();
    let theirs = state.db.insert_message(2, "likable").unwrap();
    let mine = state.db.insert_message(1, "my own").unwrap();
    client.login_as(1, "testuser1");

    client.post(&format!("/users/add_like/{}", theirs.id), &[]).await;
    assert_eq!(state.db.likes_by_user(1).unwrap().len(), 1);

    let resp = client.get("/users/1/likes").await;
    assert!(resp.body.contains("likable"));

    client.post(&format!("/users/add_like/{}", theirs.id), &[]).await;
    assert!(state.db.likes_by_user(1).unwrap().is_empty());

    let resp = client.post(&format!("/users/add_like/{}", mine.id), &[]).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = client.post("/users/add_like/999", &[]).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_profile_needs_the_password() {
    let (mut client, state) = setup();
    client.login_as(1, "testuser1");

    let resp = client.get("/users/profile").await;
    assert!(resp.body.contains("Edit Your Profile."));

    let resp = client
        .post(
            "/users/profile",
            &[("username", "renamed"), ("email", "test1@test.com"), ("password", "wrongpassword")],
        )
        .await;
    assert!(resp.body.contains("Wrong password, please try again."));
    assert!(state.db.get_user_by_username("renamed").unwrap().is_none());

    let resp = client
        .post(
            "/users/profile",
            &[
                ("username", "renamed"),
                ("email", "test1@test.com"),
                ("bio", "Just here to warble"),
                ("password", "HASHED_PASSWORD1"),
            ],
        )
        .await;
    assert!(resp.body.contains("@renamed"));
    assert!(resp.body.contains("Just here to warble"));

    let resp = client
        .post(
            "/users/profile",
            &[("username", "testuser2"), ("email", "test1@test.com"), ("password", "HASHED_PASSWORD1")],
        )
        .await;
    assert!(resp.body.contains("Username or email already taken"));
}

#[tokio::test]
async fn delete_account() {
    let (mut client, state) = setup();
    state.db.insert_message(1, "goodbye").unwrap();
    client.login_as(1, "testuser1");

    let resp = client.post("/users/delete", &[]).await;
    assert!(resp.body.contains("Your account has been deleted."));
    assert!(!client.cookies.contains_key(CURR_USER_KEY));
    assert!(state.db.get_user(1).unwrap().is_none());
    assert!(state.db.messages_for_user(1).unwrap().is_empty());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (mut client, _) = setup();
    let resp = client.get("/no/such/page").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unauthorized_keeps_queued_notices() {
    let (mut client, _) = setup();
    let jar = flash::push(CookieJar::new(), Flash::info("Queued earlier."));
    let queued = jar.get(FLASH_COOKIE).unwrap().value().to_string();
    client.cookies.insert(FLASH_COOKIE.to_string(), queued);

    let resp = client.get("/users/1/following").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Queued earlier."));
    assert!(resp.body.contains("Access unauthorized."));
    assert!(resp.body.contains("Sign up now"));
}
