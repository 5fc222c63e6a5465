//! One-shot notices carried across a redirect in a `flash` cookie.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use tracing::debug;

use warbler_types::api::Flash;

pub const FLASH_COOKIE: &str = "flash";

/// Queue a notice for the next rendered page.
pub fn push(jar: CookieJar, flash: Flash) -> CookieJar {
    let mut pending = jar.get(FLASH_COOKIE).map(|c| decode(c.value())).unwrap_or_default();
    pending.push(flash);

    jar.add(
        Cookie::build((FLASH_COOKIE, encode(&pending)))
            .path("/")
            .http_only(true),
    )
}

/// Drain queued notices. The returned jar clears the cookie.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, Vec::new());
    };
    let flashes = decode(cookie.value());
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flashes)
}

/// 303 to `to` with `flash` queued.
pub fn redirect(jar: CookieJar, to: &str, flash: Flash) -> Response {
    (push(jar, flash), Redirect::to(to)).into_response()
}

fn encode(flashes: &[Flash]) -> String {
    // Serializing a Vec of plain structs cannot fail.
    let json = serde_json::to_vec(flashes).unwrap_or_default();
    B64.encode(json)
}

fn decode(raw: &str) -> Vec<Flash> {
    let parsed = B64
        .decode(raw)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok());

    parsed.unwrap_or_else(|| {
        debug!("Discarding unreadable flash cookie");
        Vec::new()
    })
}
