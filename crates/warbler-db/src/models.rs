//! Database row types. These map directly to SQLite rows and stay distinct
//! from the `warbler-types` models so the storage layer owns its own shape.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use warbler_types::models::{Message, User};
use warbler_types::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, never the plaintext.
    pub password: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl UserRow {
    pub fn into_model(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            image_url: self.image_url.unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
            header_image_url: self
                .header_image_url
                .unwrap_or_else(|| DEFAULT_HEADER_IMAGE_URL.to_string()),
            bio: self.bio,
            location: self.location,
        }
    }
}

impl fmt::Display for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}

/// A user produced by `accounts::signup` that has not been written yet.
/// Persist it with `Database::insert_user`.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Explicit primary key; `None` lets SQLite assign one.
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

/// Profile edits. Every field replaces the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// A message joined with its author's display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: i64,
    pub text: String,
    pub timestamp: String,
    pub user_id: i64,
    pub author_username: String,
    pub author_image_url: Option<String>,
}

impl MessageRow {
    pub fn into_model(self) -> Message {
        let timestamp = parse_timestamp(&self.timestamp).unwrap_or_else(|| {
            warn!("Corrupt timestamp '{}' on message {}", self.timestamp, self.id);
            DateTime::default()
        });

        Message {
            id: self.id,
            text: self.text,
            timestamp,
            user_id: self.user_id,
            author_username: self.author_username,
            author_image_url: self
                .author_image_url
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeRow {
    pub id: i64,
    pub user_id: i64,
    pub message_id: i64,
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS.SSS" without timezone.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|ndt| ndt.and_utc())
        .or_else(|_| raw.parse::<DateTime<Utc>>())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_timestamps() {
        let ts = parse_timestamp("2026-10-19 08:30:15.250").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2026, 10, 19));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (8, 30, 15));

        assert!(parse_timestamp("2026-10-19 08:30:15").is_some());
        assert!(parse_timestamp("2026-10-19T08:30:15Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn missing_images_fall_back_to_defaults() {
        let row = UserRow {
            id: 7,
            username: "nopic".into(),
            email: "nopic@test.com".into(),
            password: "x".into(),
            image_url: None,
            header_image_url: None,
            bio: None,
            location: None,
        };
        let user = row.into_model();
        assert_eq!(user.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(user.header_image_url, DEFAULT_HEADER_IMAGE_URL);
    }
}
