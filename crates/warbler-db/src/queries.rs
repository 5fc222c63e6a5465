use rusqlite::{Connection, Row, params};
use warbler_types::models::ProfileStats;

use crate::models::{MessageRow, NewUser, UserRow, UserUpdate};
use crate::{Database, DbError, OptionalExt, Result};

/// Column list for `users u`, in `user_from_row` order.
pub(crate) const USER_COLUMNS: &str =
    "u.id, u.username, u.email, u.password, u.image_url, u.header_image_url, u.bio, u.location";

/// Messages joined with their author, in `message_from_row` order.
pub(crate) const MESSAGE_SELECT: &str =
    "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url
     FROM messages m
     JOIN users u ON m.user_id = u.id";

impl Database {
    // -- Users --

    /// Persist a user built by `accounts::signup`. Duplicate usernames or
    /// emails fail here with `DbError::Integrity`.
    pub fn insert_user(&self, user: &NewUser) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (id, username, email, password, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user.id, user.username, user.email, user.password, user.image_url],
            )?;
            let id = tx.last_insert_rowid();
            let row = query_user_by_id(&tx, id)?.ok_or(DbError::NotFound("user"))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"),
                [username],
                user_from_row,
            )
            .optional()
        })
    }

    /// All users, or those whose username contains `search` (case-insensitive).
    pub fn list_users(&self, search: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let rows = match search {
                Some(term) => {
                    let pattern = format!("%{}%", escape_like(term));
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {USER_COLUMNS} FROM users u
                         WHERE u.username LIKE ?1 ESCAPE '\\'
                         ORDER BY u.username"
                    ))?;
                    let rows = stmt
                        .query_map([pattern], user_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt =
                        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.username"))?;
                    let rows = stmt
                        .query_map([], user_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    pub fn update_user(&self, id: i64, update: &UserUpdate) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE users
                 SET username = ?2, email = ?3, image_url = ?4,
                     header_image_url = ?5, bio = ?6, location = ?7
                 WHERE id = ?1",
                params![
                    id,
                    update.username,
                    update.email,
                    update.image_url,
                    update.header_image_url,
                    update.bio,
                    update.location,
                ],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("user"));
            }
            let row = query_user_by_id(&tx, id)?.ok_or(DbError::NotFound("user"))?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Remove a user. Their messages, likes, and follow edges cascade.
    /// Returns false if no such user existed.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    pub fn profile_stats(&self, user_id: i64) -> Result<ProfileStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM messages WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE followed_id = ?1),
                    (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
                [user_id],
                |row| {
                    Ok(ProfileStats {
                        messages: row.get::<_, i64>(0)? as u64,
                        following: row.get::<_, i64>(1)? as u64,
                        followers: row.get::<_, i64>(2)? as u64,
                        likes: row.get::<_, i64>(3)? as u64,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, user_id: i64, text: &str) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (text, user_id) VALUES (?1, ?2)",
                params![text, user_id],
            )?;
            let id = tx.last_insert_rowid();
            let row = query_message(&tx, id)?.ok_or(DbError::NotFound("message"))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    pub fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    /// A user's own messages, newest first.
    pub fn messages_for_user(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT}
                 WHERE m.user_id = ?1
                 ORDER BY m.timestamp DESC, m.id DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Messages by `user_id` and everyone they follow, newest first.
    pub fn home_timeline(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT}
                 WHERE m.user_id = ?1
                    OR m.user_id IN (SELECT followed_id FROM follows WHERE follower_id = ?1)
                 ORDER BY m.timestamp DESC, m.id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![user_id, limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        user_id: row.get(3)?,
        author_username: row.get(4)?,
        author_image_url: row.get(5)?,
    })
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
        [id],
        user_from_row,
    )
    .optional()
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    conn.query_row(&format!("{MESSAGE_SELECT} WHERE m.id = ?1"), [id], message_from_row)
        .optional()
}

/// Escape LIKE wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
