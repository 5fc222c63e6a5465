use std::collections::HashSet;

use rusqlite::params;

use crate::models::{LikeRow, MessageRow};
use crate::queries::{MESSAGE_SELECT, message_from_row};
use crate::{Database, Result};

impl Database {
    // -- Likes --

    /// Insert one like edge. Liking the same message twice is a
    /// `DbError::Integrity`; callers that want toggle semantics use
    /// `toggle_like`.
    pub fn add_like(&self, user_id: i64, message_id: i64) -> Result<LikeRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                params![user_id, message_id],
            )?;
            Ok(LikeRow {
                id: conn.last_insert_rowid(),
                user_id,
                message_id,
            })
        })
    }

    pub fn remove_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                params![user_id, message_id],
            )?;
            Ok(deleted > 0)
        })
    }

    /// Like the message, or unlike it if `user_id` already does. Returns
    /// whether the message is liked afterwards. Both steps run in one
    /// transaction, so concurrent toggles never collide on the unique edge.
    pub fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                params![user_id, message_id],
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                    params![user_id, message_id],
                )?;
            }
            tx.commit()?;
            Ok(removed == 0)
        })
    }

    pub fn has_liked(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = ?1 AND message_id = ?2)",
                params![user_id, message_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Raw like edges recorded by `user_id`.
    pub fn likes_by_user(&self, user_id: i64) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, message_id FROM likes WHERE user_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(LikeRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message_id: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Messages `user_id` has liked, most recently liked first.
    pub fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT}
                 JOIN likes l ON l.message_id = m.id
                 WHERE l.user_id = ?1
                 ORDER BY l.id DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Ids of every message `user_id` has liked, for marking liked messages
    /// in a listing without a query per message.
    pub fn liked_message_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT message_id FROM likes WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<HashSet<i64>, _>>()?;
            Ok(ids)
        })
    }
}
