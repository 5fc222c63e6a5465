use rusqlite::params;

use crate::models::UserRow;
use crate::queries::{USER_COLUMNS, user_from_row};
use crate::{Database, Result};

impl Database {
    // -- Follows --

    /// Record that `follower_id` follows `followed_id`. Following the same
    /// user twice is a `DbError::Integrity`.
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO follows (followed_id, follower_id) VALUES (?1, ?2)",
                params![followed_id, follower_id],
            )?;
            Ok(())
        })
    }

    /// Drop the follow edge. Returns false if there was none.
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM follows WHERE followed_id = ?1 AND follower_id = ?2",
                params![followed_id, follower_id],
            )?;
            Ok(deleted > 0)
        })
    }

    /// Does `user_id` follow `other_id`?
    pub fn is_following(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2)",
                params![user_id, other_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Is `user_id` followed by `other_id`?
    pub fn is_followed_by(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.is_following(other_id, user_id)
    }

    /// Users that `user_id` follows.
    pub fn following(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS}
                 FROM follows f
                 JOIN users u ON u.id = f.followed_id
                 WHERE f.follower_id = ?1
                 ORDER BY u.id"
            ))?;
            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users following `user_id`.
    pub fn followers(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS}
                 FROM follows f
                 JOIN users u ON u.id = f.follower_id
                 WHERE f.followed_id = ?1
                 ORDER BY u.id"
            ))?;
            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::seeded;

    #[test]
    fn follow_adds_a_follower() {
        let (db, u1, u2) = seeded();
        db.follow(u1.id, u2.id).unwrap();

        assert_eq!(db.followers(u2.id).unwrap().len(), 1);
        assert_eq!(db.following(u2.id).unwrap().len(), 0);
        assert_eq!(db.following(u1.id).unwrap()[0].username, "testuser2");
    }

    #[test]
    fn is_following_is_directional() {
        let (db, u1, u2) = seeded();
        db.follow(u1.id, u2.id).unwrap();

        assert!(db.is_following(u1.id, u2.id).unwrap());
        assert!(!db.is_following(u2.id, u1.id).unwrap());
    }

    #[test]
    fn is_followed_by_is_directional() {
        let (db, u1, u2) = seeded();
        db.follow(u1.id, u2.id).unwrap();

        assert!(db.is_followed_by(u2.id, u1.id).unwrap());
        assert!(!db.is_followed_by(u1.id, u1.id).unwrap());
        assert!(!db.is_followed_by(u1.id, u2.id).unwrap());
    }

    #[test]
    fn follow_edge_is_unique() {
        let (db, u1, u2) = seeded();
        db.follow(u1.id, u2.id).unwrap();
        assert!(db.follow(u1.id, u2.id).unwrap_err().is_integrity());

        // The reverse edge is a different pair.
        db.follow(u2.id, u1.id).unwrap();
    }

    #[test]
    fn unfollow_removes_the_edge() {
        let (db, u1, u2) = seeded();
        db.follow(u1.id, u2.id).unwrap();

        assert!(db.unfollow(u1.id, u2.id).unwrap());
        assert!(!db.unfollow(u1.id, u2.id).unwrap());
        assert!(!db.is_following(u1.id, u2.id).unwrap());
        assert!(db.followers(u2.id).unwrap().is_empty());
    }

    #[test]
    fn cannot_follow_missing_user() {
        let (db, u1, _) = seeded();
        assert!(db.follow(u1.id, 404).unwrap_err().is_integrity());
    }
}
