//! Like toggling.
//!
//! The toggle reads current membership and then writes, mirroring the
//! platform's original read-modify-write semantics. Two interleaved
//! toggles by the same actor can lose an update; like counts are not
//! consistency-critical, and the single store connection serializes the
//! calls in practice.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::LikeOutcome;
use crate::rows::parse_uuid;

impl Database {
    /// Flip `user_id`'s membership in the post's like set. Fails with
    /// [`StoreError::NotFound`] when the post is missing or deleted.
    pub fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let visible: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM posts WHERE id = ?1 AND is_deleted = 0",
            params![post_id.to_string()],
            |row| row.get(0),
        )?;
        if visible == 0 {
            return Err(StoreError::NotFound);
        }

        let already_liked: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;

        if already_liked > 0 {
            self.conn().execute(
                "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id.to_string(), user_id.to_string()],
            )?;
        } else {
            self.conn().execute(
                "INSERT INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![
                    post_id.to_string(),
                    user_id.to_string(),
                    Utc::now().to_rfc3339(),
                ],
            )?;
        }

        Ok(LikeOutcome {
            liked: already_liked == 0,
            likes: self.likes_for_post(post_id)?,
        })
    }

    /// User ids liking a post, oldest first.
    pub fn likes_for_post(&self, post_id: Uuid) -> Result<Vec<Uuid>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM likes WHERE post_id = ?1 ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![post_id.to_string()], |row| {
            let id_str: String = row.get(0)?;
            parse_uuid(0, &id_str)
        })?;

        let mut likes = Vec::new();
        for row in rows {
            likes.push(row?);
        }
        Ok(likes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn toggle_is_an_involution() {
        let (db, _dir) = test_db();
        let alice = db.insert_user("alice", "alice@x.com", "hash").unwrap().id;
        let bob = db.insert_user("bob", "bob@x.com", "hash").unwrap().id;
        let post = db.insert_post(alice, "Title", "body", None).unwrap().id;

        let before = db.likes_for_post(post).unwrap();

        let outcome = db.toggle_like(post, bob).unwrap();
        assert!(outcome.liked);
        assert_eq!(outcome.likes, vec![bob]);

        let outcome = db.toggle_like(post, bob).unwrap();
        assert!(!outcome.liked);
        assert_eq!(outcome.likes, before);
    }

    #[test]
    fn membership_is_at_most_once_per_user() {
        let (db, _dir) = test_db();
        let alice = db.insert_user("alice", "alice@x.com", "hash").unwrap().id;
        let bob = db.insert_user("bob", "bob@x.com", "hash").unwrap().id;
        let post = db.insert_post(alice, "Title", "body", None).unwrap().id;

        db.toggle_like(post, bob).unwrap();
        db.toggle_like(post, alice).unwrap();

        let likes = db.likes_for_post(post).unwrap();
        assert_eq!(likes.len(), 2);
        assert!(likes.contains(&bob) && likes.contains(&alice));
    }

    #[test]
    fn deleted_or_missing_post_misses() {
        let (db, _dir) = test_db();
        let alice = db.insert_user("alice", "alice@x.com", "hash").unwrap().id;
        let post = db.insert_post(alice, "Title", "body", None).unwrap().id;
        db.author_delete_post(post, alice).unwrap();

        assert!(matches!(
            db.toggle_like(post, alice).unwrap_err(),
            StoreError::NotFound
        ));
        assert!(matches!(
            db.toggle_like(Uuid::new_v4(), alice).unwrap_err(),
            StoreError::NotFound
        ));
    }
}
