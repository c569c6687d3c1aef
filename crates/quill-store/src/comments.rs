//! Comment operations.
//!
//! Two deletion semantics coexist on purpose: the comment's author
//! removes the row outright, while an admin flips a reversible
//! `is_deleted` flag. Unifying them would change observable behavior
//! (an admin-deleted comment can reappear; an owner-deleted one cannot).

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{AuthorRef, CommentView};
use crate::rows::{parse_timestamp, parse_uuid};

const COMMENT_COLUMNS: &str =
    "c.id, c.author_id, c.body, c.created_at, u.username, u.email";

impl Database {
    /// Append a comment to a non-deleted post. `text` must already be
    /// validated and trimmed.
    pub fn add_comment(&self, post_id: Uuid, author_id: Uuid, text: &str) -> Result<CommentView> {
        let visible: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM posts WHERE id = ?1 AND is_deleted = 0",
            params![post_id.to_string()],
            |row| row.get(0),
        )?;
        if visible == 0 {
            return Err(StoreError::NotFound);
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        self.conn().execute(
            "INSERT INTO comments (id, post_id, author_id, body, is_deleted, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                id.to_string(),
                post_id.to_string(),
                author_id.to_string(),
                text,
                now.to_rfc3339(),
            ],
        )?;

        self.comment_view(post_id, id)
    }

    /// Hard-remove the caller's own comment. Misses (wrong post, wrong
    /// author, or no such comment) all collapse into not-found.
    pub fn delete_own_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM comments WHERE id = ?1 AND post_id = ?2 AND author_id = ?3",
            params![
                comment_id.to_string(),
                post_id.to_string(),
                author_id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Admin soft delete / restore of a single comment, addressed by the
    /// composite (post id, comment id). Idempotent at the flag level.
    pub fn set_comment_deleted(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        deleted: bool,
    ) -> Result<CommentView> {
        let affected = self.conn().execute(
            "UPDATE comments SET is_deleted = ?3 WHERE id = ?1 AND post_id = ?2",
            params![
                comment_id.to_string(),
                post_id.to_string(),
                deleted as i64,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.comment_view(post_id, comment_id)
    }

    /// Comments on a post in creation order, authors resolved.
    /// `include_deleted` is only used by moderation tooling; client-facing
    /// views always filter.
    pub fn comments_for_post(
        &self,
        post_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<CommentView>> {
        let sql = if include_deleted {
            format!(
                "SELECT {COMMENT_COLUMNS}
                 FROM comments c JOIN users u ON u.id = c.author_id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC"
            )
        } else {
            format!(
                "SELECT {COMMENT_COLUMNS}
                 FROM comments c JOIN users u ON u.id = c.author_id
                 WHERE c.post_id = ?1 AND c.is_deleted = 0
                 ORDER BY c.created_at ASC"
            )
        };

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![post_id.to_string()], row_to_comment)?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    /// Fetch one comment regardless of its deletion flag (moderation
    /// responses echo the comment they just hid).
    fn comment_view(&self, post_id: Uuid, comment_id: Uuid) -> Result<CommentView> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {COMMENT_COLUMNS}
                     FROM comments c JOIN users u ON u.id = c.author_id
                     WHERE c.id = ?1 AND c.post_id = ?2"
                ),
                params![comment_id.to_string(), post_id.to_string()],
                row_to_comment,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}

fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentView> {
    let id_str: String = row.get(0)?;
    let author_str: String = row.get(1)?;
    let created_str: String = row.get(3)?;

    Ok(CommentView {
        id: parse_uuid(0, &id_str)?,
        author: AuthorRef {
            id: parse_uuid(1, &author_str)?,
            username: row.get(4)?,
            email: row.get(5)?,
        },
        text: row.get(2)?,
        created_at: parse_timestamp(3, &created_str)?,
    })
}
