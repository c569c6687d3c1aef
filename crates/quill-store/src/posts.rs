//! Post CRUD, visibility toggles, and the view-count bump.
//!
//! Ownership and deletion guards are folded into the UPDATE predicates so
//! a non-author or a wrong-state row simply misses, which the API reports
//! as not-found (information hiding: callers cannot distinguish "someone
//! else's post" from "no such post").

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use quill_shared::moderation::{ModerationAction, Visibility};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{AuthorRef, Post, PostView};
use crate::rows::{parse_timestamp, parse_uuid};

const POST_COLUMNS: &str =
    "p.id, p.author_id, p.title, p.content, p.image, p.views, p.is_deleted, \
     p.created_at, p.updated_at, u.username, u.email";

impl Database {
    /// Persist a new post and return its resolved view.
    pub fn insert_post(
        &self,
        author_id: Uuid,
        title: &str,
        content: &str,
        image: Option<&str>,
    ) -> Result<PostView> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.conn().execute(
            "INSERT INTO posts (id, author_id, title, content, image, views, is_deleted,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?6)",
            params![
                id.to_string(),
                author_id.to_string(),
                title,
                content,
                image,
                now.to_rfc3339(),
            ],
        )?;

        self.post_view(id)
    }

    /// All non-deleted posts in creation order, authors resolved.
    pub fn list_posts(&self) -> Result<Vec<PostView>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {POST_COLUMNS}
             FROM posts p JOIN users u ON u.id = p.author_id
             WHERE p.is_deleted = 0
             ORDER BY p.created_at ASC"
        ))?;

        let rows = stmt.query_map([], row_to_post_with_author)?;

        let mut views = Vec::new();
        for row in rows {
            let (post, author) = row?;
            views.push(self.assemble_view(post, author)?);
        }
        Ok(views)
    }

    /// Fetch a non-deleted post by id, bumping its view counter by one as
    /// a side effect of the read. The bump and the visibility check share
    /// one guarded UPDATE, so a deleted post is never counted.
    pub fn get_post_and_bump_views(&self, id: Uuid) -> Result<PostView> {
        let affected = self.conn().execute(
            "UPDATE posts SET views = views + 1 WHERE id = ?1 AND is_deleted = 0",
            params![id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.post_view(id)
    }

    /// Overwrite title/content (and image, when supplied) of the caller's
    /// own non-deleted post.
    pub fn update_post(
        &self,
        id: Uuid,
        author_id: Uuid,
        title: &str,
        content: &str,
        image: Option<&str>,
    ) -> Result<PostView> {
        let affected = self.conn().execute(
            "UPDATE posts SET
                 title      = ?3,
                 content    = ?4,
                 image      = COALESCE(?5, image),
                 updated_at = ?6
             WHERE id = ?1 AND author_id = ?2 AND is_deleted = 0",
            params![
                id.to_string(),
                author_id.to_string(),
                title,
                content,
                image,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.post_view(id)
    }

    /// Author-scoped soft delete. Only the author may hide their own
    /// currently-visible post.
    pub fn author_delete_post(&self, id: Uuid, author_id: Uuid) -> Result<PostView> {
        self.author_toggle(id, author_id, ModerationAction::Delete)
    }

    /// Author-scoped restore of a post they previously soft-deleted.
    pub fn author_restore_post(&self, id: Uuid, author_id: Uuid) -> Result<PostView> {
        self.author_toggle(id, author_id, ModerationAction::Restore)
    }

    /// Admin override: set the deletion flag on any existing post,
    /// regardless of author or current state (idempotent).
    pub fn set_post_deleted(&self, id: Uuid, deleted: bool) -> Result<PostView> {
        let affected = self.conn().execute(
            "UPDATE posts SET is_deleted = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), deleted as i64, Utc::now().to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.post_view(id)
    }

    /// Apply an owner-scoped transition. The transition table pins the one
    /// state the action is legal from, and that state joins the row
    /// predicate, so a post in the wrong state (or someone else's post)
    /// simply misses.
    fn author_toggle(
        &self,
        id: Uuid,
        author_id: Uuid,
        action: ModerationAction,
    ) -> Result<PostView> {
        let (from, to) =
            Visibility::content_transition(action).ok_or(StoreError::NotFound)?;

        let affected = self.conn().execute(
            "UPDATE posts SET is_deleted = ?3, updated_at = ?4
             WHERE id = ?1 AND author_id = ?2 AND is_deleted = ?5",
            params![
                id.to_string(),
                author_id.to_string(),
                (!to.is_visible()) as i64,
                Utc::now().to_rfc3339(),
                (!from.is_visible()) as i64,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.post_view(id)
    }

    /// Assemble the resolved view of a post regardless of its deletion
    /// flag (moderation responses echo the just-hidden post).
    pub fn post_view(&self, id: Uuid) -> Result<PostView> {
        let (post, author) = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {POST_COLUMNS}
                     FROM posts p JOIN users u ON u.id = p.author_id
                     WHERE p.id = ?1"
                ),
                params![id.to_string()],
                row_to_post_with_author,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;

        self.assemble_view(post, author)
    }

    fn assemble_view(&self, post: Post, author: AuthorRef) -> Result<PostView> {
        let comments = self.comments_for_post(post.id, false)?;
        let likes = self.likes_for_post(post.id)?;

        Ok(PostView {
            id: post.id,
            author,
            title: post.title,
            content: post.content,
            image: post.image,
            likes,
            comments,
            views: post.views,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }
}

fn row_to_post_with_author(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Post, AuthorRef)> {
    let id_str: String = row.get(0)?;
    let author_str: String = row.get(1)?;
    let created_str: String = row.get(7)?;
    let updated_str: String = row.get(8)?;

    let id = parse_uuid(0, &id_str)?;
    let author_id = parse_uuid(1, &author_str)?;

    let post = Post {
        id,
        author_id,
        title: row.get(2)?,
        content: row.get(3)?,
        image: row.get(4)?,
        views: row.get(5)?,
        is_deleted: row.get::<_, i64>(6)? != 0,
        created_at: parse_timestamp(7, &created_str)?,
        updated_at: parse_timestamp(8, &updated_str)?,
    };

    let author = AuthorRef {
        id: author_id,
        username: row.get(9)?,
        email: row.get(10)?,
    };

    Ok((post, author))
}
