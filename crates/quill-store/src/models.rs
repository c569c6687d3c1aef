//! Domain model structs persisted in the SQLite database, plus the
//! response projections the API serializes.
//!
//! Projections follow the wire conventions of the public API: camelCase
//! field names, author references resolved to `{id, username, email}`,
//! password hashes never serialized, and soft-deleted comments filtered
//! out before the view is built.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use quill_shared::moderation::{AccountFlags, Role};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A full user row. Serialized only in admin responses, where the
/// moderation flags (including `isDeleted`) are part of the payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Stored lowercased and trimmed.
    pub email: String,
    /// Argon2 PHC string. Never leaves the process.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_image: Option<String>,
    pub role: Role,
    pub is_approved: bool,
    pub is_verified: bool,
    pub is_banned: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The moderation flag set, for standing derivation and login gating.
    pub fn flags(&self) -> AccountFlags {
        AccountFlags {
            is_approved: self.is_approved,
            is_verified: self.is_verified,
            is_banned: self.is_banned,
            is_deleted: self.is_deleted,
        }
    }
}

/// The non-sensitive user projection returned to ordinary callers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub role: Role,
    pub is_approved: bool,
    pub is_verified: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
            role: user.role,
            is_approved: user.is_approved,
            is_verified: user.is_verified,
        }
    }
}

/// Resolved author identity embedded in post and comment views.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A raw post row. Internal to the store; the API works with [`PostView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub views: i64,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post with its author resolved, like set, and visible comments.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub author: AuthorRef,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    /// User ids that currently like this post, each at most once.
    pub likes: Vec<Uuid>,
    pub comments: Vec<CommentView>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment with its author resolved.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub author: AuthorRef,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Result of a like toggle: the action taken plus the new membership.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: Vec<Uuid>,
}
