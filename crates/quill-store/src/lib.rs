//! # quill-store
//!
//! Persistence for the Quill blogging platform, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model. Soft-deleted rows stay in place; visibility filtering happens in
//! the query predicates. Comments and likes are owned by their post
//! (`ON DELETE CASCADE`); users are only referenced.

pub mod comments;
pub mod database;
pub mod likes;
pub mod migrations;
pub mod models;
pub mod posts;
pub mod users;

mod error;
mod rows;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
