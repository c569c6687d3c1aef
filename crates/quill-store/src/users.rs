//! User CRUD and moderation flag updates.
//!
//! Registration-time conflicts are checked against non-deleted rows so the
//! API can name the offending field; the UNIQUE columns then enforce
//! global uniqueness (soft-deleted rows included) as a backstop.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use quill_shared::moderation::Role;

use crate::database::Database;
use crate::error::{map_unique_violation, Result, StoreError};
use crate::models::User;
use crate::rows::{parse_timestamp, parse_uuid};

const USER_COLUMNS: &str = "id, username, email, password_hash, profile_image, role, \
     is_approved, is_verified, is_banned, is_deleted, created_at, updated_at";

impl Database {
    /// Insert a new user in the unverified/unapproved state.
    ///
    /// `email` must already be normalized (lowercased, trimmed).
    pub fn insert_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User> {
        // Conflict among live rows first, so the caller learns which field
        // clashed. Deleted rows still collide below via the UNIQUE columns.
        if let Some(field) = self.credential_conflict(Some(username), Some(email), None)? {
            return Err(StoreError::Conflict { field });
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        self.conn()
            .execute(
                "INSERT INTO users (id, username, email, password_hash, role,
                     is_approved, is_verified, is_banned, is_deleted, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'user', 0, 0, 0, 0, ?5, ?5)",
                params![
                    id.to_string(),
                    username,
                    email,
                    password_hash,
                    now.to_rfc3339(),
                ],
            )
            .map_err(map_unique_violation)?;

        self.get_user(id)
    }

    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Look up a non-deleted user by normalized email (login path).
    pub fn find_active_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 AND is_deleted = 0"),
                params![email],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Look up a user by normalized email regardless of deletion state
    /// (password reset path).
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Check whether another live user already holds `username` or `email`.
    /// Returns the name of the first conflicting field.
    pub fn credential_conflict(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<Option<&'static str>> {
        let exclude = exclude.map(|id| id.to_string()).unwrap_or_default();

        if let Some(email) = email {
            let hit: Option<String> = self
                .conn()
                .query_row(
                    "SELECT id FROM users
                     WHERE email = ?1 AND is_deleted = 0 AND id != ?2",
                    params![email, exclude],
                    |row| row.get(0),
                )
                .optional()?;
            if hit.is_some() {
                return Ok(Some("email"));
            }
        }

        if let Some(username) = username {
            let hit: Option<String> = self
                .conn()
                .query_row(
                    "SELECT id FROM users
                     WHERE username = ?1 AND is_deleted = 0 AND id != ?2",
                    params![username, exclude],
                    |row| row.get(0),
                )
                .optional()?;
            if hit.is_some() {
                return Ok(Some("username"));
            }
        }

        Ok(None)
    }

    /// List users for the admin console, newest last.
    pub fn list_users(&self, include_deleted: bool) -> Result<Vec<User>> {
        let sql = if include_deleted {
            format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC")
        } else {
            format!(
                "SELECT {USER_COLUMNS} FROM users WHERE is_deleted = 0 ORDER BY created_at ASC"
            )
        };

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Update the caller's own profile. `None` fields are left untouched.
    pub fn update_profile(
        &self,
        id: Uuid,
        username: Option<&str>,
        email: Option<&str>,
        profile_image: Option<&str>,
    ) -> Result<User> {
        let affected = self
            .conn()
            .execute(
                "UPDATE users SET
                     username      = COALESCE(?2, username),
                     email         = COALESCE(?3, email),
                     profile_image = COALESCE(?4, profile_image),
                     updated_at    = ?5
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    username,
                    email,
                    profile_image,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(map_unique_violation)?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }

    /// Mark the user's email as verified (email verification flow).
    pub fn set_verified(&self, id: Uuid) -> Result<()> {
        self.flag_update("UPDATE users SET is_verified = 1, updated_at = ?2 WHERE id = ?1", id)
    }

    /// Admin approval: `PendingApproval` -> `Active`. Fails with
    /// [`StoreError::NotFound`] when the target is missing or deleted.
    pub fn set_approved(&self, id: Uuid) -> Result<User> {
        self.flag_update(
            "UPDATE users SET is_approved = 1, updated_at = ?2
             WHERE id = ?1 AND is_deleted = 0",
            id,
        )?;
        self.get_user(id)
    }

    /// Admin suspend/unsuspend. Deleted targets report not-found.
    pub fn set_banned(&self, id: Uuid, banned: bool) -> Result<User> {
        let affected = self.conn().execute(
            "UPDATE users SET is_banned = ?2, updated_at = ?3
             WHERE id = ?1 AND is_deleted = 0",
            params![id.to_string(), banned as i64, Utc::now().to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }

    /// Admin soft delete. Terminal; idempotent at the flag level.
    pub fn mark_user_deleted(&self, id: Uuid) -> Result<User> {
        self.flag_update("UPDATE users SET is_deleted = 1, updated_at = ?2 WHERE id = ?1", id)?;
        self.get_user(id)
    }

    /// Replace the stored password hash (password reset flow).
    pub fn set_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), password_hash, Utc::now().to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Promote the account holding `email` to an approved, verified admin.
    /// Used by the startup bootstrap; returns whether a row matched.
    pub fn promote_admin(&self, email: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET role = 'admin', is_approved = 1, is_verified = 1, updated_at = ?2
             WHERE email = ?1 AND is_deleted = 0",
            params![email, Utc::now().to_rfc3339()],
        )?;
        Ok(affected > 0)
    }

    fn flag_update(&self, sql: &str, id: Uuid) -> Result<()> {
        let affected = self
            .conn()
            .execute(sql, params![id.to_string(), Utc::now().to_rfc3339()])?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let role_str: String = row.get(5)?;
    let created_str: String = row.get(10)?;
    let updated_str: String = row.get(11)?;

    Ok(User {
        id: parse_uuid(0, &id_str)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        profile_image: row.get(4)?,
        role: Role::parse(&role_str),
        is_approved: row.get::<_, i64>(6)? != 0,
        is_verified: row.get::<_, i64>(7)? != 0,
        is_banned: row.get::<_, i64>(8)? != 0,
        is_deleted: row.get::<_, i64>(9)? != 0,
        created_at: parse_timestamp(10, &created_str)?,
        updated_at: parse_timestamp(11, &updated_str)?,
    })
}
