//! v001 -- Initial schema creation.
//!
//! Creates the four core tables: `users`, `posts`, `comments`, and
//! `likes`. Comments and likes cascade with their post; user rows are
//! never removed (soft delete only), so no cascade hangs off `users`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    username      TEXT NOT NULL UNIQUE,        -- unique across ALL rows, deleted included
    email         TEXT NOT NULL UNIQUE,        -- stored lowercased
    password_hash TEXT NOT NULL,               -- argon2 PHC string
    profile_image TEXT,
    role          TEXT NOT NULL DEFAULT 'user',
    is_approved   INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    is_verified   INTEGER NOT NULL DEFAULT 0,
    is_banned     INTEGER NOT NULL DEFAULT 0,
    is_deleted    INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,               -- ISO-8601 / RFC-3339
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email_deleted ON users(email, is_deleted);
CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);

-- ----------------------------------------------------------------
-- Posts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id         TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    author_id  TEXT NOT NULL,                  -- FK -> users(id)
    title      TEXT NOT NULL,
    content    TEXT NOT NULL,
    image      TEXT,                           -- hosted image URL
    views      INTEGER NOT NULL DEFAULT 0,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_posts_deleted_created
    ON posts(is_deleted, created_at);

-- ----------------------------------------------------------------
-- Comments (owned by their post)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS comments (
    id         TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    post_id    TEXT NOT NULL,                  -- FK -> posts(id)
    author_id  TEXT NOT NULL,                  -- FK -> users(id)
    body       TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,

    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at);

-- ----------------------------------------------------------------
-- Likes (one row per user per post)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS likes (
    post_id    TEXT NOT NULL,                  -- FK -> posts(id)
    user_id    TEXT NOT NULL,                  -- FK -> users(id)
    created_at TEXT NOT NULL,

    PRIMARY KEY (post_id, user_id),
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id)
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
