//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development. The JWT secret defaults to a
//! dev-only value and logs a warning when left unset.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file. When unset the store picks a path in the
    /// platform data directory.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,

    /// HMAC secret for session and action tokens.
    /// Env: `JWT_SECRET`
    /// Default: dev-only constant (logged as a warning).
    pub jwt_secret: String,

    /// Session token lifetime in seconds.
    /// Env: `SESSION_TTL_SECS`
    /// Default: `3600`
    pub session_ttl_secs: i64,

    /// Filesystem path where uploaded post images are stored.
    /// Env: `UPLOAD_PATH`
    /// Default: `./uploads`
    pub upload_path: PathBuf,

    /// Maximum accepted image upload size in bytes (10 MiB).
    pub max_image_size: usize,

    /// Base URL prepended to verification links and stored image URLs.
    /// Env: `PUBLIC_BASE_URL`
    /// Default: `http://localhost:8080`
    pub public_base_url: String,

    /// Email address promoted to an approved, verified admin at startup.
    /// Env: `BOOTSTRAP_ADMIN_EMAIL`
    /// Default: unset (no bootstrap).
    pub bootstrap_admin_email: Option<String>,
}

/// Dev-only fallback secret. Never rely on it outside local runs.
const DEV_JWT_SECRET: &str = "quill-dev-secret";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_ttl_secs: 3600,
            upload_path: PathBuf::from("./uploads"),
            max_image_size: 10 * 1024 * 1024, // 10 MiB
            public_base_url: "http://localhost:8080".to_string(),
            bootstrap_admin_email: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using dev-only default");
            }
        }

        if let Ok(val) = std::env::var("SESSION_TTL_SECS") {
            match val.parse::<i64>() {
                Ok(n) if n > 0 => config.session_ttl_secs = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid SESSION_TTL_SECS, using default");
                }
            }
        }

        if let Ok(path) = std::env::var("UPLOAD_PATH") {
            config.upload_path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(email) = std::env::var("BOOTSTRAP_ADMIN_EMAIL") {
            if !email.is_empty() {
                config.bootstrap_admin_email = Some(email.trim().to_lowercase());
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.session_ttl_secs, 3600);
        assert_eq!(config.max_image_size, 10 * 1024 * 1024);
        assert!(config.bootstrap_admin_email.is_none());
    }
}
