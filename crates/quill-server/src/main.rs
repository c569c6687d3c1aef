//! # quill-server
//!
//! HTTP backend for the Quill publishing platform.
//!
//! This binary provides:
//! - **REST API** (axum) for registration, login, posts, comments, likes,
//!   and admin moderation
//! - **SQLite persistence** via the store crate (soft-delete visibility
//!   flags throughout)
//! - **Signed tokens** for sessions, email verification, and password reset
//! - **On-disk image storage** for multipart post uploads
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod config;
mod error;
mod extract;
mod image_store;
mod mailer;
mod rate_limit;
mod routes;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quill_shared::TokenSigner;
use quill_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::image_store::ImageStore;
use crate::mailer::LogMailer;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,quill_server=debug")),
        )
        .init();

    info!("Starting Quill server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        addr = %config.http_addr,
        uploads = %config.upload_path.display(),
        session_ttl_secs = config.session_ttl_secs,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    let db = match &config.database_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Database::open_at(path)?
        }
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database opened");
    }

    // Bootstrap admin: promote the configured address if that account
    // already exists (registration itself stays ordinary).
    if let Some(email) = &config.bootstrap_admin_email {
        if db.promote_admin(email)? {
            info!(email = %email, "Bootstrap admin promoted");
        } else {
            warn!(email = %email, "BOOTSTRAP_ADMIN_EMAIL does not match any account yet");
        }
    }

    let images = Arc::new(
        ImageStore::new(config.upload_path.clone(), config.max_image_size).await?,
    );

    let rate_limiter = RateLimiter::default();

    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        tokens: Arc::new(TokenSigner::new(&config.jwt_secret)),
        mailer: Arc::new(LogMailer),
        images,
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes).
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    let http_addr = config.http_addr;
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
