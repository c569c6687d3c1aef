//! Authentication extractors.
//!
//! `Principal` is the bearer-token gate every protected route goes
//! through: parse the header, verify the session token, load the account,
//! and reject banned or still-unapproved callers. `AdminPrincipal` layers
//! the admin role check on top.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use quill_shared::Role;
use quill_store::{StoreError, User};

use crate::api::AppState;
use crate::error::ApiError;

/// The authenticated caller on protected routes.
pub struct Principal {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let Some(token) = header.strip_prefix("Bearer ") else {
            return Err(ApiError::auth(
                "MISSING_TOKEN",
                "Authentication token required",
            ));
        };

        let claims = state.tokens.verify_session(token)?;

        let user = {
            let db = state.db.lock().await;
            db.get_user(claims.sub).map_err(|e| match e {
                StoreError::NotFound => {
                    ApiError::auth("INVALID_TOKEN", "User account no longer exists")
                }
                other => other.into(),
            })?
        };

        if user.is_banned {
            return Err(ApiError::forbidden(
                "ACCOUNT_BANNED",
                "This account has been suspended",
            ));
        }
        if !user.is_approved {
            return Err(ApiError::forbidden(
                "ACCOUNT_PENDING",
                "Account awaiting admin approval",
            ));
        }

        Ok(Principal { user })
    }
}

/// An authenticated caller holding the admin role.
pub struct AdminPrincipal {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let principal = Principal::from_request_parts(parts, state).await?;

        if principal.user.role != Role::Admin || principal.user.is_deleted {
            return Err(ApiError::forbidden(
                "ADMIN_REQUIRED",
                "Admin privileges required",
            ));
        }

        Ok(AdminPrincipal {
            user: principal.user,
        })
    }
}
