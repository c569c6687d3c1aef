//! Registration, email verification, login, and password reset.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;

use quill_shared::moderation::LoginDenied;
use quill_shared::password::{hash_password, validate_strength, verify_password};
use quill_shared::token::{PURPOSE_PASSWORD_RESET, PURPOSE_VERIFY_EMAIL};
use quill_shared::validate::{normalize_email, validate_email, validate_username};
use quill_store::{StoreError, UserView};

use crate::api::AppState;
use crate::error::ApiError;
use crate::mailer::OutboundEmail;
use crate::routes::{DataResponse, MessageResponse};

/// Lifetime of email verification and password reset tokens.
const ACTION_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    status: &'static str,
    token: String,
    user: UserView,
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    token: String,
    new_password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<DataResponse<UserView>>), ApiError> {
    validate_username(&req.username)?;
    let email = normalize_email(&req.email);
    validate_email(&email)?;
    validate_strength(&req.password)?;

    let hash = hash_password(&req.password)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;

    let user = {
        let db = state.db.lock().await;
        db.insert_user(&req.username, &email, &hash)?
    };

    let token = state.tokens.issue_action(
        user.id,
        PURPOSE_VERIFY_EMAIL,
        Duration::hours(ACTION_TOKEN_TTL_HOURS),
    )?;
    let url = format!(
        "{}/api/auth/verify-email/{}",
        state.config.public_base_url, token
    );

    state
        .mailer
        .send(OutboundEmail {
            to: user.email.clone(),
            subject: "Verify your email".to_string(),
            text: format!("Open {url} within one hour to verify your account."),
            html: format!(
                "<p>Click <a href=\"{url}\">here</a> to verify your account. \
                 The link expires in one hour.</p>"
            ),
        })
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    info!(user = %user.id, username = %user.username, "New registration");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            "User registered. Please verify your email; an admin must approve \
             the account before login.",
            UserView::from(&user),
        )),
    ))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = state.tokens.verify_action(&token, PURPOSE_VERIFY_EMAIL)?;

    {
        let db = state.db.lock().await;
        db.set_verified(claims.sub).map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("USER_NOT_FOUND", "User not found"),
            other => other.into(),
        })?;
    }

    info!(user = %claims.sub, "Email verified");
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = normalize_email(&req.email);

    let user = {
        let db = state.db.lock().await;
        db.find_active_by_email(&email)?
    };

    let invalid = || ApiError::auth("INVALID_CREDENTIALS", "Invalid email or password");

    let Some(user) = user else {
        return Err(invalid());
    };
    if !verify_password(&user.password_hash, &req.password) {
        return Err(invalid());
    }

    user.flags().login_gate().map_err(login_denied)?;

    let token = state.tokens.issue_session(
        user.id,
        user.role,
        Duration::seconds(state.config.session_ttl_secs),
    )?;

    info!(user = %user.id, "Login");
    Ok(Json(LoginResponse {
        status: "success",
        token,
        user: UserView::from(&user),
    }))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&req.email);

    let user = {
        let db = state.db.lock().await;
        db.find_by_email(&email)?
    };
    let Some(user) = user else {
        return Err(ApiError::not_found("USER_NOT_FOUND", "User not found"));
    };

    let token = state.tokens.issue_action(
        user.id,
        PURPOSE_PASSWORD_RESET,
        Duration::hours(ACTION_TOKEN_TTL_HOURS),
    )?;

    state
        .mailer
        .send(OutboundEmail {
            to: user.email.clone(),
            subject: "Password reset".to_string(),
            text: format!(
                "Use this token within one hour to reset your password: {token}"
            ),
            html: format!(
                "<p>Your password reset token (valid for one hour):</p>\
                 <pre>{token}</pre>"
            ),
        })
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    info!(user = %user.id, "Password reset requested");
    Ok(Json(MessageResponse::new("Password reset email sent")))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = state
        .tokens
        .verify_action(&req.token, PURPOSE_PASSWORD_RESET)?;

    validate_strength(&req.new_password)?;
    let hash = hash_password(&req.new_password)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;

    {
        let db = state.db.lock().await;
        db.set_password(claims.sub, &hash).map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("USER_NOT_FOUND", "User not found"),
            other => other.into(),
        })?;
    }

    info!(user = %claims.sub, "Password reset completed");
    Ok(Json(MessageResponse::new("Password reset successfully")))
}

fn login_denied(denied: LoginDenied) -> ApiError {
    match denied {
        // Deleted accounts are filtered out by the lookup; if one slips
        // through it is indistinguishable from a bad credential.
        LoginDenied::Deleted => ApiError::auth("INVALID_CREDENTIALS", "Invalid email or password"),
        LoginDenied::Banned => {
            ApiError::forbidden("ACCOUNT_BANNED", "This account has been suspended")
        }
        LoginDenied::Unverified => ApiError::forbidden(
            "ACCOUNT_NOT_VERIFIED",
            "Please verify your email before logging in",
        ),
        LoginDenied::Pending => {
            ApiError::forbidden("ACCOUNT_PENDING", "Account awaiting admin approval")
        }
    }
}
