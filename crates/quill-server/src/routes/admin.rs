//! Admin moderation routes.
//!
//! Every handler requires [`AdminPrincipal`]. User and post deletion are
//! reversible flags here, unlike the owner-facing routes; the responses
//! echo the entity that was just changed, deletion flag included.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use quill_store::{CommentView, PostView, StoreError, User};

use crate::api::AppState;
use crate::error::ApiError;
use crate::extract::AdminPrincipal;
use crate::routes::{DataResponse, ListResponse};

fn user_not_found(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => {
            ApiError::not_found("USER_NOT_FOUND", "User not found or deleted")
        }
        other => other.into(),
    }
}

fn post_not_found(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => ApiError::not_found("POST_NOT_FOUND", "Post not found"),
        other => other.into(),
    }
}

fn comment_not_found(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => ApiError::not_found("COMMENT_NOT_FOUND", "Comment not found"),
        other => other.into(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    show_deleted: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListResponse<User>>, ApiError> {
    let include_deleted = query.show_deleted.as_deref() == Some("true");
    let users = {
        let db = state.db.lock().await;
        db.list_users(include_deleted)?
    };
    Ok(Json(ListResponse::new(users)))
}

pub async fn approve_user(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<User>>, ApiError> {
    let user = {
        let db = state.db.lock().await;
        db.set_approved(id).map_err(user_not_found)?
    };

    info!(user = %id, admin = %admin.user.id, "User approved");
    Ok(Json(DataResponse::with_message("User account approved", user)))
}

pub async fn suspend_user(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<User>>, ApiError> {
    let user = {
        let db = state.db.lock().await;
        db.set_banned(id, true).map_err(user_not_found)?
    };

    info!(user = %id, admin = %admin.user.id, "User suspended");
    Ok(Json(DataResponse::with_message("User account suspended", user)))
}

pub async fn unsuspend_user(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<User>>, ApiError> {
    let user = {
        let db = state.db.lock().await;
        db.set_banned(id, false).map_err(user_not_found)?
    };

    info!(user = %id, admin = %admin.user.id, "User unsuspended");
    Ok(Json(DataResponse::with_message(
        "User account unsuspended",
        user,
    )))
}

pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<User>>, ApiError> {
    let user = {
        let db = state.db.lock().await;
        db.mark_user_deleted(id).map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("USER_NOT_FOUND", "User not found"),
            other => other.into(),
        })?
    };

    info!(user = %id, admin = %admin.user.id, "User marked as deleted");
    Ok(Json(DataResponse::with_message("User marked as deleted", user)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<PostView>>, ApiError> {
    let post = {
        let db = state.db.lock().await;
        db.set_post_deleted(id, true).map_err(post_not_found)?
    };

    info!(post = %id, admin = %admin.user.id, "Post deleted by admin");
    Ok(Json(DataResponse::with_message("Post deleted by admin", post)))
}

pub async fn restore_post(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<PostView>>, ApiError> {
    let post = {
        let db = state.db.lock().await;
        db.set_post_deleted(id, false).map_err(post_not_found)?
    };

    info!(post = %id, admin = %admin.user.id, "Post restored by admin");
    Ok(Json(DataResponse::with_message("Post restored by admin", post)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DataResponse<CommentView>>, ApiError> {
    let comment = {
        let db = state.db.lock().await;
        db.set_comment_deleted(post_id, comment_id, true)
            .map_err(comment_not_found)?
    };

    info!(post = %post_id, comment = %comment_id, admin = %admin.user.id, "Comment deleted by admin");
    Ok(Json(DataResponse::with_message(
        "Comment deleted by admin",
        comment,
    )))
}

pub async fn restore_comment(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DataResponse<CommentView>>, ApiError> {
    let comment = {
        let db = state.db.lock().await;
        db.set_comment_deleted(post_id, comment_id, false)
            .map_err(comment_not_found)?
    };

    info!(post = %post_id, comment = %comment_id, admin = %admin.user.id, "Comment restored by admin");
    Ok(Json(DataResponse::with_message(
        "Comment restored by admin",
        comment,
    )))
}
