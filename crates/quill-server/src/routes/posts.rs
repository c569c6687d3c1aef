//! Post CRUD, likes, and comments.
//!
//! Create and update accept `multipart/form-data` so an image file can
//! ride along with the text fields. Ownership misses surface as 404 so a
//! caller cannot probe which posts exist.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use quill_shared::validate::{validate_comment, validate_content, validate_title};
use quill_store::{CommentView, LikeOutcome, PostView, StoreError};

use crate::api::AppState;
use crate::error::ApiError;
use crate::extract::Principal;
use crate::routes::{DataResponse, ListResponse};

#[derive(Default)]
struct PostForm {
    title: Option<String>,
    content: Option<String>,
    image: Option<Vec<u8>>,
}

/// Drain a multipart body into the known post fields; unknown fields are
/// ignored. Empty image parts count as absent so a form with an empty
/// file input does not clear anything.
async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, ApiError> {
    let malformed =
        |e: axum::extract::multipart::MultipartError| {
            ApiError::validation("MALFORMED_FORM", format!("Multipart error: {e}"))
        };

    let mut form = PostForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => form.title = Some(field.text().await.map_err(malformed)?),
            "content" => form.content = Some(field.text().await.map_err(malformed)?),
            "image" => {
                let data = field.bytes().await.map_err(malformed)?;
                if !data.is_empty() {
                    form.image = Some(data.to_vec());
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn post_not_found(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => ApiError::not_found("POST_NOT_FOUND", "Post not found"),
        other => other.into(),
    }
}

pub async fn list_posts(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<PostView>>, ApiError> {
    let posts = {
        let db = state.db.lock().await;
        db.list_posts()?
    };
    Ok(Json(ListResponse::new(posts)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<PostView>>, ApiError> {
    let post = {
        let db = state.db.lock().await;
        db.get_post_and_bump_views(id).map_err(post_not_found)?
    };
    Ok(Json(DataResponse::new(post)))
}

pub async fn create_post(
    State(state): State<AppState>,
    principal: Principal,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DataResponse<PostView>>), ApiError> {
    let form = read_post_form(multipart).await?;

    let title = form.title.unwrap_or_default();
    let content = form.content.unwrap_or_default();
    validate_title(&title)?;
    validate_content(&content)?;

    let image_url = match form.image {
        Some(data) => Some(stored_image_url(&state, &data).await?),
        None => None,
    };

    let post = {
        let db = state.db.lock().await;
        db.insert_post(principal.user.id, &title, &content, image_url.as_deref())?
    };

    info!(post = %post.id, author = %principal.user.id, "Post created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message("Post created", post)),
    ))
}

pub async fn update_post(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<DataResponse<PostView>>, ApiError> {
    let form = read_post_form(multipart).await?;

    let title = form.title.unwrap_or_default();
    let content = form.content.unwrap_or_default();
    validate_title(&title)?;
    validate_content(&content)?;

    // The previous image is kept unless a replacement is uploaded.
    let image_url = match form.image {
        Some(data) => Some(stored_image_url(&state, &data).await?),
        None => None,
    };

    let post = {
        let db = state.db.lock().await;
        db.update_post(id, principal.user.id, &title, &content, image_url.as_deref())
            .map_err(post_not_found)?
    };

    info!(post = %post.id, "Post updated");
    Ok(Json(DataResponse::new(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<PostView>>, ApiError> {
    let post = {
        let db = state.db.lock().await;
        db.author_delete_post(id, principal.user.id)
            .map_err(post_not_found)?
    };

    info!(post = %post.id, "Post deleted by author");
    Ok(Json(DataResponse::with_message(
        "Post deleted successfully",
        post,
    )))
}

pub async fn restore_post(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<PostView>>, ApiError> {
    let post = {
        let db = state.db.lock().await;
        db.author_restore_post(id, principal.user.id)
            .map_err(post_not_found)?
    };

    info!(post = %post.id, "Post restored by author");
    Ok(Json(DataResponse::with_message(
        "Post restored successfully",
        post,
    )))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<LikeOutcome>>, ApiError> {
    let outcome = {
        let db = state.db.lock().await;
        db.toggle_like(id, principal.user.id)
            .map_err(post_not_found)?
    };

    let message = if outcome.liked {
        "Post liked"
    } else {
        "Post unliked"
    };
    Ok(Json(DataResponse::with_message(message, outcome)))
}

#[derive(Deserialize)]
pub struct AddCommentRequest {
    text: String,
}

pub async fn add_comment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<DataResponse<CommentView>>), ApiError> {
    let text = validate_comment(&req.text)?;

    let comment = {
        let db = state.db.lock().await;
        db.add_comment(id, principal.user.id, text)
            .map_err(post_not_found)?
    };

    info!(post = %id, comment = %comment.id, "Comment added");
    Ok((StatusCode::CREATED, Json(DataResponse::new(comment))))
}

pub async fn delete_own_comment(
    State(state): State<AppState>,
    principal: Principal,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DataResponse<PostView>>, ApiError> {
    let post = {
        let db = state.db.lock().await;
        db.delete_own_comment(post_id, comment_id, principal.user.id)
            .map_err(|e| match e {
                StoreError::NotFound => ApiError::not_found(
                    "COMMENT_NOT_FOUND",
                    "Comment not found or you don't have permission to delete it",
                ),
                other => other.into(),
            })?;
        db.post_view(post_id).map_err(post_not_found)?
    };

    info!(post = %post_id, comment = %comment_id, "Comment deleted by author");
    Ok(Json(DataResponse::with_message(
        "Comment deleted successfully",
        post,
    )))
}

async fn stored_image_url(state: &AppState, data: &[u8]) -> Result<String, ApiError> {
    let name = state.images.store_image(data).await?;
    Ok(format!(
        "{}/api/images/{}",
        state.config.public_base_url, name
    ))
}
