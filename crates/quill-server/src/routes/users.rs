//! Authenticated profile routes.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

use quill_shared::validate::{
    normalize_email, validate_email, validate_image_url, validate_username,
};
use quill_store::UserView;

use crate::api::AppState;
use crate::error::{conflict_code, ApiError};
use crate::extract::Principal;
use crate::routes::DataResponse;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    username: Option<String>,
    email: Option<String>,
    profile_image: Option<String>,
}

pub async fn get_profile(principal: Principal) -> Json<DataResponse<UserView>> {
    Json(DataResponse::new(UserView::from(&principal.user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<DataResponse<UserView>>, ApiError> {
    if let Some(username) = &req.username {
        validate_username(username)?;
    }
    let email = req.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        validate_email(email)?;
    }
    if let Some(url) = &req.profile_image {
        validate_image_url(url)?;
    }

    let user = {
        let db = state.db.lock().await;

        if let Some(field) = db.credential_conflict(
            req.username.as_deref(),
            email.as_deref(),
            Some(principal.user.id),
        )? {
            return Err(ApiError::Conflict {
                code: conflict_code(field),
                message: format!("That {field} is already registered"),
            });
        }

        db.update_profile(
            principal.user.id,
            req.username.as_deref(),
            email.as_deref(),
            req.profile_image.as_deref(),
        )?
    };

    info!(user = %user.id, "Profile updated");
    Ok(Json(DataResponse::new(UserView::from(&user))))
}
