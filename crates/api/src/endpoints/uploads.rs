//! Image upload endpoint.

use axum::{
    Router,
    extract::{Multipart, State},
    routing::post,
};
use scribe_common::{AppError, AppResult};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Uploaded image response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

/// Upload an image via the multipart field `image`.
async fn upload_image(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<UploadResponse>> {
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .to_vec();
        image = Some((content_type, data));
    }

    let (content_type, data) =
        image.ok_or_else(|| AppError::BadRequest("No image provided".to_string()))?;

    let uploaded = state
        .media_service
        .upload_image(&user.id, &content_type, &data)
        .await?;

    Ok(ApiResponse::created(UploadResponse {
        url: uploaded.url,
        size: uploaded.size,
        content_type: uploaded.content_type,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(upload_image))
}
