//! Illustration routes.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::server::AppState;
use crate::content::AgeGroup;
use crate::images::{self, PLACEHOLDER_CACHE_CONTROL, PLACEHOLDER_URL};

use super::error_response;

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub folder: Option<String>,
}

/// GET /api/random-image?folder=
///
/// `folder` is either an image folder name or a tier label ("Adult" reads
/// the `adult` folder).
pub async fn random_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImageQuery>,
) -> (StatusCode, Json<Value>) {
    let Some(folder) = query.folder.as_deref().filter(|f| !f.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Folder parameter is required");
    };
    let folder = AgeGroup::parse(folder)
        .map(|tier| tier.image_folder())
        .unwrap_or(folder);

    match images::random_image_in(&state.images_root(), folder).await {
        Ok(selection) => match serde_json::to_value(&selection) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode image selection");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal server error",
                        "imageUrl": PLACEHOLDER_URL,
                    })),
                )
            }
        },
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

/// GET /api/placeholder-image
pub async fn placeholder_image() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, PLACEHOLDER_CACHE_CONTROL),
        ],
        images::placeholder_svg(),
    )
}
