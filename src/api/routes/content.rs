//! Content generation and retrieval routes.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::server::AppState;
use crate::content::generator::MISSING_FIELDS;
use crate::content::{AgeGroup, GeneratedContent, Generation};
use crate::error::BibleError;
use crate::images;

use super::{error_response, json_body, str_field};

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub verse: Option<String>,
    #[serde(rename = "ageGroup")]
    pub age_group: Option<String>,
}

/// POST /api/generate-content
pub async fn generate_content(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let verse = str_field(&body, "verse");
    let age_group = str_field(&body, "ageGroup");

    match state.generator.generate(verse, age_group).await {
        Ok(generation) => generation_response(&generation, None),
        Err(e) => failure_response(e, verse, age_group),
    }
}

/// GET /api/generate-content?verse=&ageGroup=
pub async fn get_content(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContentQuery>,
) -> (StatusCode, Json<Value>) {
    let verse = query.verse.as_deref().unwrap_or("");
    let age_group = query.age_group.as_deref().unwrap_or("");

    match state.generator.lookup(verse, age_group).await {
        Ok(content) => {
            let found = content.is_some();
            (
                StatusCode::OK,
                Json(json!({ "content": content, "found": found })),
            )
        }
        Err(e) if e.is_client_error() => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Content lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch content")
        }
    }
}

/// POST /api/lesson
///
/// Content and an illustration for the tier, fetched concurrently.
pub async fn generate_lesson(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let verse = str_field(&body, "verse");
    let age_group = str_field(&body, "ageGroup");
    if verse.trim().is_empty() || age_group.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, MISSING_FIELDS);
    }

    let images_root = state.images_root();
    let (generation, image) = tokio::join!(
        state.generator.generate(verse, age_group),
        images::random_image(&images_root, AgeGroup::resolve(age_group)),
    );
    let image = serde_json::to_value(&image).unwrap_or(Value::Null);

    match generation {
        Ok(generation) => generation_response(&generation, Some(image)),
        Err(e) => failure_response(e, verse, age_group),
    }
}

/// 200 `{content, cached}`, or 500 with the advisory error for fallback content.
fn generation_response(generation: &Generation, image: Option<Value>) -> (StatusCode, Json<Value>) {
    let mut body = json!({
        "content": generation.content,
        "cached": generation.cached,
    });
    if let Some(image) = image {
        body["image"] = image;
    }
    match &generation.error {
        Some(error) => {
            body["error"] = json!(error);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
        }
        None => (StatusCode::OK, Json(body)),
    }
}

fn failure_response(err: BibleError, verse: &str, age_group: &str) -> (StatusCode, Json<Value>) {
    if err.is_client_error() {
        return error_response(StatusCode::BAD_REQUEST, &err.to_string());
    }
    tracing::error!(error = %err, "Content generation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Failed to generate content",
            "content": GeneratedContent::fallback(verse, AgeGroup::resolve(age_group)),
            "cached": false,
        })),
    )
}
