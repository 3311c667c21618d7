//! Mocked subscription routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::subscription;

use super::{error_response, json_body, str_field};

#[derive(Debug, Deserialize)]
pub struct SubscriptionQuery {
    pub email: Option<String>,
}

/// POST /api/subscribe
pub async fn create_subscription(
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let name = body.get("name").and_then(Value::as_str);

    match subscription::create(str_field(&body, "email"), name) {
        Ok(sub) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Subscription created successfully",
                "subscription": sub,
            })),
        ),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

/// GET /api/subscribe?email=
pub async fn check_subscription(Query(query): Query<SubscriptionQuery>) -> (StatusCode, Json<Value>) {
    match subscription::check(query.email.as_deref().unwrap_or("")) {
        Ok(sub) => (
            StatusCode::OK,
            Json(json!({ "success": true, "subscription": sub })),
        ),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_subscription() {
        let (status, Json(body)) = create_subscription(Ok(Json(
            json!({ "email": "ruth@example.com", "name": "Ruth" }),
        )))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["subscription"]["name"], "Ruth");
        assert_eq!(body["subscription"]["amount"], 100);
    }

    #[tokio::test]
    async fn test_create_subscription_invalid_email() {
        let (status, Json(body)) =
            create_subscription(Ok(Json(json!({ "email": "ruth" })))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email format");
    }

    #[tokio::test]
    async fn test_check_subscription_requires_email() {
        let (status, Json(body)) =
            check_subscription(Query(SubscriptionQuery { email: None })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email parameter is required");
    }

    #[tokio::test]
    async fn test_check_subscription_active() {
        let (status, Json(body)) = check_subscription(Query(SubscriptionQuery {
            email: Some("ruth@example.com".into()),
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subscription"]["status"], "active");
        assert_eq!(body["subscription"]["email"], "ruth@example.com");
    }
}
