pub mod age_groups;
pub mod content;
pub mod health;
pub mod images;
pub mod subscribe;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// `{ "error": msg }` with the given status.
pub(crate) fn error_response(status: StatusCode, msg: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": msg })))
}

/// Unwrap a JSON body, turning a rejection into a 400 `{error}`.
pub(crate) fn json_body(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Value, (StatusCode, Json<Value>)> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid JSON body: {}", rejection.body_text()),
        )),
    }
}

/// A string field of `body`, or "" when absent or not a string.
pub(crate) fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or("")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_field() {
        let body = json!({ "verse": "John 3:16", "ageGroup": 7 });
        assert_eq!(str_field(&body, "verse"), "John 3:16");
        assert_eq!(str_field(&body, "ageGroup"), "");
        assert_eq!(str_field(&body, "missing"), "");
    }

    #[test]
    fn test_error_response_shape() {
        let (status, Json(body)) = error_response(StatusCode::BAD_REQUEST, "nope");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "nope" }));
    }
}
