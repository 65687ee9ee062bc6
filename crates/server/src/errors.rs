use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use configs::ErrorFraming;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::error;

/// Error body of the record store: `{"detail": ...}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub title: &'static str,
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: &'static str, detail: Option<String>) -> Self {
        Self { status, title, detail }
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(_) | ServiceError::Model(_) => {
                JsonApiError::new(StatusCode::BAD_REQUEST, "Validation Error", Some(e.detail()))
            }
            ServiceError::NotFound(_) => JsonApiError::new(StatusCode::NOT_FOUND, "Not Found", Some(e.detail())),
            _ => {
                error!(err = %e, "record store request failed");
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", Some(e.detail()))
            }
        }
    }
}

/// Undecodable request bodies keep axum's status (400/415/422) with a JSON body.
impl From<JsonRejection> for JsonApiError {
    fn from(rejection: JsonRejection) -> Self {
        JsonApiError::new(rejection.status(), "Invalid Request Body", Some(rejection.body_text()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let detail = self.detail.unwrap_or_else(|| self.title.to_string());
        (self.status, Json(serde_json::json!({"detail": detail, "error": self.title}))).into_response()
    }
}

/// Error of a cloud proxy call. The message always carries the `Error:` prefix.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub framing: ErrorFraming,
}

impl ApiError {
    pub fn new(err: ServiceError, framing: ErrorFraming) -> Self {
        let (status, code) = match &err {
            ServiceError::Validation(_) | ServiceError::Model(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServiceError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_failure"),
            ServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        Self { status, code, message: format!("Error: {}", err.detail()), framing }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.framing {
            ErrorFraming::Structured => {
                (self.status, Json(serde_json::json!({"error": self.message, "code": self.code}))).into_response()
            }
            // compatibility mode: every failure is a 200 with an error string
            ErrorFraming::Legacy => (StatusCode::OK, Json(self.message)).into_response(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use models::errors::ModelError;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway_with_error_prefix() {
        let resp = ApiError::new(ServiceError::Upstream("ExpiredToken".into()), ErrorFraming::Structured)
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let v = body_json(resp).await;
        assert_eq!(v["error"], "Error: ExpiredToken");
        assert_eq!(v["code"], "upstream_failure");
    }

    #[tokio::test]
    async fn legacy_framing_is_ok_with_error_string() {
        let err = ServiceError::Model(ModelError::Validation("bad date".into()));
        let resp = ApiError::new(err, ErrorFraming::Legacy).into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!("Error: bad date"));
    }

    #[tokio::test]
    async fn record_store_errors_carry_detail() {
        let resp = JsonApiError::from(ServiceError::not_found("User")).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["detail"], "User not found");

        let resp = JsonApiError::from(ServiceError::Storage("disk full".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["detail"], "disk full");
    }
}
