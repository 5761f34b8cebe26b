use crate::pipeline::completion::CompletionError;
use crate::source::ExtractError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Request-level failure taxonomy, mapped onto HTTP statuses at the
/// routing boundary. Validation failures are raised before any external
/// call; transient upstream errors are retried inside the completion
/// client and only surface here once permanent.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    /// Chat against a session that does not exist or has no stored
    /// context. Surfaces as a 400, unlike [`ApiError::NotFound`].
    #[error("{0}")]
    UnknownSession(String),
    #[error("{0}")]
    NotFound(String),
    #[error("document extraction failed: {0}")]
    Extraction(String),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::EmptyDocument => Self::Validation(err.to_string()),
            ExtractError::ArticleNotFound(title) => {
                Self::NotFound(format!("article not found: {title}"))
            }
            ExtractError::Pdf(_) | ExtractError::ArticleFetch(_) => {
                Self::Extraction(err.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            Self::UnknownSession(_) => (StatusCode::BAD_REQUEST, "not_found"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Extraction(_) => (StatusCode::INTERNAL_SERVER_ERROR, "extraction"),
            Self::Completion(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let detail = self.to_string();
        if status.is_server_error() {
            tracing::error!(kind, %detail, "request failed");
        } else {
            tracing::info!(kind, %detail, "request rejected");
        }
        let body = Json(json!({"error": {"kind": kind, "detail": detail}}));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use crate::pipeline::completion::CompletionError;
    use crate::source::ExtractError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn validation_maps_to_bad_request() {
        let response = ApiError::Validation("user_text is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_session_maps_to_bad_request() {
        let response = ApiError::UnknownSession("unknown session".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::NotFound("no such session".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn completion_failures_map_to_500() {
        let err = ApiError::from(CompletionError::Upstream {
            status: 401,
            detail: "bad key".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn empty_documents_are_a_validation_error() {
        let err = ApiError::from(ExtractError::EmptyDocument);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_articles_are_not_found() {
        let err = ApiError::from(ExtractError::ArticleNotFound("Nope".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
