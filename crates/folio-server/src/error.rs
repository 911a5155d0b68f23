//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`folio_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on query results directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::middleware::request_id::current_request_id;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: folio_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: folio_core::Error) -> Self {
        Self {
            inner,
            request_id: current_request_id(),
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn inner(&self) -> &folio_core::Error {
        &self.inner
    }
}

impl From<folio_core::Error> for AppError {
    fn from(e: folio_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                request_id = self.request_id.as_deref().unwrap_or("-"),
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let err = AppError::new(folio_core::Error::not_found("book", "abc"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn upstream_produces_502() {
        let err = AppError::new(folio_core::Error::upstream("wiktionary", "timed out"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn no_request_id_outside_a_request() {
        let err = AppError::new(folio_core::Error::Validation("bad".into()));
        assert!(err.request_id.is_none());
    }

    #[test]
    fn with_request_id() {
        let err = AppError::new(folio_core::Error::Internal("oops".into()))
            .with_request_id("req-123".into());
        assert_eq!(err.request_id.as_deref(), Some("req-123"));
    }

    #[tokio::test]
    async fn body_carries_code_and_request_id() {
        let err = AppError::new(folio_core::Error::Conflict("taken".into()))
            .with_request_id("req-9".into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "conflict");
        assert_eq!(body["request_id"], "req-9");
    }
}
