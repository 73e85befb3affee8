//! Error-to-HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docconv_common::Error;
use serde_json::json;

/// Handler error wrapping [`docconv_common::Error`].
#[derive(Debug)]
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Exhausted conversions already logged their output line by line.
        if !self.0.is_client_error() && !matches!(self.0, Error::ConversionExhausted { .. }) {
            tracing::error!(status = %status, error = %self.0, "Conversion request failed");
        } else {
            tracing::debug!(status = %status, error = %self.0, "Conversion request rejected");
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
