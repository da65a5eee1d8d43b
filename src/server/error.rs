use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::core::conversion::ConversionError;

impl ConversionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConversionError::MissingParameters
            | ConversionError::InvalidAmount
            | ConversionError::InvalidCurrency => StatusCode::BAD_REQUEST,
            ConversionError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Every failure is logged here, right before it becomes a plain-text response.
impl IntoResponse for ConversionError {
    fn into_response(self) -> Response {
        match &self {
            ConversionError::Upstream(e) => error!(error = %format!("{e:#}"), "{}", self),
            _ => error!("{}", self),
        }
        (self.status_code(), self.to_string()).into_response()
    }
}
