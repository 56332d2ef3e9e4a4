//! Error types for the tracking number HTTP service.
//!
//! [`ApiError`] is what handlers return. Its [`IntoResponse`] impl maps each
//! case to a status code and a JSON body of the form
//! `{"code": "...", "message": "..."}`.
//!
//! ## Error Cases
//! - `BadRequest`: a query parameter is missing, unparseable or fails
//!   validation (400).
//! - `Generation`: the issuer could not produce or encode a value (500).
//! - `Internal`: anything unexpected, including panics caught by the router
//!   (500).

use core::any::Any;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const BAD_REQUEST: &str = "BAD_REQUEST";
pub const TRACKING_NUMBER_ERROR: &str = "TRACKING_NUMBER_ERROR";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// The request was missing a parameter or failed validation.
    #[error("{0}")]
    BadRequest(String),

    /// The range allocator failed, most likely because the counter store is
    /// unavailable.
    #[error("Failed to generate tracking number")]
    Generation(#[from] rangeid::Error),

    #[error("An unexpected error occurred")]
    Internal,
}

/// JSON body of every error response.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Generation(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => BAD_REQUEST,
            Self::Generation(_) => TRACKING_NUMBER_ERROR,
            Self::Internal => INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::BadRequest(reason) => tracing::warn!("Bad request: {reason}"),
            Self::Generation(e) => {
                tracing::error!("Tracking number generation error: {}", error_chain(e));
            }
            Self::Internal => tracing::error!("Unhandled error"),
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Renders `err` followed by each of its sources, separated by `: `.
fn error_chain(err: &dyn core::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Turns a handler panic into the generic internal error response.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!("Handler panicked: {detail}");
    ApiError::Internal.into_response()
}
