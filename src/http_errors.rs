// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Transport-level errors and their HTTP rendering.
//!
//! These errors reject a call before it reaches the decision engine: wrong
//! method, wrong content type, or a body that is not a usable `AdmissionReview`.
//! They are reported with a non-200 status and a body of the form
//! `{"error":{"code":<status>,"message":<text>}}`. Logical admission denials are
//! never reported this way.
//!
//! # Usage
//!
//! ```rust
//! use nodelocaldns_webhook::http_errors::TransportError;
//!
//! let err = TransportError::MethodNotAllowed("GET".to_string());
//! assert_eq!(err.status_code().as_u16(), 405);
//! ```

use crate::metrics::record_transport_rejection;
use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// A request rejected by the transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Anything other than POST on the mutation endpoint
    #[error("Only POST method is allowed (got {0})")]
    MethodNotAllowed(String),

    /// Missing or non-JSON content type
    #[error("Content-Type must be application/json (got {0:?})")]
    UnsupportedContentType(String),

    /// The body could not be read, e.g. it exceeds the size limit
    #[error("Failed to read request body: {0}")]
    UnreadableBody(#[source] BytesRejection),

    /// Reading the body or producing the response took too long
    #[error("Request not completed within {0:?}")]
    RequestTimeout(Duration),

    /// The body is not a valid `AdmissionReview`
    #[error("Failed to parse admission review: {0}")]
    InvalidReview(#[source] serde_json::Error),

    /// The envelope carries no request
    #[error("Failed to parse admission review: admission review request is nil")]
    MissingRequest,

    /// The request uid is empty
    #[error("Failed to parse admission review: admission review request UID is empty")]
    EmptyUid,

    /// The response could not be serialized
    #[error("Failed to marshal response: {0}")]
    ResponseEncoding(#[source] serde_json::Error),
}

impl TransportError {
    /// HTTP status used for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnreadableBody(rejection) => rejection.status(),
            Self::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::UnsupportedContentType(_)
            | Self::InvalidReview(_)
            | Self::MissingRequest
            | Self::EmptyUid => StatusCode::BAD_REQUEST,
            Self::ResponseEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        warn!(status_code = status.as_u16(), message = %message, "Rejecting webhook request");
        record_transport_rejection(status.as_u16());

        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "http_errors_tests.rs"]
mod http_errors_tests;
