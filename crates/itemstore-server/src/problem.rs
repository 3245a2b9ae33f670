//! Problem-details error responses (RFC 7807 shape).

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use itemstore_core::{ErrorKind, StoreError};
use serde::Serialize;
use std::error::Error as _;
use tracing::{error, warn};

/// Media type of problem bodies.
pub const PROBLEM_MEDIA_TYPE: &str = "application/problem+json";

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: &'static str,
    pub title: &'static str,
    pub status: u16,
    pub detail: String,
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A failed request, ready to be turned into a response.
#[derive(Debug)]
pub struct ApiError {
    error: StoreError,
    expose_internal: bool,
}

impl ApiError {
    #[must_use]
    pub fn new(error: StoreError, expose_internal: bool) -> Self {
        Self {
            error,
            expose_internal,
        }
    }

    /// Status code for the wrapped error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        status_for(&self.error)
    }

    /// The problem body for the wrapped error.
    #[must_use]
    pub fn problem(&self) -> Problem {
        let status = self.status();
        let kind = self.error.kind();

        let error = match kind {
            ErrorKind::Internal if !self.expose_internal => None,
            _ => self.error.source().map(|_| source_chain(&self.error)),
        };

        Problem {
            problem_type: "about:blank",
            title: status.canonical_reason().unwrap_or("Error"),
            status: status.as_u16(),
            detail: self.error.to_string(),
            category: kind.as_str(),
            error,
        }
    }
}

/// Map a store error onto an HTTP status.
#[must_use]
pub const fn status_for(err: &StoreError) -> StatusCode {
    match err {
        StoreError::UnsupportedPatchFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        StoreError::PatchNotApplicable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

/// Causes of `err`, outermost first, joined with ": ".
fn source_chain(err: &StoreError) -> String {
    let mut parts = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        parts.push(cause.to_string());
        current = cause.source();
    }
    parts.join(": ")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = self.problem();

        if self.error.kind() == ErrorKind::Internal {
            error!(error = %self.error, cause = %source_chain(&self.error), "Request failed");
        } else {
            warn!(status = problem.status, error = %self.error, "Request rejected");
        }

        let mut response = (self.status(), Json(problem)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_MEDIA_TYPE),
        );
        response
    }
}
