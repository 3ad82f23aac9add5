use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
#[cfg(feature = "server")]
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::gateway::GatewayError;

/// Message returned for every failed generation; details stay in the log.
pub const GENERATION_FAILED: &str = "Failed to process chat request";

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Why a plan request ended in the failed state.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("completion was empty")]
    EmptyContent,

    #[error("completion is not valid JSON: {0}")]
    MalformedCompletion(#[source] serde_json::Error),

    #[error("completion does not match the plan shape: {}", .0.join("; "))]
    InvalidPlan(Vec<String>),
}

impl From<GatewayError> for PlanError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Upstream(msg) => Self::Upstream(msg),
            GatewayError::EmptyContent => Self::EmptyContent,
        }
    }
}

impl PlanError {
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Upstream(_) | Self::EmptyContent | Self::MalformedCompletion(_) | Self::InvalidPlan(_) => 500,
        }
    }

    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::EmptyContent => "EMPTY_COMPLETION",
            Self::MalformedCompletion(_) => "MALFORMED_COMPLETION",
            Self::InvalidPlan(_) => "INVALID_PLAN",
        }
    }

    /// The response body for this error. Server-side failures carry only the
    /// generic message.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            Self::BadRequest(msg) => msg.clone(),
            _ => GENERATION_FAILED.to_string(),
        };

        ErrorResponse {
            error: self.error_code().to_string(),
            message,
            status_code: self.status_code(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Plan(PlanError),
    Auth(AuthError),
    InternalServerError(String),
    BadRequest(String),
}

impl fmt::Display for ApiError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ApiError::Plan(err) => write!(f, "Plan generation failed: {err}"),
            ApiError::Auth(err) => write!(f, "Authentication failed: {err}"),
            ApiError::InternalServerError(msg) => write!(f, "Internal server error: {msg}"),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
        }
    }
}

impl ApiError {
    /// Status code, machine-readable code and client-facing message.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            ApiError::Plan(err) => err.to_response(),
            ApiError::Auth(err) => ErrorResponse {
                error: err.error_code().to_string(),
                message: err.client_message(),
                status_code: err.status_code(),
            },
            ApiError::InternalServerError(_) => ErrorResponse {
                error: "INTERNAL_ERROR".to_string(),
                message: "Internal server error".to_string(),
                status_code: 500,
            },
            ApiError::BadRequest(msg) => ErrorResponse {
                error: "BAD_REQUEST".to_string(),
                message: msg.clone(),
                status_code: 400,
            },
        }
    }
}

#[cfg(feature = "server")]
impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.to_response().status_code)
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let body = self.to_response();

        if body.status_code >= 500 {
            tracing::error!("{self}");
        } else {
            tracing::warn!("{self}");
        }

        actix_web::HttpResponse::build(actix_web::ResponseError::status_code(self)).json(body)
    }
}

// Conversions into ApiError
impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        ApiError::Plan(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

// Helper functions for creating specific error types
impl ApiError {
    pub fn internal_server_error(msg: impl Into<String>) -> Self {
        ApiError::InternalServerError(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }
}
