//! Gateway runtime error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use flowgate_kernel::PolicyFault;
use serde_json::json;
use thiserror::Error;

/// Per-request runtime errors.
///
/// Each variant carries enough to build the user-visible status + message
/// pair; internal detail (stack traces, document contents) is never
/// serialized to the client.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No catalog has been loaded yet.
    #[error("no catalog snapshot is loaded")]
    NoSnapshot,

    /// No API matches the request's method + path.  An outcome, not a
    /// defect — surfaced as a 404-class response without consulting the
    /// security evaluator.
    #[error("no API matches '{0}'")]
    NoMatch(String),

    /// Security requirements unmet, subscription unusable, or no champion.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The matched API document is marked suspended.
    #[error("api '{0}' is suspended")]
    SuspendedApi(String),

    /// A named failure raised by a policy via its `Fail` outcome.
    #[error(transparent)]
    Policy(#[from] PolicyFault),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status surfaced to the client.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::NoSnapshot => 503,
            GatewayError::NoMatch(_) => 404,
            GatewayError::Unauthorized(_) => 401,
            GatewayError::SuspendedApi(_) => 503,
            GatewayError::Policy(fault) => fault.status,
            GatewayError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::NoSnapshot => "NO_SNAPSHOT",
            GatewayError::NoMatch(_) => "NO_MATCH",
            GatewayError::Unauthorized(_) => "UNAUTHORIZED",
            GatewayError::SuspendedApi(_) => "API_SUSPENDED",
            GatewayError::Policy(_) => "POLICY_FAILURE",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
