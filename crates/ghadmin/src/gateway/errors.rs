use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::HttpError;

/// Errors surfaced by a [`Gateway`](super::Gateway) call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Any other non-2xx response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Still throttled after the transport exhausted its retries.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Token missing, expired or lacking the required scope.
    #[error("Authentication required")]
    AuthRequired,

    /// Resource not found (org, repo, branch, ruleset...).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// No response, even after transport retries.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Response body did not match the expected shape.
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// A request body that could not be encoded.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Throttled past the transport's retry budget.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<HttpError> for GatewayError {
    fn from(err: HttpError) -> Self {
        Self::network(err.to_string())
    }
}

/// First line of an error's message, for event payloads and log fields.
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

pub type Result<T> = std::result::Result<T, GatewayError>;
