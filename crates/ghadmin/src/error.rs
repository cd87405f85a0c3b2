use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors returned by the host-facing operations of [`AdminService`](crate::AdminService).
#[derive(Debug, Error)]
pub enum AdminError {
    /// The token was rejected while connecting.
    #[error("authentication failed: {0}")]
    Auth(#[source] GatewayError),

    /// The operation needs a connected session.
    #[error("not connected")]
    NotConnected,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A repository identifier that is not `owner/repo`.
    #[error("invalid repository name: {0:?} (expected owner/repo)")]
    InvalidRepoName(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type Result<T> = std::result::Result<T, AdminError>;
