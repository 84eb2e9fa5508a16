//! Error types for instance resolution and session launch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SsmError {
    #[error("[{operation}] {message}")]
    RemoteService {
        operation: &'static str,
        message: String,
    },

    #[error("Found {} instances for '{token}': {}", .candidates.len(), .candidates.join(" "))]
    AmbiguousMatch {
        token: String,
        candidates: Vec<String>,
    },

    #[error("Could not resolve Instance ID for '{token}'")]
    UnresolvedToken { token: String },

    #[error("SSM inventory entity not recognised: {0}")]
    MalformedInventoryEntry(String),

    #[error("Failed to launch SSM session: {0}")]
    SessionLaunch(#[from] std::io::Error),
}

impl SsmError {
    /// Wrap an AWS SDK failure, keeping the service's own explanation.
    ///
    /// `DisplayErrorContext` walks the source chain so credential and
    /// throttling errors are not reduced to "service error".
    pub fn remote<E>(operation: &'static str, err: E) -> Self
    where
        E: std::error::Error,
    {
        Self::RemoteService {
            operation,
            message: aws_sdk_ssm::error::DisplayErrorContext(err).to_string(),
        }
    }
}
