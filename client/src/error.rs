//! Error types for the collaborator REST interface.

use frontdesk_core::ErrorKind;
use thiserror::Error;

/// Errors that can occur when talking to the collaborator.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure before a response arrived.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The collaborator did not answer within the deadline.
    #[error("request timed out: {0}")]
    TimedOut(String),

    /// The response body did not match the expected envelope.
    #[error("response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// The acting role may not perform the operation.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Role-specific message from the collaborator, surfaced verbatim.
        message: String,
    },

    /// The record's lifecycle state no longer admits the operation.
    #[error("invalid status: {message}")]
    InvalidStatus {
        /// Collaborator message naming the conflicting state.
        message: String,
    },

    /// A domain rule rejected the operation.
    #[error("business rule violation: {message}")]
    BusinessRule {
        /// Collaborator message naming the violated rule.
        message: String,
    },

    /// Any other collaborator failure.
    #[error("backend error (status {status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        message: String,
    },
}

impl ClientError {
    /// Classification of this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RequestFailed(_) | Self::ResponseParseFailed(_) | Self::ApiError { .. } => {
                ErrorKind::Network
            }
            Self::TimedOut(_) => ErrorKind::Timeout,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::InvalidStatus { .. } => ErrorKind::InvalidStatus,
            Self::BusinessRule { .. } => ErrorKind::BusinessRuleViolation,
        }
    }

    /// Whether retrying the same call can plausibly succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_the_variant() {
        assert_eq!(
            ClientError::TimedOut("deadline".to_string()).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            ClientError::PermissionDenied {
                message: "receptionists cannot cancel".to_string()
            }
            .kind(),
            ErrorKind::PermissionDenied
        );
        assert!(ClientError::RequestFailed("refused".to_string()).is_transient());
        assert!(
            !ClientError::InvalidStatus {
                message: "already cancelled".to_string()
            }
            .is_transient()
        );
    }
}
