//! Failure classification shared across the engine.
//!
//! Every fallible surface (REST calls, mutation commands, the event
//! channel) classifies its failures into one [`ErrorKind`] so recovery
//! policy lives in one place: transient kinds are retryable by the user,
//! status conflicts trigger a record refetch, permission failures are
//! surfaced verbatim and never retried.

use serde::{Deserialize, Serialize};

/// Classified failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The acting role may not perform the operation.
    PermissionDenied,
    /// The record's lifecycle state no longer admits the transition.
    InvalidStatus,
    /// A domain rule rejected the operation (e.g. completing a session
    /// scheduled for another day).
    BusinessRuleViolation,
    /// Transport-level failure reaching the collaborator.
    Network,
    /// The collaborator did not answer within the deadline.
    Timeout,
    /// A pushed message could not be decoded.
    MalformedEvent,
    /// The push channel is down; pull remains available.
    ChannelDisconnected,
}

impl ErrorKind {
    /// Canonical wire code for this kind.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::BusinessRuleViolation => "BUSINESS_RULE_VIOLATION",
            Self::Network => "NETWORK",
            Self::Timeout => "TIMEOUT",
            Self::MalformedEvent => "MALFORMED_EVENT",
            Self::ChannelDisconnected => "CHANNEL_DISCONNECTED",
        }
    }

    /// Parses a wire code, tolerating surrounding whitespace and case.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PERMISSION_DENIED" => Some(Self::PermissionDenied),
            "INVALID_STATUS" => Some(Self::InvalidStatus),
            "BUSINESS_RULE_VIOLATION" => Some(Self::BusinessRuleViolation),
            "NETWORK" => Some(Self::Network),
            "TIMEOUT" => Some(Self::Timeout),
            "MALFORMED_EVENT" => Some(Self::MalformedEvent),
            "CHANNEL_DISCONNECTED" => Some(Self::ChannelDisconnected),
            _ => None,
        }
    }

    /// Whether a retry of the same operation can plausibly succeed.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::ChannelDisconnected)
    }

    /// Whether the failed record should be refetched before retrying.
    #[must_use]
    pub const fn invalidates_record(self) -> bool {
        matches!(self, Self::InvalidStatus | Self::BusinessRuleViolation)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for kind in [
            ErrorKind::PermissionDenied,
            ErrorKind::InvalidStatus,
            ErrorKind::BusinessRuleViolation,
            ErrorKind::Network,
            ErrorKind::Timeout,
            ErrorKind::MalformedEvent,
            ErrorKind::ChannelDisconnected,
        ] {
            assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
        }
    }

    #[test]
    fn parsing_tolerates_case_and_whitespace() {
        assert_eq!(
            ErrorKind::from_code(" invalid_status "),
            Some(ErrorKind::InvalidStatus)
        );
        assert_eq!(ErrorKind::from_code("SOMETHING_ELSE"), None);
    }

    #[test]
    fn transient_kinds_are_the_transport_ones() {
        assert!(ErrorKind::Network.is_transient());
        assert!(ErrorKind::Timeout.is_transient());
        assert!(!ErrorKind::InvalidStatus.is_transient());
        assert!(ErrorKind::InvalidStatus.invalidates_record());
        assert!(!ErrorKind::PermissionDenied.invalidates_record());
    }
}
