//! Error types for attenuator control

use std::ops::Range;

use thiserror::Error;

/// The instrument session returned something that could not be interpreted
///
/// Once a driver reports this, the command/response session is in an unknown
/// state. The owner must close and reopen it; nothing in this crate retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Create a transport error with a description of what went wrong
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error for a response that did not match what the command expects
    pub fn unexpected_response(command: &str, response: &str) -> Self {
        Self::new(format!(
            "unexpected response to {command:?}: {response:?}"
        ))
    }

    /// Description of the failure
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Coarse classification of an [`AttenError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Driver session failure
    Transport,
    /// Channel index not present on the instrument
    IndexOutOfRange,
    /// Requested value plus offset above the instrument maximum
    LimitExceeded,
    /// Precondition not met yet
    InvalidState,
    /// Malformed argument
    InvalidArgument,
}

/// Errors returned by attenuator and group operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttenError {
    /// Driver session failure, passed through unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Attenuator index does not exist on the instrument
    #[error("attenuator index {index} out of range for instrument with {channel_count} channels")]
    IndexOutOfRange { index: usize, channel_count: usize },

    /// Requested attenuation plus calibration offset exceeds the maximum
    #[error("attenuation {requested} dB + offset {offset} dB exceeds maximum {max} dB")]
    LimitExceeded { requested: f64, offset: f64, max: f64 },

    /// Operation needs a precondition that is not met yet
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Malformed or wrong-kind argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A group-wide set stopped part way through
    #[error(transparent)]
    GroupSet(Box<GroupSetError>),
}

impl AttenError {
    /// Classify this error
    ///
    /// Group failures report the kind of the member error that stopped them.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::GroupSet(err) => err.source.kind(),
        }
    }

    /// True if the instrument session must be reopened before further use
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

impl From<GroupSetError> for AttenError {
    fn from(err: GroupSetError) -> Self {
        Self::GroupSet(Box::new(err))
    }
}

/// Partial failure of a group-wide set
///
/// Members before `member` were commanded to the new value and are not rolled
/// back. Members from `member` on were never commanded. The group cache still
/// holds the previous value.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("group {group:?}: set to {value} dB stopped at member {member}")]
pub struct GroupSetError {
    /// Name of the group, empty if unnamed
    pub group: String,
    /// Zero-based position of the member that failed
    pub member: usize,
    /// Value that was being commanded
    pub value: f64,
    /// Error returned by the failing member
    pub source: AttenError,
}

impl GroupSetError {
    /// Positions of members already commanded to `value`
    pub fn committed(&self) -> Range<usize> {
        0..self.member
    }

    /// Kind of the member error
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_error_kind_follows_source() {
        let err = GroupSetError {
            group: "uplink".to_string(),
            member: 1,
            value: 30.0,
            source: AttenError::LimitExceeded {
                requested: 30.0,
                offset: 40.0,
                max: 60.0,
            },
        };

        assert_eq!(err.committed(), 0..1);
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);

        let wrapped: AttenError = err.into();
        assert_eq!(wrapped.kind(), ErrorKind::LimitExceeded);
        assert!(!wrapped.is_transport());
    }

    #[test]
    fn test_group_error_message_leaves_cause_to_source() {
        use std::error::Error as _;

        let err = GroupSetError {
            group: "uplink".to_string(),
            member: 0,
            value: 70.0,
            source: AttenError::LimitExceeded {
                requested: 70.0,
                offset: 0.0,
                max: 60.0,
            },
        };

        let message = err.to_string();
        assert_eq!(message, "group \"uplink\": set to 70 dB stopped at member 0");
        assert!(!message.contains("exceeds maximum"));

        let cause = err.source().map(|cause| cause.to_string()).unwrap_or_default();
        assert!(cause.contains("exceeds maximum 60 dB"));
    }

    #[test]
    fn test_transport_error_message() {
        let err = TransportError::unexpected_response("ATTN? 1", "ERR");
        assert!(err.message().contains("ATTN? 1"));

        let wrapped = AttenError::from(err);
        assert!(wrapped.is_transport());
        assert!(wrapped.to_string().starts_with("transport error"));
    }
}
