//! Error types for rack configuration and control

use atten_core::{AttenError, GroupSetError};
use thiserror::Error;

use crate::config::Transport;

/// Problems found while validating a rack configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Instrument descriptor without a model name
    #[error("instrument {instrument}: model name is empty")]
    EmptyModel { instrument: usize },

    /// Fewer calibration offsets than channels
    #[error("instrument {instrument}: {given} offsets for {channel_count} channels")]
    MissingOffsets {
        instrument: usize,
        given: usize,
        channel_count: usize,
    },

    /// Fewer path labels than channels
    #[error("instrument {instrument}: {given} paths for {channel_count} channels")]
    MissingPaths {
        instrument: usize,
        given: usize,
        channel_count: usize,
    },

    /// Two groups share a name
    #[error("duplicate group name: {0}")]
    DuplicateGroup(String),
}

/// Errors that can occur while building or driving a rack
#[derive(Debug, Error)]
pub enum RackError {
    /// Configuration is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No driver registered for the model/transport pair
    #[error("no driver registered for model {model} over {transport}")]
    UnknownDriver { model: String, transport: Transport },

    /// Driver reports a different channel count than configured
    #[error("{model}: configured with {configured} channels, driver reports {reported}")]
    ChannelCountMismatch {
        model: String,
        configured: usize,
        reported: usize,
    },

    /// Group member refers to an instrument or channel that does not exist
    #[error("group {group}: no attenuator at instrument {instrument} index {index}")]
    UnknownGroupMember {
        group: String,
        instrument: usize,
        index: usize,
    },

    /// No group with this name
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// Attenuator operation failed
    #[error("attenuator error: {0}")]
    Atten(#[from] AttenError),

    /// The actor owning a group has stopped
    #[error("group actor has shut down")]
    ActorClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<GroupSetError> for RackError {
    fn from(err: GroupSetError) -> Self {
        Self::Atten(err.into())
    }
}
