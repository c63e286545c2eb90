//! Error taxonomy for session and telescope queries.
//!
//! Every failure a caller can observe through [`Session`](crate::Session) is one of the
//! variants below. The variants are coarse: they say *which* condition
//! stopped the query, and carry just enough context (telescope, channel, quantity) to
//! report it.

use crate::types::{Channel, TelescopeId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by session, cursor and query operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HessioError {
    /// The stream could not be opened (unreadable path or unrecognized format).
    #[error("Cannot open {path:?}: {reason}")]
    OpenFailure { path: PathBuf, reason: String },

    /// No stream is open, or no event has been read yet (or the stream is exhausted).
    #[error("No current event: open a stream and advance the cursor first")]
    NotReady,

    /// The telescope id is not part of the run configuration.
    #[error("Telescope id {telescope} is not configured for this run")]
    TelescopeIndexNotValid { telescope: TelescopeId },

    /// The telescope has no readout for the requested gain channel.
    #[error("Telescope {telescope} has no {channel} channel")]
    ChannelIndexNotValid {
        telescope: TelescopeId,
        channel: Channel,
    },

    /// The quantity was not recorded for this (otherwise valid) telescope or event.
    #[error("{what} not available{}", telescope.map(|t| format!(" for telescope {t}")).unwrap_or_default())]
    Unavailable {
        what: &'static str,
        telescope: Option<TelescopeId>,
    },

    /// The decoder wrote a buffer whose size disagrees with the count it declared.
    #[error("Decoder contract violated for {what}: declared {expected} elements, decoder holds {actual}")]
    ContractViolation {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl HessioError {
    /// Returns the telescope the error refers to, if any.
    pub fn telescope(&self) -> Option<TelescopeId> {
        match self {
            Self::TelescopeIndexNotValid { telescope }
            | Self::ChannelIndexNotValid { telescope, .. } => Some(*telescope),
            Self::Unavailable { telescope, .. } => *telescope,
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HessioError>;
