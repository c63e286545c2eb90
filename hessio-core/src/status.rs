//! Translation of raw decoder status codes into [`HessioError`].
//!
//! Every decoder query answers with a signed integer: a non-negative value is the payload
//! (a count, a written length, or plain success), and a negative value is one of the
//! sentinels below. The mapping is total and identical for every query.

use crate::error::HessioError;
use crate::types::{Channel, TelescopeId};

/// Generic failure: the quantity is not available.
pub const GENERAL_FAILURE: i32 = -1;
/// The telescope id is not part of the run configuration.
pub const TELESCOPE_INDEX_NOT_VALID: i32 = -2;
/// The channel is not read out by this telescope.
pub const CHANNEL_INDEX_NOT_VALID: i32 = -3;
/// The decoder holds no current event.
pub const NOT_READY: i32 = -4;

/// Returned by `advance` when the stream has no further event.
pub const END_OF_STREAM: i64 = -1;

/// Decoded meaning of a raw status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Non-negative payload
    Success(usize),
    TelescopeIndexNotValid,
    ChannelIndexNotValid,
    Unavailable,
    NotReady,
}

impl Status {
    /// Classifies a raw code.
    #[inline]
    pub fn from_code(code: i32) -> Self {
        match code {
            c if c >= 0 => Self::Success(c as usize),
            TELESCOPE_INDEX_NOT_VALID => Self::TelescopeIndexNotValid,
            CHANNEL_INDEX_NOT_VALID => Self::ChannelIndexNotValid,
            NOT_READY => Self::NotReady,
            _ => Self::Unavailable,
        }
    }
}

/// What a query was asking for; used to attach context to translated errors.
#[derive(Debug, Clone, Copy)]
pub struct Query {
    pub what: &'static str,
    pub telescope: Option<TelescopeId>,
    pub channel: Option<Channel>,
}

impl Query {
    /// A run- or event-level query with no telescope.
    pub const fn event(what: &'static str) -> Self {
        Self {
            what,
            telescope: None,
            channel: None,
        }
    }

    /// A per-telescope query.
    pub const fn telescope(what: &'static str, telescope: TelescopeId) -> Self {
        Self {
            what,
            telescope: Some(telescope),
            channel: None,
        }
    }

    /// A per-telescope, per-channel query.
    pub const fn channel(what: &'static str, telescope: TelescopeId, channel: Channel) -> Self {
        Self {
            what,
            telescope: Some(telescope),
            channel: Some(channel),
        }
    }

    /// Converts a status into the error for this query, or the payload on success.
    pub fn check(&self, code: i32) -> Result<usize, HessioError> {
        match Status::from_code(code) {
            Status::Success(value) => Ok(value),
            Status::NotReady => Err(HessioError::NotReady),
            Status::TelescopeIndexNotValid => match self.telescope {
                Some(telescope) => Err(HessioError::TelescopeIndexNotValid { telescope }),
                None => Err(self.unavailable()),
            },
            Status::ChannelIndexNotValid => match (self.telescope, self.channel) {
                (Some(telescope), Some(channel)) => {
                    Err(HessioError::ChannelIndexNotValid { telescope, channel })
                }
                _ => Err(self.unavailable()),
            },
            Status::Unavailable => Err(self.unavailable()),
        }
    }

    /// Same as [`check`](Self::check) for queries whose payload is 64 bits wide.
    pub fn check_wide(&self, code: i64) -> Result<u64, HessioError> {
        if code >= 0 {
            return Ok(code as u64);
        }
        let narrow = i32::try_from(code).unwrap_or(GENERAL_FAILURE);
        self.check(narrow).map(|value| value as u64)
    }

    fn unavailable(&self) -> HessioError {
        HessioError::Unavailable {
            what: self.what,
            telescope: self.telescope,
        }
    }
}
