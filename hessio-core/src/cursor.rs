//! Forward-only event cursor with an optional event limit.

use crate::decoder::Decoder;
use crate::error::Result;
use crate::session::Session;
use crate::types::EventPosition;

/// Iterates over the events of a [`Session`].
///
/// The cursor does not borrow the session between calls, so telescope queries can be
/// issued on the session while iterating:
///
/// ```no_run
/// use hessio_core::{EventCursor, TelescopeId};
///
/// let mut session = hessio_core::open("run31964.replay")?;
/// let mut cursor = EventCursor::new();
/// while let Some(position) = cursor.try_advance(&mut session)? {
///     for tel in session.telescopes_with_data()? {
///         println!("{} {}: {} pixels", position.run_id, tel, session.pixel_count(tel)?);
///     }
/// }
/// # Ok::<(), hessio_core::HessioError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventCursor {
    limit: Option<u64>,
    advanced: u64,
    finished: bool,
}

impl EventCursor {
    /// Creates a cursor that runs until the end of the stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cursor that stops after `limit` events.
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Creates a cursor from an optional limit (`None` = unbounded).
    pub fn from_limit(limit: Option<u64>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Advances the session by one event.
    ///
    /// Returns `Ok(None)` once the limit is reached or the stream ends, and keeps
    /// returning `Ok(None)` afterwards without touching the session.
    pub fn try_advance<D: Decoder>(
        &mut self,
        session: &mut Session<D>,
    ) -> Result<Option<EventPosition>> {
        if self.finished {
            return Ok(None);
        }
        if self.limit.is_some_and(|limit| self.advanced >= limit) {
            self.finished = true;
            return Ok(None);
        }

        match session.advance()? {
            Some(position) => {
                self.advanced += 1;
                Ok(Some(position))
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Number of events yielded so far.
    #[inline]
    pub fn advanced(&self) -> u64 {
        self.advanced
    }

    #[inline]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// True once the cursor has signalled exhaustion.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
