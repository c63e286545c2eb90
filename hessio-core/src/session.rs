//! Session lifecycle.
//!
//! A [`Session`] owns one decoder and tracks whether a stream is open and whether the
//! decoder holds a current event. All telescope queries go through it, so the "no event
//! yet" and "stream closed" conditions are checked in one place.

use crate::decoder::Decoder;
use crate::error::{HessioError, Result};
use crate::types::EventPosition;
use crate::DIAGNOSTICS_TARGET;
use std::path::Path;
use tracing::{debug, trace};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No stream open
    Closed,
    /// Stream open, no event read yet
    Opened,
    /// Stream open, positioned on an event
    Positioned(EventPosition),
    /// Stream open, end of stream reached
    Exhausted,
}

/// An open (or closable) stream together with its decoder.
///
/// Each session owns its decoder, so independent sessions never share event state.
/// Dropping a session that is still open closes the stream.
#[derive(Debug)]
pub struct Session<D: Decoder> {
    decoder: D,
    state: SessionState,
}

impl<D: Decoder> Session<D> {
    /// Wraps a decoder in a closed session.
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            state: SessionState::Closed,
        }
    }

    /// Creates a session and opens `path` with it.
    pub fn open_with<P: AsRef<Path>>(decoder: D, path: P) -> Result<Self> {
        let mut session = Self::new(decoder);
        session.open(path)?;
        Ok(session)
    }

    /// Opens the stream at `path`.
    ///
    /// A stream that is already open is closed first. On success the session has no
    /// current event until the first advance.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if self.is_open() {
            debug!(
                target: DIAGNOSTICS_TARGET,
                ?path,
                "closing previous stream before reopening"
            );
            self.decoder.close();
            self.state = SessionState::Closed;
        }

        let rc = self.decoder.open(path);
        if rc < 0 {
            let reason = self
                .decoder
                .open_error()
                .unwrap_or_else(|| format!("decoder returned status {rc}"));
            debug!(target: DIAGNOSTICS_TARGET, ?path, rc, %reason, "open failed");
            return Err(HessioError::OpenFailure {
                path: path.to_path_buf(),
                reason,
            });
        }

        debug!(target: DIAGNOSTICS_TARGET, ?path, "stream opened");
        self.state = SessionState::Opened;
        Ok(())
    }

    /// Moves the decoder to the next event.
    ///
    /// Returns `Ok(None)` at end of stream, and again on every later call. Fails with
    /// [`HessioError::NotReady`] if no stream is open.
    pub fn advance(&mut self) -> Result<Option<EventPosition>> {
        match self.state {
            SessionState::Closed => return Err(HessioError::NotReady),
            SessionState::Exhausted => return Ok(None),
            SessionState::Opened | SessionState::Positioned(_) => {}
        }

        let mut run_id = 0;
        let count = self.decoder.advance(&mut run_id);
        if count < 0 {
            trace!(target: DIAGNOSTICS_TARGET, "end of stream");
            self.state = SessionState::Exhausted;
            return Ok(None);
        }

        let position = EventPosition::new(run_id, count);
        trace!(
            target: DIAGNOSTICS_TARGET,
            run_id,
            global_event_count = count,
            "advanced"
        );
        self.state = SessionState::Positioned(position);
        Ok(Some(position))
    }

    /// Closes the stream.
    ///
    /// Fails with [`HessioError::NotReady`] if the session is not open.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Err(HessioError::NotReady);
        }
        self.decoder.close();
        self.state = SessionState::Closed;
        debug!(target: DIAGNOSTICS_TARGET, "stream closed");
        Ok(())
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state != SessionState::Closed
    }

    /// Current event position, if the session is positioned on an event.
    pub fn position(&self) -> Option<EventPosition> {
        match self.state {
            SessionState::Positioned(position) => Some(position),
            _ => None,
        }
    }

    /// Read-only access to the underlying decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Returns the decoder if the session holds a current event.
    pub(crate) fn ready(&self) -> Result<&D> {
        match self.state {
            SessionState::Positioned(_) => Ok(&self.decoder),
            _ => Err(HessioError::NotReady),
        }
    }
}

impl<D: Decoder> Drop for Session<D> {
    fn drop(&mut self) {
        if self.is_open() {
            self.decoder.close();
        }
    }
}
