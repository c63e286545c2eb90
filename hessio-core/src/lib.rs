//! Typed access to IACT event streams.
//!
//! This crate wraps a status-code based event decoder (the [`Decoder`] trait) in a safe,
//! typed API. A [`Session`] owns one decoder and moves through the stream event by event;
//! per-telescope queries on the current event return owned values or arrays with known
//! shapes, and every decoder failure surfaces as a [`HessioError`].
//!
//! [`ReplayDecoder`] is the file-backed decoder shipped with the crate. It reads replay
//! streams written by [`ReplayWriter`].
//!
//! # Example
//!
//! ```no_run
//! use hessio_core::{Channel, EventCursor, TelescopeId};
//!
//! let mut session = hessio_core::open("run31964.replay")?;
//! let tel = TelescopeId::new(47);
//!
//! let mut cursor = EventCursor::with_limit(10);
//! while let Some(position) = cursor.try_advance(&mut session)? {
//!     if let Ok(traces) = session.adc_samples(tel, Channel::HighGain) {
//!         let (pixels, samples) = traces.shape();
//!         println!("event {}: {pixels} x {samples}", position.global_event_count);
//!     }
//! }
//! session.close()?;
//! # Ok::<(), hessio_core::HessioError>(())
//! ```
//!
//! # Features
//!
//! - Explicit session lifecycle with clean end-of-stream handling
//! - Fresh shape queries before every array fetch; no stale dimensions
//! - Uniform translation of decoder sentinels into typed errors
//! - Replay stream reader and writer for fixtures and offline runs

pub mod cursor;
pub mod decoder;
pub mod error;
pub mod format;
pub mod records;
pub mod replay;
pub mod session;
pub mod status;
pub mod types;
pub mod writer;

mod marshal;
mod query;

#[cfg(test)]
mod testing;

use std::path::Path;

/// `tracing` target of the crate's diagnostic events.
///
/// The crate never reports through logging; these `debug`/`trace` events only describe
/// stream handling and are off unless a subscriber enables this target, e.g.
/// `RUST_LOG=hessio_core::diagnostics=debug`.
pub const DIAGNOSTICS_TARGET: &str = "hessio_core::diagnostics";

// Re-export commonly used types
pub use cursor::EventCursor;
pub use decoder::Decoder;
pub use error::{HessioError, Result};
pub use format::FormatError;
pub use replay::{ReplayDecoder, ReplayOptions};
pub use session::{Session, SessionState};
pub use types::{
    Calibration, Channel, EventPosition, GpsTime, Grid, McShower, PixelPositions, TelescopeId,
};
pub use writer::ReplayWriter;

/// Opens a replay stream with default options.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Session<ReplayDecoder>> {
    Session::open_with(ReplayDecoder::new(), path)
}

/// Opens a replay stream with explicit reader options.
pub fn open_with_options<P: AsRef<Path>>(
    path: P,
    options: ReplayOptions,
) -> Result<Session<ReplayDecoder>> {
    Session::open_with(ReplayDecoder::with_options(options), path)
}
