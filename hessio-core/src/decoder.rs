//! The decoder boundary.
//!
//! A [`Decoder`] owns an input stream and a single "current event" buffer, and answers
//! get-style queries about it with raw status codes (see [`crate::status`]). It is the only
//! component that knows how the stream is laid out on disk; everything above it works in
//! terms of this trait.
//!
//! # Contract
//!
//! * `open` returns `0` on success and a negative value on failure.
//! * `advance` returns the next global event count (`>= 0`) and writes the run id, or
//!   [`END_OF_STREAM`](crate::status::END_OF_STREAM).
//! * Count queries return the count, or a negative status.
//! * Buffer queries receive a buffer of exactly `declared_count × width` elements. They
//!   return the number of elements the decoder holds for that quantity and write them only
//!   if that number equals the buffer length. A negative status leaves the buffer untrusted.
//! * Scalar queries write their out-parameter and return `0`, or a negative status.
//! * `close` releases the stream. Closing twice must be harmless.

use crate::types::{GpsTime, McShower};
use std::path::Path;

/// Raw, status-code based access to a stream and its current event.
pub trait Decoder {
    /// Opens the stream at `path`, replacing any stream already open.
    fn open(&mut self, path: &Path) -> i32;

    /// Human-readable cause of the last failed `open`, if the decoder keeps one.
    fn open_error(&self) -> Option<String> {
        None
    }

    /// Reads the next event into the current event buffer.
    fn advance(&mut self, run_id: &mut i32) -> i64;

    /// Releases the stream.
    fn close(&mut self);

    fn run_number(&self) -> i32;

    /// Number of telescopes configured for the run.
    fn telescope_count(&self) -> i32;

    /// Global event count of the current event.
    fn global_event_count(&self) -> i64;

    /// Number of telescopes with data in the current event.
    fn telescopes_with_data_count(&self) -> i32;

    /// Ids of telescopes with data in the current event.
    fn telescopes_with_data(&self, out: &mut [i32]) -> i32;

    fn pixel_count(&self, telescope: i32) -> i32;

    /// Number of time slices per trace.
    fn sample_count(&self, telescope: i32) -> i32;

    /// Number of gain channels read out.
    fn channel_count(&self, telescope: i32) -> i32;

    /// Number of timing-reconstruction quantities per pixel.
    fn timing_type_count(&self, telescope: i32) -> i32;

    /// Sampled traces, `pixels × samples`, row-major.
    fn adc_samples(&self, telescope: i32, channel: i32, out: &mut [u16]) -> i32;

    /// Integrated ADC sums, one per pixel.
    fn adc_sums(&self, telescope: i32, channel: i32, out: &mut [i32]) -> i32;

    /// Pedestal and calibration coefficients, both `2 × pixels`, gain-major.
    fn calibration(&self, telescope: i32, pedestal: &mut [f64], coefficient: &mut [f64])
        -> i32;

    fn pixel_positions(&self, telescope: i32, x: &mut [f64], y: &mut [f64]) -> i32;

    fn mirror_area(&self, telescope: i32, out: &mut f64) -> i32;

    /// Timing values, `pixels × timing types`, row-major.
    fn pixel_timing(&self, telescope: i32, out: &mut [f32]) -> i32;

    fn timing_threshold(&self, telescope: i32, out: &mut i32) -> i32;

    fn timing_peak_global(&self, telescope: i32, out: &mut f32) -> i32;

    fn mc_shower(&self, out: &mut McShower) -> i32;

    fn central_gps_time(&self, out: &mut GpsTime) -> i32;

    fn telescope_gps_time(&self, telescope: i32, out: &mut GpsTime) -> i32;
}
