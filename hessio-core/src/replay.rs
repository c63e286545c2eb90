//! File-backed decoder for replay streams.
//!
//! [`ReplayDecoder`] reads the block stream described in [`crate::format`] one event at a
//! time and keeps the current run header and event in memory. It answers the raw
//! [`Decoder`] queries the way the native decoder does:
//!
//! * no current event: [`NOT_READY`]
//! * telescope id not in the run header: [`TELESCOPE_INDEX_NOT_VALID`]
//! * telescope configured but without data in this event: [`GENERAL_FAILURE`] for
//!   event-scoped quantities; run-scoped ones (calibration, pixel positions, mirror area)
//!   still answer
//! * gain channel not recorded: [`CHANNEL_INDEX_NOT_VALID`]
//!
//! A block that cannot be read or decoded ends the stream.

use crate::decoder::Decoder;
use crate::format::{
    decode_event, decode_mc_shower, decode_run_header, read_block, read_header, FormatError,
    TAG_EVENT, TAG_MC_SHOWER, TAG_RUN_HEADER,
};
use crate::records::{AdcData, EventRecord, RunHeader, TelescopeConfig, TelescopeEvent, TimingData};
use crate::status::{
    CHANNEL_INDEX_NOT_VALID, END_OF_STREAM, GENERAL_FAILURE, NOT_READY, TELESCOPE_INDEX_NOT_VALID,
};
use crate::types::{GpsTime, McShower};
use crate::DIAGNOSTICS_TARGET;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, trace};

/// Largest block the decoder accepts by default, in bytes.
pub const DEFAULT_MAX_BLOCK_LENGTH: u32 = 100_000_000;

/// Reader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Blocks longer than this end the stream.
    pub max_block_length: u32,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            max_block_length: DEFAULT_MAX_BLOCK_LENGTH,
        }
    }
}

/// Decoder over a replay file.
#[derive(Debug, Default)]
pub struct ReplayDecoder {
    options: ReplayOptions,
    reader: Option<BufReader<File>>,
    run: Option<RunHeader>,
    event: Option<EventRecord>,
    shower: Option<McShower>,
    pending_shower: Option<McShower>,
    open_error: Option<String>,
}

type Answer<T> = std::result::Result<T, i32>;

impl ReplayDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ReplayOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &ReplayOptions {
        &self.options
    }

    /// Run header of the run being read, once one has been seen.
    pub fn run_header(&self) -> Option<&RunHeader> {
        self.run.as_ref()
    }

    /// The current event, if any.
    pub fn current_event(&self) -> Option<&EventRecord> {
        self.event.as_ref()
    }

    fn reset(&mut self) {
        self.reader = None;
        self.run = None;
        self.event = None;
        self.shower = None;
        self.pending_shower = None;
    }

    fn open_stream(path: &Path) -> Result<BufReader<File>, FormatError> {
        let mut reader = BufReader::new(File::open(path)?);
        read_header(&mut reader)?;
        Ok(reader)
    }

    /// Reads blocks until the next usable event. `Ok(false)` at a clean end of stream.
    fn read_next_event(&mut self) -> Result<bool, FormatError> {
        let max = self.options.max_block_length;
        loop {
            let Some(reader) = self.reader.as_mut() else {
                return Ok(false);
            };
            let Some(block) = read_block(reader, max)? else {
                return Ok(false);
            };

            match block.tag {
                TAG_RUN_HEADER => {
                    let run = decode_run_header(&block.payload)?;
                    debug!(
                        target: DIAGNOSTICS_TARGET,
                        run_id = run.run_id,
                        telescopes = run.telescopes.len(),
                        "Run header"
                    );
                    self.run = Some(run);
                    self.pending_shower = None;
                }
                TAG_MC_SHOWER => {
                    self.pending_shower = Some(decode_mc_shower(&block.payload)?);
                }
                TAG_EVENT => {
                    let mut event = decode_event(&block.payload)?;
                    let Some(run) = self.run.as_ref() else {
                        debug!(
                            target: DIAGNOSTICS_TARGET,
                            global_count = event.global_count,
                            "Skipping event before any run header"
                        );
                        self.pending_shower = None;
                        continue;
                    };
                    let global_count = event.global_count;
                    event.telescopes.retain(|tel| {
                        let configured = run.telescope(tel.id).is_some();
                        if !configured {
                            debug!(
                                target: DIAGNOSTICS_TARGET,
                                telescope = tel.id,
                                global_count,
                                "Dropping data of unconfigured telescope"
                            );
                        }
                        configured
                    });
                    self.shower = self.pending_shower.take();
                    self.event = Some(event);
                    return Ok(true);
                }
                tag => {
                    trace!(
                        target: DIAGNOSTICS_TARGET,
                        tag,
                        length = block.payload.len(),
                        "Skipping unknown block"
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    fn current(&self) -> Answer<(&RunHeader, &EventRecord)> {
        match (&self.run, &self.event) {
            (Some(run), Some(event)) => Ok((run, event)),
            _ => Err(NOT_READY),
        }
    }

    fn config(&self, telescope: i32) -> Answer<&TelescopeConfig> {
        let (run, _) = self.current()?;
        run.telescope(telescope).ok_or(TELESCOPE_INDEX_NOT_VALID)
    }

    fn telescope_event(&self, telescope: i32) -> Answer<&TelescopeEvent> {
        self.config(telescope)?;
        let (_, event) = self.current()?;
        event.telescope(telescope).ok_or(GENERAL_FAILURE)
    }

    fn raw(&self, telescope: i32) -> Answer<&AdcData> {
        self.telescope_event(telescope)?
            .raw
            .as_ref()
            .ok_or(GENERAL_FAILURE)
    }

    fn raw_gain(&self, telescope: i32, channel: i32) -> Answer<(&AdcData, usize)> {
        let raw = self.raw(telescope)?;
        match usize::try_from(channel) {
            Ok(gain) if gain < raw.num_gains as usize => Ok((raw, gain)),
            _ => Err(CHANNEL_INDEX_NOT_VALID),
        }
    }

    fn timing(&self, telescope: i32) -> Answer<&TimingData> {
        self.telescope_event(telescope)?
            .timing
            .as_ref()
            .ok_or(GENERAL_FAILURE)
    }
}

impl Decoder for ReplayDecoder {
    fn open(&mut self, path: &Path) -> i32 {
        self.reset();
        match Self::open_stream(path) {
            Ok(reader) => {
                debug!(
                    target: DIAGNOSTICS_TARGET,
                    path = %path.display(),
                    "Opened replay stream"
                );
                self.reader = Some(reader);
                self.open_error = None;
                0
            }
            Err(e) => {
                debug!(
                    target: DIAGNOSTICS_TARGET,
                    path = %path.display(),
                    error = %e,
                    "Failed to open replay stream"
                );
                self.open_error = Some(e.to_string());
                GENERAL_FAILURE
            }
        }
    }

    fn open_error(&self) -> Option<String> {
        self.open_error.clone()
    }

    fn advance(&mut self, run_id: &mut i32) -> i64 {
        self.event = None;
        self.shower = None;
        match self.read_next_event() {
            Ok(true) => {
                if let (Some(run), Some(event)) = (&self.run, &self.event) {
                    *run_id = run.run_id;
                    return event.global_count;
                }
            }
            Ok(false) => debug!(target: DIAGNOSTICS_TARGET, "End of replay stream"),
            Err(e) => debug!(
                target: DIAGNOSTICS_TARGET,
                error = %e,
                "Replay stream ended on unreadable block"
            ),
        }
        self.reset();
        END_OF_STREAM
    }

    fn close(&mut self) {
        self.reset();
    }

    fn run_number(&self) -> i32 {
        status(self.current().map(|(run, _)| run.run_id))
    }

    fn telescope_count(&self) -> i32 {
        status(self.current().map(|(run, _)| len_status(run.telescopes.len())))
    }

    fn global_event_count(&self) -> i64 {
        match self.current() {
            Ok((_, event)) => event.global_count,
            Err(code) => code as i64,
        }
    }

    fn telescopes_with_data_count(&self) -> i32 {
        status(
            self.current()
                .map(|(_, event)| len_status(event.telescopes.len())),
        )
    }

    fn telescopes_with_data(&self, out: &mut [i32]) -> i32 {
        status(self.current().map(|(_, event)| {
            let ids: Vec<i32> = event.telescopes.iter().map(|t| t.id).collect();
            copy_into(&ids, out)
        }))
    }

    fn pixel_count(&self, telescope: i32) -> i32 {
        status(
            self.telescope_event(telescope)
                .and_then(|_| self.config(telescope))
                .map(|config| len_status(config.pixel_count())),
        )
    }

    fn sample_count(&self, telescope: i32) -> i32 {
        status(self.raw(telescope).map(|raw| len_status(raw.num_samples as usize)))
    }

    fn channel_count(&self, telescope: i32) -> i32 {
        status(self.raw(telescope).map(|raw| len_status(raw.num_gains as usize)))
    }

    fn timing_type_count(&self, telescope: i32) -> i32 {
        status(
            self.timing(telescope)
                .map(|timing| len_status(timing.num_types as usize)),
        )
    }

    fn adc_samples(&self, telescope: i32, channel: i32, out: &mut [u16]) -> i32 {
        status(self.raw_gain(telescope, channel).and_then(|(raw, gain)| {
            let samples = raw.gain_samples(gain).ok_or(GENERAL_FAILURE)?;
            Ok(copy_into(samples, out))
        }))
    }

    fn adc_sums(&self, telescope: i32, channel: i32, out: &mut [i32]) -> i32 {
        status(self.raw_gain(telescope, channel).and_then(|(raw, gain)| {
            let sums = raw.gain_sums(gain).ok_or(GENERAL_FAILURE)?;
            Ok(copy_into(sums, out))
        }))
    }

    fn calibration(&self, telescope: i32, pedestal: &mut [f64], coefficient: &mut [f64]) -> i32 {
        status(self.config(telescope).map(|config| {
            copy_pair_into(
                (config.pedestal.as_slice(), config.calibration.as_slice()),
                (pedestal, coefficient),
            )
        }))
    }

    fn pixel_positions(&self, telescope: i32, x: &mut [f64], y: &mut [f64]) -> i32 {
        status(self.config(telescope).map(|config| {
            copy_pair_into((config.pixel_x.as_slice(), config.pixel_y.as_slice()), (x, y))
        }))
    }

    fn mirror_area(&self, telescope: i32, out: &mut f64) -> i32 {
        status(self.config(telescope).map(|config| {
            *out = config.mirror_area;
            0
        }))
    }

    fn pixel_timing(&self, telescope: i32, out: &mut [f32]) -> i32 {
        status(
            self.timing(telescope)
                .map(|timing| copy_into(&timing.values, out)),
        )
    }

    fn timing_threshold(&self, telescope: i32, out: &mut i32) -> i32 {
        status(self.timing(telescope).map(|timing| {
            *out = timing.threshold;
            0
        }))
    }

    fn timing_peak_global(&self, telescope: i32, out: &mut f32) -> i32 {
        status(self.timing(telescope).map(|timing| {
            *out = timing.peak_global;
            0
        }))
    }

    fn mc_shower(&self, out: &mut McShower) -> i32 {
        status(self.current().and_then(|_| {
            *out = self.shower.ok_or(GENERAL_FAILURE)?;
            Ok(0)
        }))
    }

    fn central_gps_time(&self, out: &mut GpsTime) -> i32 {
        status(self.current().and_then(|(_, event)| {
            *out = event.central_gps.ok_or(GENERAL_FAILURE)?;
            Ok(0)
        }))
    }

    fn telescope_gps_time(&self, telescope: i32, out: &mut GpsTime) -> i32 {
        status(self.telescope_event(telescope).and_then(|tel| {
            *out = tel.gps.ok_or(GENERAL_FAILURE)?;
            Ok(0)
        }))
    }
}

#[inline]
fn status(answer: Answer<i32>) -> i32 {
    answer.unwrap_or_else(|code| code)
}

#[inline]
fn len_status(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(GENERAL_FAILURE)
}

/// Copies `src` into `out` when the sizes agree. Returns the number of held elements.
fn copy_into<T: Copy>(src: &[T], out: &mut [T]) -> i32 {
    if src.len() == out.len() {
        out.copy_from_slice(src);
    }
    len_status(src.len())
}

fn copy_pair_into<T: Copy>(src: (&[T], &[T]), out: (&mut [T], &mut [T])) -> i32 {
    if src.0.len() != src.1.len() {
        return GENERAL_FAILURE;
    }
    if src.0.len() == out.0.len() && src.1.len() == out.1.len() {
        out.0.copy_from_slice(src.0);
        out.1.copy_from_slice(src.1);
    }
    len_status(src.0.len())
}
