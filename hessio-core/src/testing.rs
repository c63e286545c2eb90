//! Minimal decoder used by the lifecycle and cursor unit tests.

use crate::decoder::Decoder;
use crate::status::{END_OF_STREAM, GENERAL_FAILURE};
use crate::types::{GpsTime, McShower};
use std::collections::VecDeque;
use std::path::Path;

/// Replays a fixed list of `(run_id, global_event_count)` pairs and answers every data
/// query with a general failure.
#[derive(Debug, Default)]
pub(crate) struct ScriptedDecoder {
    script: Vec<(i32, i64)>,
    pending: VecDeque<(i32, i64)>,
    pub fail_open: bool,
    pub advances: usize,
    pub closes: usize,
}

impl ScriptedDecoder {
    pub fn new(script: Vec<(i32, i64)>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }
}

impl Decoder for ScriptedDecoder {
    fn open(&mut self, _path: &Path) -> i32 {
        if self.fail_open {
            return GENERAL_FAILURE;
        }
        self.pending = self.script.iter().copied().collect();
        0
    }

    fn advance(&mut self, run_id: &mut i32) -> i64 {
        self.advances += 1;
        match self.pending.pop_front() {
            Some((run, count)) => {
                *run_id = run;
                count
            }
            None => END_OF_STREAM,
        }
    }

    fn close(&mut self) {
        self.closes += 1;
        self.pending.clear();
    }

    fn run_number(&self) -> i32 {
        GENERAL_FAILURE
    }

    fn telescope_count(&self) -> i32 {
        GENERAL_FAILURE
    }

    fn global_event_count(&self) -> i64 {
        GENERAL_FAILURE as i64
    }

    fn telescopes_with_data_count(&self) -> i32 {
        GENERAL_FAILURE
    }

    fn telescopes_with_data(&self, _out: &mut [i32]) -> i32 {
        GENERAL_FAILURE
    }

    fn pixel_count(&self, _telescope: i32) -> i32 {
        GENERAL_FAILURE
    }

    fn sample_count(&self, _telescope: i32) -> i32 {
        GENERAL_FAILURE
    }

    fn channel_count(&self, _telescope: i32) -> i32 {
        GENERAL_FAILURE
    }

    fn timing_type_count(&self, _telescope: i32) -> i32 {
        GENERAL_FAILURE
    }

    fn adc_samples(&self, _telescope: i32, _channel: i32, _out: &mut [u16]) -> i32 {
        GENERAL_FAILURE
    }

    fn adc_sums(&self, _telescope: i32, _channel: i32, _out: &mut [i32]) -> i32 {
        GENERAL_FAILURE
    }

    fn calibration(&self, _telescope: i32, _pedestal: &mut [f64], _coefficient: &mut [f64]) -> i32 {
        GENERAL_FAILURE
    }

    fn pixel_positions(&self, _telescope: i32, _x: &mut [f64], _y: &mut [f64]) -> i32 {
        GENERAL_FAILURE
    }

    fn mirror_area(&self, _telescope: i32, _out: &mut f64) -> i32 {
        GENERAL_FAILURE
    }

    fn pixel_timing(&self, _telescope: i32, _out: &mut [f32]) -> i32 {
        GENERAL_FAILURE
    }

    fn timing_threshold(&self, _telescope: i32, _out: &mut i32) -> i32 {
        GENERAL_FAILURE
    }

    fn timing_peak_global(&self, _telescope: i32, _out: &mut f32) -> i32 {
        GENERAL_FAILURE
    }

    fn mc_shower(&self, _out: &mut McShower) -> i32 {
        GENERAL_FAILURE
    }

    fn central_gps_time(&self, _out: &mut GpsTime) -> i32 {
        GENERAL_FAILURE
    }

    fn telescope_gps_time(&self, _telescope: i32, _out: &mut GpsTime) -> i32 {
        GENERAL_FAILURE
    }
}
