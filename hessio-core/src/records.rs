//! In-memory records of a replay stream.
//!
//! These mirror what a decoder keeps in its event buffer: the run header with the camera
//! and calibration set-up of every configured telescope, and per event the telescopes that
//! delivered data.

use crate::types::{GpsTime, CALIBRATION_GAINS};

/// Run-scoped configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHeader {
    pub run_id: i32,
    pub telescopes: Vec<TelescopeConfig>,
}

impl RunHeader {
    pub fn new(run_id: i32, telescopes: Vec<TelescopeConfig>) -> Self {
        Self { run_id, telescopes }
    }

    /// Looks up a configured telescope.
    pub fn telescope(&self, id: i32) -> Option<&TelescopeConfig> {
        self.telescopes.iter().find(|t| t.id == id)
    }
}

/// Camera settings and calibration of one configured telescope.
#[derive(Debug, Clone, PartialEq)]
pub struct TelescopeConfig {
    pub id: i32,
    /// Pixel x positions [m]
    pub pixel_x: Vec<f64>,
    /// Pixel y positions [m]
    pub pixel_y: Vec<f64>,
    /// Mirror area corrected for inclination [m²]
    pub mirror_area: f64,
    /// Pedestals, `CALIBRATION_GAINS × pixels`, gain-major
    pub pedestal: Vec<f64>,
    /// ADC to p.e. coefficients, `CALIBRATION_GAINS × pixels`, gain-major
    pub calibration: Vec<f64>,
}

impl TelescopeConfig {
    /// Creates a camera with `pixels` pixels at the origin, zero pedestals and unit
    /// coefficients.
    pub fn new(id: i32, pixels: usize) -> Self {
        Self {
            id,
            pixel_x: vec![0.0; pixels],
            pixel_y: vec![0.0; pixels],
            mirror_area: 0.0,
            pedestal: vec![0.0; CALIBRATION_GAINS * pixels],
            calibration: vec![1.0; CALIBRATION_GAINS * pixels],
        }
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixel_x.len()
    }
}

/// One triggered array event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventRecord {
    pub global_count: i64,
    pub central_gps: Option<GpsTime>,
    /// Telescopes with data, in stream order
    pub telescopes: Vec<TelescopeEvent>,
}

impl EventRecord {
    pub fn new(global_count: i64) -> Self {
        Self {
            global_count,
            ..Self::default()
        }
    }

    /// Data of one telescope in this event.
    pub fn telescope(&self, id: i32) -> Option<&TelescopeEvent> {
        self.telescopes.iter().find(|t| t.id == id)
    }
}

/// Data of one telescope in one event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelescopeEvent {
    pub id: i32,
    pub gps: Option<GpsTime>,
    pub raw: Option<AdcData>,
    pub timing: Option<TimingData>,
}

impl TelescopeEvent {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Raw ADC readout of one telescope.
#[derive(Debug, Clone, PartialEq)]
pub struct AdcData {
    pub num_gains: u32,
    pub num_pixels: u32,
    pub num_samples: u32,
    /// `gains × pixels × samples`
    pub samples: Vec<u16>,
    /// `gains × pixels`
    pub sums: Vec<i32>,
}

impl AdcData {
    /// Builds a readout from sampled traces; sums are the trace integrals.
    ///
    /// Returns `None` if `samples` does not hold `gains × pixels × num_samples` values, or
    /// if a trace integral does not fit in an `i32`.
    pub fn from_samples(
        num_gains: u32,
        num_pixels: u32,
        num_samples: u32,
        samples: Vec<u16>,
    ) -> Option<Self> {
        let expected = (num_gains as usize)
            .checked_mul(num_pixels as usize)?
            .checked_mul(num_samples as usize)?;
        if samples.len() != expected {
            return None;
        }
        let sums = if num_samples == 0 {
            vec![0; num_gains as usize * num_pixels as usize]
        } else {
            samples
                .chunks_exact(num_samples as usize)
                .map(|trace| {
                    trace
                        .iter()
                        .try_fold(0i32, |acc, &s| acc.checked_add(i32::from(s)))
                })
                .collect::<Option<Vec<i32>>>()?
        };
        Some(Self {
            num_gains,
            num_pixels,
            num_samples,
            samples,
            sums,
        })
    }

    /// Samples of one gain channel, `pixels × samples`.
    pub fn gain_samples(&self, gain: usize) -> Option<&[u16]> {
        let len = self.num_pixels as usize * self.num_samples as usize;
        self.samples.get(gain * len..(gain + 1) * len)
    }

    /// Sums of one gain channel.
    pub fn gain_sums(&self, gain: usize) -> Option<&[i32]> {
        let len = self.num_pixels as usize;
        self.sums.get(gain * len..(gain + 1) * len)
    }
}

/// Pixel timing reconstruction of one telescope.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingData {
    pub num_types: u32,
    pub threshold: i32,
    pub peak_global: f32,
    /// `pixels × num_types`
    pub values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adc_sums_are_trace_integrals() {
        let adc = AdcData::from_samples(1, 2, 3, vec![1, 2, 3, 10, 20, 30]).unwrap();
        assert_eq!(adc.sums, vec![6, 60]);
        assert_eq!(adc.gain_samples(0), Some(&[1, 2, 3, 10, 20, 30][..]));
        assert_eq!(adc.gain_samples(1), None);
    }

    #[test]
    fn test_adc_rejects_wrong_length() {
        assert!(AdcData::from_samples(2, 2, 3, vec![0; 6]).is_none());
    }

    #[test]
    fn test_adc_rejects_trace_integral_past_i32() {
        assert!(AdcData::from_samples(1, 1, 40_000, vec![u16::MAX; 40_000]).is_none());

        // 32767 full-scale samples still fit.
        let adc = AdcData::from_samples(1, 1, 32_767, vec![u16::MAX; 32_767]).unwrap();
        assert_eq!(adc.sums, vec![32_767 * 65_535]);
    }

    #[test]
    fn test_run_header_lookup() {
        let run = RunHeader::new(31964, vec![TelescopeConfig::new(38, 4)]);
        assert_eq!(run.telescope(38).map(|t| t.pixel_count()), Some(4));
        assert!(run.telescope(47).is_none());
    }
}
