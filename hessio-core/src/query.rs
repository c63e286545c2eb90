//! Per-telescope and per-channel queries on the current event.
//!
//! Every accessor checks that the session is positioned on an event, then talks to the
//! decoder. Array-shaped results resolve their dimensions with fresh count queries on
//! every call; nothing is cached between calls, so a result always reflects the event the
//! cursor is on.

use crate::decoder::Decoder;
use crate::error::{HessioError, Result};
use crate::marshal::{fetch_grid, fetch_grid_pair, fetch_pair, fetch_scalar, fetch_vec};
use crate::session::Session;
use crate::status::Query;
use crate::types::{
    Calibration, Channel, GpsTime, Grid, McShower, PixelPositions, TelescopeId,
    CALIBRATION_GAINS,
};

impl<D: Decoder> Session<D> {
    // ------------------------------------------------------------------
    // Run and event level
    // ------------------------------------------------------------------

    /// Run number of the current event.
    pub fn run_number(&self) -> Result<i32> {
        let query = Query::event("run number");
        let run = query.check(self.ready()?.run_number())?;
        if run == 0 {
            return Err(unset(&query));
        }
        Ok(run as i32)
    }

    /// Number of telescopes configured for the run.
    pub fn telescope_count(&self) -> Result<usize> {
        let query = Query::event("telescope count");
        let count = query.check(self.ready()?.telescope_count())?;
        if count == 0 {
            return Err(unset(&query));
        }
        Ok(count)
    }

    /// Central trigger counter of the current event.
    pub fn global_event_count(&self) -> Result<i64> {
        let count = Query::event("global event count")
            .check_wide(self.ready()?.global_event_count())?;
        Ok(count as i64)
    }

    /// Number of telescopes with data in the current event.
    pub fn telescopes_with_data_count(&self) -> Result<usize> {
        Query::event("telescopes with data").check(self.ready()?.telescopes_with_data_count())
    }

    /// Ids of the telescopes with data in the current event, in stream order.
    pub fn telescopes_with_data(&self) -> Result<Vec<TelescopeId>> {
        let decoder = self.ready()?;
        let count = self.telescopes_with_data_count()?;
        let ids = fetch_vec(Query::event("telescopes with data"), count, |out| {
            decoder.telescopes_with_data(out)
        })?;
        Ok(ids.into_iter().map(TelescopeId::new).collect())
    }

    /// Simulated shower parameters; unavailable for real-data streams.
    pub fn mc_shower(&self) -> Result<McShower> {
        let decoder = self.ready()?;
        fetch_scalar(Query::event("MC shower"), |out| decoder.mc_shower(out))
    }

    /// Central trigger GPS time.
    pub fn central_gps_time(&self) -> Result<GpsTime> {
        let decoder = self.ready()?;
        fetch_scalar(Query::event("central GPS time"), |out| {
            decoder.central_gps_time(out)
        })
    }

    // ------------------------------------------------------------------
    // Counts
    // ------------------------------------------------------------------

    /// Number of pixels in the camera of `telescope`.
    pub fn pixel_count(&self, telescope: TelescopeId) -> Result<usize> {
        let decoder = self.ready()?;
        Query::telescope("pixel count", telescope).check(decoder.pixel_count(telescope.get()))
    }

    /// Number of time slices per trace.
    pub fn sample_count(&self, telescope: TelescopeId) -> Result<usize> {
        let decoder = self.ready()?;
        Query::telescope("sample count", telescope).check(decoder.sample_count(telescope.get()))
    }

    /// Number of gain channels read out.
    pub fn channel_count(&self, telescope: TelescopeId) -> Result<usize> {
        let decoder = self.ready()?;
        Query::telescope("channel count", telescope)
            .check(decoder.channel_count(telescope.get()))
    }

    /// Number of timing-reconstruction quantities per pixel.
    pub fn timing_type_count(&self, telescope: TelescopeId) -> Result<usize> {
        let decoder = self.ready()?;
        Query::telescope("timing type count", telescope)
            .check(decoder.timing_type_count(telescope.get()))
    }

    // ------------------------------------------------------------------
    // Raw data
    // ------------------------------------------------------------------

    /// Sampled traces as a `pixels × samples` grid.
    pub fn adc_samples(&self, telescope: TelescopeId, channel: Channel) -> Result<Grid<u16>> {
        let decoder = self.ready()?;
        let pixels = self.pixel_count(telescope)?;
        let samples = self.sample_count(telescope)?;
        fetch_grid(
            Query::channel("ADC samples", telescope, channel),
            pixels,
            samples,
            |out| decoder.adc_samples(telescope.get(), channel.index() as i32, out),
        )
    }

    /// Integrated ADC sums, one per pixel.
    pub fn adc_sums(&self, telescope: TelescopeId, channel: Channel) -> Result<Vec<i32>> {
        let decoder = self.ready()?;
        let pixels = self.pixel_count(telescope)?;
        fetch_vec(Query::channel("ADC sums", telescope, channel), pixels, |out| {
            decoder.adc_sums(telescope.get(), channel.index() as i32, out)
        })
    }

    // ------------------------------------------------------------------
    // Calibration and camera
    // ------------------------------------------------------------------

    /// Pedestals and ADC to photo-electron coefficients, both `2 × pixels`.
    pub fn calibration(&self, telescope: TelescopeId) -> Result<Calibration> {
        let decoder = self.ready()?;
        let pixels = self.pixel_count(telescope)?;
        let (pedestal, coefficient) = fetch_grid_pair(
            Query::telescope("calibration", telescope),
            CALIBRATION_GAINS,
            pixels,
            |pedestal, coefficient| decoder.calibration(telescope.get(), pedestal, coefficient),
        )?;
        Ok(Calibration {
            pedestal,
            coefficient,
        })
    }

    /// Camera-plane pixel positions [m].
    pub fn pixel_positions(&self, telescope: TelescopeId) -> Result<PixelPositions> {
        let decoder = self.ready()?;
        let pixels = self.pixel_count(telescope)?;
        let (x, y) = fetch_pair(Query::telescope("pixel positions", telescope), pixels, |x, y| {
            decoder.pixel_positions(telescope.get(), x, y)
        })?;
        Ok(PixelPositions { x, y })
    }

    /// Total mirror area corrected for inclination [m²].
    pub fn mirror_area(&self, telescope: TelescopeId) -> Result<f64> {
        let decoder = self.ready()?;
        fetch_scalar(Query::telescope("mirror area", telescope), |out| {
            decoder.mirror_area(telescope.get(), out)
        })
    }

    /// Telescope GPS time.
    pub fn telescope_gps_time(&self, telescope: TelescopeId) -> Result<GpsTime> {
        let decoder = self.ready()?;
        fetch_scalar(Query::telescope("telescope GPS time", telescope), |out| {
            decoder.telescope_gps_time(telescope.get(), out)
        })
    }

    // ------------------------------------------------------------------
    // Pixel timing
    // ------------------------------------------------------------------

    /// Timing values as a `pixels × timing types` grid.
    pub fn pixel_timing(&self, telescope: TelescopeId) -> Result<Grid<f32>> {
        let decoder = self.ready()?;
        let pixels = self.pixel_count(telescope)?;
        let types = self.timing_type_count(telescope)?;
        fetch_grid(
            Query::telescope("pixel timing", telescope),
            pixels,
            types,
            |out| decoder.pixel_timing(telescope.get(), out),
        )
    }

    /// Minimum base-to-peak amplitude used in the timing pixel selection.
    pub fn timing_threshold(&self, telescope: TelescopeId) -> Result<i32> {
        let decoder = self.ready()?;
        fetch_scalar(Query::telescope("timing threshold", telescope), |out| {
            decoder.timing_threshold(telescope.get(), out)
        })
    }

    /// Camera-wide mean peak position [time slices].
    pub fn timing_peak_global(&self, telescope: TelescopeId) -> Result<f32> {
        let decoder = self.ready()?;
        fetch_scalar(Query::telescope("global peak position", telescope), |out| {
            decoder.timing_peak_global(telescope.get(), out)
        })
    }
}

fn unset(query: &Query) -> HessioError {
    HessioError::Unavailable {
        what: query.what,
        telescope: None,
    }
}
