//! Python bindings for the hessio session layer with numpy array results.
//!
//! This module exposes a `Session` class that walks a replay stream event by event and
//! answers per-telescope queries with numpy arrays of the documented shapes. Decoder
//! failures are raised as subclasses of `HessioError`.

use hessio_core::{
    Channel, EventCursor, HessioError as CoreError, ReplayDecoder, Session, TelescopeId,
};
use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;
use pyo3::types::PyDict;

create_exception!(hessio, HessioError, PyException, "Base class of all hessio errors.");
create_exception!(hessio, HessioOpenError, HessioError, "The stream could not be opened.");
create_exception!(
    hessio,
    HessioNotReadyError,
    HessioError,
    "No current event: open a stream and move to an event first."
);
create_exception!(
    hessio,
    HessioTelescopeIndexError,
    HessioError,
    "The telescope id is not configured for this run."
);
create_exception!(
    hessio,
    HessioChannelIndexError,
    HessioError,
    "The gain channel is not read out by this telescope."
);
create_exception!(
    hessio,
    HessioGeneralError,
    HessioError,
    "The quantity is not available for this telescope or event."
);
create_exception!(
    hessio,
    HessioContractError,
    HessioError,
    "The decoder returned data of an unexpected size."
);

fn to_py_err(err: CoreError) -> PyErr {
    let message = err.to_string();
    match err {
        CoreError::OpenFailure { .. } => HessioOpenError::new_err(message),
        CoreError::NotReady => HessioNotReadyError::new_err(message),
        CoreError::TelescopeIndexNotValid { .. } => HessioTelescopeIndexError::new_err(message),
        CoreError::ChannelIndexNotValid { .. } => HessioChannelIndexError::new_err(message),
        CoreError::Unavailable { .. } => HessioGeneralError::new_err(message),
        CoreError::ContractViolation { .. } => HessioContractError::new_err(message),
    }
}

fn channel(index: i32) -> PyResult<Channel> {
    Channel::from_index(index).ok_or_else(|| {
        HessioChannelIndexError::new_err(format!("{index} is not a gain channel (0 or 1)"))
    })
}

fn array2<'py, T: numpy::Element>(
    py: Python<'py>,
    shape: (usize, usize),
    data: Vec<T>,
) -> PyResult<&'py PyArray2<T>> {
    let array = Array2::from_shape_vec(shape, data)
        .map_err(|e| HessioContractError::new_err(e.to_string()))?;
    Ok(array.into_pyarray(py))
}

/// An open replay stream positioned on (at most) one event.
///
/// Example:
///     >>> import hessio
///     >>> session = hessio.Session("run31964.replay")
///     >>> for run_id, event_id in session.events(limit=10):
///     ...     for tel in session.teldata_list():
///     ...         traces = session.adc_sample(tel, 0)  # pixels x samples
#[pyclass(name = "Session")]
pub struct PySession {
    inner: Session<ReplayDecoder>,
}

#[pymethods]
impl PySession {
    /// Opens the replay stream at `path`.
    #[new]
    fn new(path: &str) -> PyResult<Self> {
        let inner = hessio_core::open(path).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn __repr__(&self) -> String {
        match self.inner.position() {
            Some(position) => format!(
                "Session(run={}, event={})",
                position.run_id, position.global_event_count
            ),
            None => format!("Session(state={:?})", self.inner.state()),
        }
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __exit__(
        &mut self,
        _exc_type: Option<&PyAny>,
        _exc_value: Option<&PyAny>,
        _traceback: Option<&PyAny>,
    ) {
        // Closing an already closed session is not an error on exit
        let _ = self.inner.close();
    }

    /// Moves to the next event.
    ///
    /// Returns:
    ///     tuple | None: (run_id, global_event_count), or None at end of stream
    fn move_to_next_event(&mut self) -> PyResult<Option<(i32, i64)>> {
        let position = self.inner.advance().map_err(to_py_err)?;
        Ok(position.map(|p| (p.run_id, p.global_event_count)))
    }

    /// Iterates over events, optionally stopping after `limit` of them.
    ///
    /// Yields (run_id, global_event_count) tuples; the session is positioned on each
    /// yielded event while the loop body runs.
    #[pyo3(signature = (limit=None))]
    fn events(slf: PyRef<'_, Self>, limit: Option<u64>) -> EventIterator {
        EventIterator {
            session: slf.into(),
            cursor: EventCursor::from_limit(limit),
        }
    }

    /// Closes the stream.
    fn close(&mut self) -> PyResult<()> {
        self.inner.close().map_err(to_py_err)
    }

    fn run_number(&self) -> PyResult<i32> {
        self.inner.run_number().map_err(to_py_err)
    }

    /// Number of telescopes configured for the run.
    fn telescope_count(&self) -> PyResult<usize> {
        self.inner.telescope_count().map_err(to_py_err)
    }

    fn global_event_count(&self) -> PyResult<i64> {
        self.inner.global_event_count().map_err(to_py_err)
    }

    /// Number of telescopes with data in the current event.
    fn num_teldata(&self) -> PyResult<usize> {
        self.inner.telescopes_with_data_count().map_err(to_py_err)
    }

    /// Ids of the telescopes with data in the current event.
    fn teldata_list<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray1<i32>> {
        let ids = self.inner.telescopes_with_data().map_err(to_py_err)?;
        let ids: Vec<i32> = ids.into_iter().map(TelescopeId::get).collect();
        Ok(ids.into_pyarray(py))
    }

    fn num_pixels(&self, telescope: i32) -> PyResult<usize> {
        self.inner
            .pixel_count(TelescopeId::new(telescope))
            .map_err(to_py_err)
    }

    fn num_samples(&self, telescope: i32) -> PyResult<usize> {
        self.inner
            .sample_count(TelescopeId::new(telescope))
            .map_err(to_py_err)
    }

    fn num_channels(&self, telescope: i32) -> PyResult<usize> {
        self.inner
            .channel_count(TelescopeId::new(telescope))
            .map_err(to_py_err)
    }

    fn num_types(&self, telescope: i32) -> PyResult<usize> {
        self.inner
            .timing_type_count(TelescopeId::new(telescope))
            .map_err(to_py_err)
    }

    /// Sampled traces, shape (pixels, samples), dtype uint16.
    fn adc_sample<'py>(
        &self,
        py: Python<'py>,
        telescope: i32,
        channel_index: i32,
    ) -> PyResult<&'py PyArray2<u16>> {
        let grid = self
            .inner
            .adc_samples(TelescopeId::new(telescope), channel(channel_index)?)
            .map_err(to_py_err)?;
        let shape = grid.shape();
        array2(py, shape, grid.into_vec())
    }

    /// Integrated ADC sums, shape (pixels,), dtype int32.
    fn adc_sum<'py>(
        &self,
        py: Python<'py>,
        telescope: i32,
        channel_index: i32,
    ) -> PyResult<&'py PyArray1<i32>> {
        let sums = self
            .inner
            .adc_sums(TelescopeId::new(telescope), channel(channel_index)?)
            .map_err(to_py_err)?;
        Ok(sums.into_pyarray(py))
    }

    /// Pedestal and conversion coefficients, each of shape (2, pixels).
    fn calibration<'py>(
        &self,
        py: Python<'py>,
        telescope: i32,
    ) -> PyResult<(&'py PyArray2<f64>, &'py PyArray2<f64>)> {
        let calibration = self
            .inner
            .calibration(TelescopeId::new(telescope))
            .map_err(to_py_err)?;
        let shape = calibration.pedestal.shape();
        Ok((
            array2(py, shape, calibration.pedestal.into_vec())?,
            array2(py, shape, calibration.coefficient.into_vec())?,
        ))
    }

    /// Pixel positions in the camera plane [m], as (x, y).
    fn pixel_position<'py>(
        &self,
        py: Python<'py>,
        telescope: i32,
    ) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
        let positions = self
            .inner
            .pixel_positions(TelescopeId::new(telescope))
            .map_err(to_py_err)?;
        Ok((positions.x.into_pyarray(py), positions.y.into_pyarray(py)))
    }

    /// Mirror area corrected for inclination [m²].
    fn mirror_area(&self, telescope: i32) -> PyResult<f64> {
        self.inner
            .mirror_area(TelescopeId::new(telescope))
            .map_err(to_py_err)
    }

    /// Timing values, shape (pixels, types), dtype float32.
    fn pixel_timing<'py>(&self, py: Python<'py>, telescope: i32) -> PyResult<&'py PyArray2<f32>> {
        let grid = self
            .inner
            .pixel_timing(TelescopeId::new(telescope))
            .map_err(to_py_err)?;
        let shape = grid.shape();
        array2(py, shape, grid.into_vec())
    }

    fn timing_threshold(&self, telescope: i32) -> PyResult<i32> {
        self.inner
            .timing_threshold(TelescopeId::new(telescope))
            .map_err(to_py_err)
    }

    /// Camera-wide mean peak position [time slices].
    fn peak_global(&self, telescope: i32) -> PyResult<f32> {
        self.inner
            .timing_peak_global(TelescopeId::new(telescope))
            .map_err(to_py_err)
    }

    /// Simulated shower parameters as a dict.
    fn mc_shower(&self, py: Python<'_>) -> PyResult<PyObject> {
        let shower = self.inner.mc_shower().map_err(to_py_err)?;
        let dict = PyDict::new(py);
        dict.set_item("primary_id", shower.primary_id)?;
        dict.set_item("energy", shower.energy)?;
        dict.set_item("azimuth", shower.azimuth)?;
        dict.set_item("altitude", shower.altitude)?;
        dict.set_item("core_x", shower.core_x)?;
        dict.set_item("core_y", shower.core_y)?;
        Ok(dict.into())
    }

    /// Central trigger time as (seconds, nanoseconds).
    fn central_gps_time(&self) -> PyResult<(i64, i32)> {
        let time = self.inner.central_gps_time().map_err(to_py_err)?;
        Ok((time.seconds, time.nanoseconds))
    }

    /// Telescope trigger time as (seconds, nanoseconds).
    fn telescope_gps_time(&self, telescope: i32) -> PyResult<(i64, i32)> {
        let time = self
            .inner
            .telescope_gps_time(TelescopeId::new(telescope))
            .map_err(to_py_err)?;
        Ok((time.seconds, time.nanoseconds))
    }
}

/// Iterator returned by `Session.events()`.
#[pyclass]
pub struct EventIterator {
    session: Py<PySession>,
    cursor: EventCursor,
}

#[pymethods]
impl EventIterator {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(mut slf: PyRefMut<'_, Self>, py: Python<'_>) -> PyResult<Option<(i32, i64)>> {
        let this = &mut *slf;
        let mut session = this.session.borrow_mut(py);
        let position = this
            .cursor
            .try_advance(&mut session.inner)
            .map_err(to_py_err)?;
        Ok(position.map(|p| (p.run_id, p.global_event_count)))
    }
}

/// Opens a replay stream. Same as `Session(path)`.
#[pyfunction]
fn open(path: &str) -> PyResult<PySession> {
    PySession::new(path)
}

/// hessio session module for Python.
#[pymodule]
fn hessio(py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(open, m)?)?;
    m.add_class::<PySession>()?;
    m.add_class::<EventIterator>()?;
    m.add("HessioError", py.get_type::<HessioError>())?;
    m.add("HessioOpenError", py.get_type::<HessioOpenError>())?;
    m.add("HessioNotReadyError", py.get_type::<HessioNotReadyError>())?;
    m.add("HessioTelescopeIndexError", py.get_type::<HessioTelescopeIndexError>())?;
    m.add("HessioChannelIndexError", py.get_type::<HessioChannelIndexError>())?;
    m.add("HessioGeneralError", py.get_type::<HessioGeneralError>())?;
    m.add("HessioContractError", py.get_type::<HessioContractError>())?;
    Ok(())
}
