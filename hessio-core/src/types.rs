//! Core value types returned by telescope queries.
//!
//! Everything here is a plain owned value: results are copied out of the decoder's event
//! buffer, so they stay valid after the cursor moves on.

use std::fmt;

/// Number of gain rows in calibration grids (high and low gain), independent of how many
/// channels a telescope actually read out.
pub const CALIBRATION_GAINS: usize = 2;

/// Identifier of one telescope in the array configuration of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TelescopeId(i32);

impl TelescopeId {
    /// Creates a telescope id.
    #[inline]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw id as used by the decoder.
    #[inline]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for TelescopeId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for TelescopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gain channel of a pixel readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    /// High-gain readout path (index 0)
    HighGain = 0,
    /// Low-gain readout path (index 1)
    LowGain = 1,
}

impl Channel {
    /// Both channels in index order.
    pub const ALL: [Channel; 2] = [Channel::HighGain, Channel::LowGain];

    /// Attempts to build a channel from its numeric index.
    #[inline]
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::HighGain),
            1 => Some(Self::LowGain),
            _ => None,
        }
    }

    /// Returns the numeric index (0 or 1).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighGain => f.write_str("high-gain"),
            Self::LowGain => f.write_str("low-gain"),
        }
    }
}

/// Position of the cursor: the pair yielded by every successful advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPosition {
    /// Run the event belongs to
    pub run_id: i32,
    /// Central trigger counter assigned by the recording system
    pub global_event_count: i64,
}

impl EventPosition {
    #[inline]
    pub fn new(run_id: i32, global_event_count: i64) -> Self {
        Self {
            run_id,
            global_event_count,
        }
    }
}

/// Dense row-major two-dimensional container with a fixed shape.
///
/// The shape is fixed at construction and always matches the data length; all element
/// access is bounds-checked and returns `None` instead of panicking.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> Grid<T> {
    /// Wraps `data` as a `rows × cols` grid. Returns `None` if the length does not match.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        if rows.checked_mul(cols)? != data.len() {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the element at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col)
    }

    /// Returns one row as a slice.
    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.data.get(start..start + self.cols)
    }

    /// Iterates over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact panics on a zero chunk size
        let cols = self.cols.max(1);
        self.data
            .chunks_exact(cols)
            .take(if self.cols == 0 { 0 } else { self.rows })
    }

    /// Flat row-major view of all elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consumes the grid and returns the flat row-major data.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

/// Pedestal and conversion coefficient grids for one telescope.
///
/// Both grids are `CALIBRATION_GAINS × pixels`, gain-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Average pedestal on ADC sums
    pub pedestal: Grid<f64>,
    /// ADC to photo-electron conversion coefficient
    pub coefficient: Grid<f64>,
}

impl Calibration {
    /// Returns `(pedestal, coefficient)` for one pixel and channel.
    pub fn get(&self, channel: Channel, pixel: usize) -> Option<(f64, f64)> {
        let pedestal = self.pedestal.get(channel.index(), pixel)?;
        let coefficient = self.coefficient.get(channel.index(), pixel)?;
        Some((*pedestal, *coefficient))
    }
}

/// Camera-plane pixel positions for one telescope.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelPositions {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl PixelPositions {
    /// Returns the `(x, y)` position of one pixel.
    pub fn get(&self, pixel: usize) -> Option<(f64, f64)> {
        Some((*self.x.get(pixel)?, *self.y.get(pixel)?))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Simulated shower parameters for the current event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct McShower {
    /// Primary particle id (0 = gamma, 1 = electron, ...)
    pub primary_id: i32,
    /// Primary energy [TeV]
    pub energy: f64,
    /// Azimuth of the shower direction [rad]
    pub azimuth: f64,
    /// Altitude of the shower direction [rad]
    pub altitude: f64,
    /// Core position x [m]
    pub core_x: f64,
    /// Core position y [m]
    pub core_y: f64,
}

/// GPS time stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsTime {
    pub seconds: i64,
    pub nanoseconds: i32,
}

impl GpsTime {
    #[inline]
    pub fn new(seconds: i64, nanoseconds: i32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }
}
