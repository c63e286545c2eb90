//! Byte layout of replay streams.
//!
//! A replay stream is a file header followed by tagged blocks. All integers and floats
//! are little-endian.
//!
//! ```text
//! header : magic "HESSRPL\0" (8) | version u32
//! block  : tag u32 | length u32 | payload (length bytes)
//! ```
//!
//! Block payloads:
//!
//! ```text
//! RUN_HEADER (2000) : run_id i32 | ntel u32 | ntel × telescope
//!   telescope       : id i32 | npix u32 | mirror_area f64
//!                     | x[npix] f64 | y[npix] f64
//!                     | pedestal[2·npix] f64 | calib[2·npix] f64
//! EVENT (2010)      : global_count i64 | flags u8 (bit 0: central GPS)
//!                     | [gps] | ntel u32 | ntel × teldata
//!   teldata         : id i32 | flags u8 (bit 0: raw, bit 1: timing, bit 2: GPS)
//!                     | [gps] | [raw] | [timing]
//!   gps             : seconds i64 | nanoseconds i32
//!   raw             : gains u32 | pixels u32 | samples u32
//!                     | samples[gains·pixels·samples] u16 | sums[gains·pixels] i32
//!   timing          : types u32 | threshold i32 | peak_global f32
//!                     | pixels u32 | values[pixels·types] f32
//! MC_SHOWER (2020)  : primary_id i32 | energy f64 | azimuth f64 | altitude f64
//!                     | core_x f64 | core_y f64
//! ```
//!
//! Blocks with any other tag are skipped by readers.

use crate::records::{AdcData, EventRecord, RunHeader, TelescopeConfig, TelescopeEvent, TimingData};
use crate::types::{GpsTime, McShower, CALIBRATION_GAINS};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

/// File magic.
pub const MAGIC: [u8; 8] = *b"HESSRPL\0";
/// Current format version.
pub const VERSION: u32 = 1;

pub const TAG_RUN_HEADER: u32 = 2000;
pub const TAG_EVENT: u32 = 2010;
pub const TAG_MC_SHOWER: u32 = 2020;

const EVENT_HAS_GPS: u8 = 0x1;
const TEL_HAS_RAW: u8 = 0x1;
const TEL_HAS_TIMING: u8 = 0x2;
const TEL_HAS_GPS: u8 = 0x4;

/// Errors reading or writing replay streams.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Not a replay stream (bad magic {0:?})")]
    InvalidMagic([u8; 8]),

    #[error("Unsupported replay version: {0}")]
    UnsupportedVersion(u32),

    #[error("Block of {length} bytes exceeds the limit of {max} bytes")]
    BlockTooLong { length: u32, max: u32 },

    #[error("Malformed block: {0}")]
    Malformed(String),
}

/// One tagged block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub tag: u32,
    pub payload: Vec<u8>,
}

// ============================================================================
// Framing
// ============================================================================

/// Writes the file header.
pub fn write_header<W: Write>(writer: &mut W) -> Result<(), FormatError> {
    writer.write_all(&MAGIC)?;
    writer.write_u32::<LittleEndian>(VERSION)?;
    Ok(())
}

/// Reads and checks the file header.
pub fn read_header<R: Read>(reader: &mut R) -> Result<(), FormatError> {
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(FormatError::InvalidMagic(magic));
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }
    Ok(())
}

/// Writes one block.
pub fn write_block<W: Write>(writer: &mut W, tag: u32, payload: &[u8]) -> Result<(), FormatError> {
    let length = u32::try_from(payload.len())
        .map_err(|_| FormatError::Malformed(format!("payload of {} bytes", payload.len())))?;
    writer.write_u32::<LittleEndian>(tag)?;
    writer.write_u32::<LittleEndian>(length)?;
    writer.write_all(payload)?;
    Ok(())
}

/// Reads the next block. Returns `Ok(None)` at a clean end of stream.
pub fn read_block<R: Read>(reader: &mut R, max_length: u32) -> Result<Option<Block>, FormatError> {
    let mut tag_bytes = [0u8; 4];
    match reader.read_exact(&mut tag_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let tag = u32::from_le_bytes(tag_bytes);
    let length = reader.read_u32::<LittleEndian>()?;
    if length > max_length {
        return Err(FormatError::BlockTooLong {
            length,
            max: max_length,
        });
    }
    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload)?;
    Ok(Some(Block { tag, payload }))
}

// ============================================================================
// Payload encoding
// ============================================================================

pub fn encode_run_header(run: &RunHeader) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::new();
    out.write_i32::<LittleEndian>(run.run_id)?;
    write_len(&mut out, run.telescopes.len())?;
    for tel in &run.telescopes {
        let npix = tel.pixel_count();
        check_len("pixel y", tel.pixel_y.len(), npix)?;
        check_len("pedestal", tel.pedestal.len(), CALIBRATION_GAINS * npix)?;
        check_len("calibration", tel.calibration.len(), CALIBRATION_GAINS * npix)?;

        out.write_i32::<LittleEndian>(tel.id)?;
        write_len(&mut out, npix)?;
        out.write_f64::<LittleEndian>(tel.mirror_area)?;
        for values in [&tel.pixel_x, &tel.pixel_y, &tel.pedestal, &tel.calibration] {
            for &v in values.iter() {
                out.write_f64::<LittleEndian>(v)?;
            }
        }
    }
    Ok(out)
}

pub fn encode_event(event: &EventRecord) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::new();
    out.write_i64::<LittleEndian>(event.global_count)?;
    out.write_u8(if event.central_gps.is_some() { EVENT_HAS_GPS } else { 0 })?;
    if let Some(gps) = &event.central_gps {
        write_gps(&mut out, gps)?;
    }
    write_len(&mut out, event.telescopes.len())?;
    for tel in &event.telescopes {
        let mut flags = 0;
        if tel.raw.is_some() {
            flags |= TEL_HAS_RAW;
        }
        if tel.timing.is_some() {
            flags |= TEL_HAS_TIMING;
        }
        if tel.gps.is_some() {
            flags |= TEL_HAS_GPS;
        }
        out.write_i32::<LittleEndian>(tel.id)?;
        out.write_u8(flags)?;
        if let Some(gps) = &tel.gps {
            write_gps(&mut out, gps)?;
        }
        if let Some(raw) = &tel.raw {
            let (traces, sample_count) =
                adc_shape(raw.num_gains, raw.num_pixels, raw.num_samples)?;
            check_len("ADC samples", raw.samples.len(), sample_count)?;
            check_len("ADC sums", raw.sums.len(), traces)?;
            out.write_u32::<LittleEndian>(raw.num_gains)?;
            out.write_u32::<LittleEndian>(raw.num_pixels)?;
            out.write_u32::<LittleEndian>(raw.num_samples)?;
            for &s in &raw.samples {
                out.write_u16::<LittleEndian>(s)?;
            }
            for &s in &raw.sums {
                out.write_i32::<LittleEndian>(s)?;
            }
        }
        if let Some(timing) = &tel.timing {
            let types = timing.num_types as usize;
            let pixels = if types == 0 { 0 } else { timing.values.len() / types };
            check_len("timing values", timing.values.len(), pixels * types)?;
            out.write_u32::<LittleEndian>(timing.num_types)?;
            out.write_i32::<LittleEndian>(timing.threshold)?;
            out.write_f32::<LittleEndian>(timing.peak_global)?;
            write_len(&mut out, pixels)?;
            for &v in &timing.values {
                out.write_f32::<LittleEndian>(v)?;
            }
        }
    }
    Ok(out)
}

pub fn encode_mc_shower(shower: &McShower) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::with_capacity(44);
    out.write_i32::<LittleEndian>(shower.primary_id)?;
    for v in [
        shower.energy,
        shower.azimuth,
        shower.altitude,
        shower.core_x,
        shower.core_y,
    ] {
        out.write_f64::<LittleEndian>(v)?;
    }
    Ok(out)
}

// ============================================================================
// Payload decoding
// ============================================================================

pub fn decode_run_header(payload: &[u8]) -> Result<RunHeader, FormatError> {
    let mut r = Cursor::new(payload);
    let run_id = r.read_i32::<LittleEndian>()?;
    let ntel = r.read_u32::<LittleEndian>()? as usize;
    let mut telescopes = Vec::new();
    for _ in 0..ntel {
        let id = r.read_i32::<LittleEndian>()?;
        let npix = r.read_u32::<LittleEndian>()? as usize;
        let mirror_area = r.read_f64::<LittleEndian>()?;
        let pixel_x = read_f64s(&mut r, npix)?;
        let pixel_y = read_f64s(&mut r, npix)?;
        let pedestal = read_f64s(&mut r, CALIBRATION_GAINS * npix)?;
        let calibration = read_f64s(&mut r, CALIBRATION_GAINS * npix)?;
        if telescopes.iter().any(|t: &TelescopeConfig| t.id == id) {
            return Err(FormatError::Malformed(format!("telescope {id} configured twice")));
        }
        telescopes.push(TelescopeConfig {
            id,
            pixel_x,
            pixel_y,
            mirror_area,
            pedestal,
            calibration,
        });
    }
    expect_consumed(&r)?;
    Ok(RunHeader { run_id, telescopes })
}

pub fn decode_event(payload: &[u8]) -> Result<EventRecord, FormatError> {
    let mut r = Cursor::new(payload);
    let global_count = r.read_i64::<LittleEndian>()?;
    if global_count < 0 {
        return Err(FormatError::Malformed(format!(
            "negative global event count {global_count}"
        )));
    }
    let flags = r.read_u8()?;
    let central_gps = if flags & EVENT_HAS_GPS != 0 {
        Some(read_gps(&mut r)?)
    } else {
        None
    };

    let ntel = r.read_u32::<LittleEndian>()? as usize;
    let mut telescopes: Vec<TelescopeEvent> = Vec::new();
    for _ in 0..ntel {
        let id = r.read_i32::<LittleEndian>()?;
        let flags = r.read_u8()?;
        let gps = if flags & TEL_HAS_GPS != 0 {
            Some(read_gps(&mut r)?)
        } else {
            None
        };
        let raw = if flags & TEL_HAS_RAW != 0 {
            Some(read_adc(&mut r)?)
        } else {
            None
        };
        let timing = if flags & TEL_HAS_TIMING != 0 {
            Some(read_timing(&mut r)?)
        } else {
            None
        };
        if telescopes.iter().any(|t| t.id == id) {
            return Err(FormatError::Malformed(format!(
                "telescope {id} listed twice in event {global_count}"
            )));
        }
        telescopes.push(TelescopeEvent {
            id,
            gps,
            raw,
            timing,
        });
    }
    expect_consumed(&r)?;
    Ok(EventRecord {
        global_count,
        central_gps,
        telescopes,
    })
}

pub fn decode_mc_shower(payload: &[u8]) -> Result<McShower, FormatError> {
    let mut r = Cursor::new(payload);
    let shower = McShower {
        primary_id: r.read_i32::<LittleEndian>()?,
        energy: r.read_f64::<LittleEndian>()?,
        azimuth: r.read_f64::<LittleEndian>()?,
        altitude: r.read_f64::<LittleEndian>()?,
        core_x: r.read_f64::<LittleEndian>()?,
        core_y: r.read_f64::<LittleEndian>()?,
    };
    expect_consumed(&r)?;
    Ok(shower)
}

// ============================================================================
// Helpers
// ============================================================================

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), FormatError> {
    let len = u32::try_from(len).map_err(|_| FormatError::Malformed(format!("length {len}")))?;
    out.write_u32::<LittleEndian>(len)?;
    Ok(())
}

fn check_len(what: &str, actual: usize, expected: usize) -> Result<(), FormatError> {
    if actual != expected {
        return Err(FormatError::Malformed(format!(
            "{what}: expected {expected} values, got {actual}"
        )));
    }
    Ok(())
}

fn write_gps(out: &mut Vec<u8>, gps: &GpsTime) -> Result<(), FormatError> {
    out.write_i64::<LittleEndian>(gps.seconds)?;
    out.write_i32::<LittleEndian>(gps.nanoseconds)?;
    Ok(())
}

fn read_gps(r: &mut Cursor<&[u8]>) -> Result<GpsTime, FormatError> {
    Ok(GpsTime {
        seconds: r.read_i64::<LittleEndian>()?,
        nanoseconds: r.read_i32::<LittleEndian>()?,
    })
}

/// Trace and sample counts of an ADC block, `(gains × pixels, gains × pixels × samples)`.
fn adc_shape(
    num_gains: u32,
    num_pixels: u32,
    num_samples: u32,
) -> Result<(usize, usize), FormatError> {
    if num_gains as usize > CALIBRATION_GAINS {
        return Err(FormatError::Malformed(format!("{num_gains} gain channels")));
    }
    let traces = (num_gains as usize) * (num_pixels as usize);
    let sample_count = traces
        .checked_mul(num_samples as usize)
        .ok_or_else(|| FormatError::Malformed("sample count overflow".to_string()))?;
    Ok((traces, sample_count))
}

fn read_adc(r: &mut Cursor<&[u8]>) -> Result<AdcData, FormatError> {
    let num_gains = r.read_u32::<LittleEndian>()?;
    let num_pixels = r.read_u32::<LittleEndian>()?;
    let num_samples = r.read_u32::<LittleEndian>()?;
    let (traces, sample_count) = adc_shape(num_gains, num_pixels, num_samples)?;

    reserve_check(r, sample_count, 2)?;
    let mut samples = Vec::with_capacity(sample_count);
    for _ in 0..sample_count {
        samples.push(r.read_u16::<LittleEndian>()?);
    }
    reserve_check(r, traces, 4)?;
    let mut sums = Vec::with_capacity(traces);
    for _ in 0..traces {
        sums.push(r.read_i32::<LittleEndian>()?);
    }
    Ok(AdcData {
        num_gains,
        num_pixels,
        num_samples,
        samples,
        sums,
    })
}

fn read_timing(r: &mut Cursor<&[u8]>) -> Result<TimingData, FormatError> {
    let num_types = r.read_u32::<LittleEndian>()?;
    let threshold = r.read_i32::<LittleEndian>()?;
    let peak_global = r.read_f32::<LittleEndian>()?;
    let pixels = r.read_u32::<LittleEndian>()? as usize;
    let count = pixels
        .checked_mul(num_types as usize)
        .ok_or_else(|| FormatError::Malformed("timing value count overflow".to_string()))?;
    reserve_check(r, count, 4)?;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(r.read_f32::<LittleEndian>()?);
    }
    Ok(TimingData {
        num_types,
        threshold,
        peak_global,
        values,
    })
}

fn read_f64s(r: &mut Cursor<&[u8]>, count: usize) -> Result<Vec<f64>, FormatError> {
    reserve_check(r, count, 8)?;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(r.read_f64::<LittleEndian>()?);
    }
    Ok(values)
}

/// Refuses element counts that cannot fit in the rest of the payload, before allocating.
fn reserve_check(r: &Cursor<&[u8]>, count: usize, width: usize) -> Result<(), FormatError> {
    let remaining = r.get_ref().len().saturating_sub(r.position() as usize);
    match count.checked_mul(width) {
        Some(bytes) if bytes <= remaining => Ok(()),
        _ => Err(FormatError::Malformed(format!(
            "{count} elements do not fit in {remaining} remaining bytes"
        ))),
    }
}

fn expect_consumed(r: &Cursor<&[u8]>) -> Result<(), FormatError> {
    let trailing = r.get_ref().len() as u64 - r.position();
    if trailing != 0 {
        return Err(FormatError::Malformed(format!("{trailing} trailing bytes")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_checks_magic_and_version() {
        let mut bytes = Vec::new();
        write_header(&mut bytes).unwrap();
        assert!(read_header(&mut bytes.as_slice()).is_ok());

        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert!(matches!(
            read_header(&mut bad.as_slice()),
            Err(FormatError::InvalidMagic(_))
        ));

        let mut future = bytes.clone();
        future[8] = 9;
        assert!(matches!(
            read_header(&mut future.as_slice()),
            Err(FormatError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_read_block_clean_eof() {
        let empty: &[u8] = &[];
        assert!(read_block(&mut &empty[..], 1024).unwrap().is_none());
    }

    #[test]
    fn test_read_block_respects_limit() {
        let mut bytes = Vec::new();
        write_block(&mut bytes, TAG_EVENT, &[0u8; 64]).unwrap();
        assert!(matches!(
            read_block(&mut bytes.as_slice(), 32),
            Err(FormatError::BlockTooLong { length: 64, max: 32 })
        ));
        let block = read_block(&mut bytes.as_slice(), 64).unwrap().unwrap();
        assert_eq!(block.tag, TAG_EVENT);
        assert_eq!(block.payload.len(), 64);
    }

    #[test]
    fn test_truncated_block_is_an_error() {
        let mut bytes = Vec::new();
        write_block(&mut bytes, TAG_EVENT, &[0u8; 16]).unwrap();
        bytes.truncate(12);
        assert!(matches!(
            read_block(&mut bytes.as_slice(), 1024),
            Err(FormatError::Io(_))
        ));
    }

    #[test]
    fn test_event_payload_keeps_optional_parts() {
        let mut tel = TelescopeEvent::new(47);
        tel.gps = Some(GpsTime::new(1_400_000_000, 250));
        tel.raw = AdcData::from_samples(1, 2, 2, vec![3, 4, 5, 6]);
        let event = EventRecord {
            global_count: 408,
            central_gps: None,
            telescopes: vec![tel, TelescopeEvent::new(38)],
        };
        let decoded = decode_event(&encode_event(&event).unwrap()).unwrap();
        assert_eq!(decoded, event);
        assert!(decoded.telescope(38).unwrap().raw.is_none());
    }

    #[test]
    fn test_encode_rejects_inconsistent_adc_block() {
        let event_with = |raw: AdcData| {
            let mut tel = TelescopeEvent::new(47);
            tel.raw = Some(raw);
            EventRecord {
                global_count: 5,
                central_gps: None,
                telescopes: vec![tel],
            }
        };
        let short_samples = AdcData {
            num_gains: 1,
            num_pixels: 2,
            num_samples: 3,
            samples: vec![1; 4],
            sums: vec![3, 1],
        };
        let short_sums = AdcData {
            num_gains: 1,
            num_pixels: 2,
            num_samples: 3,
            samples: vec![1; 6],
            sums: vec![3],
        };
        let three_gains = AdcData {
            num_gains: 3,
            num_pixels: 1,
            num_samples: 1,
            samples: vec![1; 3],
            sums: vec![1; 3],
        };
        for raw in [short_samples, short_sums, three_gains] {
            assert!(matches!(
                encode_event(&event_with(raw)),
                Err(FormatError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_huge_counts_are_rejected_before_allocation() {
        let mut payload = Vec::new();
        payload.write_i32::<LittleEndian>(1).unwrap();
        payload.write_u32::<LittleEndian>(1).unwrap();
        payload.write_i32::<LittleEndian>(5).unwrap();
        payload.write_u32::<LittleEndian>(u32::MAX).unwrap();
        payload.write_f64::<LittleEndian>(1.0).unwrap();
        assert!(matches!(
            decode_run_header(&payload),
            Err(FormatError::Malformed(_))
        ));
    }

    #[test]
    fn test_duplicate_telescope_in_event_is_malformed() {
        let event = EventRecord {
            global_count: 1,
            central_gps: None,
            telescopes: vec![TelescopeEvent::new(4), TelescopeEvent::new(4)],
        };
        assert!(matches!(
            decode_event(&encode_event(&event).unwrap()),
            Err(FormatError::Malformed(_))
        ));
    }
}
