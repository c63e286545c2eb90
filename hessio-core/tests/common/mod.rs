//! Replay fixtures shared by the integration tests.
//!
//! The main fixture reproduces run 31964, event 408 of a simulated CTA array: 126
//! configured telescopes, data from telescopes 38 and 47.

#![allow(dead_code)]

use hessio_core::records::{AdcData, EventRecord, RunHeader, TelescopeConfig, TelescopeEvent, TimingData};
use hessio_core::{GpsTime, McShower, ReplayWriter};
use tempfile::NamedTempFile;

pub const RUN_ID: i32 = 31964;
pub const EVENT_COUNT: i64 = 408;
pub const TELESCOPES: i32 = 126;

pub const TEL_FULL: i32 = 47;
pub const TEL_RAW_ONLY: i32 = 38;
pub const TEL_NO_DATA: i32 = 1;
pub const TEL_UNKNOWN: i32 = 99999;

pub const FULL_PIXELS: usize = 2048;
pub const FULL_SAMPLES: usize = 25;
pub const RAW_ONLY_PIXELS: usize = 1855;
pub const RAW_ONLY_SAMPLES: usize = 15;
pub const TIMING_TYPES: usize = 7;

/// Trace of pixel 10 of telescope 47, high gain.
pub const PIXEL_10_TRACE: [u16; 25] = [
    22, 20, 21, 24, 22, 19, 22, 27, 22, 21, 20, 22, 21, 20, 19, 22, 23, 20, 22, 20, 20, 23, 20,
    20, 22,
];

pub const PEDESTAL_0_0: f64 = 457.36550903320312;
pub const COEFFICIENT_0_2: f64 = 0.092817604541778564;
pub const PIXEL_2_X: f64 = -0.085799999535083771;
pub const PIXEL_2_Y: f64 = -0.14880000054836273;
pub const MIRROR_AREA: f64 = 14.562566757202148;
pub const TIMING_THRESHOLD: i32 = -6;
pub const PEAK_GLOBAL: f32 = 9.740449905395508;
pub const TIMING_8_0: f32 = 11.069999694824219;

pub const CENTRAL_GPS: GpsTime = GpsTime {
    seconds: 1_085_123_456,
    nanoseconds: 250_000_000,
};

/// Synthetic trace value for pixels other than pixel 10.
pub fn sample(pixel: usize, slice: usize) -> u16 {
    20 + ((pixel * 7 + slice * 3) % 5) as u16
}

fn traces(pixels: usize, samples: usize, gains: usize) -> Vec<u16> {
    let mut data = Vec::with_capacity(gains * pixels * samples);
    for _ in 0..gains {
        for pixel in 0..pixels {
            for slice in 0..samples {
                data.push(sample(pixel, slice));
            }
        }
    }
    data
}

pub fn scenario_run() -> RunHeader {
    let telescopes = (1..=TELESCOPES)
        .map(|id| {
            let pixels = match id {
                TEL_FULL => FULL_PIXELS,
                TEL_RAW_ONLY => RAW_ONLY_PIXELS,
                _ => 64,
            };
            let mut config = TelescopeConfig::new(id, pixels);
            config.mirror_area = 100.0 + id as f64;
            if id == TEL_FULL {
                config.mirror_area = MIRROR_AREA;
                config.pixel_x[2] = PIXEL_2_X;
                config.pixel_y[2] = PIXEL_2_Y;
                config.pedestal[0] = PEDESTAL_0_0;
                config.calibration[2] = COEFFICIENT_0_2;
            }
            config
        })
        .collect();
    RunHeader::new(RUN_ID, telescopes)
}

pub fn scenario_event() -> EventRecord {
    let mut full_traces = traces(FULL_PIXELS, FULL_SAMPLES, 1);
    full_traces[10 * FULL_SAMPLES..11 * FULL_SAMPLES].copy_from_slice(&PIXEL_10_TRACE);

    let mut timing_values = vec![0.0f32; FULL_PIXELS * TIMING_TYPES];
    timing_values[8 * TIMING_TYPES] = TIMING_8_0;

    let mut raw_only = TelescopeEvent::new(TEL_RAW_ONLY);
    raw_only.raw = AdcData::from_samples(
        1,
        RAW_ONLY_PIXELS as u32,
        RAW_ONLY_SAMPLES as u32,
        traces(RAW_ONLY_PIXELS, RAW_ONLY_SAMPLES, 1),
    );

    let mut full = TelescopeEvent::new(TEL_FULL);
    full.gps = Some(GpsTime::new(CENTRAL_GPS.seconds, CENTRAL_GPS.nanoseconds + 17));
    full.raw = AdcData::from_samples(1, FULL_PIXELS as u32, FULL_SAMPLES as u32, full_traces);
    full.timing = Some(TimingData {
        num_types: TIMING_TYPES as u32,
        threshold: TIMING_THRESHOLD,
        peak_global: PEAK_GLOBAL,
        values: timing_values,
    });

    EventRecord {
        global_count: EVENT_COUNT,
        central_gps: Some(CENTRAL_GPS),
        telescopes: vec![raw_only, full],
    }
}

/// Second event of the scenario: a small dual-gain readout of telescope 5 only.
pub fn dual_gain_event() -> EventRecord {
    let mut tel = TelescopeEvent::new(5);
    tel.raw = AdcData::from_samples(2, 64, 3, traces(64, 3, 2));
    EventRecord {
        global_count: EVENT_COUNT + 1,
        central_gps: None,
        telescopes: vec![tel],
    }
}

/// Writes run 31964 with events 408 and 409.
pub fn write_scenario() -> NamedTempFile {
    write_replay(|writer| {
        writer.write_run_header(&scenario_run()).unwrap();
        writer.write_event(&scenario_event()).unwrap();
        writer.write_event(&dual_gain_event()).unwrap();
    })
}

/// Writes a simulated run where the first event carries MC shower parameters.
pub fn write_simulation() -> NamedTempFile {
    write_replay(|writer| {
        writer
            .write_run_header(&RunHeader::new(7, vec![TelescopeConfig::new(1, 4)]))
            .unwrap();
        writer.write_mc_shower(&simulated_shower()).unwrap();
        writer.write_event(&small_event(0, 1, 4)).unwrap();
        writer.write_event(&small_event(1, 1, 4)).unwrap();
    })
}

pub fn simulated_shower() -> McShower {
    McShower {
        primary_id: 0,
        energy: 1.25,
        azimuth: 0.0,
        altitude: 1.2217,
        core_x: -142.5,
        core_y: 88.0,
    }
}

/// One telescope, one gain, three samples per pixel.
pub fn small_event(count: i64, telescope: i32, pixels: usize) -> EventRecord {
    let mut tel = TelescopeEvent::new(telescope);
    tel.raw = AdcData::from_samples(1, pixels as u32, 3, traces(pixels, 3, 1));
    EventRecord {
        global_count: count,
        central_gps: None,
        telescopes: vec![tel],
    }
}

pub fn write_replay(build: impl FnOnce(&mut ReplayWriter<std::fs::File>)) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let mut writer = ReplayWriter::create(file.path()).unwrap();
    build(&mut writer);
    writer.flush().unwrap();
    file
}
