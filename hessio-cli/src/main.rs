//! Single-pixel inspector for IACT replay streams.
//!
//! Walks the events of a replay stream and, for every event in which the chosen telescope
//! has data, integrates one pixel trace and converts it to photo-electrons.

use anyhow::{Context, Result};
use clap::Parser;
use hessio_core::{Channel, Decoder, EventCursor, EventPosition, Session, TelescopeId};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Default ADC to photo-electron scale applied on top of the per-pixel coefficient.
const DEFAULT_CALIB_SCALE: f64 = 0.92;

/// Log filter used when `RUST_LOG` is unset. Library diagnostics stay off unless
/// `RUST_LOG` names their target.
fn default_log_filter() -> String {
    format!("warn,{}=off", hessio_core::DIAGNOSTICS_TARGET)
}

/// Pixel signal inspector for IACT replay streams.
///
/// Prints, for each event where the telescope has data, the integrated trace of one pixel
/// and its calibrated intensity in photo-electrons.
#[derive(Parser, Debug)]
#[command(name = "hessio")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input replay stream
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Telescope id
    #[arg(short, long)]
    tel: i32,

    /// Pixel index
    #[arg(short, long)]
    pix: usize,

    /// Gain channel (0 = high gain, 1 = low gain)
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(i32).range(0..=1))]
    channel: i32,

    /// Stop after this many events
    #[arg(short, long, value_name = "N")]
    limit: Option<u64>,

    /// Extra scale applied to the calibration coefficient
    #[arg(long, default_value_t = DEFAULT_CALIB_SCALE)]
    calib_scale: f64,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Signal of the inspected pixel in one event.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PixelSignal {
    intensity: i64,
    npe: f64,
}

impl PixelSignal {
    fn new(trace: &[u16], pedestal: f64, coefficient: f64, scale: f64) -> Self {
        let intensity: i64 = trace.iter().map(|&s| s as i64).sum();
        let npe = (intensity as f64 - pedestal) * coefficient * scale;
        Self { intensity, npe }
    }
}

#[derive(Debug, Default)]
struct Summary {
    events: u64,
    with_data: u64,
    npe_total: f64,
    position: Option<(f64, f64)>,
}

fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_filter()));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let channel = Channel::from_index(args.channel).context("Invalid channel")?;
    let tel = TelescopeId::new(args.tel);

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb.set_message(format!(
            "Reading {:?}...",
            args.input.file_name().unwrap_or_default()
        ));
        pb
    };

    let start_time = Instant::now();

    let mut session = hessio_core::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;

    let mut cursor = EventCursor::from_limit(args.limit);
    let mut summary = Summary::default();

    while let Some(position) = cursor
        .try_advance(&mut session)
        .context("Failed to read next event")?
    {
        summary.events += 1;
        progress.set_message(format!(
            "Run {} event {}",
            position.run_id, position.global_event_count
        ));

        let has_data = session
            .telescopes_with_data()
            .context("Failed to list telescopes with data")?
            .contains(&tel);
        if !has_data {
            debug!(telescope = %tel, event = position.global_event_count, "no data");
            continue;
        }

        match inspect(&session, tel, args.pix, channel, args.calib_scale) {
            Ok((signal, pixel_position)) => {
                summary.with_data += 1;
                summary.npe_total += signal.npe;
                summary.position.get_or_insert(pixel_position);
                progress.suspend(|| print_signal(&position, signal));
            }
            Err(e) => {
                warn!(event = position.global_event_count, "{e}");
                progress.suspend(|| {
                    println!(
                        "run {} event {}: {e}",
                        position.run_id, position.global_event_count
                    )
                });
            }
        }
    }

    let total_duration = start_time.elapsed();
    progress.finish_with_message(format!(
        "Done! Read {} events in {:.2}s",
        summary.events,
        total_duration.as_secs_f64()
    ));

    if !args.quiet {
        eprintln!();
        eprintln!("Summary:");
        eprintln!("  Input:        {:?}", args.input);
        eprintln!("  Telescope:    {}", tel);
        eprintln!("  Pixel:        {} ({})", args.pix, channel);
        eprintln!("  Events:       {}", summary.events);
        eprintln!("  With data:    {}", summary.with_data);
        if summary.with_data > 0 {
            eprintln!(
                "  Mean p.e.:    {:.2}",
                summary.npe_total / summary.with_data as f64
            );
        }
        match summary.position {
            Some((x, y)) => eprintln!("  Position:     ({:.4}, {:.4}) m", x, y),
            None => eprintln!("  Position:     unknown (telescope had no data)"),
        }
        eprintln!("  Duration:     {:.3}s", total_duration.as_secs_f64());
    }

    Ok(())
}

/// Reads the pixel trace, calibration and position of the current event.
fn inspect<D: Decoder>(
    session: &Session<D>,
    tel: TelescopeId,
    pixel: usize,
    channel: Channel,
    scale: f64,
) -> Result<(PixelSignal, (f64, f64))> {
    let traces = session.adc_samples(tel, channel)?;
    let no_such_pixel = || {
        anyhow::anyhow!(
            "pixel {pixel} out of range: telescope {tel} has {} pixels",
            traces.rows()
        )
    };
    let trace = traces.row(pixel).ok_or_else(no_such_pixel)?;
    let (pedestal, coefficient) = session
        .calibration(tel)?
        .get(channel, pixel)
        .ok_or_else(no_such_pixel)?;
    let position = session
        .pixel_positions(tel)?
        .get(pixel)
        .ok_or_else(no_such_pixel)?;
    Ok((
        PixelSignal::new(trace, pedestal, coefficient, scale),
        position,
    ))
}

fn print_signal(position: &EventPosition, signal: PixelSignal) {
    println!(
        "run {} event {}: intensity {} ADC, {:.2} p.e.",
        position.run_id, position.global_event_count, signal.intensity, signal.npe
    );
}
