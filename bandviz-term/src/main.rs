//! # bandviz - Terminal Spectrum Visualizer
//!
//! Captures audio from an input device and draws the energy of its frequency
//! bands as text bars, updated once per analysis frame.
//!
//! ## Architecture
//! - **Capture Thread**: the cpal callback runs the whole analysis pipeline and
//!   composes the text of every completed frame
//! - **Main Thread**: owns the terminal and writes frames as they arrive
//! - **Communication**: bounded crossbeam channels; a frame that finds the
//!   channel full is dropped instead of stalling the capture thread

mod capture;
mod sink;

use anyhow::{Context, Result};
use bandviz_core::config::{DEFAULT_DB_CEIL, DEFAULT_DB_FLOOR};
use bandviz_core::{AggregationMode, FrameAnalysis, Pipeline, VisualizerConfig, readout_for};
use clap::{Parser, ValueEnum};
use cpal::traits::StreamTrait;
use crossbeam_channel::TrySendError;
use sink::{SinkStyle, TerminalSink};
use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;

/// Frames that may wait for the terminal before new ones are dropped.
const FRAME_QUEUE_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Bass, mid and treble on one line
    Bands,
    /// Fixed-stride buckets on a dB scale, one per line
    Buckets,
}

/// Real-time audio spectrum visualizer for the terminal.
#[derive(Debug, Parser)]
#[command(name = "bandviz", version, about)]
struct Args {
    /// JSON config file; missing fields use their defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Aggregation mode, overriding the config file
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Number of buckets; implies `--mode buckets`
    #[arg(short, long)]
    buckets: Option<usize>,

    /// Input device name (default input device if omitted)
    #[arg(short, long)]
    device: Option<String>,

    /// Print every frame on new lines instead of redrawing in place
    #[arg(long)]
    scroll: bool,

    /// Print every bin instead of bars: normalized magnitude in band mode,
    /// power in bucket mode
    #[arg(long)]
    dump_bins: bool,

    /// Write the effective config to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_config: Option<PathBuf>,
}

/// Loads the config file (if any) and applies the command line overrides.
fn build_config(args: &Args) -> Result<VisualizerConfig> {
    let mut config = match &args.config {
        Some(path) => VisualizerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => VisualizerConfig::default(),
    };

    match (args.mode, args.buckets) {
        (Some(ModeArg::Bands), Some(_)) => {
            anyhow::bail!("--buckets cannot be combined with --mode bands");
        }
        (Some(ModeArg::Bands), None) => config.mode = AggregationMode::Bands,
        (Some(ModeArg::Buckets), None) => {
            if !matches!(config.mode, AggregationMode::Buckets { .. }) {
                config.mode = AggregationMode::default_buckets();
            }
        }
        (_, Some(count)) => {
            config.mode = match config.mode {
                AggregationMode::Buckets { db_floor, db_ceil, .. } => AggregationMode::Buckets {
                    count,
                    db_floor,
                    db_ceil,
                },
                AggregationMode::Bands => AggregationMode::Buckets {
                    count,
                    db_floor: DEFAULT_DB_FLOOR,
                    db_ceil: DEFAULT_DB_CEIL,
                },
            };
        }
        (None, None) => {}
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Writes `[i]: value` for every bin of the frame, using the spectrum the
/// active mode aggregates (normalized magnitude or power).
fn dump_bins(analysis: &FrameAnalysis<'_>, out: &mut String) {
    out.clear();
    for (i, value) in analysis.spectrum.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "[{}]: {:.6}", i, value);
    }
}

fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;

    if let Some(path) = &args.write_config {
        config
            .save(path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        log::info!("Config written to {}", path.display());
        return Ok(());
    }

    let pipeline = Pipeline::new(&config).context("Failed to set up the analysis pipeline")?;
    let readout = readout_for(&config);
    let dump = args.dump_bins;

    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<String>(FRAME_QUEUE_DEPTH);
    let (error_tx, error_rx) = crossbeam_channel::bounded::<String>(1);

    let mut text = String::new();
    let on_frame = move |analysis: &FrameAnalysis<'_>| {
        if dump {
            dump_bins(analysis, &mut text);
        } else {
            readout.compose(analysis.readings, &mut text);
        }
        match frame_tx.try_send(text.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::debug!("Display is behind, dropping frame {}", analysis.frame_number)
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    };

    let (stream, format) = capture::start_capture(args.device.as_deref(), pipeline, on_frame, error_tx)
        .context("Failed to start audio capture")?;
    log::info!(
        "Capturing {} Hz x {} channels, analyzing channel 0",
        format.sample_rate,
        format.channel_count
    );

    let style = if args.scroll || dump {
        SinkStyle::Scroll
    } else {
        SinkStyle::Redraw
    };
    let mut sink = TerminalSink::new(io::stdout().lock(), style);
    match crossterm::terminal::size() {
        Ok((_, rows)) => sink = sink.with_rows(rows),
        Err(e) => log::debug!("Terminal size unavailable: {}", e),
    }

    let outcome = loop {
        crossbeam_channel::select! {
            recv(frame_rx) -> msg => match msg {
                Ok(frame) => {
                    if let Err(e) = sink.write_frame(&frame) {
                        break Err(anyhow::Error::new(e).context("Failed to write to terminal"));
                    }
                }
                Err(_) => break Ok(()),
            },
            recv(error_rx) -> msg => {
                let reason = msg.unwrap_or_else(|_| "stream closed".to_string());
                break Err(anyhow::anyhow!("Audio stream failed: {}", reason));
            },
        }
    };

    if let Err(e) = stream.pause() {
        log::warn!("Error pausing stream: {}", e);
    }
    drop(stream);
    sink.finish()?;
    outcome
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
