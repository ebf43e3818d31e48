//! # Configuration Module
//!
//! Holds every tunable of the pipeline: frame size, peak decay, bar geometry
//! and the aggregation mode. A config can be loaded from and saved to JSON so
//! a setup can be reused between runs; fields missing from a file fall back
//! to their defaults.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::bar::BarGlyphs;
use crate::error::ConfigError;

/// Default number of samples per analysis frame (~46ms at 44.1kHz).
pub const DEFAULT_FRAME_SIZE: usize = 2048;
/// Default per-frame peak decay factor.
pub const DEFAULT_DECAY_RATE: f32 = 0.90;
/// Default number of cells per bar.
pub const DEFAULT_BAR_WIDTH: usize = 20;
/// Default display gain for band-mode magnitudes.
pub const DEFAULT_MAGNITUDE_SCALE: f32 = 0.02;
/// Default bucket count for bucket mode.
pub const DEFAULT_BUCKET_COUNT: usize = 64;
/// Default dB value mapped to an empty bar in bucket mode.
pub const DEFAULT_DB_FLOOR: f32 = -80.0;
/// Default dB value mapped to a full bar in bucket mode.
pub const DEFAULT_DB_CEIL: f32 = -20.0;

fn default_bucket_count() -> usize {
    DEFAULT_BUCKET_COUNT
}

fn default_db_floor() -> f32 {
    DEFAULT_DB_FLOOR
}

fn default_db_ceil() -> f32 {
    DEFAULT_DB_CEIL
}

/// How frequency bins are grouped into the displayed bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationMode {
    /// Three perceptual bands (bass, mid, treble) over normalized magnitudes.
    Bands,
    /// `count` equal-stride buckets over the power spectrum, shown in dB.
    Buckets {
        #[serde(default = "default_bucket_count")]
        count: usize,
        #[serde(default = "default_db_floor")]
        db_floor: f32,
        #[serde(default = "default_db_ceil")]
        db_ceil: f32,
    },
}

impl AggregationMode {
    /// Bucket mode with the default count and dB range.
    pub fn default_buckets() -> Self {
        AggregationMode::Buckets {
            count: DEFAULT_BUCKET_COUNT,
            db_floor: DEFAULT_DB_FLOOR,
            db_ceil: DEFAULT_DB_CEIL,
        }
    }
}

/// Complete configuration for a [`crate::pipeline::Pipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Samples per analysis frame. Must be even and at least 2.
    pub frame_size: usize,
    /// Factor applied to each peak once per frame, in (0, 1).
    pub decay_rate: f32,
    /// Cells per rendered bar.
    pub bar_width: usize,
    /// Magnitude that fills a band-mode bar completely.
    pub magnitude_scale: f32,
    pub mode: AggregationMode,
    pub glyphs: BarGlyphs,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            decay_rate: DEFAULT_DECAY_RATE,
            bar_width: DEFAULT_BAR_WIDTH,
            magnitude_scale: DEFAULT_MAGNITUDE_SCALE,
            mode: AggregationMode::Bands,
            glyphs: BarGlyphs::default(),
        }
    }
}

impl VisualizerConfig {
    /// Loads a config from a JSON file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: VisualizerConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: VisualizerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Number of bins produced by a real-input transform of `frame_size` samples.
    pub fn bin_count(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Number of bars displayed per frame.
    pub fn band_count(&self) -> usize {
        match self.mode {
            AggregationMode::Bands => crate::bands::NAMED_BANDS.len(),
            AggregationMode::Buckets { count, .. } => count,
        }
    }

    /// Display gain handed to the bar renderer. Bucket values are already
    /// normalized to [0, 1].
    pub fn display_scale(&self) -> f32 {
        match self.mode {
            AggregationMode::Bands => self.magnitude_scale,
            AggregationMode::Buckets { .. } => 1.0,
        }
    }

    /// Checks every field against what the pipeline can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size < 2 || self.frame_size % 2 != 0 {
            return Err(ConfigError::invalid(
                "frame_size",
                format!("must be even and at least 2, got {}", self.frame_size),
            ));
        }
        if !(self.decay_rate > 0.0 && self.decay_rate < 1.0) {
            return Err(ConfigError::invalid(
                "decay_rate",
                format!("must lie strictly between 0 and 1, got {}", self.decay_rate),
            ));
        }
        if self.bar_width == 0 {
            return Err(ConfigError::invalid("bar_width", "must be greater than 0"));
        }
        if !(self.magnitude_scale.is_finite() && self.magnitude_scale > 0.0) {
            return Err(ConfigError::invalid(
                "magnitude_scale",
                format!("must be a positive number, got {}", self.magnitude_scale),
            ));
        }
        if let AggregationMode::Buckets {
            count,
            db_floor,
            db_ceil,
        } = self.mode
        {
            if count == 0 || count > self.bin_count() {
                return Err(ConfigError::invalid(
                    "mode.count",
                    format!("must be between 1 and {}, got {}", self.bin_count(), count),
                ));
            }
            if !(db_floor.is_finite() && db_ceil.is_finite() && db_floor < db_ceil) {
                return Err(ConfigError::invalid(
                    "mode.db_floor",
                    format!("floor {} must be below ceiling {}", db_floor, db_ceil),
                ));
            }
        }
        self.glyphs.validate()
    }
}
