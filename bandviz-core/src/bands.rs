//! # Band Aggregation Module
//!
//! Reduces a spectrum of `frame_size / 2 + 1` bins to one energy value per
//! displayed bar. Two strategies share the same output contract:
//!
//! - **Named bands**: bass, mid and treble over fixed frequency ranges,
//!   averaging normalized magnitudes.
//! - **Fixed buckets**: `count` equal-stride groups of power bins, averaged
//!   and mapped to [0, 1] on a decibel scale.

use std::ops::Range;

/// Added to the mean power before taking the log.
const POWER_FLOOR: f32 = 1e-12;

/// A perceptual band over `[freq_min, freq_max)` Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamedBand {
    pub label: &'static str,
    pub freq_min: f32,
    pub freq_max: f32,
}

/// The three bands shown in band mode.
pub const NAMED_BANDS: [NamedBand; 3] = [
    NamedBand {
        label: "Bass",
        freq_min: 20.0,
        freq_max: 250.0,
    },
    NamedBand {
        label: "Mid",
        freq_min: 250.0,
        freq_max: 2000.0,
    },
    NamedBand {
        label: "Treble",
        freq_min: 2000.0,
        freq_max: 8000.0,
    },
];

/// Maps a frequency range to the bins `[bin_min, bin_max)` it covers.
///
/// Bin indices are truncated towards zero and the upper bin is clamped to
/// `frame_size / 2`. The returned range is empty when the band lies above the
/// clamp or is narrower than one bin.
pub fn band_bin_range(freq_min: f32, freq_max: f32, freq_resolution: f32, frame_size: usize) -> Range<usize> {
    let bin_min = (freq_min / freq_resolution) as usize;
    let bin_max = ((freq_max / freq_resolution) as usize).min(frame_size / 2);
    bin_min..bin_max
}

/// Mean magnitude over `bins`, clamped to at most 1.0. An empty range yields 0.
pub fn band_energy(magnitudes: &[f32], bins: Range<usize>) -> f32 {
    if bins.start >= bins.end {
        return 0.0;
    }
    let count = bins.len();
    let sum: f32 = magnitudes[bins].iter().sum();
    (sum / count as f32).min(1.0)
}

/// Splits `bin_count` bins into `bucket_count` contiguous ranges of equal
/// stride, the last one absorbing the remainder.
pub fn bucket_bin_ranges(bin_count: usize, bucket_count: usize) -> Vec<Range<usize>> {
    let stride = bin_count / bucket_count;
    (0..bucket_count)
        .map(|i| {
            let start = i * stride;
            let end = if i == bucket_count - 1 {
                bin_count
            } else {
                start + stride
            };
            start..end
        })
        .collect()
}

/// Mean power over `bins`, skipping the DC bin. `None` when no bin contributes.
pub fn bucket_mean_power(powers: &[f32], bins: Range<usize>) -> Option<f32> {
    let (sum, count) = bins
        .filter(|&bin| bin != 0)
        .fold((0.0f32, 0usize), |(sum, count), bin| (sum + powers[bin], count + 1));
    if count == 0 {
        return None;
    }
    Some(sum / count as f32)
}

/// `10 * log10(1e-12 + power)`.
pub fn power_to_db(power: f32) -> f32 {
    10.0 * (POWER_FLOOR + power).log10()
}

/// Linearly maps `db` from `[db_floor, db_ceil]` onto `[0, 1]`, clamping outside values.
pub fn rescale_db(db: f32, db_floor: f32, db_ceil: f32) -> f32 {
    ((db - db_floor) / (db_ceil - db_floor)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Strategy {
    Bands,
    Buckets { db_floor: f32, db_ceil: f32 },
}

/// Holds the bin range of every displayed band and computes their energies.
#[derive(Debug, Clone)]
pub struct BandAggregator {
    strategy: Strategy,
    frame_size: usize,
    ranges: Vec<Range<usize>>,
    labels: Vec<String>,
}

impl BandAggregator {
    /// Aggregator for the three named bands. Every band is empty until
    /// [`BandAggregator::set_sample_rate`] provides the frequency resolution.
    pub fn named_bands(frame_size: usize) -> Self {
        Self {
            strategy: Strategy::Bands,
            frame_size,
            ranges: vec![0..0; NAMED_BANDS.len()],
            labels: NAMED_BANDS.iter().map(|band| band.label.to_string()).collect(),
        }
    }

    /// Aggregator for `bucket_count` dB-scaled buckets.
    ///
    /// # Panics
    /// * If `bucket_count` is 0
    pub fn buckets(frame_size: usize, bucket_count: usize, db_floor: f32, db_ceil: f32) -> Self {
        assert!(bucket_count > 0, "bucket count must be greater than 0");

        let ranges = bucket_bin_ranges(frame_size / 2 + 1, bucket_count);
        let labels = (0..bucket_count).map(|i| format!("{:>7}", i)).collect();
        Self {
            strategy: Strategy::Buckets { db_floor, db_ceil },
            frame_size,
            ranges,
            labels,
        }
    }

    /// Recomputes the frequency-dependent state for a newly negotiated rate:
    /// band-mode bin ranges and bucket labels.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        let freq_resolution = sample_rate as f32 / self.frame_size as f32;
        match self.strategy {
            Strategy::Bands => {
                for (range, band) in self.ranges.iter_mut().zip(NAMED_BANDS.iter()) {
                    *range = band_bin_range(band.freq_min, band.freq_max, freq_resolution, self.frame_size);
                    log::debug!("{} band covers bins {:?}", band.label, range);
                }
            }
            Strategy::Buckets { .. } => {
                for (label, range) in self.labels.iter_mut().zip(&self.ranges) {
                    let lower_edge = range.start as f32 * freq_resolution;
                    *label = format!("{:>5.0}Hz", lower_edge);
                }
            }
        }
    }

    /// Number of bands produced per frame.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether `aggregate` expects power (bucket mode) rather than magnitude.
    pub fn uses_power(&self) -> bool {
        matches!(self.strategy, Strategy::Buckets { .. })
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Computes one energy per band from `spectrum` into `energies`.
    ///
    /// # Arguments
    /// * `spectrum` - Normalized magnitudes in band mode, raw power in bucket mode
    /// * `energies` - Destination with one slot per band
    pub fn aggregate(&self, spectrum: &[f32], energies: &mut [f32]) {
        debug_assert_eq!(energies.len(), self.ranges.len());
        match self.strategy {
            Strategy::Bands => {
                for (energy, range) in energies.iter_mut().zip(&self.ranges) {
                    *energy = band_energy(spectrum, range.clone());
                }
            }
            Strategy::Buckets { db_floor, db_ceil } => {
                for (energy, range) in energies.iter_mut().zip(&self.ranges) {
                    // An empty bucket reads as empty whatever the floor.
                    *energy = match bucket_mean_power(spectrum, range.clone()) {
                        Some(mean_power) => rescale_db(power_to_db(mean_power), db_floor, db_ceil),
                        None => 0.0,
                    };
                }
            }
        }
    }
}
