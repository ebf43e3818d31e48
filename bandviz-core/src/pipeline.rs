//! # Analysis Pipeline
//!
//! The owned context that runs every stage for one capture stream. It is
//! driven by exactly two calls from the capture side:
//!
//! 1. [`Pipeline::on_format_negotiated`] whenever the stream format is (re)negotiated
//! 2. [`Pipeline::on_samples_available`] for every block of interleaved samples
//!
//! Each completed frame is windowed, transformed, aggregated and peak-tracked
//! synchronously inside the second call; the caller receives the readings
//! through a closure. Nothing here blocks, spawns threads or allocates per frame.

use crate::bands::BandAggregator;
use crate::config::{AggregationMode, VisualizerConfig};
use crate::error::VisualizerError;
use crate::fft::{self, SpectralTransform, WindowTable};
use crate::frame::FrameAccumulator;
use crate::peak::PeakTracker;

/// Sample encoding reported by the capture side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleFormat {
    /// 32-bit float, the only encoding the pipeline accepts.
    F32,
    /// Anything else, carrying its name for diagnostics.
    Other(String),
}

/// The format as negotiated by the capture side, not yet checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub sample_format: SampleFormat,
}

/// An accepted stream format: float samples, a known rate and at least one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channel_count: u16,
}

impl AudioFormat {
    /// Hz per bin for frames of `frame_size` samples.
    pub fn frequency_resolution(&self, frame_size: usize) -> f32 {
        self.sample_rate as f32 / frame_size as f32
    }
}

/// Energy and held peak of one band for the latest frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BandReading {
    pub label: String,
    pub raw: f32,
    pub peak: f32,
}

/// Everything a caller gets to see about one completed frame.
#[derive(Debug)]
pub struct FrameAnalysis<'a> {
    /// Number of this frame since the pipeline was created, starting at 1.
    pub frame_number: u64,
    pub readings: &'a [BandReading],
    /// Normalized magnitudes in band mode, raw power in bucket mode.
    pub spectrum: &'a [f32],
}

/// Frame buffer, window, FFT plan, aggregator and peak state for one stream.
#[derive(Debug)]
pub struct Pipeline {
    frame_size: usize,
    accumulator: FrameAccumulator,
    window: WindowTable,
    transform: SpectralTransform,
    spectrum: Vec<f32>,
    aggregator: BandAggregator,
    energies: Vec<f32>,
    peaks: PeakTracker,
    readings: Vec<BandReading>,
    format: Option<AudioFormat>,
    frames_analyzed: u64,
}

impl Pipeline {
    /// Validates `config` and allocates every buffer the pipeline will use.
    pub fn new(config: &VisualizerConfig) -> Result<Self, VisualizerError> {
        config.validate()?;

        let frame_size = config.frame_size;
        let aggregator = match config.mode {
            AggregationMode::Bands => BandAggregator::named_bands(frame_size),
            AggregationMode::Buckets {
                count,
                db_floor,
                db_ceil,
            } => BandAggregator::buckets(frame_size, count, db_floor, db_ceil),
        };
        let band_count = aggregator.len();
        let readings = aggregator
            .labels()
            .iter()
            .map(|label| BandReading {
                label: label.clone(),
                raw: 0.0,
                peak: 0.0,
            })
            .collect();

        let transform = SpectralTransform::new(frame_size);
        log::debug!(
            "pipeline ready: {} samples per frame, {} bins, {} bands",
            frame_size,
            transform.bin_count(),
            band_count
        );

        Ok(Self {
            frame_size,
            accumulator: FrameAccumulator::new(frame_size),
            window: WindowTable::hann(frame_size),
            spectrum: vec![0.0; transform.bin_count()],
            transform,
            aggregator,
            energies: vec![0.0; band_count],
            peaks: PeakTracker::new(band_count, config.decay_rate),
            readings,
            format: None,
            frames_analyzed: 0,
        })
    }

    /// Whether blocks are currently analyzed.
    pub fn is_ready(&self) -> bool {
        self.format.is_some()
    }

    pub fn band_count(&self) -> usize {
        self.readings.len()
    }

    /// Readings of the last completed frame.
    pub fn readings(&self) -> &[BandReading] {
        &self.readings
    }

    pub fn aggregator(&self) -> &BandAggregator {
        &self.aggregator
    }

    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// Accepts a newly negotiated stream format.
    ///
    /// # Returns
    /// * `Ok(Some(format))` - Analysis runs from the next block on
    /// * `Ok(None)` - The rate is still 0; blocks are skipped until a later negotiation
    /// * `Err(UnsupportedFormat)` - Samples are not 32-bit float
    /// * `Err(InvalidFormat)` - The stream reports no channels
    pub fn on_format_negotiated(&mut self, format: StreamFormat) -> Result<Option<AudioFormat>, VisualizerError> {
        if let SampleFormat::Other(name) = format.sample_format {
            return Err(VisualizerError::UnsupportedFormat(name));
        }
        if format.channel_count == 0 {
            return Err(VisualizerError::InvalidFormat("stream reports 0 channels".to_string()));
        }
        if format.sample_rate == 0 {
            log::debug!("format negotiated without a sample rate, waiting for the next one");
            // Samples from the previous rate must not complete a frame at the next one.
            self.accumulator.reset();
            self.format = None;
            return Ok(None);
        }

        let accepted = AudioFormat {
            sample_rate: format.sample_rate,
            channel_count: format.channel_count,
        };
        if self.format.is_some_and(|current| current != accepted) {
            // A partial frame from the old stream would mix two rates.
            self.accumulator.reset();
        }

        self.aggregator.set_sample_rate(accepted.sample_rate);
        for (reading, label) in self.readings.iter_mut().zip(self.aggregator.labels()) {
            reading.label.clone_from(label);
        }
        self.format = Some(accepted);

        log::info!("got audio format:");
        log::info!("  format: F32");
        log::info!("  capturing rate: {}x{}", accepted.sample_rate, accepted.channel_count);
        log::info!(
            "  frequency resolution: {:.2} Hz per bin",
            accepted.frequency_resolution(self.frame_size)
        );
        Ok(Some(accepted))
    }

    /// Feeds one block of interleaved float samples. Only channel 0 is analyzed.
    ///
    /// `on_frame` is called once for every frame the block completes. A `None`
    /// block (the capture side had no buffer) and blocks arriving before a
    /// format is known are skipped.
    ///
    /// # Returns
    /// * The number of frames completed by this block
    pub fn on_samples_available<F>(&mut self, block: Option<&[f32]>, mut on_frame: F) -> usize
    where
        F: FnMut(&FrameAnalysis<'_>),
    {
        let Some(samples) = block else {
            log::trace!("capture buffer unavailable, skipping block");
            return 0;
        };
        let Some(format) = self.format else {
            log::trace!("no sample rate yet, skipping {} samples", samples.len());
            return 0;
        };

        let channels = format.channel_count as usize;
        log::trace!("captured {} samples", samples.len() / channels);

        let mut completed = 0;
        for &sample in samples.iter().step_by(channels) {
            if !self.accumulator.push(sample) {
                continue;
            }
            match self.analyze_frame() {
                Ok(()) => {
                    completed += 1;
                    on_frame(&FrameAnalysis {
                        frame_number: self.frames_analyzed,
                        readings: &self.readings,
                        spectrum: &self.spectrum,
                    });
                }
                Err(e) => log::warn!("skipping frame: {}", e),
            }
        }
        completed
    }

    /// Window → transform → magnitude/power → aggregate → peaks, for the frame
    /// the accumulator just completed.
    fn analyze_frame(&mut self) -> Result<(), VisualizerError> {
        self.window
            .apply(self.accumulator.frame(), self.transform.input_mut());
        let bins = self.transform.execute()?;

        if self.aggregator.uses_power() {
            fft::power_into(bins, &mut self.spectrum);
        } else {
            fft::magnitude_into(bins, &mut self.spectrum, self.frame_size);
        }
        self.aggregator.aggregate(&self.spectrum, &mut self.energies);

        for (index, (reading, &raw)) in self.readings.iter_mut().zip(&self.energies).enumerate() {
            reading.raw = raw;
            reading.peak = self.peaks.update(index, raw);
        }
        self.frames_analyzed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> VisualizerConfig {
        VisualizerConfig {
            frame_size: 8,
            ..VisualizerConfig::default()
        }
    }

    fn f32_format(sample_rate: u32, channel_count: u16) -> StreamFormat {
        StreamFormat {
            sample_rate,
            channel_count,
            sample_format: SampleFormat::F32,
        }
    }

    #[test]
    fn rejects_non_float_formats() {
        let mut pipeline = Pipeline::new(&small_config()).unwrap();
        let result = pipeline.on_format_negotiated(StreamFormat {
            sample_rate: 48000,
            channel_count: 2,
            sample_format: SampleFormat::Other("I16".to_string()),
        });
        assert!(matches!(result, Err(VisualizerError::UnsupportedFormat(name)) if name == "I16"));
        assert!(!pipeline.is_ready());
    }

    #[test]
    fn rejects_zero_channels() {
        let mut pipeline = Pipeline::new(&small_config()).unwrap();
        assert!(matches!(
            pipeline.on_format_negotiated(f32_format(48000, 0)),
            Err(VisualizerError::InvalidFormat(_))
        ));
    }

    #[test]
    fn zero_rate_keeps_pipeline_idle() {
        let mut pipeline = Pipeline::new(&small_config()).unwrap();
        assert_eq!(pipeline.on_format_negotiated(f32_format(0, 1)).unwrap(), None);
        let frames = pipeline.on_samples_available(Some(&[1.0; 64][..]), |_| panic!("no frame expected"));
        assert_eq!(frames, 0);
        assert_eq!(pipeline.frames_analyzed(), 0);
    }

    #[test]
    fn missing_block_is_skipped() {
        let mut pipeline = Pipeline::new(&small_config()).unwrap();
        pipeline.on_format_negotiated(f32_format(8, 1)).unwrap();
        assert_eq!(pipeline.on_samples_available(None, |_| panic!("no frame expected")), 0);
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = VisualizerConfig {
            frame_size: 7,
            ..VisualizerConfig::default()
        };
        assert!(matches!(Pipeline::new(&config), Err(VisualizerError::Config(_))));
    }

    #[test]
    fn format_change_discards_partial_frame() {
        let mut pipeline = Pipeline::new(&small_config()).unwrap();
        pipeline.on_format_negotiated(f32_format(8, 1)).unwrap();
        assert_eq!(pipeline.on_samples_available(Some(&[0.5; 5][..]), |_| {}), 0);

        pipeline.on_format_negotiated(f32_format(16, 1)).unwrap();
        // 5 stale samples are gone, so 5 more do not complete a frame.
        assert_eq!(pipeline.on_samples_available(Some(&[0.5; 5][..]), |_| {}), 0);
        assert_eq!(pipeline.on_samples_available(Some(&[0.5; 3][..]), |_| {}), 1);
    }

    #[test]
    fn rate_dropping_to_zero_discards_partial_frame() {
        let mut pipeline = Pipeline::new(&small_config()).unwrap();
        pipeline.on_format_negotiated(f32_format(8, 1)).unwrap();
        assert_eq!(pipeline.on_samples_available(Some(&[0.5; 5][..]), |_| {}), 0);

        assert_eq!(pipeline.on_format_negotiated(f32_format(0, 1)).unwrap(), None);
        pipeline.on_format_negotiated(f32_format(16, 1)).unwrap();

        assert_eq!(pipeline.on_samples_available(Some(&[0.5; 3][..]), |_| {}), 0);
        assert_eq!(pipeline.on_samples_available(Some(&[0.5; 5][..]), |_| {}), 1);
    }

    #[test]
    fn only_channel_zero_is_analyzed() {
        let mut pipeline = Pipeline::new(&small_config()).unwrap();
        pipeline.on_format_negotiated(f32_format(8, 2)).unwrap();
        // 16 interleaved stereo samples hold exactly 8 frames of channel 0.
        let block: Vec<f32> = (0..16).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
        let mut spectra = Vec::new();
        let frames = pipeline.on_samples_available(Some(block.as_slice()), |analysis| {
            spectra.push(analysis.spectrum.to_vec());
        });
        assert_eq!(frames, 1);
        // Channel 0 is silent; channel 1 would have put energy into bin 0.
        assert!(spectra[0].iter().all(|&m| m == 0.0));
    }
}
