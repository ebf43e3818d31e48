// bandviz-core/src/lib.rs

//! The core logic for the bandviz spectrum visualizer.
//! This crate is responsible for frame accumulation, spectral analysis,
//! band aggregation, peak tracking and bar rendering. It is completely
//! headless: it talks to no audio API and writes to no terminal. The
//! capture side drives it through [`Pipeline::on_format_negotiated`] and
//! [`Pipeline::on_samples_available`].

pub mod bands;
pub mod bar;
pub mod config;
pub mod error;
pub mod fft;
pub mod frame;
pub mod peak;
pub mod pipeline;

pub use bar::{BarGlyphs, BarRenderer, Readout, ReadoutLayout};
pub use config::{AggregationMode, VisualizerConfig};
pub use error::{ConfigError, RenderError, VisualizerError};
pub use pipeline::{AudioFormat, BandReading, FrameAnalysis, Pipeline, SampleFormat, StreamFormat};

/// Builds the readout matching `config`: one line for the named bands,
/// one line per bucket in bucket mode.
pub fn readout_for(config: &VisualizerConfig) -> Readout {
    let renderer = BarRenderer::new(config.bar_width, config.display_scale(), config.glyphs);
    let layout = match config.mode {
        AggregationMode::Bands => ReadoutLayout::SingleLine,
        AggregationMode::Buckets { .. } => ReadoutLayout::PerLine,
    };
    Readout::new(renderer, layout)
}
