//! # Fast Fourier Transform (FFT) Module
//!
//! This module provides the spectral stages of the pipeline: the Hann window
//! table, the planned real-input FFT, and the conversion of complex bins into
//! magnitude or power values.
//!
//! ## Features
//! - Hann windowing for reduced spectral leakage
//! - Real-to-complex FFT using RealFFT (RustFFT underneath), planned once
//! - Preallocated input, output and scratch buffers, so a transform never allocates
//! - Normalized magnitude and raw power extraction

use std::f32::consts::TAU;
use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::error::VisualizerError;

/// Precomputed Hann window coefficients.
///
/// The Hann window tapers a frame to zero at both edges, which keeps energy
/// from one frequency smearing into its neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTable {
    coefficients: Vec<f32>,
}

impl WindowTable {
    /// Builds a Hann table of `size` coefficients: `0.5 - 0.5 * cos(2πi / (size - 1))`.
    ///
    /// # Panics
    /// * If `size` is less than 2, for which the window is undefined
    pub fn hann(size: usize) -> Self {
        assert!(size >= 2, "Hann window needs at least 2 points, got {}", size);

        let scale = TAU / (size - 1) as f32;
        let coefficients = (0..size)
            .map(|i| 0.5 - 0.5 * (scale * i as f32).cos())
            .collect();
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Writes `frame[i] * w[i]` into `out`, leaving `frame` untouched.
    ///
    /// # Arguments
    /// * `frame` - Raw time-domain samples, same length as the table
    /// * `out` - Destination buffer, usually the transform's bound input
    pub fn apply(&self, frame: &[f32], out: &mut [f32]) {
        debug_assert_eq!(frame.len(), self.coefficients.len());
        debug_assert_eq!(out.len(), self.coefficients.len());
        for ((dst, &sample), &w) in out.iter_mut().zip(frame).zip(&self.coefficients) {
            *dst = sample * w;
        }
    }
}

/// A real-input FFT planned once for a fixed frame size.
///
/// The input, output and scratch buffers are bound at construction. Callers
/// fill [`SpectralTransform::input_mut`], call [`SpectralTransform::execute`]
/// and read [`SpectralTransform::bins`].
pub struct SpectralTransform {
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralTransform {
    /// Plans a forward transform for frames of `frame_size` samples.
    pub fn new(frame_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(frame_size);

        let input = plan.make_input_vec();
        let output = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        Self {
            plan,
            input,
            output,
            scratch,
        }
    }

    /// Number of output bins, `frame_size / 2 + 1`.
    pub fn bin_count(&self) -> usize {
        self.output.len()
    }

    /// The bound time-domain input. Its contents are consumed by `execute`.
    pub fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    /// Runs the planned transform on the bound input.
    ///
    /// # Returns
    /// * `Ok(bins)` - The spectrum, bin 0 is DC and the last bin is Nyquist
    /// * `Err(e)` - The FFT rejected its buffers
    pub fn execute(&mut self) -> Result<&[Complex<f32>], VisualizerError> {
        self.plan
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)?;
        Ok(&self.output)
    }

    /// The spectrum produced by the last `execute`.
    pub fn bins(&self) -> &[Complex<f32>] {
        &self.output
    }
}

impl std::fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralTransform")
            .field("frame_size", &self.plan.len())
            .finish_non_exhaustive()
    }
}

/// Converts complex bins into normalized magnitudes, `|X[k]| / frame_size`.
///
/// # Arguments
/// * `bins` - Complex spectrum from the transform
/// * `out` - Destination, same length as `bins`
/// * `frame_size` - The transform length used for normalization
pub fn magnitude_into(bins: &[Complex<f32>], out: &mut [f32], frame_size: usize) {
    debug_assert_eq!(bins.len(), out.len());
    let scale = 1.0 / frame_size as f32;
    for (dst, bin) in out.iter_mut().zip(bins) {
        *dst = bin.norm() * scale; // .norm() is sqrt(re^2 + im^2)
    }
}

/// Converts complex bins into unnormalized power, `re² + im²`.
pub fn power_into(bins: &[Complex<f32>], out: &mut [f32]) {
    debug_assert_eq!(bins.len(), out.len());
    for (dst, bin) in out.iter_mut().zip(bins) {
        *dst = bin.norm_sqr();
    }
}
