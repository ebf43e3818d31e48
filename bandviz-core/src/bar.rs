//! # Bar Rendering
//!
//! Turns a `(value, peak)` pair into a fixed-width text bar such as
//! `######.....|........`, and composes the bars of one frame into the text
//! that gets written to the terminal.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::error::{ConfigError, RenderError};
use crate::pipeline::BandReading;

/// Glyphs used for the three kinds of bar cells. Must be ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarGlyphs {
    pub filled: char,
    pub empty: char,
    pub peak: char,
}

impl Default for BarGlyphs {
    fn default() -> Self {
        Self {
            filled: '#',
            empty: '.',
            peak: '|',
        }
    }
}

impl BarGlyphs {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for glyph in [self.filled, self.empty, self.peak] {
            if !glyph.is_ascii() || glyph.is_ascii_control() {
                return Err(ConfigError::invalid(
                    "glyphs",
                    format!("{:?} is not a printable ASCII character", glyph),
                ));
            }
        }
        Ok(())
    }
}

/// Number of filled cells for `value` in `[0, 1]` on a bar of `width` cells.
/// Values outside the unit range are clamped first.
pub fn bar_fill(value: f32, width: usize) -> usize {
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    (value * width as f32).round() as usize
}

/// Renders bars of a fixed width and display gain.
#[derive(Debug, Clone)]
pub struct BarRenderer {
    width: usize,
    scale: f32,
    filled: u8,
    empty: u8,
    peak: u8,
}

impl BarRenderer {
    /// # Arguments
    /// * `width` - Cells per bar
    /// * `scale` - Energy that fills the bar completely
    /// * `glyphs` - Cell glyphs, already validated as ASCII
    pub fn new(width: usize, scale: f32, glyphs: BarGlyphs) -> Self {
        Self {
            width,
            scale,
            filled: glyphs.filled as u8,
            empty: glyphs.empty as u8,
            peak: glyphs.peak as u8,
        }
    }

    /// Writes one bar into the first `width` cells of `out`.
    ///
    /// The left `round(raw / scale * width)` cells are filled, the rest empty,
    /// and the cell at `round(peak / scale * width) - 1` is replaced by the
    /// peak marker when it falls inside the bar.
    ///
    /// # Returns
    /// * `Ok(())` - The bar was written
    /// * `Err(RenderError::BufferTooSmall)` - `out` is shorter than `width`; nothing was written
    pub fn render_into(&self, raw_energy: f32, peak_energy: f32, out: &mut [u8]) -> Result<(), RenderError> {
        if out.len() < self.width {
            return Err(RenderError::BufferTooSmall {
                needed: self.width,
                got: out.len(),
            });
        }

        for (cell, glyph) in out.iter_mut().zip(self.cells(raw_energy, peak_energy)) {
            *cell = glyph;
        }
        Ok(())
    }

    /// Appends one bar to `line`.
    pub fn push_bar(&self, raw_energy: f32, peak_energy: f32, line: &mut String) {
        line.extend(self.cells(raw_energy, peak_energy).map(char::from));
    }

    /// The `width` glyphs of one bar, left to right.
    fn cells(&self, raw_energy: f32, peak_energy: f32) -> impl Iterator<Item = u8> + '_ {
        let filled = bar_fill(raw_energy / self.scale, self.width);
        // round(peak) - 1 is always below width, so only a zero fill hides the marker
        let peak_pos = bar_fill(peak_energy / self.scale, self.width).checked_sub(1);
        (0..self.width).map(move |i| {
            if Some(i) == peak_pos {
                self.peak
            } else if i < filled {
                self.filled
            } else {
                self.empty
            }
        })
    }

    /// Renders one bar into a new string.
    pub fn render(&self, raw_energy: f32, peak_energy: f32) -> String {
        let mut line = String::with_capacity(self.width);
        self.push_bar(raw_energy, peak_energy, &mut line);
        line
    }
}

/// How a frame of readings is laid out as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadoutLayout {
    /// All bands on one line with their raw and peak values.
    SingleLine,
    /// One bucket per line.
    PerLine,
}

/// Composes the text for a whole frame of readings.
#[derive(Debug, Clone)]
pub struct Readout {
    renderer: BarRenderer,
    layout: ReadoutLayout,
}

impl Readout {
    pub fn new(renderer: BarRenderer, layout: ReadoutLayout) -> Self {
        Self { renderer, layout }
    }

    /// Lines produced per frame for `band_count` bands.
    pub fn line_count(&self, band_count: usize) -> usize {
        match self.layout {
            ReadoutLayout::SingleLine => 1,
            ReadoutLayout::PerLine => band_count,
        }
    }

    /// Clears `out` and writes the frame into it, lines separated by `\n`.
    pub fn compose(&self, readings: &[BandReading], out: &mut String) {
        out.clear();
        for (i, reading) in readings.iter().enumerate() {
            match self.layout {
                ReadoutLayout::SingleLine => {
                    if i > 0 {
                        out.push_str("  ");
                    }
                    let _ = write!(out, "{:<6} [", reading.label);
                    self.renderer.push_bar(reading.raw, reading.peak, out);
                    let _ = write!(out, "] r:{:.3} p:{:.3}", reading.raw, reading.peak);
                }
                ReadoutLayout::PerLine => {
                    if i > 0 {
                        out.push('\n');
                    }
                    let _ = write!(out, "{} [", reading.label);
                    self.renderer.push_bar(reading.raw, reading.peak, out);
                    out.push(']');
                }
            }
        }
    }
}
