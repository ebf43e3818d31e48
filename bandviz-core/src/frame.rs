//! # Frame Accumulation
//!
//! Collects mono samples into a fixed-length frame. The buffer is allocated
//! once and reused; a full frame is signalled exactly once, after which the
//! write index starts over.

/// Fixed-length time-domain buffer filled one sample at a time.
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    frame: Vec<f32>,
    write_index: usize,
}

impl FrameAccumulator {
    /// Creates an accumulator for frames of `frame_size` samples.
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame: vec![0.0; frame_size],
            write_index: 0,
        }
    }

    /// Appends one sample. Returns `true` when this sample completed the frame;
    /// the next push starts a new frame.
    #[must_use]
    pub fn push(&mut self, sample: f32) -> bool {
        self.frame[self.write_index] = sample;
        self.write_index += 1;
        if self.write_index == self.frame.len() {
            self.write_index = 0;
            return true;
        }
        false
    }

    /// The frame buffer. Only meaningful as a whole right after `push` returned `true`.
    pub fn frame(&self) -> &[f32] {
        &self.frame
    }

    /// Frame length in samples.
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Samples buffered towards the next frame.
    pub fn filled(&self) -> usize {
        self.write_index
    }

    /// Drops any partially accumulated frame.
    pub fn reset(&mut self) {
        self.write_index = 0;
    }
}
