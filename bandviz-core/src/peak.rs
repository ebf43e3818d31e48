//! # Peak Tracking
//!
//! Per-band peak hold with geometric release: a rising value is taken
//! immediately, a falling one lets the held peak shrink by `decay_rate` each
//! frame until the live value catches it.

/// One peak step: `raw` if it exceeds `peak`, otherwise `max(raw, peak * decay_rate)`.
pub fn decay_peak(peak: f32, raw: f32, decay_rate: f32) -> f32 {
    if raw > peak {
        return raw;
    }
    raw.max(peak * decay_rate)
}

/// Holds one decaying peak per band.
#[derive(Debug, Clone)]
pub struct PeakTracker {
    peaks: Vec<f32>,
    decay_rate: f32,
}

impl PeakTracker {
    /// Creates a tracker for `band_count` bands, all peaks at 0.
    pub fn new(band_count: usize, decay_rate: f32) -> Self {
        Self {
            peaks: vec![0.0; band_count],
            decay_rate,
        }
    }

    /// Feeds this frame's raw energy for `band_index` and returns the new peak.
    /// Call once per band per completed frame.
    pub fn update(&mut self, band_index: usize, raw_energy: f32) -> f32 {
        let peak = &mut self.peaks[band_index];
        *peak = decay_peak(*peak, raw_energy, self.decay_rate);
        *peak
    }

    pub fn peak(&self, band_index: usize) -> f32 {
        self.peaks[band_index]
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn reset(&mut self) {
        self.peaks.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_input_is_taken_exactly() {
        let mut tracker = PeakTracker::new(2, 0.9);
        assert_eq!(tracker.update(0, 0.4), 0.4);
        assert_eq!(tracker.update(0, 0.7), 0.7);
        assert_eq!(tracker.peak(1), 0.0);
    }

    #[test]
    fn silence_decays_by_exactly_the_rate() {
        let mut tracker = PeakTracker::new(1, 0.9);
        tracker.update(0, 0.5);
        assert_eq!(tracker.update(0, 0.0), 0.5 * 0.9);
        assert_eq!(tracker.update(0, 0.0), 0.5 * 0.9 * 0.9);
    }

    #[test]
    fn falling_input_above_decayed_peak_wins() {
        assert_eq!(decay_peak(1.0, 0.95, 0.9), 0.95);
        assert_eq!(decay_peak(1.0, 0.5, 0.9), 0.9);
    }

    #[test]
    fn peak_strictly_decreases_under_silence() {
        let mut tracker = PeakTracker::new(1, 0.9);
        tracker.update(0, 1.0);
        let mut previous = tracker.peak(0);
        for _ in 0..200 {
            let next = tracker.update(0, 0.0);
            if previous > 0.0 {
                assert!(next < previous, "{} did not drop below {}", next, previous);
            }
            assert!(next >= 0.0);
            previous = next;
        }
        assert!(previous < 1e-9);
    }

    #[test]
    fn reset_zeroes_all_bands() {
        let mut tracker = PeakTracker::new(3, 0.5);
        for i in 0..3 {
            tracker.update(i, 1.0);
        }
        tracker.reset();
        assert_eq!(tracker.peaks(), &[0.0, 0.0, 0.0]);
    }
}
