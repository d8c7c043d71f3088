use std::sync::atomic::{AtomicU32, Ordering};

use crate::traits::sample_transform::SampleTransform;

/// Smallest alpha the filter accepts. At zero the output would freeze on its
/// first sample.
pub const ALPHA_FLOOR: f32 = 0.01;

/// Single-pole low-pass filter.
///
/// `out[0] = in[0]`, `out[i] = alpha * in[i] + (1 - alpha) * out[i - 1]`.
/// Alpha can be retuned live through a shared handle; the producer picks the
/// new value up on its next frame.
#[derive(Debug)]
pub struct LowPassFilter {
    alpha_bits: AtomicU32,
}

impl LowPassFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha_bits: AtomicU32::new(clamp_alpha(alpha).to_bits()),
        }
    }

    pub fn alpha(&self) -> f32 {
        f32::from_bits(self.alpha_bits.load(Ordering::Relaxed))
    }

    /// Update alpha, clamped to `[ALPHA_FLOOR, 1.0]`. Returns the value applied.
    pub fn set_alpha(&self, alpha: f32) -> f32 {
        let clamped = clamp_alpha(alpha);
        if clamped != alpha {
            log::debug!("low-pass alpha {} clamped to {}", alpha, clamped);
        }
        self.alpha_bits.store(clamped.to_bits(), Ordering::Relaxed);
        clamped
    }
}

fn clamp_alpha(alpha: f32) -> f32 {
    if alpha.is_nan() {
        return ALPHA_FLOOR;
    }
    alpha.clamp(ALPHA_FLOOR, 1.0)
}

impl SampleTransform for LowPassFilter {
    fn process(&self, frame: &[f32]) -> Vec<f32> {
        let Some((&first, rest)) = frame.split_first() else {
            return Vec::new();
        };

        let alpha = self.alpha();
        let mut filtered = Vec::with_capacity(frame.len());
        filtered.push(first);
        let mut previous = first;
        for &sample in rest {
            previous = alpha * sample + (1.0 - alpha) * previous;
            filtered.push(previous);
        }
        filtered
    }

    fn name(&self) -> &str {
        "low-pass"
    }
}
