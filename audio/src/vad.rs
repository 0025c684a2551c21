//! Frame-level voice activity detection.
//!
//! A frame counts as silent when any of three cues fires: the zeroth
//! cepstral coefficient (log-energy proxy) falls below a floor, the mean
//! square energy falls below a floor, or the zero-crossing rate rises above
//! a ceiling (hiss and fricative-like noise rather than voiced speech).

use serde::{Deserialize, Serialize};

/// Configuration for silence classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    /// Frames with feature[0] below this are silent (default: -40.0).
    pub c0_silence_threshold: f32,
    /// Frames with mean square energy below this are silent (default: 0.01).
    pub energy_threshold: f32,
    /// Frames with zero-crossing rate above this are silent (default: 0.1).
    pub zcr_threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            c0_silence_threshold: -40.0,
            energy_threshold: 0.01,
            zcr_threshold: 0.1,
        }
    }
}

/// Stateless silence classifier over (frame, feature) pairs.
#[derive(Debug, Clone, Default)]
pub struct VoiceActivityDetector {
    cfg: VadConfig,
}

impl VoiceActivityDetector {
    pub fn new(cfg: VadConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &VadConfig {
        &self.cfg
    }

    /// Classifies one frame given its raw samples and its feature vector.
    /// Empty inputs classify as silent.
    pub fn is_silent(&self, frame: &[f32], feature: &[f32]) -> bool {
        if frame.is_empty() || feature.is_empty() {
            return true;
        }
        feature[0] < self.cfg.c0_silence_threshold
            || energy(frame) < self.cfg.energy_threshold
            || zero_crossing_rate(frame) > self.cfg.zcr_threshold
    }
}

/// Mean square energy of a frame. Empty input yields 0.
pub fn energy(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f64 = frame.iter().map(|&s| s as f64 * s as f64).sum();
    (sum / frame.len() as f64) as f32
}

/// Zero-crossing rate: transitions between the non-negative and negative
/// sample classes, divided by the frame length. A sample sitting exactly on
/// zero belongs to the non-negative class. Empty input yields 0.
pub fn zero_crossing_rate(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let mut crossings = 0usize;
    for pair in frame.windows(2) {
        if (pair[0] >= 0.0) != (pair[1] >= 0.0) {
            crossings += 1;
        }
    }
    crossings as f32 / frame.len() as f32
}
