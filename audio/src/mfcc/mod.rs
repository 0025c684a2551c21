//! MFCC feature extraction from PCM audio frames.
//!
//! Front-end for utterance matching: pre-emphasis -> Hamming window -> power
//! spectrum (radix-2 FFT) -> triangular mel filterbank -> natural log ->
//! DCT-II -> cepstral coefficients. Coefficient 0 sums the log mel energies
//! and approximates frame log-energy, which the silence detector relies on.
//!
//! Default parameters match the engine's capture format:
//! - SampleRate: 48000
//! - FrameSize: 2048 (~42.7ms)
//! - HopSize: 1024 (50% overlap)
//! - NumFilters: 40
//! - NumCoeffs: 13
//! - Band: 50 Hz - 8000 Hz
//! - PreEmphasis: 0.95

mod fft;
mod mel;

use serde::{Deserialize, Serialize};

pub use mel::hamming_window;

/// Configuration for MFCC extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfccConfig {
    pub sample_rate: u32,
    pub frame_size: usize,
    pub hop_size: usize,
    pub num_filters: usize,
    pub num_coeffs: usize,
    pub low_freq: f64,
    pub high_freq: f64,
    pub pre_emphasis: f32,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            frame_size: 2048,
            hop_size: 1024,
            num_filters: 40,
            num_coeffs: 13,
            low_freq: 50.0,
            high_freq: 8000.0,
            pre_emphasis: 0.95,
        }
    }
}

/// Applies pre-emphasis: `out[i] = in[i] - coeff * in[i-1]`, with the first
/// sample passed through. Inputs shorter than 2 are returned unchanged.
pub fn pre_emphasis(signal: &[f32], coeff: f32) -> Vec<f32> {
    if signal.len() < 2 {
        return signal.to_vec();
    }
    let mut out = Vec::with_capacity(signal.len());
    out.push(signal[0]);
    for i in 1..signal.len() {
        out.push(signal[i] - coeff * signal[i - 1]);
    }
    out
}

/// Applies a Hamming window pointwise. Inputs shorter than 2 are returned
/// unchanged.
pub fn apply_hamming(frame: &[f32]) -> Vec<f32> {
    if frame.len() < 2 {
        return frame.to_vec();
    }
    let window = mel::hamming_window(frame.len());
    frame
        .iter()
        .zip(&window)
        .map(|(&s, &w)| (s as f64 * w) as f32)
        .collect()
}

/// MFCC feature extractor.
///
/// Construction precomputes the Hamming window, the mel filterbank, and the
/// DCT basis; extraction itself is immutable and shareable by `&self`.
pub struct FeatureExtractor {
    cfg: MfccConfig,
    window: Vec<f64>,
    mel_bank: Vec<Vec<f64>>,
    dct: Vec<Vec<f64>>,
}

impl FeatureExtractor {
    /// Creates a new extractor with the given config.
    ///
    /// Panics if `frame_size` is not a power of two, if `hop_size` is zero,
    /// or if `num_coeffs` exceeds `num_filters`.
    pub fn new(cfg: MfccConfig) -> Self {
        assert!(
            cfg.frame_size.is_power_of_two(),
            "frame_size must be a power of two, got {}",
            cfg.frame_size
        );
        assert!(cfg.hop_size > 0, "hop_size must be non-zero");
        assert!(
            cfg.num_coeffs > 0 && cfg.num_coeffs <= cfg.num_filters,
            "num_coeffs must be in 1..=num_filters, got {}/{}",
            cfg.num_coeffs,
            cfg.num_filters
        );

        let window = mel::hamming_window(cfg.frame_size);
        let mel_bank = mel::mel_filter_bank(
            cfg.num_filters,
            cfg.frame_size,
            cfg.sample_rate,
            cfg.low_freq,
            cfg.high_freq,
        );
        let dct = mel::dct_basis(cfg.num_coeffs, cfg.num_filters);
        Self { cfg, window, mel_bank, dct }
    }

    pub fn config(&self) -> &MfccConfig {
        &self.cfg
    }

    /// Extracts one MFCC vector from a single frame of normalized f32 PCM
    /// (range [-1, 1]).
    ///
    /// Returns `None` when the frame length does not match the configured
    /// frame size or the transform produces a non-finite value.
    pub fn extract(&self, frame: &[f32]) -> Option<Vec<f32>> {
        let n = self.cfg.frame_size;
        if frame.len() != n {
            return None;
        }

        // Pre-emphasis + windowing, fused into the FFT buffer
        let mut buf = vec![(0.0f64, 0.0f64); n];
        let coeff = self.cfg.pre_emphasis as f64;
        buf[0] = (frame[0] as f64 * self.window[0], 0.0);
        for i in 1..n {
            let s = frame[i] as f64 - coeff * frame[i - 1] as f64;
            buf[i] = (s * self.window[i], 0.0);
        }

        fft::fft(&mut buf);

        // Power spectrum over the non-redundant half
        let half = n / 2 + 1;
        let mut power = vec![0.0f64; half];
        for (k, p) in power.iter_mut().enumerate() {
            let (re, im) = buf[k];
            *p = re * re + im * im;
        }

        // Mel filterbank + log
        let mut log_mel = vec![0.0f64; self.cfg.num_filters];
        for (m, out) in log_mel.iter_mut().enumerate() {
            let mut sum = 0.0f64;
            for (k, &w) in self.mel_bank[m].iter().enumerate() {
                sum += w * power[k];
            }
            if sum < 1e-10 {
                sum = 1e-10;
            }
            *out = sum.ln();
        }

        // DCT-II down to cepstra
        let mut mfcc = Vec::with_capacity(self.cfg.num_coeffs);
        for row in &self.dct {
            let c: f64 = row.iter().zip(&log_mel).map(|(b, e)| b * e).sum();
            mfcc.push(c as f32);
        }

        if mfcc.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(mfcc)
    }

    /// Extracts an MFCC sequence from a longer recording by sliding a
    /// frame-sized window at hop-size steps. Windows that would overrun the
    /// buffer are not emitted; frames that fail extraction are skipped.
    ///
    /// Returns `(len - frame_size) / hop_size + 1` vectors, or an empty
    /// sequence when the audio is shorter than one frame.
    pub fn extract_sequence(&self, audio: &[f32]) -> Vec<Vec<f32>> {
        let cfg = &self.cfg;
        if audio.len() < cfg.frame_size {
            return Vec::new();
        }

        let num_frames = (audio.len() - cfg.frame_size) / cfg.hop_size + 1;
        let mut seq = Vec::with_capacity(num_frames);
        for t in 0..num_frames {
            let start = t * cfg.hop_size;
            if let Some(feature) = self.extract(&audio[start..start + cfg.frame_size]) {
                seq.push(feature);
            }
        }
        seq
    }
}
