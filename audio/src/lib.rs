//! Audio DSP front-end for utterance matching.
//!
//! # Pipeline
//!
//! Capture hands the engine fixed-size mono frames; this crate turns them
//! into features and classifies silence:
//!
//! 1. [`mfcc::FeatureExtractor::extract`]: 2048-sample frame -> 13 MFCCs
//! 2. [`vad::VoiceActivityDetector::is_silent`]: (frame, feature) -> silence
//! 3. [`wav`]: mono 16-bit PCM WAV files in and out, with format validation
//!
//! # Example
//!
//! ```rust
//! use refrain_audio::mfcc::{FeatureExtractor, MfccConfig};
//! use refrain_audio::vad::VoiceActivityDetector;
//!
//! let extractor = FeatureExtractor::new(MfccConfig::default());
//! let vad = VoiceActivityDetector::default();
//!
//! let frame = vec![0.0f32; 2048];
//! let feature = extractor.extract(&frame).unwrap();
//! assert_eq!(feature.len(), 13);
//! assert!(vad.is_silent(&frame, &feature));
//! ```

mod error;
pub mod mfcc;
pub mod vad;
pub mod wav;

pub use error::AudioError;
