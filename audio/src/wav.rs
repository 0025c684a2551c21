//! Mono 16-bit PCM WAV reading and writing.
//!
//! The engine consumes normalized f32 samples at a fixed rate, so reads
//! validate the container (mono, 16-bit integer PCM, expected sample rate)
//! before any samples cross into the DSP path.

use std::path::Path;

use crate::error::AudioError;

/// Reads a WAV file into normalized f32 samples (range [-1, 1]).
///
/// Rejects files that are not mono 16-bit integer PCM at `expected_rate`.
pub fn read_wav(path: &Path, expected_rate: u32) -> Result<Vec<f32>, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(AudioError::Channels { got: spec.channels });
    }
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(AudioError::Encoding);
    }
    if spec.bits_per_sample != 16 {
        return Err(AudioError::BitDepth { got: spec.bits_per_sample });
    }
    if spec.sample_rate != expected_rate {
        return Err(AudioError::SampleRate { expected: expected_rate, got: spec.sample_rate });
    }

    let mut samples = Vec::with_capacity(reader.len() as usize);
    for sample in reader.samples::<i16>() {
        samples.push(sample? as f32 / 32768.0);
    }
    Ok(samples)
}

/// Writes normalized f32 samples as a mono 16-bit PCM WAV file.
/// Samples are clamped to [-1, 1] before scaling.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
