use thiserror::Error;

/// Errors from WAV container decoding and format validation.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),

    #[error("expected mono audio, got {got} channels")]
    Channels { got: u16 },

    #[error("expected 16-bit samples, got {got}")]
    BitDepth { got: u16 },

    #[error("expected integer PCM samples")]
    Encoding,

    #[error("expected sample rate {expected}, got {got}")]
    SampleRate { expected: u32, got: u32 },
}
