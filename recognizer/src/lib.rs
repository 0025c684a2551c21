//! Repetition counting for short spoken or chanted phrases.
//!
//! # Architecture
//!
//! Pushed audio frames flow through three stages:
//!
//! 1. [`UtteranceSegmenter::push`]: framed samples -> voiced utterances
//! 2. [`compute_similarity`]: utterance vs. template -> similarity in `[0, 1]`
//! 3. [`RecognitionSession::process_frame`]: similarity -> match events
//!
//! Reference recordings live behind a [`ReferenceStore`]; a
//! [`TemplateRegistry`] decodes them, extracts feature sequences, trims
//! silent frames, and hands immutable [`ReferenceTemplate`]s to sessions.
//!
//! # Matching
//!
//! Sequences are aligned with dynamic time warping over cosine distance
//! between per-frame MFCC vectors, so slower and faster repetitions of the
//! same phrase still score close to 1.

mod dtw;
mod error;
mod segmenter;
mod session;
mod template;

pub use dtw::{compute_similarity, cosine_similarity};
pub use error::{ErrorKind, RecognizerError};
pub use segmenter::{SegmenterConfig, UtteranceSegmenter};
pub use session::{
    Discard, EventSink, RecognitionSession, SessionConfig, SessionEvent, SessionState, SinkFunc,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use template::{
    trim_silence, MemoryStore, ReferenceStore, ReferenceTemplate, TemplateRegistry, WavDirStore,
};
