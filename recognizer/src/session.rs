//! Recognition sessions: the stateful loop that turns pushed audio frames
//! into match events against one reference template.
//!
//! A session is driven by a single caller thread. Events fan out through an
//! [`EventSink`] after internal state is released, so sinks may safely call
//! back into the session.

use std::sync::{Arc, Mutex};

use refrain_audio::mfcc::{FeatureExtractor, MfccConfig};
use refrain_audio::vad::{VadConfig, VoiceActivityDetector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dtw::compute_similarity;
use crate::error::{ErrorKind, RecognizerError};
use crate::segmenter::{SegmenterConfig, UtteranceSegmenter};
use crate::template::{ReferenceTemplate, TemplateRegistry};

/// Threshold used when the host has no opinion.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Lifecycle of a [`RecognitionSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Listening,
    Stopped,
    Error,
}

/// Notifications a session pushes to its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    /// Human-readable state description.
    Status(String),
    /// One completed utterance was scored against the target.
    Match {
        similarity: f32,
        matched: bool,
        count: u32,
    },
    /// The running match count changed.
    MatchCount(u32),
    /// The configured match limit was hit; the session has stopped.
    LimitReached { count: u32 },
    /// A failure the host should surface.
    Error { kind: ErrorKind, message: String },
    /// The template set was rebuilt from the backing store.
    ReferencesUpdated { names: Vec<String> },
    /// Whether the session is listening for matches.
    Listening(bool),
    /// Whether the session is capturing a new reference.
    Recording(bool),
}

/// A sink for session events.
pub trait EventSink: Send + Sync {
    /// Receives one event. Must not block.
    fn emit(&self, event: &SessionEvent);
}

/// A function that implements the EventSink trait.
pub struct SinkFunc<F>(pub F);

impl<F> EventSink for SinkFunc<F>
where
    F: Fn(&SessionEvent) + Send + Sync,
{
    fn emit(&self, event: &SessionEvent) {
        (self.0)(event)
    }
}

/// An EventSink that discards all events.
pub struct Discard;

impl EventSink for Discard {
    fn emit(&self, _event: &SessionEvent) {}
}

/// Configuration for a [`RecognitionSession`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mfcc: MfccConfig,
    pub vad: VadConfig,
    pub segmenter: SegmenterConfig,
}

struct Capture {
    name: String,
    samples: Vec<f32>,
}

struct SessionInner {
    state: SessionState,
    target: Option<Arc<ReferenceTemplate>>,
    threshold: f32,
    limit: u32,
    count: u32,
    segmenter: UtteranceSegmenter,
    capture: Option<Capture>,
}

/// Matches pushed audio frames against one reference template and counts
/// repetitions.
///
/// All methods take `&self`; internal state lives behind a mutex so a session
/// can be shared with a control thread, but audio frames must come from a
/// single caller at a time.
pub struct RecognitionSession {
    registry: Arc<TemplateRegistry>,
    sink: Box<dyn EventSink>,
    extractor: FeatureExtractor,
    inner: Mutex<SessionInner>,
}

impl RecognitionSession {
    pub fn new(cfg: SessionConfig, registry: Arc<TemplateRegistry>, sink: Box<dyn EventSink>) -> Self {
        let segmenter =
            UtteranceSegmenter::new(cfg.segmenter, VoiceActivityDetector::new(cfg.vad));
        Self {
            registry,
            sink,
            extractor: FeatureExtractor::new(cfg.mfcc),
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                target: None,
                threshold: DEFAULT_SIMILARITY_THRESHOLD,
                limit: 0,
                count: 0,
                segmenter,
                capture: None,
            }),
        }
    }

    /// Begins listening for the named reference.
    ///
    /// `threshold` is the minimum similarity in `[0, 1]` that counts as a
    /// match; `limit` stops the session after that many matches, with 0
    /// meaning unlimited. The match count restarts at zero.
    ///
    /// Fails with [`RecognizerError::SessionActive`] while listening or
    /// capturing, with [`RecognizerError::InvalidInput`] for an out-of-range
    /// threshold, and with [`RecognizerError::MissingReference`] when the
    /// name has no template with voiced content. Only the last of these
    /// moves the session into the error state.
    pub fn start(&self, name: &str, threshold: f32, limit: u32) -> Result<(), RecognizerError> {
        let mut events = Vec::new();
        let result;
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.capture.is_some() || inner.state == SessionState::Listening {
                return Err(RecognizerError::SessionActive);
            }
            if !(0.0..=1.0).contains(&threshold) {
                return Err(RecognizerError::InvalidInput(format!(
                    "threshold {} outside [0, 1]",
                    threshold
                )));
            }

            match self.registry.get(name).filter(|t| !t.trimmed.is_empty()) {
                Some(template) => {
                    info!(
                        "listening for {:?} (threshold {}, limit {})",
                        name, threshold, limit
                    );
                    inner.target = Some(template);
                    inner.threshold = threshold;
                    inner.limit = limit;
                    inner.count = 0;
                    inner.segmenter.reset();
                    inner.state = SessionState::Listening;
                    events.push(SessionEvent::MatchCount(0));
                    events.push(SessionEvent::Status("Listening".into()));
                    events.push(SessionEvent::Listening(true));
                    result = Ok(());
                }
                None => {
                    let err = RecognizerError::MissingReference {
                        name: name.to_string(),
                    };
                    warn!("start failed: {}", err);
                    inner.state = SessionState::Error;
                    events.push(SessionEvent::Error {
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                    events.push(SessionEvent::Status("Error".into()));
                    result = Err(err);
                }
            }
        }
        self.emit_all(events);
        result
    }

    /// Feeds one frame of raw samples.
    ///
    /// While capturing a reference the frame is appended to the capture
    /// buffer. While listening it runs through the segmenter; when it
    /// completes an utterance, the similarity against the target is returned
    /// and the outcome is emitted. Otherwise the frame is ignored.
    pub fn process_frame(&self, frame: &[f32]) -> Option<f32> {
        let mut events = Vec::new();
        let outcome;
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(capture) = inner.capture.as_mut() {
                capture.samples.extend_from_slice(frame);
                return None;
            }
            if inner.state != SessionState::Listening {
                return None;
            }

            let feature = self.extractor.extract(frame);
            let Some(utterance) = inner.segmenter.push(frame, feature) else {
                return None;
            };
            let Some(target) = inner.target.clone() else {
                return None;
            };

            let similarity = compute_similarity(&utterance, &target.trimmed);
            let matched = similarity >= inner.threshold;
            if matched {
                inner.count += 1;
            }
            debug!(
                "utterance of {} frames vs {:?}: similarity {:.3}, matched {}",
                utterance.len(),
                target.name,
                similarity,
                matched
            );

            events.push(SessionEvent::Match {
                similarity,
                matched,
                count: inner.count,
            });
            if matched {
                events.push(SessionEvent::MatchCount(inner.count));
                if inner.limit > 0 && inner.count >= inner.limit {
                    info!("match limit {} reached for {:?}", inner.limit, target.name);
                    events.push(SessionEvent::LimitReached { count: inner.count });
                    stop_locked(&mut inner, &mut events);
                }
            }
            outcome = Some(similarity);
        }
        self.emit_all(events);
        outcome
    }

    /// Stops listening. Does nothing unless the session is listening.
    pub fn stop(&self) {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == SessionState::Listening {
                stop_locked(&mut inner, &mut events);
            }
        }
        self.emit_all(events);
    }

    /// Resets the running match count to zero, in any state.
    pub fn reset_match_count(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.count = 0;
        }
        self.sink.emit(&SessionEvent::MatchCount(0));
    }

    /// Begins capturing audio for a new reference named `name`. Frames fed
    /// via [`Self::process_frame`] accumulate until
    /// [`Self::finish_recording`].
    pub fn begin_recording(&self, name: &str) -> Result<(), RecognizerError> {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.capture.is_some() || inner.state == SessionState::Listening {
                return Err(RecognizerError::SessionActive);
            }
            inner.capture = Some(Capture {
                name: name.to_string(),
                samples: Vec::new(),
            });
            events.push(SessionEvent::Status(format!("Recording: {}", name)));
            events.push(SessionEvent::Recording(true));
        }
        self.emit_all(events);
        Ok(())
    }

    /// Ends a capture and hands the recorded samples back for persistence.
    /// Returns `None` when no capture was in progress.
    pub fn finish_recording(&self) -> Option<(String, Vec<f32>)> {
        let mut events = Vec::new();
        let finished;
        {
            let mut inner = self.inner.lock().unwrap();
            finished = inner.capture.take();
            if let Some(capture) = &finished {
                info!(
                    "captured {} samples for reference {:?}",
                    capture.samples.len(),
                    capture.name
                );
                events.push(SessionEvent::Status("Stopped".into()));
                events.push(SessionEvent::Recording(false));
            }
        }
        self.emit_all(events);
        finished.map(|c| (c.name, c.samples))
    }

    /// Rebuilds templates from the backing store and announces the new set.
    /// Returns the number of templates loaded. Running comparisons keep
    /// their snapshot of the previous template.
    pub fn refresh_references(&self) -> usize {
        let count = self.registry.reload();
        self.sink.emit(&SessionEvent::ReferencesUpdated {
            names: self.registry.names(),
        });
        count
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state
    }

    pub fn match_count(&self) -> u32 {
        self.inner.lock().unwrap().count
    }

    pub fn is_recording(&self) -> bool {
        self.inner.lock().unwrap().capture.is_some()
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    fn emit_all(&self, events: Vec<SessionEvent>) {
        for event in &events {
            self.sink.emit(event);
        }
    }
}

fn stop_locked(inner: &mut SessionInner, events: &mut Vec<SessionEvent>) {
    inner.state = SessionState::Stopped;
    inner.target = None;
    inner.segmenter.reset();
    events.push(SessionEvent::Status("Stopped".into()));
    events.push(SessionEvent::Listening(false));
}
