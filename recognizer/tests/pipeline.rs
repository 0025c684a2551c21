//! End-to-end tests over the full pipeline: WAV references on disk,
//! template building, live frame streaming, match counting.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use refrain_audio::mfcc::MfccConfig;
use refrain_audio::vad::VadConfig;
use refrain_recognizer::{
    EventSink, MemoryStore, RecognitionSession, RecognizerError, ReferenceStore, SessionConfig,
    SessionEvent, SessionState, SinkFunc, TemplateRegistry, WavDirStore,
};

const SAMPLE_RATE: u32 = 48000;
const FRAME: usize = 2048;
const HOP: usize = 1024;

/// Two seconds of a harmonic-rich 220 Hz tone, loud enough to read as voice.
fn chant(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            let mut s = 0.0;
            for h in 1..=24 {
                s += (2.0 * PI * 220.0 * h as f64 * t).sin() / h as f64;
            }
            (0.5 * s) as f32
        })
        .collect()
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("refrain_e2e_{}_{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn recording_sink() -> (Arc<Mutex<Vec<SessionEvent>>>, Box<dyn EventSink>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let sink = SinkFunc(move |event: &SessionEvent| {
        sink_events.lock().unwrap().push(event.clone());
    });
    (events, Box::new(sink))
}

fn dir_session(dir: &Path) -> (RecognitionSession, Arc<Mutex<Vec<SessionEvent>>>) {
    let registry = Arc::new(TemplateRegistry::new(
        Box::new(WavDirStore::new(dir, SAMPLE_RATE)),
        MfccConfig::default(),
        VadConfig::default(),
    ));
    registry.reload();
    let (events, sink) = recording_sink();
    (
        RecognitionSession::new(SessionConfig::default(), registry, sink),
        events,
    )
}

/// Feeds samples as overlapping hop-aligned frames, then enough silence to
/// flush the open utterance.
fn stream_utterance(session: &RecognitionSession, samples: &[f32]) {
    let mut start = 0;
    while start + FRAME <= samples.len() {
        session.process_frame(&samples[start..start + FRAME]);
        start += HOP;
    }
    let silence = [0.0f32; FRAME];
    for _ in 0..15 {
        session.process_frame(&silence);
    }
}

#[test]
fn counts_repetitions_from_wav_reference() {
    let dir = scratch_dir("match");
    let store = WavDirStore::new(&dir, SAMPLE_RATE);
    store.save("om", &chant(96000)).unwrap();

    let (session, events) = dir_session(&dir);
    assert_eq!(session.registry().names(), vec!["om".to_string()]);

    session.start("om", 0.7, 1).unwrap();
    // Replay the stored recording, decoded the same way the template was.
    let live = store.load("om").unwrap();
    stream_utterance(&session, &live);

    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.match_count(), 1);

    let events = events.lock().unwrap();
    let matches: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Match {
                similarity,
                matched,
                ..
            } => Some((*similarity, *matched)),
            _ => None,
        })
        .collect();
    assert_eq!(matches.len(), 1);
    let (similarity, matched) = matches[0];
    assert!(matched);
    assert!(similarity >= 0.999, "similarity {}", similarity);
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::LimitReached { count: 1 })));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn reference_management_updates_registry() {
    let dir = scratch_dir("refs");
    let store = WavDirStore::new(&dir, SAMPLE_RATE);
    store.save("om", &chant(48000)).unwrap();
    store.save("gayatri", &chant(48000)).unwrap();

    let (session, events) = dir_session(&dir);
    assert_eq!(session.refresh_references(), 2);

    store.delete("gayatri").unwrap();
    assert_eq!(session.refresh_references(), 1);

    {
        let events = events.lock().unwrap();
        assert_eq!(
            events[0],
            SessionEvent::ReferencesUpdated {
                names: vec!["gayatri".into(), "om".into()]
            }
        );
        assert_eq!(
            events[1],
            SessionEvent::ReferencesUpdated {
                names: vec!["om".into()]
            }
        );
    }

    assert!(matches!(
        session.start("gayatri", 0.7, 0),
        Err(RecognizerError::MissingReference { .. })
    ));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn record_save_and_match_roundtrip() {
    let dir = scratch_dir("record");
    let store = WavDirStore::new(&dir, SAMPLE_RATE);
    let (session, _events) = dir_session(&dir);

    // Capture a new reference through the session itself.
    session.begin_recording("mantra").unwrap();
    let take = chant(96000);
    for chunk in take.chunks(FRAME) {
        session.process_frame(chunk);
    }
    let (name, samples) = session.finish_recording().expect("capture");
    assert_eq!(name, "mantra");
    assert_eq!(samples.len(), take.len());

    let stored = store.save(&name, &samples).unwrap();
    assert_eq!(stored, name);
    assert_eq!(session.refresh_references(), 1);

    // Two repetitions, then the limit stops the session.
    session.start("mantra", 0.7, 2).unwrap();
    let live = store.load("mantra").unwrap();
    stream_utterance(&session, &live);
    assert_eq!(session.state(), SessionState::Listening);
    assert_eq!(session.match_count(), 1);

    stream_utterance(&session, &live);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.match_count(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn in_memory_store_supports_the_same_flow() {
    let store = Arc::new(MemoryStore::new());
    store.insert("om", chant(96000));

    let registry = Arc::new(TemplateRegistry::new(
        Box::new(store.clone()),
        MfccConfig::default(),
        VadConfig::default(),
    ));
    registry.reload();

    let (events, sink) = recording_sink();
    let session = RecognitionSession::new(SessionConfig::default(), registry, sink);
    session.start("om", 0.7, 0).unwrap();
    stream_utterance(&session, &chant(96000));

    assert_eq!(session.state(), SessionState::Listening);
    assert_eq!(session.match_count(), 1);
    session.stop();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, SessionEvent::MatchCount(1))));
}
