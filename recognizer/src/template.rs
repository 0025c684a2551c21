//! Reference templates: backing stores, feature extraction, silence trimming.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use refrain_audio::mfcc::{FeatureExtractor, MfccConfig};
use refrain_audio::vad::{VadConfig, VoiceActivityDetector};
use refrain_audio::wav;
use tracing::{debug, warn};

use crate::error::RecognizerError;

/// A named reference recording with its derived feature sequences.
#[derive(Debug, Clone)]
pub struct ReferenceTemplate {
    pub name: String,
    /// Raw mono samples at the engine sample rate.
    pub audio: Vec<f32>,
    /// Feature sequence over the whole recording.
    pub features: Vec<Vec<f32>>,
    /// Voiced-only subsequence used as the comparison target.
    pub trimmed: Vec<Vec<f32>>,
}

/// Keeps `features[i]` only when its audio sub-frame is voiced.
///
/// The sub-frame for index i starts at `i * hop_size` and spans `frame_size`
/// samples, zero-padded when the recording ends inside it. Iteration stops
/// once the start offset passes the audio end. Audio shorter than one frame
/// or an empty feature sequence yields an empty result.
pub fn trim_silence(
    features: &[Vec<f32>],
    audio: &[f32],
    vad: &VoiceActivityDetector,
    frame_size: usize,
    hop_size: usize,
) -> Vec<Vec<f32>> {
    if audio.len() < frame_size || features.is_empty() {
        return Vec::new();
    }

    let mut kept = Vec::new();
    let mut frame = vec![0.0f32; frame_size];
    for (i, feature) in features.iter().enumerate() {
        let start = i * hop_size;
        if start >= audio.len() {
            break;
        }
        let end = (start + frame_size).min(audio.len());
        let len = end - start;
        frame[..len].copy_from_slice(&audio[start..end]);
        frame[len..].fill(0.0);

        if !vad.is_silent(&frame, feature) {
            kept.push(feature.clone());
        }
    }
    kept
}

/// Lists and loads raw reference recordings.
///
/// Implementations must be safe for concurrent use.
/// Use [`MemoryStore`] for in-memory storage (testing/ephemeral).
pub trait ReferenceStore: Send + Sync {
    /// Returns available reference names.
    fn names(&self) -> Result<Vec<String>, RecognizerError>;

    /// Loads the raw mono samples for a named reference, at the engine
    /// sample rate.
    fn load(&self, name: &str) -> Result<Vec<f32>, RecognizerError>;
}

impl<S: ReferenceStore + ?Sized> ReferenceStore for Arc<S> {
    fn names(&self) -> Result<Vec<String>, RecognizerError> {
        (**self).names()
    }

    fn load(&self, name: &str) -> Result<Vec<f32>, RecognizerError> {
        (**self).load(name)
    }
}

/// [`ReferenceStore`] over a directory of `<name>.wav` files.
pub struct WavDirStore {
    dir: PathBuf,
    sample_rate: u32,
}

impl WavDirStore {
    pub fn new(dir: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self { dir: dir.into(), sample_rate }
    }

    /// Path a reference of this name lives at.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.wav", name))
    }

    /// Persists a recording into the store. An existing reference is never
    /// overwritten; a colliding name gets a numeric suffix (`name_1`,
    /// `name_2`, ...). Returns the name actually stored.
    pub fn save(&self, name: &str, samples: &[f32]) -> Result<String, RecognizerError> {
        let mut stored = name.to_string();
        let mut counter = 1;
        while self.path_of(&stored).exists() {
            stored = format!("{}_{}", name, counter);
            counter += 1;
        }
        wav::write_wav(&self.path_of(&stored), samples, self.sample_rate)
            .map_err(|e| storage_failure(&stored, e))?;
        Ok(stored)
    }

    /// Removes a reference recording.
    pub fn delete(&self, name: &str) -> Result<(), RecognizerError> {
        std::fs::remove_file(self.path_of(name)).map_err(|e| storage_failure(name, e))
    }
}

fn storage_failure(name: &str, err: impl std::fmt::Display) -> RecognizerError {
    RecognizerError::StorageFailure {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

impl ReferenceStore for WavDirStore {
    fn names(&self) -> Result<Vec<String>, RecognizerError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| storage_failure(&self.dir.display().to_string(), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| storage_failure(&self.dir.display().to_string(), e))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("wav") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<Vec<f32>, RecognizerError> {
        wav::read_wav(&self.path_of(name), self.sample_rate).map_err(|e| storage_failure(name, e))
    }
}

/// In-memory [`ReferenceStore`]. Suitable for tests and hosts that manage
/// their own persistence.
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Vec<f32>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    pub fn insert(&self, name: impl Into<String>, samples: Vec<f32>) {
        self.inner.lock().unwrap().insert(name.into(), samples);
    }

    /// Removes a reference. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.inner.lock().unwrap().remove(name).is_some()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceStore for MemoryStore {
    fn names(&self) -> Result<Vec<String>, RecognizerError> {
        let mut names: Vec<String> = self.inner.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<Vec<f32>, RecognizerError> {
        self.inner
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| storage_failure(name, "not found"))
    }
}

/// Ready-to-match templates built from a [`ReferenceStore`].
///
/// `reload` rebuilds the whole template map and swaps it in under the write
/// lock, so readers never observe a partially built set. Sessions hold an
/// `Arc` snapshot of their template, so reloads never mutate a running
/// comparison target.
pub struct TemplateRegistry {
    store: Box<dyn ReferenceStore>,
    extractor: FeatureExtractor,
    vad: VoiceActivityDetector,
    templates: RwLock<HashMap<String, Arc<ReferenceTemplate>>>,
}

impl TemplateRegistry {
    pub fn new(store: Box<dyn ReferenceStore>, mfcc: MfccConfig, vad: VadConfig) -> Self {
        Self {
            store,
            extractor: FeatureExtractor::new(mfcc),
            vad: VoiceActivityDetector::new(vad),
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuilds every template from the backing store and swaps the set in.
    /// References that fail to load or yield no features are skipped and do
    /// not affect the others; if the store cannot even list names, the
    /// previous set is kept. Returns the number of templates loaded.
    pub fn reload(&self) -> usize {
        let names = match self.store.names() {
            Ok(names) => names,
            Err(e) => {
                warn!("reference listing failed: {}", e);
                return 0;
            }
        };

        let mut fresh = HashMap::with_capacity(names.len());
        for name in names {
            match self.build_template(&name) {
                Ok(template) => {
                    fresh.insert(name, Arc::new(template));
                }
                Err(e) => warn!("skipping reference {:?}: {}", name, e),
            }
        }

        let count = fresh.len();
        *self.templates.write().unwrap() = fresh;
        count
    }

    fn build_template(&self, name: &str) -> Result<ReferenceTemplate, RecognizerError> {
        let audio = self.store.load(name)?;
        let features = self.extractor.extract_sequence(&audio);
        if features.is_empty() {
            return Err(storage_failure(name, "no features extracted"));
        }

        let cfg = self.extractor.config();
        let trimmed = trim_silence(&features, &audio, &self.vad, cfg.frame_size, cfg.hop_size);
        debug!(
            "built template {:?}: {} frames, {} voiced",
            name,
            features.len(),
            trimmed.len()
        );

        Ok(ReferenceTemplate {
            name: name.to_string(),
            audio,
            features,
            trimmed,
        })
    }

    /// Returns the template for `name`, if loaded.
    pub fn get(&self, name: &str) -> Option<Arc<ReferenceTemplate>> {
        self.templates.read().unwrap().get(name).cloned()
    }

    /// Returns loaded template names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
