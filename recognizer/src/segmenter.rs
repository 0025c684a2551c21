//! Groups voiced frames into utterances delimited by silence.

use refrain_audio::vad::VoiceActivityDetector;
use serde::{Deserialize, Serialize};

/// Configuration for utterance segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Hard cap on buffered features per utterance (default: 150).
    pub max_utterance_frames: usize,
    /// Consecutive silent frames that close an utterance (default: 15).
    pub silence_frames_threshold: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_utterance_frames: 150,
            silence_frames_threshold: 15,
        }
    }
}

/// Accumulates voiced features into a bounded buffer and flushes a completed
/// utterance after a run of silence, or when the buffer reaches capacity.
///
/// The buffer length always stays within `[0, max_utterance_frames]`; a
/// voiced frame arriving at capacity flushes the full buffer first and then
/// opens the next utterance with itself.
#[derive(Debug, Default)]
pub struct UtteranceSegmenter {
    cfg: SegmenterConfig,
    vad: VoiceActivityDetector,
    buffer: Vec<Vec<f32>>,
    silence_run: usize,
}

impl UtteranceSegmenter {
    pub fn new(cfg: SegmenterConfig, vad: VoiceActivityDetector) -> Self {
        Self {
            cfg,
            vad,
            buffer: Vec::new(),
            silence_run: 0,
        }
    }

    /// Feeds one frame and its feature, if extraction produced one (a
    /// missing feature counts as silence). Returns a completed utterance
    /// when this step closes one.
    pub fn push(&mut self, frame: &[f32], feature: Option<Vec<f32>>) -> Option<Vec<Vec<f32>>> {
        let silent = match &feature {
            Some(f) => self.vad.is_silent(frame, f),
            None => true,
        };

        if !silent {
            self.silence_run = 0;
            let flushed = if self.buffer.len() >= self.cfg.max_utterance_frames {
                Some(std::mem::take(&mut self.buffer))
            } else {
                None
            };
            if let Some(f) = feature {
                self.buffer.push(f);
            }
            return flushed;
        }

        self.silence_run = self.silence_run.saturating_add(1);
        if self.silence_run >= self.cfg.silence_frames_threshold && !self.buffer.is_empty() {
            self.silence_run = 0;
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }

    /// Number of features in the open utterance.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when no utterance is open.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discards the open utterance and the silence run.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.silence_run = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Constant positive frame: energetic, zero crossings, confident C0.
    fn voiced_frame() -> Vec<f32> {
        vec![0.5; 64]
    }

    fn silent_frame() -> Vec<f32> {
        vec![0.0; 64]
    }

    fn feature(tag: f32) -> Vec<f32> {
        let mut f = vec![0.0f32; 13];
        f[1] = tag;
        f
    }

    fn segmenter() -> UtteranceSegmenter {
        UtteranceSegmenter::new(SegmenterConfig::default(), VoiceActivityDetector::default())
    }

    #[test]
    fn silence_run_flushes_buffer() {
        let mut seg = segmenter();

        for i in 0..10 {
            assert!(seg.push(&voiced_frame(), Some(feature(i as f32))).is_none());
        }
        assert_eq!(seg.len(), 10);

        for _ in 0..14 {
            assert!(seg.push(&silent_frame(), Some(feature(0.0))).is_none());
        }
        let utterance = seg.push(&silent_frame(), Some(feature(0.0))).expect("flush");

        assert_eq!(utterance.len(), 10);
        // Order preserved.
        for (i, f) in utterance.iter().enumerate() {
            assert_eq!(f[1], i as f32);
        }
        assert!(seg.is_empty());
    }

    #[test]
    fn silence_counter_restarts_after_flush() {
        let mut seg = segmenter();
        seg.push(&voiced_frame(), Some(feature(1.0)));
        for _ in 0..15 {
            seg.push(&silent_frame(), Some(feature(0.0)));
        }
        assert!(seg.is_empty());

        // A fresh utterance needs a fresh 15-frame run to close.
        seg.push(&voiced_frame(), Some(feature(2.0)));
        for _ in 0..14 {
            assert!(seg.push(&silent_frame(), Some(feature(0.0))).is_none());
        }
        let utterance = seg.push(&silent_frame(), Some(feature(0.0))).expect("flush");
        assert_eq!(utterance.len(), 1);
        assert_eq!(utterance[0][1], 2.0);
    }

    #[test]
    fn capacity_forces_flush_before_append() {
        let mut seg = segmenter();

        for i in 0..150 {
            assert!(seg.push(&voiced_frame(), Some(feature(i as f32))).is_none());
        }
        assert_eq!(seg.len(), 150);

        // Frame 151 flushes the full buffer and opens the next utterance.
        let utterance = seg.push(&voiced_frame(), Some(feature(150.0))).expect("force flush");
        assert_eq!(utterance.len(), 150);
        assert_eq!(utterance[0][1], 0.0);
        assert_eq!(utterance[149][1], 149.0);
        assert_eq!(seg.len(), 1);
    }

    #[test]
    fn silence_only_never_flushes() {
        let mut seg = segmenter();
        for _ in 0..100 {
            assert!(seg.push(&silent_frame(), Some(feature(0.0))).is_none());
        }
        assert!(seg.is_empty());
    }

    #[test]
    fn missing_feature_counts_as_silence() {
        let mut seg = segmenter();
        for i in 0..5 {
            seg.push(&voiced_frame(), Some(feature(i as f32)));
        }
        for _ in 0..14 {
            assert!(seg.push(&voiced_frame(), None).is_none());
        }
        let utterance = seg.push(&voiced_frame(), None).expect("flush");
        assert_eq!(utterance.len(), 5);
    }

    #[test]
    fn voiced_frame_resets_silence_run() {
        let mut seg = segmenter();
        seg.push(&voiced_frame(), Some(feature(1.0)));
        for _ in 0..14 {
            seg.push(&silent_frame(), Some(feature(0.0)));
        }
        // Voice returns just before the cutoff; the run starts over.
        seg.push(&voiced_frame(), Some(feature(2.0)));
        for _ in 0..14 {
            assert!(seg.push(&silent_frame(), Some(feature(0.0))).is_none());
        }
        let utterance = seg.push(&silent_frame(), Some(feature(0.0))).expect("flush");
        assert_eq!(utterance.len(), 2);
    }

    #[test]
    fn reset_discards_open_utterance() {
        let mut seg = segmenter();
        for i in 0..5 {
            seg.push(&voiced_frame(), Some(feature(i as f32)));
        }
        seg.reset();
        assert!(seg.is_empty());

        for _ in 0..15 {
            assert!(seg.push(&silent_frame(), Some(feature(0.0))).is_none());
        }
    }
}
