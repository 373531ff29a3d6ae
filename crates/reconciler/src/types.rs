use std::collections::{HashMap, HashSet, VecDeque};

/// One ASR-emitted utterance slice, positioned by its stable index in the
/// room's line sequence.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Line {
    pub line_idx: usize,
    pub beg: i64,
    pub end: i64,
    /// `-1` means unknown speaker.
    pub speaker: i32,
    /// Last-known raw ASR string for this slice; used only for change detection.
    pub text: String,
    pub sentences: Vec<Sentence>,
}

/// A completed sentence within a [`Line`]. The source text is a
/// distinguished field; translations live in a separate map keyed by
/// target language so a source revision can drop them in one step.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sentence {
    pub sent_idx: usize,
    pub source_text: String,
    pub translations: HashMap<String, String>,
}

impl Sentence {
    pub fn new(sent_idx: usize, source_text: String) -> Self {
        Self {
            sent_idx,
            source_text,
            translations: HashMap::new(),
        }
    }
}

/// Outstanding translation work for one `(line_idx, sent_idx)` position.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranslationRequest {
    pub line_idx: usize,
    pub sent_idx: usize,
    pub sentence: String,
    pub translated_langs: HashSet<String>,
}

/// One ASR hypothesis submission.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HypothesisChunk {
    pub buffer_transcription: String,
    pub lines: Vec<IncomingLine>,
    pub remaining_time_transcription: f64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IncomingLine {
    pub beg: String,
    pub end: String,
    pub text: String,
    pub speaker: i32,
}

/// A completed translation to fold back into the reconciler state.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub line_idx: usize,
    pub sent_idx: usize,
    pub sentence: String,
    pub lang: String,
    pub translation: String,
}

/// A snapshot suitable for client broadcast: the last N sentences in
/// forward order, spread over a suffix of the line sequence.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BroadcastSentence {
    pub line_idx: usize,
    pub sent_idx: usize,
    pub source_text: String,
    pub translations: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BroadcastChunk {
    pub last_n_sents: Vec<BroadcastSentence>,
    pub incomplete_sentence: String,
    pub transcription_delay: f64,
    pub translation_delay: f64,
}

/// Fixed-window rolling average over the last `n` samples (default 4).
#[derive(Debug, Clone)]
pub struct RollingAverage {
    window: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl RollingAverage {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            sum: 0.0,
        }
    }

    pub fn record(&mut self, sample: f64) {
        if self.window.len() == self.capacity {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
        self.window.push_back(sample);
        self.sum += sample;
    }

    pub fn value(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.sum / self.window.len() as f64
        }
    }
}

impl Default for RollingAverage {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Parses `"HH:MM:SS"` into integer seconds. Malformed input yields `0`.
pub fn parse_timestamp(raw: &str) -> i64 {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 3 {
        return 0;
    }
    let h: i64 = parts[0].parse().unwrap_or(-1);
    let m: i64 = parts[1].parse().unwrap_or(-1);
    let s: i64 = parts[2].parse().unwrap_or(-1);
    if h < 0 || m < 0 || s < 0 {
        return 0;
    }
    h * 3600 + m * 60 + s
}
