use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ReconcilerError;
use crate::tokenizer::{PunctuationTokenizer, SentenceTokenizer};
use crate::types::{
    parse_timestamp, BroadcastChunk, BroadcastSentence, HypothesisChunk, IncomingLine, Line,
    RollingAverage, Sentence, TranslationRequest, TranslationResult,
};

const DEFAULT_COMPARE_DEPTH: usize = 10;
const DEFAULT_BROADCAST_SENTENCES: usize = 20;
const DEFAULT_ROLLING_WINDOW: usize = 4;
const BROADCAST_CAPACITY: usize = 64;

struct ReconcilerState {
    lines: Vec<Line>,
    incomplete_sentence: String,
    translation_queue: Vec<TranslationRequest>,
    last_chunk: Option<BroadcastChunk>,
    transcription_delay: RollingAverage,
    translation_delay: RollingAverage,
}

impl ReconcilerState {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            incomplete_sentence: String::new(),
            translation_queue: Vec::new(),
            last_chunk: None,
            transcription_delay: RollingAverage::new(DEFAULT_ROLLING_WINDOW),
            translation_delay: RollingAverage::new(DEFAULT_ROLLING_WINDOW),
        }
    }
}

/// Maintains the canonical Line/Sentence model for one room from a stream
/// of ASR hypotheses and exposes a translation work queue. All mutation
/// happens under a single mutex; broadcasts are a non-blocking publish to
/// a multi-consumer channel so the translation worker never blocks here.
pub struct Reconciler {
    state: Mutex<ReconcilerState>,
    tx: broadcast::Sender<BroadcastChunk>,
    tokenizer: Box<dyn SentenceTokenizer + Send + Sync>,
    source_lang: String,
    compare_depth: usize,
    broadcast_sentences: usize,
    persist: Option<Box<dyn Fn(&[Line]) + Send + Sync>>,
}

impl Reconciler {
    pub fn new(source_lang: impl Into<String>) -> Self {
        Self::with_options(
            source_lang,
            DEFAULT_COMPARE_DEPTH,
            DEFAULT_BROADCAST_SENTENCES,
        )
    }

    pub fn with_options(
        source_lang: impl Into<String>,
        compare_depth: usize,
        broadcast_sentences: usize,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            state: Mutex::new(ReconcilerState::new()),
            tx,
            tokenizer: Box::new(PunctuationTokenizer),
            source_lang: source_lang.into(),
            compare_depth,
            broadcast_sentences,
            persist: None,
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn SentenceTokenizer + Send + Sync>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Installs a persistence hook invoked with the full line sequence
    /// after every broadcast-triggering update.
    pub fn with_persistence(mut self, persist: Box<dyn Fn(&[Line]) + Send + Sync>) -> Self {
        self.persist = Some(persist);
        self
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastChunk> {
        self.tx.subscribe()
    }

    pub fn last_chunk(&self) -> Result<Option<BroadcastChunk>, ReconcilerError> {
        let state = self
            .state
            .lock()
            .map_err(|_| ReconcilerError::LockPoisoned)?;
        Ok(state.last_chunk.clone())
    }

    /// Snapshot copy of the to-translate list; the caller must not hold
    /// the reconciler's lock while performing MT calls.
    pub fn poll_translation_queue(&self) -> Result<Vec<TranslationRequest>, ReconcilerError> {
        let state = self
            .state
            .lock()
            .map_err(|_| ReconcilerError::LockPoisoned)?;
        Ok(state.translation_queue.clone())
    }

    pub fn submit_hypothesis(&self, chunk: HypothesisChunk) -> Result<(), ReconcilerError> {
        let incoming: Vec<IncomingLine> = chunk
            .lines
            .into_iter()
            .filter(|l| !l.text.is_empty())
            .collect();
        if incoming.is_empty() {
            return Ok(());
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| ReconcilerError::LockPoisoned)?;

        let existing_count = state.lines.len() as i64;
        let incoming_count = incoming.len() as i64;
        let floor = existing_count - self.compare_depth as i64;
        let last_idx = incoming.len() - 1;
        let mut changed = false;

        for (i, inc) in incoming.iter().enumerate() {
            let line_idx = existing_count - incoming_count + i as i64;
            let is_last = i == last_idx;

            if line_idx < 0 {
                let (new_line, incomplete) = self.build_line(state.lines.len(), inc);
                state.lines.push(new_line);
                let appended = state.lines.last().unwrap().clone();
                self.upsert_translation_queue(&mut state.translation_queue, &appended);
                changed = true;
                if is_last && state.incomplete_sentence != incomplete {
                    state.incomplete_sentence = incomplete;
                }
                continue;
            }

            let line_idx = line_idx as usize;
            if (line_idx as i64) < floor {
                continue; // frozen: older than compare_depth
            }

            if inc.beg.split(':').count() != 3 {
                warn!(line_idx, raw = %inc.beg, "malformed line start timestamp");
            }
            if inc.end.split(':').count() != 3 {
                warn!(line_idx, raw = %inc.end, "malformed line end timestamp");
            }
            let beg = parse_timestamp(&inc.beg);
            let end = parse_timestamp(&inc.end);
            let (sentence_texts, incomplete) = self.tokenizer.split(&inc.text);
            let text_changed = state.lines[line_idx].text != inc.text;

            {
                let line = &mut state.lines[line_idx];
                line.beg = beg;
                line.end = end;
                line.speaker = inc.speaker;
                if text_changed {
                    line.text = inc.text.clone();
                    reconcile_sentences(&mut line.sentences, &sentence_texts);
                }
            }

            if is_last {
                let incomplete = incomplete.unwrap_or_default();
                if state.incomplete_sentence != incomplete {
                    state.incomplete_sentence = incomplete;
                    changed = true;
                }
            }

            if text_changed {
                changed = true;
                let snapshot = state.lines[line_idx].clone();
                self.upsert_translation_queue(&mut state.translation_queue, &snapshot);
            }
        }

        state
            .transcription_delay
            .record(chunk.remaining_time_transcription);

        if changed {
            self.publish(&mut state);
        }

        Ok(())
    }

    pub fn submit_translation(
        &self,
        results: Vec<TranslationResult>,
        elapsed: Duration,
    ) -> Result<(), ReconcilerError> {
        if results.is_empty() {
            return Ok(());
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| ReconcilerError::LockPoisoned)?;

        for result in &results {
            let Some(line) = state.lines.get_mut(result.line_idx) else {
                warn!(line_idx = result.line_idx, "translation for unknown line");
                continue;
            };
            let Some(sentence) = line.sentences.get_mut(result.sent_idx) else {
                warn!(sent_idx = result.sent_idx, "translation for unknown sentence");
                continue;
            };
            if sentence.source_text != result.sentence {
                debug!(
                    line_idx = result.line_idx,
                    sent_idx = result.sent_idx,
                    "discarding stale translation"
                );
                continue;
            }
            sentence
                .translations
                .insert(result.lang.clone(), result.translation.clone());
            if let Some(req) = state
                .translation_queue
                .iter_mut()
                .find(|r| r.line_idx == result.line_idx && r.sent_idx == result.sent_idx)
            {
                req.translated_langs.insert(result.lang.clone());
            }
        }

        state
            .translation_delay
            .record(elapsed.as_secs_f64() / results.len() as f64);

        self.publish(&mut state);
        Ok(())
    }

    fn build_line(&self, idx: usize, inc: &IncomingLine) -> (Line, String) {
        if inc.beg.split(':').count() != 3 {
            warn!(line_idx = idx, raw = %inc.beg, "malformed line start timestamp");
        }
        if inc.end.split(':').count() != 3 {
            warn!(line_idx = idx, raw = %inc.end, "malformed line end timestamp");
        }
        let beg = parse_timestamp(&inc.beg);
        let end = parse_timestamp(&inc.end);
        let (sentence_texts, incomplete) = self.tokenizer.split(&inc.text);
        let sentences = sentence_texts
            .into_iter()
            .enumerate()
            .map(|(j, text)| Sentence::new(j, text))
            .collect();
        let line = Line {
            line_idx: idx,
            beg,
            end,
            speaker: inc.speaker,
            text: inc.text.clone(),
            sentences,
        };
        (line, incomplete.unwrap_or_default())
    }

    fn upsert_translation_queue(&self, queue: &mut Vec<TranslationRequest>, line: &Line) {
        for sentence in &line.sentences {
            if let Some(req) = queue
                .iter_mut()
                .find(|r| r.line_idx == line.line_idx && r.sent_idx == sentence.sent_idx)
            {
                if req.sentence != sentence.source_text {
                    req.sentence = sentence.source_text.clone();
                    req.translated_langs.clear();
                }
            } else {
                queue.push(TranslationRequest {
                    line_idx: line.line_idx,
                    sent_idx: sentence.sent_idx,
                    sentence: sentence.source_text.clone(),
                    translated_langs: HashSet::new(),
                });
            }
        }
    }

    fn last_n_sentences(&self, lines: &[Line]) -> Vec<BroadcastSentence> {
        let mut collected: Vec<BroadcastSentence> = Vec::new();
        'outer: for line in lines.iter().rev() {
            for sentence in line.sentences.iter().rev() {
                collected.push(BroadcastSentence {
                    line_idx: line.line_idx,
                    sent_idx: sentence.sent_idx,
                    source_text: sentence.source_text.clone(),
                    translations: sentence.translations.clone(),
                });
                if collected.len() >= self.broadcast_sentences {
                    break 'outer;
                }
            }
        }
        collected.reverse();
        collected
    }

    fn publish(&self, state: &mut ReconcilerState) {
        let chunk = BroadcastChunk {
            last_n_sents: self.last_n_sentences(&state.lines),
            incomplete_sentence: state.incomplete_sentence.clone(),
            transcription_delay: state.transcription_delay.value(),
            translation_delay: state.translation_delay.value(),
        };
        state.last_chunk = Some(chunk.clone());
        // Non-blocking: no receivers simply means the chunk is dropped.
        let _ = self.tx.send(chunk);
        if let Some(persist) = &self.persist {
            persist(&state.lines);
        }
    }
}

/// Positionally reconciles a line's sentences against freshly tokenized
/// text: an unchanged source keeps its old Sentence (and translations);
/// anything else is replaced with a fresh, translation-less Sentence.
fn reconcile_sentences(existing: &mut Vec<Sentence>, new_texts: &[String]) {
    for (j, text) in new_texts.iter().enumerate() {
        let keep = existing.get(j).is_some_and(|old| old.source_text == *text);
        if keep {
            continue;
        }
        let replacement = Sentence::new(j, text.clone());
        if j < existing.len() {
            existing[j] = replacement;
        } else {
            existing.push(replacement);
        }
    }
    existing.truncate(new_texts.len());
}
