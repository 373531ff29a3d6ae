mod error;
mod reconciler;
mod tokenizer;
mod types;

pub use error::ReconcilerError;
pub use reconciler::Reconciler;
pub use tokenizer::{PunctuationTokenizer, SentenceTokenizer};
pub use types::{
    parse_timestamp, BroadcastChunk, BroadcastSentence, HypothesisChunk, IncomingLine, Line,
    RollingAverage, Sentence, TranslationRequest, TranslationResult,
};
