/// External-collaborator seam for locale-aware sentence splitting. The
/// reconciler is agnostic to how sentences are detected; it only needs
/// complete sentences plus whatever trailing fragment hasn't closed yet.
pub trait SentenceTokenizer {
    /// Splits `text` into complete sentences and an optional trailing
    /// incomplete fragment (a tail not ending in `.`, `!`, or `?`).
    fn split(&self, text: &str) -> (Vec<String>, Option<String>);
}

/// Splits on `. ! ?` boundaries, treating an unterminated tail as incomplete.
/// Ships as the crate's runnable default so no external NLP dependency is
/// required to exercise the reconciler.
#[derive(Debug, Default, Clone, Copy)]
pub struct PunctuationTokenizer;

impl SentenceTokenizer for PunctuationTokenizer {
    fn split(&self, text: &str) -> (Vec<String>, Option<String>) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return (Vec::new(), None);
        }

        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut chars = trimmed.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);
            if matches!(c, '.' | '!' | '?') {
                sentences.push(current.trim().to_string());
                current.clear();
            }
        }

        let incomplete = if current.trim().is_empty() {
            None
        } else {
            Some(current.trim().to_string())
        };

        (sentences, incomplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_sentences_with_trailing_fragment() {
        let tok = PunctuationTokenizer;
        let (done, tail) = tok.split("Hello world. How are you");
        assert_eq!(done, vec!["Hello world."]);
        assert_eq!(tail.as_deref(), Some("How are you"));
    }

    #[test]
    fn fully_terminated_text_has_no_incomplete_tail() {
        let tok = PunctuationTokenizer;
        let (done, tail) = tok.split("Hello world. How are you?");
        assert_eq!(done, vec!["Hello world.", "How are you?"]);
        assert_eq!(tail, None);
    }

    #[test]
    fn trailing_space_with_no_terminator_is_incomplete_only() {
        let tok = PunctuationTokenizer;
        let (done, tail) = tok.split("still talking ");
        assert!(done.is_empty());
        assert_eq!(tail.as_deref(), Some("still talking"));
    }

    #[test]
    fn empty_text_yields_nothing() {
        let tok = PunctuationTokenizer;
        let (done, tail) = tok.split("");
        assert!(done.is_empty());
        assert_eq!(tail, None);
    }
}
