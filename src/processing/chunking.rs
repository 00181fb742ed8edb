//! Word-budget chunking helpers.
//!
//! Notes are split on whitespace-delimited words and packed greedily into chunks of at most
//! `max_words` words. Highlights:
//!
//! - Words are never split; a chunk boundary always falls between two words.
//! - Each chunk is the exact slice of the source from its first word to its last word, so the
//!   original spacing inside a chunk survives and a note that fits in one chunk is returned
//!   as its trimmed text.
//! - Output depends only on `(text, max_words)`; the chunk order becomes the stored index.
//! - `truncate_words` implements the note size cap applied before chunking.

use super::types::ChunkingError;

/// Split `text` into ordered chunks of at most `max_words` words.
///
/// Returns an empty vector for empty or whitespace-only input and at least one chunk otherwise.
pub fn chunk_words(text: &str, max_words: usize) -> Result<Vec<String>, ChunkingError> {
    if max_words == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let spans = word_spans(text);
    let chunks = spans
        .chunks(max_words)
        .filter_map(|group| {
            let (start, _) = group.first()?;
            let (_, end) = group.last()?;
            Some(text[*start..*end].to_string())
        })
        .collect();
    Ok(chunks)
}

/// Keep at most `max_words` words of `text`, returning the kept slice and whether a tail
/// was dropped.
pub fn truncate_words(text: &str, max_words: usize) -> (&str, bool) {
    let mut seen = 0usize;
    let mut in_word = false;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if in_word {
                in_word = false;
                if seen == max_words {
                    let rest = &text[idx..];
                    let dropped = rest.split_whitespace().next().is_some();
                    return (&text[..idx], dropped);
                }
            }
        } else if !in_word {
            in_word = true;
            seen += 1;
            if seen > max_words {
                return (text[..idx].trim_end(), true);
            }
        }
    }
    (text, false)
}

/// Count whitespace-delimited words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                spans.push((begin, idx));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(begin) = start {
        spans.push((begin, text.len()));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn chunk_words_respects_word_budget() {
        let chunks = chunk_words("one two three four five", 2).expect("chunks");
        assert_eq!(chunks, vec!["one two", "three four", "five"]);
    }

    #[test]
    fn chunk_words_handles_empty_input() {
        assert!(chunk_words("", 4).expect("chunks").is_empty());
        assert!(chunk_words(" \n\t ", 4).expect("chunks").is_empty());
    }

    #[test]
    fn chunk_words_rejects_zero_budget() {
        let error = chunk_words("hello", 0).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn short_text_yields_single_chunk_equal_to_text() {
        let text = "Rust ownership\nrules explained";
        let chunks = chunk_words(text, 10).expect("chunks");
        assert_eq!(chunks, vec![text.to_string()]);

        let padded = chunk_words("  padded text  ", 2).expect("chunks");
        assert_eq!(padded, vec!["padded text".to_string()]);
    }

    #[test]
    fn chunking_is_deterministic_and_lossless() {
        let text = "The quick  brown fox\tjumps over the lazy dog. Ünïcödé wörds stay whole; \
                    punctuation-heavy tokens like a.b.c and https://example.org/x?y=1 too.";
        for budget in 1..8 {
            let first = chunk_words(text, budget).expect("chunks");
            let second = chunk_words(text, budget).expect("chunks");
            assert_eq!(first, second);

            for chunk in &first {
                let count = count_words(chunk);
                assert!(count >= 1 && count <= budget, "chunk {chunk:?} over budget {budget}");
            }

            let rejoined: Vec<&str> = first.iter().flat_map(|chunk| words(chunk)).collect();
            assert_eq!(rejoined, words(text));
        }
    }

    #[test]
    fn truncate_words_caps_long_text() {
        let (kept, truncated) = truncate_words("a b c d e", 3);
        assert_eq!(kept, "a b c");
        assert!(truncated);
    }

    #[test]
    fn truncate_words_keeps_short_text() {
        let (kept, truncated) = truncate_words("a b c", 3);
        assert_eq!(kept, "a b c");
        assert!(!truncated);

        let (kept, truncated) = truncate_words("a b c   ", 3);
        assert_eq!(kept, "a b c");
        assert!(!truncated);

        let (kept, truncated) = truncate_words("a b", 5);
        assert_eq!(kept, "a b");
        assert!(!truncated);
    }
}
