//! Sentence segmentation with lossless separator recovery.
//!
//! Sentences are exact, non-overlapping substrings of the input; the
//! whitespace between consecutive sentences (and before the first) is kept as
//! a separator list so that `sep[0] + sent[0] + sep[1] + sent[1] + ...`
//! reproduces the original text. Dropping a sentence drops exactly its span
//! plus its leading separator.

/// A passage split into sentences plus the separators preceding each one.
/// `separators.len() == sentences.len()`; `separators[0]` is usually empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmented {
    pub sentences: Vec<String>,
    pub separators: Vec<String>,
}

impl Segmented {
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// Split `text` at sentence terminators (`.`, `!`, `?` followed by
/// whitespace) and newlines. Trailing quotes and brackets stick to the
/// sentence they close.
pub fn segment(text: &str) -> Segmented {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(i);
        }

        if c == '\n' {
            // Hard break regardless of punctuation.
            if let Some(s) = start {
                if i > s {
                    spans.push((s, i));
                }
            }
            start = None;
            continue;
        }

        if matches!(c, '.' | '!' | '?') {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if matches!(next, '.' | '!' | '?' | '"' | '\'' | ')' | ']') {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let at_boundary = match chars.peek() {
                Some(&(_, next)) => next.is_whitespace(),
                None => true,
            };
            if at_boundary {
                if let Some(s) = start {
                    spans.push((s, end));
                }
                start = None;
            }
        }
    }

    if let Some(s) = start {
        if text.len() > s {
            spans.push((s, text.len()));
        }
    }

    let mut sentences = Vec::with_capacity(spans.len());
    let mut separators = Vec::with_capacity(spans.len());
    let mut prev_end = 0;
    for &(s, e) in &spans {
        separators.push(text[prev_end..s].to_string());
        sentences.push(text[s..e].to_string());
        prev_end = e;
    }

    Segmented {
        sentences,
        separators,
    }
}
