#![allow(dead_code)]

//! Deterministic stand-ins for the scoring and reference tokenizers.

use std::collections::HashMap;
use std::sync::Mutex;

use ctxprune_core::errors::PruneResult;
use ctxprune_core::traits::{LengthTokenizer, ScoringTokenizer};

pub const EMPTY_ID: u32 = 3;
pub const EOS_ID: u32 = 2;
const FIRST_WORD_ID: u32 = 10;

/// Whitespace tokenizer with an interned vocabulary: one id per distinct
/// word, ids below `FIRST_WORD_ID` reserved for sentinels.
#[derive(Default)]
pub struct MockScoringTok {
    vocab: Mutex<Vec<String>>,
    index: Mutex<HashMap<String, u32>>,
}

impl MockScoringTok {
    fn intern(&self, word: &str) -> u32 {
        let mut index = self.index.lock().unwrap();
        if let Some(&id) = index.get(word) {
            return id;
        }
        let mut vocab = self.vocab.lock().unwrap();
        let id = FIRST_WORD_ID + vocab.len() as u32;
        vocab.push(word.to_string());
        index.insert(word.to_string(), id);
        id
    }
}

impl ScoringTokenizer for MockScoringTok {
    fn encode(&self, text: &str) -> PruneResult<Vec<u32>> {
        Ok(text.split_whitespace().map(|w| self.intern(w)).collect())
    }

    fn decode(&self, ids: &[u32]) -> PruneResult<String> {
        let vocab = self.vocab.lock().unwrap();
        let words: Vec<&str> = ids
            .iter()
            .filter(|&&id| id >= FIRST_WORD_ID)
            .filter_map(|&id| vocab.get((id - FIRST_WORD_ID) as usize))
            .map(String::as_str)
            .collect();
        Ok(words.join(" "))
    }

    fn empty_token_id(&self) -> u32 {
        EMPTY_ID
    }

    fn eos_token_id(&self) -> u32 {
        EOS_ID
    }
}

/// Reference tokenizer counting whitespace-separated words.
pub struct WordLen;

impl LengthTokenizer for WordLen {
    fn token_len(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Build the scoring model's output row for one passage: prefix tokens for
/// `"question: {q} [title: {t}] context:"`, then one id/score per content
/// word, then the end-of-sequence sentinel.
pub fn scored_row(
    tok: &MockScoringTok,
    question: &str,
    title: Option<&str>,
    text: &str,
    word_scores: &[f64],
) -> (Vec<f64>, Vec<u32>) {
    let prefix = match title {
        Some(t) => format!("question: {question} title: {t} context:"),
        None => format!("question: {question} context:"),
    };
    let mut ids = tok.encode(&prefix).unwrap();
    let mut scores = vec![0.01; ids.len()];

    let content_ids = tok.encode(text).unwrap();
    assert_eq!(
        content_ids.len(),
        word_scores.len(),
        "one score per content word"
    );
    ids.extend(content_ids);
    scores.extend_from_slice(word_scores);

    ids.push(EOS_ID);
    scores.push(0.5);
    (scores, ids)
}
