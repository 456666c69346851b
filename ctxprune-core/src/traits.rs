use crate::errors::PruneResult;

/// Reference tokenizer used purely for length bookkeeping.
///
/// Budgets are always measured against this tokenizer, never against the
/// scoring model's vocabulary. The split is deliberate: selection decisions
/// happen on the scoring tokenizer's grid, length accounting here.
pub trait LengthTokenizer {
    fn token_len(&self, text: &str) -> usize;
}

/// Tokenizer matching the scoring model's vocabulary.
///
/// Used to compute question/title offsets into score arrays, to re-tokenize
/// sentences for score pooling, and to decode retained token ids back to
/// text after token-level compression.
pub trait ScoringTokenizer {
    fn encode(&self, text: &str) -> PruneResult<Vec<u32>>;

    fn batch_encode(&self, texts: &[String]) -> PruneResult<Vec<Vec<u32>>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }

    fn decode(&self, ids: &[u32]) -> PruneResult<String>;

    /// Structural "empty span" sentinel. Never dropped by token selection.
    fn empty_token_id(&self) -> u32;

    /// End-of-sequence sentinel. Marks the end of passage content in score
    /// arrays and is stripped before decoding.
    fn eos_token_id(&self) -> u32;
}
