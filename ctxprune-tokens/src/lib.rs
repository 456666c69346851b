//! # ctxprune-tokens
//!
//! Reference-length token counting for budget accounting.
//!
//! Wraps a tiktoken cl100k BPE with a content-hash keyed cache, since the
//! sentence stage re-measures the same separators and short sentences many
//! times per question.

use ctxprune_core::errors::{PruneError, PruneResult};
use ctxprune_core::traits::LengthTokenizer;
use moka::sync::Cache;
use tiktoken_rs::CoreBPE;

/// Entries are (32-byte blake3 key, usize count); 64k of them is a few MiB.
const CACHE_CAPACITY: u64 = 65_536;

/// Token counter over the reference (budgeting) vocabulary.
pub struct TokenCounter {
    bpe: CoreBPE,
    cache: Cache<[u8; 32], usize>,
}

impl TokenCounter {
    pub fn new() -> PruneResult<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| PruneError::Tokenization {
            reason: format!("failed to load cl100k_base: {e}"),
        })?;
        Ok(Self {
            bpe,
            cache: Cache::new(CACHE_CAPACITY),
        })
    }

    /// Exact token count, bypassing the cache.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Token count with content-hash caching.
    pub fn count_cached(&self, text: &str) -> usize {
        let key = *blake3::hash(text.as_bytes()).as_bytes();
        if let Some(count) = self.cache.get(&key) {
            return count;
        }
        let count = self.count(text);
        self.cache.insert(key, count);
        count
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        // The cl100k vocabulary ships embedded in tiktoken-rs; loading it
        // only fails if the crate's own data is corrupt.
        Self::new().expect("embedded cl100k_base vocabulary")
    }
}

impl LengthTokenizer for TokenCounter {
    fn token_len(&self, text: &str) -> usize {
        self.count_cached(text)
    }
}
