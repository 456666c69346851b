//! # ctxprune-compression
//!
//! Three-stage pruning of retrieved passages under a token budget, driven by
//! per-token relevance scores from an external scoring model:
//!
//! 1. **Context selection** — keep whole passages by aggregate score, either
//!    by cumulative-score percentile or greedy length accumulation.
//! 2. **Sentence selection** — within survivors, drop the lowest-scoring
//!    sentences, rebalancing per-passage budgets across score ranks.
//! 3. **Token selection** — keep the globally top-scoring tokens up to a
//!    final fractional budget and decode back to text.
//!
//! Selection decisions run on the scoring tokenizer's grid; every budget is
//! measured with the independent reference tokenizer.

pub mod align;
pub mod context;
pub mod pipeline;
pub mod render;
pub mod segment;
pub mod sentence;
pub mod token;

pub use context::{ContextSelection, ContextSelector};
pub use pipeline::CompressionPipeline;
pub use sentence::{SentenceOutcome, SentenceSelector};
pub use token::TokenSelector;
