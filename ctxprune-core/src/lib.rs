//! # ctxprune-core
//!
//! Foundation crate for the ctxprune pruning pipeline.
//! Defines the passage model, tokenizer traits, errors, and config.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod errors;
pub mod passage;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::{CompressionConfig, PromptShape, QuestionMode, ScoreMode};
pub use errors::{PruneError, PruneResult};
pub use passage::Passage;
pub use traits::{LengthTokenizer, ScoringTokenizer};
