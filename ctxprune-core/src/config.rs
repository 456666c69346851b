use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{PruneError, PruneResult};

/// Default values shared by `Default` impls and `#[serde(default)]`.
pub mod defaults {
    pub const DEFAULT_CTX_COMP_LEN: usize = 500;
    pub const DEFAULT_SENT_COMP_LEN: usize = 500;
    pub const DEFAULT_POW: f64 = 1.0;
    pub const DEFAULT_TOKEN_LAMB: f64 = 1.0;

    pub const DEFAULT_INSTRUCTION: &str = "Write a high-quality answer for the given question \
         using only the provided search results (some of which might be irrelevant).";
    pub const DEFAULT_QUESTION_TEMPLATE: &str = "Question: {question}\nAnswer:";
    /// Literal string the scoring model places between the title and the
    /// passage body ("question: {q} title: {t} context: {text}").
    pub const DEFAULT_PATTERN: &str = "context:";
}

/// How per-token scores are pooled into one aggregate score per passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    Mean,
    Max,
    Sum,
}

impl FromStr for ScoreMode {
    type Err = PruneError;

    fn from_str(s: &str) -> PruneResult<Self> {
        match s {
            "mean" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            "sum" => Ok(Self::Sum),
            other => Err(PruneError::InvalidConfiguration {
                field: "ctx_score_mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether the "question [title]" prefix tokens count toward passage scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionMode {
    Include,
    Exclude,
}

impl FromStr for QuestionMode {
    type Err = PruneError;

    fn from_str(s: &str) -> PruneResult<Self> {
        match s {
            "include" => Ok(Self::Include),
            "exclude" => Ok(Self::Exclude),
            other => Err(PruneError::InvalidConfiguration {
                field: "question_mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Pruning pipeline configuration.
///
/// Budgets (`ctx_comp_len`, `sent_comp_len`) are measured in *reference*
/// tokenizer tokens; selection decisions are made on the scoring tokenizer's
/// grid. `token_lamb` is a fraction of the scoring-tokenizer token count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Keep score-descending order after context selection (vs. original order).
    pub do_sort_ctx: bool,
    pub ctx_score_mode: ScoreMode,
    pub question_mode: QuestionMode,
    /// Include the final token of the content sub-range in the aggregate.
    pub include_end_token: bool,
    /// Context-selection budget (reference-tokenizer tokens).
    pub ctx_comp_len: usize,
    /// When set, context selection cuts by cumulative score percentile
    /// instead of greedy length accumulation.
    pub ctx_score_cumsum: Option<f64>,
    /// Run sentence-level compression after context selection. Also relaxes
    /// the greedy context stop, since overshoot will be shrunk later.
    pub comp_sent: bool,
    /// Sentence-compression budget: total length to *remove* across passages
    /// (reference-tokenizer tokens).
    pub sent_comp_len: usize,
    /// Split the sentence budget by inverse passage score instead of evenly.
    pub adaptive_sent_comp: bool,
    /// Exponent sharpening the adaptive split.
    pub pow: f64,
    /// Never drop every sentence of a passage.
    pub constraint_1_sent: bool,
    /// Run token-level compression after the earlier stages.
    pub comp_tok: bool,
    /// Fraction of scoring-tokenizer tokens kept by token-level compression.
    pub token_lamb: f64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            do_sort_ctx: false,
            ctx_score_mode: ScoreMode::Mean,
            question_mode: QuestionMode::Exclude,
            include_end_token: false,
            ctx_comp_len: defaults::DEFAULT_CTX_COMP_LEN,
            ctx_score_cumsum: None,
            comp_sent: false,
            sent_comp_len: defaults::DEFAULT_SENT_COMP_LEN,
            adaptive_sent_comp: false,
            pow: defaults::DEFAULT_POW,
            constraint_1_sent: false,
            comp_tok: false,
            token_lamb: defaults::DEFAULT_TOKEN_LAMB,
        }
    }
}

impl CompressionConfig {
    /// Load from a TOML document.
    pub fn from_toml_str(s: &str) -> PruneResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| PruneError::InvalidConfiguration {
            field: "config",
            value: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject numeric values outside their meaningful ranges.
    pub fn validate(&self) -> PruneResult<()> {
        if !(0.0..=1.0).contains(&self.token_lamb) {
            return Err(PruneError::InvalidConfiguration {
                field: "token_lamb",
                value: self.token_lamb.to_string(),
            });
        }
        if let Some(p) = self.ctx_score_cumsum {
            if !(0.0..=1.0).contains(&p) {
                return Err(PruneError::InvalidConfiguration {
                    field: "ctx_score_cumsum",
                    value: p.to_string(),
                });
            }
        }
        if self.pow <= 0.0 {
            return Err(PruneError::InvalidConfiguration {
                field: "pow",
                value: self.pow.to_string(),
            });
        }
        Ok(())
    }
}

/// Strings used only to measure rendered prompt lengths for budgeting.
/// Prompt assembly for the generation model happens downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptShape {
    pub instruction: String,
    /// Must contain a `{question}` placeholder.
    pub question_template: String,
    /// Scoring-model pattern string preceding passage content.
    pub pattern: String,
}

impl Default for PromptShape {
    fn default() -> Self {
        Self {
            instruction: defaults::DEFAULT_INSTRUCTION.to_string(),
            question_template: defaults::DEFAULT_QUESTION_TEMPLATE.to_string(),
            pattern: defaults::DEFAULT_PATTERN.to_string(),
        }
    }
}

impl PromptShape {
    pub fn render_question(&self, question: &str) -> String {
        self.question_template.replace("{question}", question)
    }
}
