use serde::{Deserialize, Serialize};

/// One retrieved candidate text block.
///
/// `org_idx` is the 1-based retrieval rank and the passage's stable identity:
/// it survives every selection stage unchanged, while `text` is rewritten in
/// place as sentences and tokens are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
    pub org_idx: usize,
    /// Aggregate relevance score, assigned during context selection.
    #[serde(default)]
    pub ctx_score: f64,
}

impl Passage {
    pub fn new(org_idx: usize, text: impl Into<String>, title: Option<String>) -> Self {
        Self {
            text: text.into(),
            title,
            org_idx,
            ctx_score: 0.0,
        }
    }
}
