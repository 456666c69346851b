//! Token-level selection over the concatenated remaining token stream.

use std::sync::OnceLock;

use ctxprune_core::errors::PruneResult;
use ctxprune_core::passage::Passage;
use ctxprune_core::traits::ScoringTokenizer;
use regex::Regex;
use tracing::debug;

fn multi_space() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("literal regex"))
}

pub struct TokenSelector<'a> {
    scoring: &'a dyn ScoringTokenizer,
    /// Fraction of the concatenated token stream to keep.
    token_lamb: f64,
}

impl<'a> TokenSelector<'a> {
    pub fn new(scoring: &'a dyn ScoringTokenizer, token_lamb: f64) -> Self {
        Self {
            scoring,
            token_lamb,
        }
    }

    /// Keep the globally top-scoring `floor(total * token_lamb)` positions,
    /// plus every empty-span sentinel position regardless of score, then
    /// decode each passage's survivors back to text.
    pub fn select(
        &self,
        mut passages: Vec<Passage>,
        scores: &[Vec<f64>],
        token_ids: &[Vec<u32>],
    ) -> PruneResult<Vec<Passage>> {
        let lens: Vec<usize> = scores.iter().map(Vec::len).collect();
        let flat_scores: Vec<f64> = scores.iter().flatten().copied().collect();
        let flat_ids: Vec<u32> = token_ids.iter().flatten().copied().collect();

        let total = flat_scores.len();
        let target_len = (total as f64 * self.token_lamb) as usize;

        let mut order: Vec<usize> = (0..total).collect();
        order.sort_by(|&a, &b| {
            flat_scores[b]
                .partial_cmp(&flat_scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut keep = vec![false; total];
        for &i in order.iter().take(target_len) {
            keep[i] = true;
        }

        // Empty-span sentinels are structural, never dropped.
        let empty_id = self.scoring.empty_token_id();
        let eos_id = self.scoring.eos_token_id();
        for (i, &id) in flat_ids.iter().enumerate() {
            if id == empty_id {
                keep[i] = true;
            }
        }

        debug!(total, target_len, "token selection");

        let mut start = 0usize;
        for (passage, &len) in passages.iter_mut().zip(&lens) {
            let end = start + len;
            let kept_ids: Vec<u32> = (start..end)
                .filter(|&i| keep[i])
                .map(|i| flat_ids[i])
                .filter(|&id| id != eos_id)
                .collect();
            let text = self.scoring.decode(&kept_ids)?;
            passage.text = multi_space().replace_all(&text, " ").into_owned();
            start = end;
        }

        Ok(passages)
    }
}
