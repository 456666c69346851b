//! Context-level selection: keep whole passages under a length budget.

use ctxprune_core::config::{CompressionConfig, PromptShape};
use ctxprune_core::errors::{PruneError, PruneResult};
use ctxprune_core::passage::Passage;
use ctxprune_core::traits::{LengthTokenizer, ScoringTokenizer};
use tracing::{debug, warn};

use crate::{align, render};

/// Passages surviving context selection, their score/token-id arrays in the
/// same order, and the selected `org_idx` values in descending score order
/// (consumed by sentence selection's rank-based budget split).
#[derive(Debug)]
pub struct ContextSelection {
    pub passages: Vec<Passage>,
    pub scores: Vec<Vec<f64>>,
    pub token_ids: Vec<Vec<u32>>,
    pub ranked_org_idx: Vec<usize>,
}

pub struct ContextSelector<'a> {
    config: &'a CompressionConfig,
    shape: &'a PromptShape,
    scoring: &'a dyn ScoringTokenizer,
    length: &'a dyn LengthTokenizer,
}

impl<'a> ContextSelector<'a> {
    pub fn new(
        config: &'a CompressionConfig,
        shape: &'a PromptShape,
        scoring: &'a dyn ScoringTokenizer,
        length: &'a dyn LengthTokenizer,
    ) -> Self {
        Self {
            config,
            shape,
            scoring,
            length,
        }
    }

    pub fn select(
        &self,
        question: &str,
        mut passages: Vec<Passage>,
        scores: Vec<Vec<f64>>,
        token_ids: Vec<Vec<u32>>,
    ) -> PruneResult<ContextSelection> {
        if passages.is_empty() {
            return Err(PruneError::NoDocumentsFound);
        }

        let titles: Vec<Option<String>> = passages.iter().map(|p| p.title.clone()).collect();
        let ctx_scores = align::ctx_scores(
            &scores,
            self.config.ctx_score_mode,
            self.config.question_mode,
            self.config.include_end_token,
            self.scoring,
            question,
            &titles,
            &self.shape.pattern,
        )?;

        // Candidate positions, best score first.
        let mut order: Vec<usize> = (0..passages.len()).collect();
        order.sort_by(|&a, &b| {
            ctx_scores[b]
                .partial_cmp(&ctx_scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let selected = match self.config.ctx_score_cumsum {
            Some(percentile) => self.select_by_percentile(&order, &ctx_scores, percentile),
            None => self.select_greedy(&order, &passages, question),
        };

        // Percentile mode records each survivor's normalized share of the
        // score mass; greedy mode keeps the raw aggregate.
        let total: f64 = ctx_scores.iter().sum();
        let normalize =
            self.config.ctx_score_cumsum.is_some() && total > 0.0 && total.is_finite();
        for &i in &selected {
            passages[i].ctx_score = if normalize {
                ctx_scores[i] / total
            } else {
                ctx_scores[i]
            };
        }

        let ranked_org_idx: Vec<usize> = selected.iter().map(|&i| passages[i].org_idx).collect();

        let mut output_order = selected;
        if !self.config.do_sort_ctx {
            output_order.sort_unstable();
        }

        debug!(
            kept = output_order.len(),
            ranked = ?ranked_org_idx,
            "context selection complete"
        );

        Ok(ContextSelection {
            passages: output_order.iter().map(|&i| passages[i].clone()).collect(),
            scores: output_order.iter().map(|&i| scores[i].clone()).collect(),
            token_ids: output_order.iter().map(|&i| token_ids[i].clone()).collect(),
            ranked_org_idx,
        })
    }

    /// Cut where the cumulative normalized score first strictly exceeds the
    /// percentile. At least one passage is always retained.
    fn select_by_percentile(
        &self,
        order: &[usize],
        ctx_scores: &[f64],
        percentile: f64,
    ) -> Vec<usize> {
        let total: f64 = ctx_scores.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            warn!(total, "non-positive score mass, keeping all passages");
            return order.to_vec();
        }

        let mut cut = order.len();
        let mut cumulative = 0.0;
        for (rank, &i) in order.iter().enumerate() {
            cumulative += ctx_scores[i] / total;
            if cumulative > percentile {
                cut = rank + 1;
                break;
            }
        }
        order[..cut.max(1)].to_vec()
    }

    /// Walk passages best-first, accumulating rendered lengths toward the
    /// budget. Without sentence compression, stop before a passage whose
    /// addition would land farther from the target than stopping here; with
    /// it, overshoot is tolerated because the sentence stage shrinks it.
    fn select_greedy(&self, order: &[usize], passages: &[Passage], question: &str) -> Vec<usize> {
        let target = self.config.ctx_comp_len;
        let titled = passages.first().is_some_and(|p| p.title.is_some());
        let mut len_total = render::empty_prompt_len(self.length, self.shape, question, titled);
        let mut selected = Vec::new();

        for &i in order {
            let len_ctx = render::rendered_len(self.length, &passages[i]);
            if !self.config.comp_sent
                && len_total.abs_diff(target) < (len_total + len_ctx).abs_diff(target)
            {
                break;
            }
            len_total += len_ctx;
            selected.push(i);
            if len_total >= target {
                break;
            }
        }

        debug!(len_total, target, kept = selected.len(), "greedy accumulation");
        selected
    }
}
