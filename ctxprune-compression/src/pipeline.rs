//! Orchestrates the three selection stages for one question.

use ctxprune_core::config::{CompressionConfig, PromptShape};
use ctxprune_core::errors::{PruneError, PruneResult};
use ctxprune_core::passage::Passage;
use ctxprune_core::traits::{LengthTokenizer, ScoringTokenizer};
use tracing::info;

use crate::align;
use crate::context::ContextSelector;
use crate::sentence::SentenceSelector;
use crate::token::TokenSelector;

/// One question's pruning run: context selection, then optional sentence and
/// token selection, strictly in that order. The pipeline holds no per-run
/// state, so one instance can serve many questions; callers may run questions
/// in parallel since tokenizers are borrowed immutably.
pub struct CompressionPipeline<'a> {
    config: CompressionConfig,
    shape: PromptShape,
    scoring: &'a dyn ScoringTokenizer,
    length: &'a dyn LengthTokenizer,
}

impl<'a> CompressionPipeline<'a> {
    pub fn new(
        config: CompressionConfig,
        shape: PromptShape,
        scoring: &'a dyn ScoringTokenizer,
        length: &'a dyn LengthTokenizer,
    ) -> PruneResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shape,
            scoring,
            length,
        })
    }

    /// Prune one question's passages. `scores[i]` and `token_ids[i]` are the
    /// scoring model's output for `passages[i]` and must be index-aligned.
    ///
    /// A failed question is the caller's to skip; errors here never poison
    /// other questions.
    pub fn run(
        &self,
        question: &str,
        passages: Vec<Passage>,
        scores: Vec<Vec<f64>>,
        token_ids: Vec<Vec<u32>>,
    ) -> PruneResult<Vec<Passage>> {
        if passages.len() != scores.len() || passages.len() != token_ids.len() {
            return Err(PruneError::InvalidConfiguration {
                field: "score_arrays",
                value: format!(
                    "{} passages, {} score rows, {} token-id rows",
                    passages.len(),
                    scores.len(),
                    token_ids.len()
                ),
            });
        }
        for (row, ids) in scores.iter().zip(&token_ids) {
            if row.len() != ids.len() {
                return Err(PruneError::InvalidConfiguration {
                    field: "score_arrays",
                    value: format!("score row {} vs token-id row {}", row.len(), ids.len()),
                });
            }
        }

        let candidates = passages.len();
        let selection = ContextSelector::new(&self.config, &self.shape, self.scoring, self.length)
            .select(question, passages, scores, token_ids)?;

        let (mut passages, mut scores, mut token_ids) =
            (selection.passages, selection.scores, selection.token_ids);

        if self.config.comp_sent {
            let outcome =
                SentenceSelector::new(&self.config, &self.shape, self.scoring, self.length)
                    .select(
                        question,
                        passages,
                        scores,
                        token_ids,
                        &selection.ranked_org_idx,
                    )?;
            passages = outcome.passages;
            scores = outcome.scores;
            token_ids = outcome.token_ids;
        }

        if self.config.comp_tok {
            // Without a preceding sentence stage the rows still carry the
            // question/title prefix and eos slots; restrict them to passage
            // content so the kept fraction is spent on content tokens only.
            if !self.config.comp_sent {
                let titles: Vec<Option<String>> =
                    passages.iter().map(|p| p.title.clone()).collect();
                (scores, token_ids) = align::content_regions(
                    self.scoring,
                    question,
                    &titles,
                    &self.shape.pattern,
                    &scores,
                    &token_ids,
                )?;
            }
            passages = TokenSelector::new(self.scoring, self.config.token_lamb)
                .select(passages, &scores, &token_ids)?;
        }

        info!(
            candidates,
            survivors = passages.len(),
            comp_sent = self.config.comp_sent,
            comp_tok = self.config.comp_tok,
            "pruning complete"
        );

        Ok(passages)
    }
}
