//! Sentence-level selection inside surviving passages.
//!
//! Each passage's score array is first restricted to its content region
//! (after the question/title prefix, before the end-of-sequence sentinel),
//! then pooled per sentence by re-tokenizing the sentences and walking
//! cumulative token counts. Passages are processed lowest-score-first while a
//! fold carries the global removed-length accumulator and the per-rank budget
//! allowances, so savings beyond one passage's allowance shrink the
//! allowances of better-ranked passages and shortfalls roll back to the
//! previous rank.

use std::collections::HashMap;

use ctxprune_core::config::{CompressionConfig, PromptShape};
use ctxprune_core::errors::PruneResult;
use ctxprune_core::passage::Passage;
use ctxprune_core::traits::{LengthTokenizer, ScoringTokenizer};
use tracing::{debug, warn};

use crate::{align, render, segment};

/// Passages after sentence compression, with their score/token-id arrays
/// rebuilt from the surviving sentences.
pub struct SentenceOutcome {
    pub passages: Vec<Passage>,
    pub scores: Vec<Vec<f64>>,
    pub token_ids: Vec<Vec<u32>>,
}

/// One passage's sentences pooled against its content score array.
struct PooledPassage {
    sentences: Vec<String>,
    separators: Vec<String>,
    /// Sentences at and past this index had no score slots (the scoring
    /// model truncated the passage) and are always kept verbatim.
    scored: usize,
    mean_scores: Vec<f64>,
    score_slices: Vec<Vec<f64>>,
    id_slices: Vec<Vec<u32>>,
}

pub struct SentenceSelector<'a> {
    config: &'a CompressionConfig,
    shape: &'a PromptShape,
    scoring: &'a dyn ScoringTokenizer,
    length: &'a dyn LengthTokenizer,
}

impl<'a> SentenceSelector<'a> {
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
        ranked_org_idx: &[usize],
    ) -> PruneResult<SentenceOutcome> {
        let titles: Vec<Option<String>> = passages.iter().map(|p| p.title.clone()).collect();
        let (content_scores, content_ids) = align::content_regions(
            self.scoring,
            question,
            &titles,
            &self.shape.pattern,
            &scores,
            &token_ids,
        )?;

        // Pool sentence scores; tokenizer failures are per-passage faults.
        let mut removal = vec![false; passages.len()];
        let mut pooled: Vec<Option<PooledPassage>> = Vec::with_capacity(passages.len());
        for (i, passage) in passages.iter().enumerate() {
            match self.pool_passage(passage, &content_scores[i], &content_ids[i]) {
                Ok(p) => pooled.push(Some(p)),
                Err(e) => {
                    warn!(org_idx = passage.org_idx, error = %e, "sentence tokenization failed, dropping passage");
                    removal[i] = true;
                    pooled.push(None);
                }
            }
        }

        let sent_target = self.config.sent_comp_len as i64;
        let mut allowances = self.allowances(&passages);
        let rank_of: HashMap<usize, usize> = ranked_org_idx
            .iter()
            .enumerate()
            .map(|(rank, &org)| (org, rank))
            .collect();
        let position_of: HashMap<usize, usize> = passages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.org_idx, i))
            .collect();

        let mut new_scores: HashMap<usize, Vec<f64>> = HashMap::new();
        let mut new_ids: HashMap<usize, Vec<u32>> = HashMap::new();
        let mut total_comp_len: i64 = 0;

        // Lowest-scored passage first, so leftover budget rolls toward the
        // better-ranked passages processed later.
        for &org in ranked_org_idx.iter().rev() {
            let (Some(&rank), Some(&i)) = (rank_of.get(&org), position_of.get(&org)) else {
                continue;
            };
            if removal[i] {
                continue;
            }
            let Some(pool) = &pooled[i] else { continue };

            if pool.mean_scores.is_empty() {
                warn!(org_idx = org, "no scoreable sentences, dropping passage");
                removal[i] = true;
                continue;
            }

            let allowance = allowances[rank];
            if total_comp_len >= sent_target || allowance <= 0 {
                new_scores.insert(org, content_scores[i].clone());
                new_ids.insert(org, content_ids[i].clone());
                continue;
            }

            let ctx_len = render::rendered_len(self.length, &passages[i]) as i64;

            // Drop lowest-mean-score sentences first.
            let mut drop_order: Vec<usize> = (0..pool.mean_scores.len()).collect();
            drop_order.sort_by(|&a, &b| {
                pool.mean_scores[a]
                    .partial_cmp(&pool.mean_scores[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut cur_comp_len: i64 = 0;
            let mut dropped = 0usize;
            for (r, &sent_idx) in drop_order.iter().enumerate() {
                let piece = format!("{}{}", pool.separators[sent_idx], pool.sentences[sent_idx]);
                let sent_len = self.length.token_len(&piece) as i64;
                cur_comp_len += sent_len;
                total_comp_len += sent_len;
                dropped = r + 1;
                if total_comp_len >= sent_target {
                    // Restore the last sentence if stopping one short lands
                    // closer to the global target.
                    if (total_comp_len - sent_len - sent_target).abs()
                        < (total_comp_len - sent_target).abs()
                    {
                        dropped = r;
                        total_comp_len -= sent_len;
                        cur_comp_len -= sent_len;
                    }
                    break;
                } else if cur_comp_len >= allowance {
                    break;
                }
            }

            if self.config.constraint_1_sent && dropped == drop_order.len() {
                dropped -= 1;
            }

            let actual_comp_len: i64;
            if dropped == drop_order.len() {
                removal[i] = true;
                actual_comp_len = ctx_len;
                debug!(org_idx = org, "all sentences dropped, removing passage");
            } else {
                let mut kept: Vec<usize> = drop_order[dropped..].to_vec();
                kept.sort_unstable();

                let mut text = String::new();
                let mut kept_scores = Vec::new();
                let mut kept_ids = Vec::new();
                for &si in &kept {
                    text.push_str(&pool.separators[si]);
                    text.push_str(&pool.sentences[si]);
                    kept_scores.extend_from_slice(&pool.score_slices[si]);
                    kept_ids.extend_from_slice(&pool.id_slices[si]);
                }
                for (k, rest) in pool.sentences[pool.scored..].iter().enumerate() {
                    text.push_str(&pool.separators[pool.scored + k]);
                    text.push_str(rest);
                }

                passages[i].text = text;
                let after_len = render::rendered_len(self.length, &passages[i]) as i64;
                actual_comp_len = ctx_len - after_len;
                new_scores.insert(org, kept_scores);
                new_ids.insert(org, kept_ids);
            }

            // Reconcile requested vs. realized savings: the loop counted
            // sentence lengths, the wrapper re-measure is authoritative.
            total_comp_len += actual_comp_len - cur_comp_len;

            if actual_comp_len > allowance {
                // Overshoot eats into the best-ranked remaining allowances.
                let mut exceed = actual_comp_len - allowance;
                for allowance_slot in allowances.iter_mut().take(rank) {
                    if exceed == 0 {
                        break;
                    }
                    if *allowance_slot > 0 {
                        let reduced = (*allowance_slot - exceed).max(0);
                        exceed = (exceed - *allowance_slot).max(0);
                        *allowance_slot = reduced;
                    }
                }
            } else if rank > 0 {
                // Shortfall becomes extra allowance for the next-better rank.
                allowances[rank - 1] += allowance - actual_comp_len;
            }
        }

        debug!(
            total_comp_len,
            sent_target,
            removed = removal.iter().filter(|&&r| r).count(),
            "sentence selection complete"
        );

        let mut out = SentenceOutcome {
            passages: Vec::new(),
            scores: Vec::new(),
            token_ids: Vec::new(),
        };
        for (i, passage) in passages.into_iter().enumerate() {
            if removal[i] {
                continue;
            }
            let org = passage.org_idx;
            out.scores
                .push(new_scores.remove(&org).unwrap_or_else(|| content_scores[i].clone()));
            out.token_ids
                .push(new_ids.remove(&org).unwrap_or_else(|| content_ids[i].clone()));
            out.passages.push(passage);
        }
        Ok(out)
    }

    /// Per-rank removal budgets. Uniform split by default; the adaptive split
    /// gives low-scored passages a larger share, proportional to
    /// `1 / score^pow`, and is sorted ascending so rank 0 (best passage)
    /// holds the smallest allowance.
    fn allowances(&self, passages: &[Passage]) -> Vec<i64> {
        let n = passages.len();
        let total = self.config.sent_comp_len as f64;

        if self.config.adaptive_sent_comp && n > 1 {
            let inverse: Vec<f64> = passages
                .iter()
                .map(|p| 1.0 / p.ctx_score.powf(self.config.pow))
                .collect();
            let mass: f64 = inverse.iter().sum();
            if mass.is_finite() && mass > 0.0 {
                let mut split: Vec<i64> = inverse
                    .iter()
                    .map(|x| ((x / mass) * total) as i64)
                    .collect();
                split.sort_unstable();
                return split;
            }
            warn!("adaptive split degenerate (non-positive passage scores), using uniform");
        }

        vec![(self.config.sent_comp_len / n.max(1)) as i64; n]
    }

    /// Segment one passage and pool its content score array per sentence by
    /// cumulative token counts from re-encoding the sentences.
    fn pool_passage(
        &self,
        passage: &Passage,
        content_scores: &[f64],
        content_ids: &[u32],
    ) -> PruneResult<PooledPassage> {
        let seg = segment::segment(&passage.text);
        let encoded = self.scoring.batch_encode(&seg.sentences)?;

        let mut mean_scores = Vec::new();
        let mut score_slices = Vec::new();
        let mut id_slices = Vec::new();
        let mut start = 0usize;
        for ids in &encoded {
            if start >= content_scores.len() {
                break;
            }
            let end = (start + ids.len()).min(content_scores.len());
            let slice = &content_scores[start..end];
            let mean = if slice.is_empty() {
                0.0
            } else {
                slice.iter().sum::<f64>() / slice.len() as f64
            };
            mean_scores.push(mean);
            score_slices.push(slice.to_vec());
            id_slices.push(content_ids[start..end.min(content_ids.len())].to_vec());
            start = end;
        }

        let scored = mean_scores.len();
        Ok(PooledPassage {
            sentences: seg.sentences,
            separators: seg.separators,
            scored,
            mean_scores,
            score_slices,
            id_slices,
        })
    }
}
