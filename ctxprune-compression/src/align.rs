//! Maps raw per-token score arrays onto passage content.
//!
//! The scoring model sees `"question: {q} title: {t} {pattern} {text}"`, so a
//! passage's score array starts with question/title tokens that must not count
//! toward passage-level aggregates when `QuestionMode::Exclude` is set. The
//! offset is re-derived here by encoding the prefix with the scoring
//! tokenizer, not carried along from upstream.

use ctxprune_core::config::{QuestionMode, ScoreMode};
use ctxprune_core::errors::{PruneError, PruneResult};
use ctxprune_core::traits::ScoringTokenizer;
use tracing::warn;

/// Untitled questions are truncated to their last 252 tokens before the
/// offset is measured, bounding it for abnormally long questions.
const MAX_QUESTION_TOKENS: usize = 252;

/// Index into each passage's score array where passage content begins.
///
/// Titles must be present for every passage or absent for every passage.
pub fn ctx_start_indices(
    tokenizer: &dyn ScoringTokenizer,
    question: &str,
    titles: &[Option<String>],
    pattern: &str,
) -> PruneResult<Vec<usize>> {
    let titled = titles.first().is_some_and(|t| t.is_some());
    if titles.iter().any(|t| t.is_some() != titled) {
        return Err(PruneError::MixedTitles);
    }

    let len_pattern = tokenizer.encode(pattern)?.len();

    if titled {
        let rendered: Vec<String> = titles
            .iter()
            .map(|t| format!("question: {question} title: {}", t.as_deref().unwrap_or_default()))
            .collect();
        let encoded = tokenizer.batch_encode(&rendered)?;
        Ok(encoded.iter().map(|ids| ids.len() + len_pattern).collect())
    } else {
        let question_ids = tokenizer.encode(&format!("question: {question}"))?;
        let len_question = question_ids.len().min(MAX_QUESTION_TOKENS);
        Ok(vec![len_question + len_pattern; titles.len()])
    }
}

/// Restrict each score/token-id row to its passage-content sub-range: after
/// the question/title prefix, before the trailing end-of-sequence sentinel.
pub fn content_regions(
    tokenizer: &dyn ScoringTokenizer,
    question: &str,
    titles: &[Option<String>],
    pattern: &str,
    scores: &[Vec<f64>],
    token_ids: &[Vec<u32>],
) -> PruneResult<(Vec<Vec<f64>>, Vec<Vec<u32>>)> {
    let starts = ctx_start_indices(tokenizer, question, titles, pattern)?;
    let eos = tokenizer.eos_token_id();

    let mut content_scores = Vec::with_capacity(scores.len());
    let mut content_ids = Vec::with_capacity(token_ids.len());
    for ((score_row, id_row), &start) in scores.iter().zip(token_ids).zip(&starts) {
        let end = id_row
            .iter()
            .rposition(|&id| id == eos)
            .unwrap_or(id_row.len());
        let start = start.min(score_row.len());
        let end = end.clamp(start, score_row.len());
        content_scores.push(score_row[start..end].to_vec());
        content_ids.push(id_row[start..end].to_vec());
    }
    Ok((content_scores, content_ids))
}

/// Per-passage aggregate score over the content sub-range.
///
/// Zero-valued slots are padding and are filtered out before pooling. With
/// `include_end_token = false` the final remaining slot is dropped too.
pub fn ctx_scores(
    batch_scores: &[Vec<f64>],
    mode: ScoreMode,
    question_mode: QuestionMode,
    include_end_token: bool,
    tokenizer: &dyn ScoringTokenizer,
    question: &str,
    titles: &[Option<String>],
    pattern: &str,
) -> PruneResult<Vec<f64>> {
    let starts = match question_mode {
        QuestionMode::Include => vec![0; batch_scores.len()],
        QuestionMode::Exclude => ctx_start_indices(tokenizer, question, titles, pattern)?,
    };

    let mut aggregates = Vec::with_capacity(batch_scores.len());
    for (scores, &start) in batch_scores.iter().zip(&starts) {
        let start = start.min(scores.len());
        let mut content: Vec<f64> = scores[start..].iter().copied().filter(|s| *s != 0.0).collect();
        if !include_end_token {
            content.pop();
        }

        if content.is_empty() {
            warn!(start, "no scoreable tokens in passage content range");
            aggregates.push(0.0);
            continue;
        }

        let agg = match mode {
            ScoreMode::Mean => content.iter().sum::<f64>() / content.len() as f64,
            ScoreMode::Max => content.iter().copied().fold(f64::MIN, f64::max),
            ScoreMode::Sum => content.iter().sum(),
        };
        aggregates.push(agg);
    }

    Ok(aggregates)
}
