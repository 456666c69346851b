#[path = "../common/mod.rs"]
mod common;

use common::{scored_row, MockScoringTok, WordLen, EMPTY_ID, EOS_ID};
use ctxprune_compression::{CompressionPipeline, TokenSelector};
use ctxprune_core::config::{CompressionConfig, PromptShape, QuestionMode};
use ctxprune_core::errors::PruneResult;
use ctxprune_core::passage::Passage;
use ctxprune_core::traits::ScoringTokenizer;
use proptest::prelude::*;

const QUESTION: &str = "who won";

fn base_config() -> CompressionConfig {
    CompressionConfig {
        question_mode: QuestionMode::Exclude,
        include_end_token: false,
        do_sort_ctx: false,
        ..CompressionConfig::default()
    }
}

/// Build n titled passages with one uniform per-word score each, plus their
/// scoring-model rows.
fn build_inputs(
    tok: &MockScoringTok,
    passage_scores: &[f64],
) -> (Vec<Passage>, Vec<Vec<f64>>, Vec<Vec<u32>>) {
    let mut passages = Vec::new();
    let mut scores = Vec::new();
    let mut ids = Vec::new();
    for (i, &s) in passage_scores.iter().enumerate() {
        let org = i + 1;
        let text = format!("t{org} alpha beta. gamma delta{org}.");
        let title = format!("T{org}");
        let p = Passage::new(org, text.clone(), Some(title.clone()));
        let word_scores = vec![s; 5];
        let (row_scores, row_ids) = scored_row(tok, QUESTION, Some(&title), &text, &word_scores);
        passages.push(p);
        scores.push(row_scores);
        ids.push(row_ids);
    }
    (passages, scores, ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    // With do_sort_ctx = false, surviving org_idx values form a subsequence
    // of the input order.
    #[test]
    fn percentile_selection_preserves_original_order(
        passage_scores in prop::collection::vec(0.05f64..1.0, 2..6),
        percentile in 0.05f64..0.95,
    ) {
        let tok = MockScoringTok::default();
        let (passages, scores, ids) = build_inputs(&tok, &passage_scores);

        let config = CompressionConfig {
            ctx_score_cumsum: Some(percentile),
            ..base_config()
        };
        let pipeline =
            CompressionPipeline::new(config, PromptShape::default(), &tok, &WordLen).unwrap();
        let out = pipeline.run(QUESTION, passages, scores, ids).unwrap();

        prop_assert!(!out.is_empty());
        let kept: Vec<usize> = out.iter().map(|p| p.org_idx).collect();
        let mut sorted = kept.clone();
        sorted.sort_unstable();
        prop_assert_eq!(&kept, &sorted, "output must keep original relative order");
        prop_assert!(kept.len() <= passage_scores.len());
    }

    // constraint_1_sent: no passage is ever removed by sentence compression,
    // however large the removal budget.
    #[test]
    fn at_least_one_sentence_survives_under_constraint(
        passage_scores in prop::collection::vec(0.05f64..1.0, 1..5),
        sent_comp_len in 1usize..500,
    ) {
        let tok = MockScoringTok::default();
        let (passages, scores, ids) = build_inputs(&tok, &passage_scores);
        let n = passages.len();

        let config = CompressionConfig {
            ctx_score_cumsum: Some(0.999),
            comp_sent: true,
            sent_comp_len,
            constraint_1_sent: true,
            ..base_config()
        };
        let pipeline =
            CompressionPipeline::new(config, PromptShape::default(), &tok, &WordLen).unwrap();
        let out = pipeline.run(QUESTION, passages, scores, ids).unwrap();

        prop_assert_eq!(out.len(), n);
        for p in &out {
            prop_assert!(
                !p.text.trim().is_empty(),
                "passage {} lost all sentences",
                p.org_idx
            );
        }
    }

    // Adaptive budget splitting must behave like uniform for the degenerate
    // single-passage case and never panic for any pow.
    #[test]
    fn adaptive_split_handles_any_pow(
        passage_scores in prop::collection::vec(0.05f64..1.0, 1..5),
        pow in 0.1f64..4.0,
    ) {
        let tok = MockScoringTok::default();
        let (passages, scores, ids) = build_inputs(&tok, &passage_scores);

        let config = CompressionConfig {
            ctx_score_cumsum: Some(0.999),
            comp_sent: true,
            sent_comp_len: 6,
            adaptive_sent_comp: true,
            pow,
            constraint_1_sent: true,
            ..base_config()
        };
        let pipeline =
            CompressionPipeline::new(config, PromptShape::default(), &tok, &WordLen).unwrap();
        let out = pipeline.run(QUESTION, passages, scores, ids).unwrap();
        prop_assert!(!out.is_empty());
    }
}

/// Decode makes sentinel positions visible for counting.
struct MarkerTok;

impl ScoringTokenizer for MarkerTok {
    fn encode(&self, text: &str) -> PruneResult<Vec<u32>> {
        Ok(text.split_whitespace().map(|_| 10).collect())
    }

    fn decode(&self, ids: &[u32]) -> PruneResult<String> {
        Ok(ids
            .iter()
            .map(|&id| {
                if id == EMPTY_ID {
                    "<empty>".to_string()
                } else {
                    format!("w{id}")
                }
            })
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn empty_token_id(&self) -> u32 {
        EMPTY_ID
    }

    fn eos_token_id(&self) -> u32 {
        EOS_ID
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    // Every empty-span sentinel survives token selection, whatever the
    // fractional budget or its score rank.
    #[test]
    fn empty_sentinels_always_survive_token_selection(
        row_specs in prop::collection::vec(
            prop::collection::vec((0.0f64..1.0, prop::bool::weighted(0.2)), 1..20),
            1..4,
        ),
        token_lamb in 0.0f64..1.0,
    ) {
        let mut passages = Vec::new();
        let mut scores = Vec::new();
        let mut ids = Vec::new();
        let mut sentinel_counts = Vec::new();
        for (i, spec) in row_specs.iter().enumerate() {
            passages.push(Passage::new(i + 1, "placeholder", None));
            scores.push(spec.iter().map(|&(s, _)| s).collect::<Vec<f64>>());
            ids.push(
                spec.iter()
                    .map(|&(_, is_sentinel)| if is_sentinel { EMPTY_ID } else { 10 + i as u32 })
                    .collect::<Vec<u32>>(),
            );
            sentinel_counts.push(spec.iter().filter(|&&(_, s)| s).count());
        }

        let out = TokenSelector::new(&MarkerTok, token_lamb)
            .select(passages, &scores, &ids)
            .unwrap();

        for (p, &expected) in out.iter().zip(&sentinel_counts) {
            let found = p.text.split_whitespace().filter(|w| *w == "<empty>").count();
            prop_assert_eq!(found, expected, "passage {}", p.org_idx);
        }
    }

    // token_lamb = 1.0 keeps every non-sentinel token in order.
    #[test]
    fn full_fraction_is_identity(
        row in prop::collection::vec(0.0f64..1.0, 1..30),
    ) {
        let ids: Vec<u32> = (0..row.len() as u32).map(|i| 10 + i).collect();
        let passages = vec![Passage::new(1, "placeholder", None)];

        let out = TokenSelector::new(&MarkerTok, 1.0)
            .select(passages, &[row.clone()], &[ids.clone()])
            .unwrap();

        let expected: Vec<String> = ids.iter().map(|id| format!("w{id}")).collect();
        prop_assert_eq!(out[0].text.clone(), expected.join(" "));
    }
}
