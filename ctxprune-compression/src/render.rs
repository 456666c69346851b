//! Rendered-length helpers for budget accounting.
//!
//! Budgets target the prompt as the generation model will see it, so greedy
//! context selection and sentence compression measure passages with their
//! document wrapper, and the running total starts at the empty-context prompt
//! length. Actual prompt assembly happens downstream; nothing here is ever
//! sent to a model.

use ctxprune_core::config::PromptShape;
use ctxprune_core::passage::Passage;
use ctxprune_core::traits::LengthTokenizer;

/// The passage as it will be rendered into the prompt: wrapped with its
/// document header when titled, bare text otherwise (long-document inputs
/// carry no titles and are concatenated directly).
pub fn passage_render(passage: &Passage) -> String {
    match &passage.title {
        Some(title) => format!(
            "Document [{}](Title: {}) {}",
            passage.org_idx, title, passage.text
        ),
        None => passage.text.clone(),
    }
}

pub fn rendered_len(length: &dyn LengthTokenizer, passage: &Passage) -> usize {
    length.token_len(&passage_render(passage))
}

/// Length of the prompt with zero passages, the starting point for greedy
/// length accumulation.
pub fn empty_prompt_len(
    length: &dyn LengthTokenizer,
    shape: &PromptShape,
    question: &str,
    titled: bool,
) -> usize {
    if titled {
        length.token_len(&format!(
            "{}\n\n\n\n{}",
            shape.instruction,
            shape.render_question(question)
        ))
    } else {
        length.token_len(&format!("\n\n{question}"))
    }
}
