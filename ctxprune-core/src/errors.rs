/// Pruning pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PruneError {
    #[error("invalid configuration: {field} = {value:?}")]
    InvalidConfiguration { field: &'static str, value: String },

    #[error("passages mix titled and untitled entries")]
    MixedTitles,

    #[error("no candidate passages supplied")]
    NoDocumentsFound,

    #[error("tokenization failed: {reason}")]
    Tokenization { reason: String },
}

pub type PruneResult<T> = Result<T, PruneError>;
