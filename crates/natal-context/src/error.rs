use natal_core::SubjectId;
use natal_store::StoreError;
use natal_summarize::SummarizeError;

use crate::oracle::OracleError;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    /// No chart is stored and there is no birth data to compute one from
    #[error("no birth data for subject {0}")]
    NoBirthData(SubjectId),
}
