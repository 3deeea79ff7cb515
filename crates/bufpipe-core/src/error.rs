use thiserror::Error;

use crate::models::StageId;

pub type Result<T> = std::result::Result<T, LineageError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineageError {
    #[error("stage not found: {0}")]
    NotFound(StageId),

    #[error("no current stage to filter; load something first")]
    NoCurrentStage,

    /// Every `u64` id has been handed out. Not recoverable.
    #[error("stage id space exhausted")]
    IdSpaceExhausted,
}
