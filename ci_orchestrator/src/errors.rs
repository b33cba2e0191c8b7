//! Error taxonomy for commit orchestration.

use thiserror::Error;

use crate::events::build::BuildEvent;
use crate::models::build::BuildStatus;

/// Rejections raised before any orchestration runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The commit SHA is the all-zero sentinel (a branch deletion).
    #[error("commit sha can not be 0000000000000000000000000000000000000000")]
    InvalidSha,

    #[error("{0} can't be blank")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum CiError {
    #[error("invalid commit: {0}")]
    Validation(#[from] ValidationError),

    #[error("build {build_id} can not `{event}` from status `{from}`")]
    InvalidTransition {
        build_id: i64,
        event: BuildEvent,
        from: BuildStatus,
    },

    #[error("invalid state value: {0:?}")]
    InvalidState(String),

    #[error("build not found: {0}")]
    BuildNotFound(i64),

    #[error("commit not found: project {project_id}, sha {sha}")]
    CommitNotFound { project_id: i64, sha: String },

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type CiResult<T> = Result<T, CiError>;
