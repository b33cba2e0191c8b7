//! Storage collaborators consumed by the orchestrator.
//!
//! The orchestrator never talks to a database directly; it goes through
//! [`BuildStore`] for commits and builds and [`JobCatalog`] for job
//! definitions. Both return `anyhow::Result` so any backend can plug in.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::events::build::StatusChange;
use crate::models::build::{BuildStatus, CiBuild, NewCiBuild};
use crate::models::commit::{CiCommit, NewCiCommit};
use crate::models::job::CiJob;

pub use memory::MemoryStore;

/// Typed store failures the services react to. Travel inside `anyhow::Error`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Compare-and-set lost: the build is no longer in the expected status.
    #[error("build {build_id} is {actual}, expected {expected}")]
    StaleStatus {
        build_id: i64,
        expected: BuildStatus,
        actual: BuildStatus,
    },

    #[error("build {0} does not exist")]
    MissingBuild(i64),
}

#[async_trait]
pub trait BuildStore: Send + Sync {
    /// Insert the commit unless `(project_id, sha)` is already stored; return the stored row.
    async fn upsert_commit(&self, new_commit: NewCiCommit) -> anyhow::Result<CiCommit>;

    async fn find_commit(&self, project_id: i64, sha: &str) -> anyhow::Result<Option<CiCommit>>;

    /// All builds of a commit, in creation order.
    async fn load_builds_for_commit(&self, commit_id: i64) -> anyhow::Result<Vec<CiBuild>>;

    async fn find_build(&self, build_id: i64) -> anyhow::Result<Option<CiBuild>>;

    /// Insert a `pending` build with the next id.
    async fn create_build(&self, new_build: NewCiBuild) -> anyhow::Result<CiBuild>;

    /// Atomically write `change` if the build is still in `change.from`.
    ///
    /// Fails with [`StoreError::StaleStatus`] when another writer got there
    /// first, or [`StoreError::MissingBuild`].
    async fn update_build_status(
        &self,
        build_id: i64,
        change: StatusChange,
    ) -> anyhow::Result<CiBuild>;

    /// Replace the build's trace. Fails with [`StoreError::MissingBuild`].
    async fn write_trace(&self, build_id: i64, trace: String) -> anyhow::Result<CiBuild>;
}

#[async_trait]
pub trait JobCatalog: Send + Sync {
    /// Jobs configured for a project, in configuration order.
    async fn jobs_for_project(&self, project_id: i64) -> anyhow::Result<Vec<CiJob>>;
}
