//! Orchestrator — the operations external triggers call.
//!
//! Push hooks call [`Orchestrator::record_commit`] and
//! [`Orchestrator::reconcile`], users call [`Orchestrator::retry`], and build
//! runners call [`Orchestrator::report_transition`] (and reconcile again once
//! a test build finishes). Everything that adds builds to a commit runs under
//! that commit's lock.

use std::sync::Arc;

use crate::config::CiConfig;
use crate::errors::{CiError, CiResult};
use crate::events::build::BuildEvent;
use crate::models::build::CiBuild;
use crate::models::commit::{CiCommit, CommitKey, NewCiCommit};
use crate::services::commit_lock::CommitLocks;
use crate::services::scm::SourceControl;
use crate::services::{build_service, commit_service, reconcile_service, retry_service};
use crate::store::{BuildStore, JobCatalog};

pub struct Orchestrator {
    store: Arc<dyn BuildStore>,
    jobs: Arc<dyn JobCatalog>,
    scm: Arc<dyn SourceControl>,
    config: CiConfig,
    locks: CommitLocks,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn BuildStore>,
        jobs: Arc<dyn JobCatalog>,
        scm: Arc<dyn SourceControl>,
        config: CiConfig,
    ) -> Self {
        Self {
            store,
            jobs,
            scm,
            config,
            locks: CommitLocks::new(),
        }
    }

    pub fn config(&self) -> &CiConfig {
        &self.config
    }

    /// Validate and store a pushed commit. Re-recording a known SHA returns the stored commit.
    pub async fn record_commit(&self, new_commit: NewCiCommit) -> CiResult<CiCommit> {
        if let Err(e) = commit_service::validate(&new_commit) {
            tracing::warn!(
                project_id = new_commit.project_id,
                sha = %new_commit.sha,
                "Rejected commit: {e}"
            );
            return Err(e.into());
        }

        let commit = self.store.upsert_commit(new_commit).await?;
        tracing::info!(
            commit_id = commit.id,
            project_id = commit.project_id,
            sha = %commit.short_sha(),
            ref_name = %commit.ref_name,
            "Commit recorded"
        );
        Ok(commit)
    }

    pub async fn find_commit(&self, project_id: i64, sha: &str) -> CiResult<CiCommit> {
        self.store
            .find_commit(project_id, sha)
            .await?
            .ok_or_else(|| CiError::CommitNotFound {
                project_id,
                sha: sha.to_string(),
            })
    }

    /// Create the commit's missing builds, gating deploy jobs on test results.
    ///
    /// Idempotent; safe to call again after any failure.
    pub async fn reconcile(&self, commit: &CiCommit) -> CiResult<Vec<CiBuild>> {
        commit_service::validate_stored(commit)?;

        let _guard = self.locks.acquire(&commit.key()).await;
        let jobs = self.jobs.jobs_for_project(commit.project_id).await?;
        reconcile_service::reconcile(self.store.as_ref(), commit, &jobs).await
    }

    /// Reconcile a stored commit by its SHA.
    pub async fn reconcile_sha(&self, project_id: i64, sha: &str) -> CiResult<Vec<CiBuild>> {
        let commit = self.find_commit(project_id, sha).await?;
        self.reconcile(&commit).await
    }

    pub async fn retry(&self, commit: &CiCommit) -> CiResult<CiBuild> {
        commit_service::validate_stored(commit)?;

        let _guard = self.locks.acquire(&commit.key()).await;
        retry_service::retry(self.store.as_ref(), commit).await
    }

    /// Re-run one build's job on its commit.
    pub async fn retry_build(&self, build_id: i64) -> CiResult<CiBuild> {
        let previous = build_service::get_build(self.store.as_ref(), build_id).await?;
        let key = CommitKey {
            project_id: previous.project_id,
            sha: previous.sha.clone(),
        };

        let _guard = self.locks.acquire(&key).await;
        retry_service::retry_build(self.store.as_ref(), &previous).await
    }

    pub async fn report_transition(&self, build_id: i64, event: BuildEvent) -> CiResult<CiBuild> {
        build_service::report_transition(self.store.as_ref(), build_id, event).await
    }

    pub async fn write_trace(&self, build_id: i64, trace: &str) -> CiResult<CiBuild> {
        let max_bytes = self.config.max_trace_bytes;
        build_service::write_trace(self.store.as_ref(), build_id, trace, max_bytes).await
    }

    pub async fn builds(&self, commit: &CiCommit) -> CiResult<Vec<CiBuild>> {
        Ok(self.store.load_builds_for_commit(commit.id).await?)
    }

    pub async fn last_build(&self, commit: &CiCommit) -> CiResult<Option<CiBuild>> {
        build_service::last_build(self.store.as_ref(), commit.id).await
    }

    /// Newest build per SHA across the given commits.
    pub async fn latest_by_sha(&self, commits: &[CiCommit]) -> CiResult<Vec<CiBuild>> {
        let mut builds = Vec::new();
        for commit in commits {
            builds.extend(self.store.load_builds_for_commit(commit.id).await?);
        }
        Ok(build_service::latest_by_sha(&builds))
    }

    /// Whether the commit asked to be skipped. Callers skip `reconcile` when true.
    pub async fn ci_skip(&self, commit: &CiCommit) -> bool {
        commit_service::ci_skip(self.scm.as_ref(), commit, &self.config.skip_marker).await
    }

    pub async fn git_commit_message(&self, commit: &CiCommit) -> Option<String> {
        commit_service::git_commit_message(self.scm.as_ref(), commit).await
    }

    pub async fn git_author_name(&self, commit: &CiCommit) -> Option<String> {
        commit_service::git_author_name(self.scm.as_ref(), commit).await
    }

    pub async fn git_author_email(&self, commit: &CiCommit) -> Option<String> {
        commit_service::git_author_email(self.scm.as_ref(), commit).await
    }
}
