//! In-process store backing both collaborator traits.
//!
//! Ids are handed out from counters under the same write lock as the insert,
//! so id order is creation order.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{BuildStore, JobCatalog, StoreError};
use crate::events;
use crate::events::build::StatusChange;
use crate::models::build::{BuildStatus, CiBuild, NewCiBuild};
use crate::models::commit::{CiCommit, NewCiCommit};
use crate::models::job::{CiJob, JobType};

#[derive(Default)]
struct Tables {
    commits: BTreeMap<i64, CiCommit>,
    builds: BTreeMap<i64, CiBuild>,
    jobs: BTreeMap<i64, CiJob>,
    next_commit_id: i64,
    next_build_id: i64,
    next_job_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job for a project. Jobs come back in registration order.
    pub async fn add_job(
        &self,
        project_id: i64,
        name: &str,
        job_type: JobType,
        config: serde_json::Value,
    ) -> CiJob {
        let mut tables = self.tables.write().await;
        tables.next_job_id += 1;
        let job = CiJob {
            id: tables.next_job_id,
            project_id,
            name: name.to_string(),
            job_type,
            config,
        };
        tables.jobs.insert(job.id, job.clone());
        job
    }

    pub async fn build_count(&self) -> usize {
        self.tables.read().await.builds.len()
    }
}

#[async_trait]
impl BuildStore for MemoryStore {
    async fn upsert_commit(&self, new_commit: NewCiCommit) -> anyhow::Result<CiCommit> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables
            .commits
            .values()
            .find(|c| c.project_id == new_commit.project_id && c.sha == new_commit.sha)
        {
            return Ok(existing.clone());
        }

        tables.next_commit_id += 1;
        let commit = CiCommit {
            id: tables.next_commit_id,
            project_id: new_commit.project_id,
            ref_name: new_commit.ref_name,
            sha: new_commit.sha,
            before_sha: new_commit.before_sha,
            push_data: new_commit.push_data,
            created_at: Utc::now(),
        };
        tables.commits.insert(commit.id, commit.clone());
        Ok(commit)
    }

    async fn find_commit(&self, project_id: i64, sha: &str) -> anyhow::Result<Option<CiCommit>> {
        let tables = self.tables.read().await;
        Ok(tables
            .commits
            .values()
            .find(|c| c.project_id == project_id && c.sha == sha)
            .cloned())
    }

    async fn load_builds_for_commit(&self, commit_id: i64) -> anyhow::Result<Vec<CiBuild>> {
        let tables = self.tables.read().await;
        Ok(tables
            .builds
            .values()
            .filter(|b| b.commit_id == commit_id)
            .cloned()
            .collect())
    }

    async fn find_build(&self, build_id: i64) -> anyhow::Result<Option<CiBuild>> {
        Ok(self.tables.read().await.builds.get(&build_id).cloned())
    }

    async fn create_build(&self, new_build: NewCiBuild) -> anyhow::Result<CiBuild> {
        let mut tables = self.tables.write().await;
        tables.next_build_id += 1;
        let build = CiBuild {
            id: tables.next_build_id,
            commit_id: new_build.commit_id,
            project_id: new_build.project_id,
            job_id: new_build.job_id,
            ref_name: new_build.ref_name,
            sha: new_build.sha,
            status: BuildStatus::Pending,
            started_at: None,
            finished_at: None,
            trace: None,
            created_at: Utc::now(),
        };
        tables.builds.insert(build.id, build.clone());
        Ok(build)
    }

    async fn update_build_status(
        &self,
        build_id: i64,
        change: StatusChange,
    ) -> anyhow::Result<CiBuild> {
        let mut tables = self.tables.write().await;
        let build = tables
            .builds
            .get_mut(&build_id)
            .ok_or(StoreError::MissingBuild(build_id))?;

        if build.status != change.from {
            return Err(StoreError::StaleStatus {
                build_id,
                expected: change.from,
                actual: build.status,
            }
            .into());
        }

        events::build::apply(build, &change);
        Ok(build.clone())
    }

    async fn write_trace(&self, build_id: i64, trace: String) -> anyhow::Result<CiBuild> {
        let mut tables = self.tables.write().await;
        let build = tables
            .builds
            .get_mut(&build_id)
            .ok_or(StoreError::MissingBuild(build_id))?;
        build.trace = Some(trace);
        Ok(build.clone())
    }
}

#[async_trait]
impl JobCatalog for MemoryStore {
    async fn jobs_for_project(&self, project_id: i64) -> anyhow::Result<Vec<CiJob>> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .values()
            .filter(|j| j.project_id == project_id)
            .cloned()
            .collect())
    }
}
