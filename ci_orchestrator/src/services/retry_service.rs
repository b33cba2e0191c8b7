//! Retries — add a fresh build to a commit, leaving its history alone.

use std::collections::HashMap;

use crate::errors::CiResult;
use crate::models::build::{BuildStatus, CiBuild, NewCiBuild};
use crate::models::commit::CiCommit;
use crate::services::build_service;
use crate::store::BuildStore;

/// Pick the job a commit-level retry should run.
///
/// Jobs whose newest build failed come first, newest failure winning.
/// Without one, the job of the commit's last build is reused.
pub fn retry_job(builds: &[CiBuild]) -> Option<i64> {
    let mut newest: HashMap<Option<i64>, &CiBuild> = HashMap::new();
    for build in builds {
        let entry = newest.entry(build.job_id).or_insert(build);
        if build.id > entry.id {
            *entry = build;
        }
    }

    let failed = newest
        .values()
        .filter(|b| b.status == BuildStatus::Failed)
        .max_by_key(|b| b.id);

    match failed {
        Some(build) => build.job_id,
        None => builds.iter().max_by_key(|b| b.id).and_then(|b| b.job_id),
    }
}

/// Create one pending build for `commit`, running the job picked by
/// [`retry_job`] (none when the commit has no builds yet). No gating applies.
pub async fn retry(store: &dyn BuildStore, commit: &CiCommit) -> CiResult<CiBuild> {
    let builds = store.load_builds_for_commit(commit.id).await?;
    let job_id = retry_job(&builds);

    let build = build_service::create_build(
        store,
        NewCiBuild {
            commit_id: commit.id,
            project_id: commit.project_id,
            job_id,
            ref_name: commit.ref_name.clone(),
            sha: commit.sha.clone(),
        },
        "retry",
    )
    .await?;

    tracing::info!(commit_id = commit.id, build_id = build.id, "Commit retried");
    Ok(build)
}

/// Create one pending build running the same job, on the same commit, as `previous`.
pub async fn retry_build(store: &dyn BuildStore, previous: &CiBuild) -> CiResult<CiBuild> {
    let build = build_service::create_build(
        store,
        NewCiBuild {
            commit_id: previous.commit_id,
            project_id: previous.project_id,
            job_id: previous.job_id,
            ref_name: previous.ref_name.clone(),
            sha: previous.sha.clone(),
        },
        "retry",
    )
    .await?;

    tracing::info!(previous_build_id = previous.id, build_id = build.id, "Build retried");
    Ok(build)
}
