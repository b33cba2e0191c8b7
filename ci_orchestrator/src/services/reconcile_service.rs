//! Commit reconciliation — create missing builds, gate deploys on tests.
//!
//! Given the jobs configured for a project and the builds a commit already
//! has, reconcile adds:
//!
//! 1. a pending build for every test job that has none, unconditionally;
//! 2. a pending build for every deploy job that has none, but only when the
//!    commit has at least one test job and the newest build of every test
//!    job is `success`.
//!
//! Existing builds are never touched, so calling reconcile again with no
//! status change in between creates nothing. Builds created in step 1 are
//! `pending` and therefore always keep step 2 closed in the same pass.

use std::collections::HashMap;

use crate::errors::CiResult;
use crate::models::build::{BuildStatus, CiBuild, NewCiBuild};
use crate::models::commit::CiCommit;
use crate::models::job::CiJob;
use crate::services::build_service;
use crate::store::BuildStore;

/// Jobs that need a build, split by why.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BuildPlan {
    pub tests: Vec<CiJob>,
    pub deploys: Vec<CiJob>,
    /// Deploy jobs without builds were held back by failing or unfinished tests.
    pub deploys_gated: bool,
}

impl BuildPlan {
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty() && self.deploys.is_empty()
    }
}

/// Status of the newest build per job id.
fn latest_status_by_job(builds: &[CiBuild]) -> HashMap<i64, (i64, BuildStatus)> {
    let mut latest: HashMap<i64, (i64, BuildStatus)> = HashMap::new();
    for b in builds {
        let Some(job_id) = b.job_id else { continue };
        let entry = latest.entry(job_id).or_insert((b.id, b.status));
        if b.id >= entry.0 {
            *entry = (b.id, b.status);
        }
    }
    latest
}

/// True when there is at least one test job and each one's newest build succeeded.
pub fn all_tests_succeeded(
    test_jobs: &[&CiJob],
    latest: &HashMap<i64, (i64, BuildStatus)>,
) -> bool {
    !test_jobs.is_empty()
        && test_jobs
            .iter()
            .all(|job| matches!(latest.get(&job.id), Some((_, BuildStatus::Success))))
}

/// Decide which builds reconcile should create. Pure.
pub fn plan_builds(jobs: &[CiJob], existing: &[CiBuild]) -> BuildPlan {
    let (deploy_jobs, test_jobs): (Vec<&CiJob>, Vec<&CiJob>) =
        jobs.iter().partition(|j| j.is_deploy());
    let latest = latest_status_by_job(existing);

    let tests: Vec<CiJob> = test_jobs
        .iter()
        .filter(|job| !latest.contains_key(&job.id))
        .map(|job| (*job).clone())
        .collect();

    let missing_deploys: Vec<CiJob> = deploy_jobs
        .iter()
        .filter(|job| !latest.contains_key(&job.id))
        .map(|job| (*job).clone())
        .collect();

    // A test job missing a build counts as unfinished: its new build is pending.
    if all_tests_succeeded(&test_jobs, &latest) {
        BuildPlan {
            tests,
            deploys: missing_deploys,
            deploys_gated: false,
        }
    } else {
        BuildPlan {
            tests,
            deploys_gated: !missing_deploys.is_empty(),
            deploys: Vec::new(),
        }
    }
}

/// Create the builds `plan_builds` asks for. The caller holds the commit lock
/// and has validated the commit.
pub async fn reconcile(
    store: &dyn BuildStore,
    commit: &CiCommit,
    jobs: &[CiJob],
) -> CiResult<Vec<CiBuild>> {
    let existing = store.load_builds_for_commit(commit.id).await?;
    let plan = plan_builds(jobs, &existing);

    if plan.deploys_gated {
        crate::metrics::deploy_gated();
        tracing::debug!(
            commit_id = commit.id,
            sha = %commit.short_sha(),
            "Deploy builds withheld until all test builds succeed"
        );
    }

    let mut created = Vec::with_capacity(plan.tests.len() + plan.deploys.len());
    for job in plan.tests.iter().chain(plan.deploys.iter()) {
        let build = build_service::create_build(
            store,
            NewCiBuild {
                commit_id: commit.id,
                project_id: commit.project_id,
                job_id: Some(job.id),
                ref_name: commit.ref_name.clone(),
                sha: commit.sha.clone(),
            },
            job.job_type.as_str(),
        )
        .await?;
        created.push(build);
    }

    if !created.is_empty() {
        tracing::info!(
            commit_id = commit.id,
            project_id = commit.project_id,
            sha = %commit.short_sha(),
            created = created.len(),
            "Commit reconciled"
        );
    }

    Ok(created)
}
