//! Build lifecycle: status transitions, traces, and read helpers.

use std::collections::HashMap;

use chrono::Utc;

use crate::errors::{CiError, CiResult};
use crate::events::build::{self, BuildEvent};
use crate::models::build::{BuildStatus, CiBuild, NewCiBuild};
use crate::store::{BuildStore, StoreError};

/// Create a new pending build record.
pub async fn create_build(
    store: &dyn BuildStore,
    new_build: NewCiBuild,
    kind: &str,
) -> CiResult<CiBuild> {
    let result = store.create_build(new_build).await?;

    crate::metrics::build_status_changed(BuildStatus::Pending.as_str());
    crate::metrics::build_created(kind);
    tracing::info!(
        build_id = result.id,
        commit_id = result.commit_id,
        project_id = result.project_id,
        job_id = ?result.job_id,
        sha = %result.short_sha(),
        kind,
        "Build created"
    );

    Ok(result)
}

pub async fn get_build(store: &dyn BuildStore, build_id: i64) -> CiResult<CiBuild> {
    store
        .find_build(build_id)
        .await?
        .ok_or(CiError::BuildNotFound(build_id))
}

/// Apply a runner event to a build.
///
/// The status check and the write happen as one compare-and-set in the
/// store. Of two racing events on the same build exactly one wins; the loser
/// gets `InvalidTransition` against the status it lost to.
pub async fn report_transition(
    store: &dyn BuildStore,
    build_id: i64,
    event: BuildEvent,
) -> CiResult<CiBuild> {
    let current = get_build(store, build_id).await?;

    let change = match build::plan_transition(&current, event, Utc::now()) {
        Ok(change) => change,
        Err(e) => {
            crate::metrics::transition_rejected(event.as_str());
            tracing::warn!(build_id, %event, from = %current.status, "Transition rejected");
            return Err(e);
        }
    };

    let updated = match store.update_build_status(build_id, change).await {
        Ok(updated) => updated,
        Err(e) => return Err(stale_to_transition_error(e, event)),
    };

    crate::metrics::build_status_changed(updated.status.as_str());
    if let Some(duration) = updated.duration() {
        crate::metrics::build_duration(duration.num_milliseconds().max(0) as u64);
    }
    tracing::info!(
        build_id,
        %event,
        from = %change.from,
        to = %change.to,
        "Build status changed"
    );

    Ok(updated)
}

fn stale_to_transition_error(e: anyhow::Error, event: BuildEvent) -> CiError {
    match e.downcast_ref::<StoreError>() {
        Some(StoreError::StaleStatus { build_id, actual, .. }) => {
            crate::metrics::transition_rejected(event.as_str());
            tracing::warn!(build_id, %event, from = %actual, "Transition lost a concurrent update");
            CiError::InvalidTransition {
                build_id: *build_id,
                event,
                from: *actual,
            }
        }
        Some(StoreError::MissingBuild(build_id)) => CiError::BuildNotFound(*build_id),
        None => CiError::Storage(e),
    }
}

/// Replace a build's trace, keeping at most `max_bytes` of its tail.
///
/// A cut trace is stored behind a `...truncated...` line, which does not count
/// against `max_bytes`.
pub async fn write_trace(
    store: &dyn BuildStore,
    build_id: i64,
    trace: &str,
    max_bytes: usize,
) -> CiResult<CiBuild> {
    let trace = truncate_trace(trace, max_bytes);
    match store.write_trace(build_id, trace).await {
        Ok(build) => Ok(build),
        Err(e) => match e.downcast_ref::<StoreError>() {
            Some(StoreError::MissingBuild(id)) => Err(CiError::BuildNotFound(*id)),
            _ => Err(CiError::Storage(e)),
        },
    }
}

const TRUNCATED_PREFIX: &str = "...truncated...\n";

fn truncate_trace(trace: &str, max_bytes: usize) -> String {
    if trace.len() <= max_bytes {
        return trace.to_string();
    }
    let mut cut = trace.len() - max_bytes;
    while !trace.is_char_boundary(cut) {
        cut += 1;
    }
    format!("{TRUNCATED_PREFIX}{}", &trace[cut..])
}

/// Most recently created build of a commit.
pub async fn last_build(store: &dyn BuildStore, commit_id: i64) -> CiResult<Option<CiBuild>> {
    let builds = store.load_builds_for_commit(commit_id).await?;
    Ok(builds.into_iter().max_by_key(|b| b.id))
}

/// Collapse builds to the newest one per SHA, ordered by id.
pub fn latest_by_sha(builds: &[CiBuild]) -> Vec<CiBuild> {
    let mut newest: HashMap<&str, &CiBuild> = HashMap::new();
    for b in builds {
        newest
            .entry(b.sha.as_str())
            .and_modify(|cur| {
                if b.id > cur.id {
                    *cur = b;
                }
            })
            .or_insert(b);
    }

    let mut result: Vec<CiBuild> = newest.into_values().cloned().collect();
    result.sort_by_key(|b| b.id);
    result
}
