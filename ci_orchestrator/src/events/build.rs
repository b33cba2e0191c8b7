//! Build lifecycle events and the status transition table.
//!
//! A build moves `pending -> running -> {success, failed}`. Every accepted
//! event is checked against [`TRANSITIONS`]; anything not listed there is an
//! [`CiError::InvalidTransition`]. Timestamps follow two rules keyed on the
//! source status only:
//!
//! - leaving `pending` for `running` stamps `started_at`
//! - any transition out of `running` stamps `finished_at`

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CiError, CiResult};
use crate::models::build::{BuildStatus, CiBuild};

/// Events reported by build runners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildEvent {
    Run,
    Drop,
    Success,
}

impl BuildEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildEvent::Run => "run",
            BuildEvent::Drop => "drop",
            BuildEvent::Success => "success",
        }
    }
}

impl fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildEvent {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(BuildEvent::Run),
            "drop" => Ok(BuildEvent::Drop),
            "success" => Ok(BuildEvent::Success),
            other => Err(CiError::InvalidState(other.to_string())),
        }
    }
}

/// `(event, from, to)` edges. The only legal moves.
pub const TRANSITIONS: &[(BuildEvent, BuildStatus, BuildStatus)] = &[
    (BuildEvent::Run, BuildStatus::Pending, BuildStatus::Running),
    (BuildEvent::Drop, BuildStatus::Running, BuildStatus::Failed),
    (BuildEvent::Success, BuildStatus::Running, BuildStatus::Success),
];

/// Status change plus the timestamps it stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: BuildStatus,
    pub to: BuildStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Look up the edge for `event` leaving `from`.
pub fn next_status(build_id: i64, from: BuildStatus, event: BuildEvent) -> CiResult<BuildStatus> {
    TRANSITIONS
        .iter()
        .find(|(e, src, _)| *e == event && *src == from)
        .map(|(_, _, to)| *to)
        .ok_or(CiError::InvalidTransition {
            build_id,
            event,
            from,
        })
}

/// Compute the full status change for `event` applied to `build` at `now`.
///
/// Pure: the caller persists the change atomically (see the build service).
pub fn plan_transition(
    build: &CiBuild,
    event: BuildEvent,
    now: DateTime<Utc>,
) -> CiResult<StatusChange> {
    let from = build.status;
    let to = next_status(build.id, from, event)?;

    let mut change = StatusChange {
        from,
        to,
        started_at: build.started_at,
        finished_at: build.finished_at,
    };

    match (from, to) {
        (BuildStatus::Pending, BuildStatus::Running) => change.started_at = Some(now),
        (BuildStatus::Running, _) => change.finished_at = Some(now),
        _ => {}
    }

    Ok(change)
}

/// Write a planned change onto a build. Stores call this once the
/// compare-and-set on `change.from` has passed.
pub fn apply(build: &mut CiBuild, change: &StatusChange) {
    build.status = change.to;
    build.started_at = change.started_at;
    build.finished_at = change.finished_at;
}
