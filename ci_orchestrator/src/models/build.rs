//! ci.build — One execution of a job against a commit.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CiError;
use crate::models::commit::short_hash;

/// Closed set of build statuses. Persisted as exactly these lowercase strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    #[default]
    Pending,
    Running,
    Failed,
    Success,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Pending => "pending",
            BuildStatus::Running => "running",
            BuildStatus::Failed => "failed",
            BuildStatus::Success => "success",
        }
    }

    /// `failed` and `success` admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStatus::Failed | BuildStatus::Success)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStatus {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BuildStatus::Pending),
            "running" => Ok(BuildStatus::Running),
            "failed" => Ok(BuildStatus::Failed),
            "success" => Ok(BuildStatus::Success),
            other => Err(CiError::InvalidState(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiBuild {
    /// Monotonic; a larger id means a later creation.
    pub id: i64,
    pub commit_id: i64,
    pub project_id: i64,
    /// Job definition this build runs. `None` for a retry of a commit without prior builds.
    pub job_id: Option<i64>,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    pub status: BuildStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub trace: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CiBuild {
    pub fn short_sha(&self) -> &str {
        short_hash(&self.sha)
    }

    /// Wall time between start and finish, once both are known.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some(finished - started),
            _ => None,
        }
    }
}

/// A build waiting to be inserted. Status always starts at `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCiBuild {
    pub commit_id: i64,
    pub project_id: i64,
    pub job_id: Option<i64>,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}
