//! ci.commit — A pushed code state; the aggregate root for its builds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of the abbreviated hashes shown next to builds.
pub const SHORT_SHA_LEN: usize = 8;

/// SHA GitLab-style push hooks send for a deleted branch.
pub const BLANK_SHA: &str = "0000000000000000000000000000000000000000";

/// First `SHORT_SHA_LEN` characters of a hash, or the whole hash when shorter.
pub fn short_hash(sha: &str) -> &str {
    match sha.char_indices().nth(SHORT_SHA_LEN) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}

/// Identity used for per-commit serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitKey {
    pub project_id: i64,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiCommit {
    pub id: i64,
    pub project_id: i64,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    pub before_sha: String,
    /// Opaque payload of the push that produced this commit.
    pub push_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl CiCommit {
    pub fn key(&self) -> CommitKey {
        CommitKey {
            project_id: self.project_id,
            sha: self.sha.clone(),
        }
    }

    pub fn short_sha(&self) -> &str {
        short_hash(&self.sha)
    }

    pub fn short_before_sha(&self) -> &str {
        short_hash(&self.before_sha)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCiCommit {
    pub project_id: i64,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    pub before_sha: String,
    #[serde(default)]
    pub push_data: serde_json::Value,
}
