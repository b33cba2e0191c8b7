//! ci.job — A configured unit of CI work for a project.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    #[default]
    Test,
    Deploy,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Test => "test",
            JobType::Deploy => "deploy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiJob {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    #[serde(default)]
    pub job_type: JobType,
    /// Build configuration (script, tags, ...). Not interpreted here.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl CiJob {
    pub fn is_deploy(&self) -> bool {
        self.job_type == JobType::Deploy
    }
}
