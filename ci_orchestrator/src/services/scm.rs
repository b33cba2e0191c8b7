//! Source-control lookups — commit message and author metadata.
//!
//! Lookups are best effort. Callers degrade a failed lookup to an absent
//! value instead of failing the orchestration step that asked for it.

use async_trait::async_trait;

#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn commit_message(&self, project_id: i64, sha: &str) -> anyhow::Result<String>;

    async fn author_name(&self, project_id: i64, sha: &str) -> anyhow::Result<String>;

    async fn author_email(&self, project_id: i64, sha: &str) -> anyhow::Result<String>;
}

/// For deployments with no repository access. Every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSourceControl;

#[async_trait]
impl SourceControl for DetachedSourceControl {
    async fn commit_message(&self, _project_id: i64, _sha: &str) -> anyhow::Result<String> {
        anyhow::bail!("no source control configured")
    }

    async fn author_name(&self, _project_id: i64, _sha: &str) -> anyhow::Result<String> {
        anyhow::bail!("no source control configured")
    }

    async fn author_email(&self, _project_id: i64, _sha: &str) -> anyhow::Result<String> {
        anyhow::bail!("no source control configured")
    }
}
