//! Commit validation and source-control derived queries.

use crate::errors::ValidationError;
use crate::models::commit::{CiCommit, NewCiCommit, BLANK_SHA};
use crate::services::scm::SourceControl;

/// Reject commits that must never produce builds.
pub fn validate(commit: &NewCiCommit) -> Result<(), ValidationError> {
    if commit.ref_name.trim().is_empty() {
        return Err(ValidationError::MissingField("ref"));
    }
    if commit.sha.trim().is_empty() {
        return Err(ValidationError::MissingField("sha"));
    }
    if commit.before_sha.trim().is_empty() {
        return Err(ValidationError::MissingField("before_sha"));
    }
    if is_blank_payload(&commit.push_data) {
        return Err(ValidationError::MissingField("push_data"));
    }
    if commit.sha == BLANK_SHA {
        return Err(ValidationError::InvalidSha);
    }
    Ok(())
}

fn is_blank_payload(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Stored commits went through `validate`; re-check before acting on one.
pub fn validate_stored(commit: &CiCommit) -> Result<(), ValidationError> {
    validate(&NewCiCommit {
        project_id: commit.project_id,
        ref_name: commit.ref_name.clone(),
        sha: commit.sha.clone(),
        before_sha: commit.before_sha.clone(),
        push_data: commit.push_data.clone(),
    })
}

pub async fn git_commit_message(scm: &dyn SourceControl, commit: &CiCommit) -> Option<String> {
    match scm.commit_message(commit.project_id, &commit.sha).await {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!(
                commit_id = commit.id,
                sha = %commit.sha,
                "Commit message lookup failed: {e}"
            );
            None
        }
    }
}

/// True when the commit message carries `marker`. A failed lookup counts as no marker.
pub async fn ci_skip(scm: &dyn SourceControl, commit: &CiCommit, marker: &str) -> bool {
    git_commit_message(scm, commit)
        .await
        .map(|message| message.contains(marker))
        .unwrap_or(false)
}

pub async fn git_author_name(scm: &dyn SourceControl, commit: &CiCommit) -> Option<String> {
    match scm.author_name(commit.project_id, &commit.sha).await {
        Ok(name) if !name.is_empty() => Some(name),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(
                commit_id = commit.id,
                sha = %commit.sha,
                "Author name lookup failed: {e}"
            );
            None
        }
    }
}

pub async fn git_author_email(scm: &dyn SourceControl, commit: &CiCommit) -> Option<String> {
    match scm.author_email(commit.project_id, &commit.sha).await {
        Ok(email) if !email.is_empty() => Some(email),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(
                commit_id = commit.id,
                sha = %commit.sha,
                "Author email lookup failed: {e}"
            );
            None
        }
    }
}
