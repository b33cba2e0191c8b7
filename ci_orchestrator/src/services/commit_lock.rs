//! Per-commit mutual exclusion for reconcile and retry.
//!
//! Reconcile reads the build set and then creates builds. Two of them racing
//! on the same commit could both see "no deploy build yet", so every
//! operation that adds builds to a commit holds that commit's lock.
//! Different commits never contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::commit::CommitKey;

#[derive(Default)]
pub struct CommitLocks {
    locks: Mutex<HashMap<CommitKey, Arc<Mutex<()>>>>,
}

/// Held for the duration of one commit-scoped operation.
pub struct CommitGuard {
    _guard: OwnedMutexGuard<()>,
}

impl CommitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &CommitKey) -> CommitGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries nobody holds or waits on can go.
            locks.retain(|k, l| k == key || Arc::strong_count(l) > 1);
            locks.entry(key.clone()).or_default().clone()
        };
        CommitGuard {
            _guard: lock.lock_owned().await,
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
