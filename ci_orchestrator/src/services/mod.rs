//! Orchestration services — commit validation, build lifecycle, reconcile, retry.

pub mod build_service;
pub mod commit_lock;
pub mod commit_service;
pub mod orchestrator;
pub mod reconcile_service;
pub mod retry_service;
pub mod scm;
