//! Orchestration data models.

pub mod build;
pub mod commit;
pub mod job;
