//! Centrix CI orchestrator — build lifecycle and commit build orchestration.
//!
//! Tracks every build of a pushed commit through `pending -> running ->
//! {success, failed}`, creates the builds a commit is missing, holds deploy
//! jobs back until every test job of the commit has succeeded, and re-runs
//! work without touching earlier builds.
//!
//! Storage and source control are collaborators behind traits
//! ([`store::BuildStore`], [`store::JobCatalog`], [`services::scm::SourceControl`]);
//! [`store::MemoryStore`] is the in-process implementation.

pub mod config;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;
pub mod telemetry;

pub use config::CiConfig;
pub use errors::{CiError, CiResult, ValidationError};
pub use events::build::BuildEvent;
pub use models::build::{BuildStatus, CiBuild};
pub use models::commit::{CiCommit, NewCiCommit};
pub use models::job::{CiJob, JobType};
pub use services::orchestrator::Orchestrator;
