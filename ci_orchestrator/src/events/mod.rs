//! Build lifecycle events.
//!
//! Runners report events; the transition table decides what they mean.

pub mod build;
