//! Prometheus-style metrics for orchestration observability.
//!
//! Only the `metrics` facade is used here; the host process installs the exporter.

use metrics::{counter, histogram};

/// Record a build entering a status (creation counts as `pending`).
pub fn build_status_changed(status: &str) {
    counter!("ci_builds_total", "status" => status.to_string()).increment(1);
}

/// Record a build created by reconcile or retry. `kind` is `test`, `deploy` or `retry`.
pub fn build_created(kind: &str) {
    counter!("ci_builds_created_total", "kind" => kind.to_string()).increment(1);
}

/// Record a reconcile that withheld deploy builds.
pub fn deploy_gated() {
    counter!("ci_deploy_gated_total").increment(1);
}

/// Record build duration.
pub fn build_duration(duration_ms: u64) {
    histogram!("ci_build_duration_ms").record(duration_ms as f64);
}

/// Record a transition refused by the state machine.
pub fn transition_rejected(event: &str) {
    counter!("ci_transitions_rejected_total", "event" => event.to_string()).increment(1);
}
