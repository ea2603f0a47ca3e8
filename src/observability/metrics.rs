//! Metrics collection.
//!
//! # Responsibilities
//! - Define router metrics (dispatches, hooks, unmatched paths)
//! - Record through the `metrics` facade; the host application installs
//!   whichever recorder it exports with
//!
//! # Metrics
//! - `router_dispatch_total` (counter): dispatches by outcome
//! - `router_dispatch_duration_seconds` (histogram): time spent in hooks
//! - `router_hooks_total` (counter): hooks run by phase
//! - `router_unmatched_total` (counter): paths no route matched
//!
//! # Design Decisions
//! - With no recorder installed every call is a no-op
//! - Labels are static strings only

use std::time::Instant;

use crate::transition::HookPhase;

pub fn record_dispatch(outcome: &'static str, started: Instant) {
    ::metrics::counter!("router_dispatch_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("router_dispatch_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_hook(phase: HookPhase) {
    ::metrics::counter!("router_hooks_total", "phase" => phase.as_str()).increment(1);
}

pub fn record_unmatched() {
    ::metrics::counter!("router_unmatched_total").increment(1);
}
