//! Structured observability hooks for the dispatch lifecycle.
//!
//! This module provides:
//! - Dispatch-scoped tracing spans via [`dispatch_span`] and [`delivery_span`]
//! - Emission functions for key lifecycle events: received, wrapped, matched,
//!   triggered, failed, finished
//!
//! Events are emitted at `info!` level, trigger failures at `warn!`.

use tracing::{info, warn, Span};

use crate::event::{EventMetadata, EventType};
use crate::trigger::JobParams;

/// Span covering one dispatch of a raw event.
///
/// Returned as a plain [`Span`] so async callers can attach it with
/// [`tracing::Instrument`].
pub fn dispatch_span(raw_event_type: &str) -> Span {
    tracing::info_span!("jobhook.dispatch", event = %raw_event_type)
}

/// Span tagged with the webhook delivery id, wrapping everything done for
/// one inbound request.
pub fn delivery_span(delivery_id: &str) -> Span {
    tracing::info_span!("jobhook.delivery", delivery_id = %delivery_id)
}

/// Emit event: normalized event metadata.
pub fn emit_event_received(event_type: EventType, meta: &EventMetadata) {
    info!(
        event = "event.received",
        event_type = %event_type,
        repo = %meta.repo,
        branch = %meta.branch,
        target_branch = %meta.target_branch,
        commit = meta.commit.as_deref().unwrap_or(""),
        pull_num = meta.pull_num,
    );
}

/// Emit event: a raw type was rewritten into a synthetic one.
pub fn emit_event_wrapped(raw_event_type: &str, wrapped: EventType) {
    info!(event = "event.wrapped", raw = %raw_event_type, wrapped = %wrapped);
}

/// Emit event: a branch deletion was skipped without matching.
pub fn emit_deletion_skipped(raw_event_type: &str) {
    info!(event = "event.deleted_skipped", raw = %raw_event_type);
}

/// Emit event: a rule matched and its jobs are about to be triggered.
pub fn emit_rule_matched(rule: &str, jobs: usize) {
    info!(event = "rule.matched", rule = %rule, jobs = jobs);
}

/// Emit event: one job was queued.
pub fn emit_job_triggered(job: &str, params: &JobParams) {
    info!(event = "job.triggered", job = %job, params = ?params);
}

/// Emit event: the build server refused a job; the dispatch continues.
pub fn emit_job_trigger_failed(job: &str, error: &dyn std::fmt::Display) {
    warn!(event = "job.trigger_failed", job = %job, error = %error);
}

/// Emit event: dispatch completed with counts of matched rules and started jobs.
pub fn emit_dispatch_finished(matched_rules: usize, jobs_started: usize) {
    info!(
        event = "dispatch.finished",
        matched_rules = matched_rules,
        jobs_started = jobs_started,
    );
}
