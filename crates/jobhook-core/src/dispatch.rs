//! Event dispatch: normalize, match, resolve parameters, trigger.
//!
//! The [`Dispatcher`] runs one strictly sequential pipeline per event. Jobs
//! are triggered in rule order, then job-list order within each rule. A job
//! the build server does not know aborts the dispatch; any other trigger
//! failure is logged and skipped.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::error::{DispatchError, Result};
use crate::event::{self, EventMetadata, EventType};
use crate::metrics::METRICS;
use crate::obs;
use crate::rules::{CompiledRule, ParamValue, RuleSet};
use crate::trigger::{JobParams, JobTrigger, TriggerError};

/// One successfully triggered job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInvocation {
    pub name: String,
    pub params: JobParams,
}

/// A matched rule with its resolved parameters, before anything is triggered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRule {
    /// See [`CompiledRule::label`].
    pub rule: String,
    /// `None` when the rule declares no `jobs`.
    pub jobs: Option<Vec<String>>,
    pub params: JobParams,
}

/// Everything the dispatcher would do for an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchPlan {
    /// Set for branch deletions, which are never matched.
    pub deleted: bool,
    pub event_type: Option<EventType>,
    pub metadata: Option<EventMetadata>,
    pub rules: Vec<PlannedRule>,
}

impl DispatchPlan {
    fn deletion() -> Self {
        Self {
            deleted: true,
            event_type: None,
            metadata: None,
            rules: Vec::new(),
        }
    }
}

/// Outcome of a dispatch that was not aborted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub deleted: bool,
    pub event_type: Option<EventType>,
    /// Labels of the matched rules, in match order.
    pub matched_rules: Vec<String>,
    /// Jobs that were queued, in trigger order.
    pub jobs: Vec<JobInvocation>,
}

/// Default parameters overlaid with the rule's `job_params`. A null value
/// removes the parameter.
pub fn resolve_params(defaults: &JobParams, rule: &CompiledRule) -> JobParams {
    let mut params = defaults.clone();
    for (key, value) in &rule.rule().job_params {
        match value {
            ParamValue::Null => {
                params.remove(key);
            }
            value => {
                params.insert(key.clone(), value.to_string());
            }
        }
    }
    params
}

/// Runs events against an immutable rule set and a job trigger.
///
/// Cheap to clone; clones share the rule set and the trigger.
pub struct Dispatcher<T: JobTrigger> {
    rules: Arc<RuleSet>,
    trigger: Arc<T>,
}

impl<T: JobTrigger> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            trigger: Arc::clone(&self.trigger),
        }
    }
}

impl<T: JobTrigger> Dispatcher<T> {
    /// Create a dispatcher over a shared rule set and trigger.
    pub fn new(rules: Arc<RuleSet>, trigger: Arc<T>) -> Self {
        Self { rules, trigger }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Compute matches and parameters without triggering anything.
    pub fn plan(&self, raw_event_type: &str, payload: &Value) -> Result<DispatchPlan> {
        if event::is_deletion(payload) {
            return Ok(DispatchPlan::deletion());
        }

        let (event_type, meta) = event::normalize(raw_event_type, payload)?;
        if event_type.as_str() != raw_event_type {
            obs::emit_event_wrapped(raw_event_type, event_type);
        }

        let defaults = meta.default_job_params();
        let rules = self
            .rules
            .get_matches(event_type, &meta)
            .into_iter()
            .map(|compiled| PlannedRule {
                rule: compiled.label(),
                jobs: compiled.rule().jobs.clone(),
                params: resolve_params(&defaults, compiled),
            })
            .collect();

        Ok(DispatchPlan {
            deleted: false,
            event_type: Some(event_type),
            metadata: Some(meta),
            rules,
        })
    }

    /// Dispatch an event, returning a summary of what was matched and
    /// triggered.
    pub async fn dispatch(&self, raw_event_type: &str, payload: &Value) -> Result<DispatchSummary> {
        self.run(raw_event_type, payload)
            .instrument(obs::dispatch_span(raw_event_type))
            .await
    }

    /// Dispatch an event and return the triggered jobs.
    pub async fn process(&self, raw_event_type: &str, payload: &Value) -> Result<Vec<JobInvocation>> {
        Ok(self.dispatch(raw_event_type, payload).await?.jobs)
    }

    async fn run(&self, raw_event_type: &str, payload: &Value) -> Result<DispatchSummary> {
        METRICS.inc_events_processed();

        let plan = self.plan(raw_event_type, payload)?;
        if plan.deleted {
            obs::emit_deletion_skipped(raw_event_type);
            return Ok(DispatchSummary {
                deleted: true,
                event_type: None,
                matched_rules: Vec::new(),
                jobs: Vec::new(),
            });
        }
        if let (Some(event_type), Some(meta)) = (plan.event_type, plan.metadata.as_ref()) {
            obs::emit_event_received(event_type, meta);
        }
        METRICS.add_rules_matched(plan.rules.len() as u64);

        let mut matched_rules = Vec::with_capacity(plan.rules.len());
        let mut jobs = Vec::new();

        for planned in plan.rules {
            let Some(job_names) = planned.jobs else {
                return Err(DispatchError::NoJobsConfigured { rule: planned.rule });
            };
            obs::emit_rule_matched(&planned.rule, job_names.len());

            for job in job_names {
                match self.trigger.trigger(&job, &planned.params).await {
                    Ok(()) => {
                        METRICS.inc_jobs_triggered();
                        obs::emit_job_triggered(&job, &planned.params);
                        jobs.push(JobInvocation {
                            name: job,
                            params: planned.params.clone(),
                        });
                    }
                    Err(TriggerError::NotFound(_)) => {
                        METRICS.inc_trigger_failures();
                        return Err(DispatchError::JobNotFound {
                            job,
                            rule: planned.rule,
                        });
                    }
                    Err(e @ TriggerError::Failed { .. }) => {
                        METRICS.inc_trigger_failures();
                        obs::emit_job_trigger_failed(&job, &e);
                    }
                }
            }
            matched_rules.push(planned.rule);
        }

        obs::emit_dispatch_finished(matched_rules.len(), jobs.len());
        Ok(DispatchSummary {
            deleted: false,
            event_type: plan.event_type,
            matched_rules,
            jobs,
        })
    }
}
