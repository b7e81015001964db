//! In-memory fakes for the trigger boundary (testing only)
//!
//! [`RecordingTrigger`] satisfies the [`JobTrigger`] contract without a build
//! server: it records every call in order and replays scripted failures.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::dispatch::JobInvocation;
use crate::trigger::{JobParams, JobTrigger, TriggerError};

#[derive(Debug, Clone)]
enum ScriptedFailure {
    NotFound,
    Failed(String),
}

/// Records trigger calls in order. Jobs can be scripted to fail.
///
/// Failed calls are recorded too, so tests can assert on the exact call
/// sequence the dispatcher produced.
#[derive(Debug, Default)]
pub struct RecordingTrigger {
    calls: Mutex<Vec<JobInvocation>>,
    failures: Mutex<HashMap<String, ScriptedFailure>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `job` report "not found".
    pub fn fail_not_found(&self, job: &str) {
        lock(&self.failures).insert(job.to_string(), ScriptedFailure::NotFound);
    }

    /// Make `job` report a generic trigger failure.
    pub fn fail_with(&self, job: &str, reason: &str) {
        lock(&self.failures).insert(job.to_string(), ScriptedFailure::Failed(reason.to_string()));
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<JobInvocation> {
        lock(&self.calls).clone()
    }

    /// Job names of every call received, in order.
    pub fn called_jobs(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|c| c.name.clone()).collect()
    }
}

#[async_trait]
impl JobTrigger for RecordingTrigger {
    async fn trigger(&self, job: &str, params: &JobParams) -> Result<(), TriggerError> {
        lock(&self.calls).push(JobInvocation {
            name: job.to_string(),
            params: params.clone(),
        });

        let scripted = lock(&self.failures).get(job).cloned();
        match scripted {
            None => Ok(()),
            Some(ScriptedFailure::NotFound) => Err(TriggerError::NotFound(job.to_string())),
            Some(ScriptedFailure::Failed(reason)) => Err(TriggerError::Failed {
                job: job.to_string(),
                reason,
            }),
        }
    }
}
