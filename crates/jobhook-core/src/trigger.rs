//! The job trigger boundary.
//!
//! [`JobTrigger`] is implemented by whatever schedules builds (the Jenkins
//! client in `jobhook-jenkins`, or [`crate::fakes::RecordingTrigger`] in
//! tests). The dispatcher only distinguishes "job not found", which aborts a
//! dispatch, from every other failure, which is skipped.

use std::collections::BTreeMap;

use async_trait::async_trait;

/// Resolved job parameters, ordered by key.
pub type JobParams = BTreeMap<String, String>;

/// Failure reported by a [`JobTrigger`].
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// The job does not exist on the build server.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The build server refused or failed to queue the job.
    #[error("failed to trigger {job}: {reason}")]
    Failed { job: String, reason: String },
}

/// Schedules a build of a named job.
#[async_trait]
pub trait JobTrigger: Send + Sync {
    /// Queue one build of `job` with `params`. Implementations decide how to
    /// treat jobs that take no parameters.
    async fn trigger(&self, job: &str, params: &JobParams) -> Result<(), TriggerError>;
}
