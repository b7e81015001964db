//! Error types for jobhook-jenkins

use jobhook_core::TriggerError;
use thiserror::Error;

/// Errors that can occur while talking to Jenkins
#[derive(Error, Debug)]
pub enum JenkinsError {
    /// Job does not exist (HTTP 404)
    #[error("Jenkins job not found: {0}")]
    JobNotFound(String),

    /// Jenkins answered with a non-success status
    #[error("Jenkins refused job {job} ({status}): {body}")]
    Rejected {
        job: String,
        status: u16,
        body: String,
    },

    /// Job description could not be parsed
    #[error("Invalid job description for {job}: {reason}")]
    InvalidJobInfo { job: String, reason: String },

    /// Client could not be built
    #[error("Invalid Jenkins client configuration: {0}")]
    Config(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for JenkinsError {
    fn from(err: reqwest::Error) -> Self {
        JenkinsError::Http(err.to_string())
    }
}

impl JenkinsError {
    /// Map into the dispatcher's trigger error, keeping "not found" distinct.
    pub fn into_trigger_error(self, job: &str) -> TriggerError {
        match self {
            JenkinsError::JobNotFound(name) => TriggerError::NotFound(name),
            other => TriggerError::Failed {
                job: job.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_stays_not_found() {
        let err = JenkinsError::JobNotFound("app-build".to_string()).into_trigger_error("app-build");
        assert!(matches!(err, TriggerError::NotFound(ref j) if j == "app-build"));
    }

    #[test]
    fn other_errors_become_generic_failures() {
        let err = JenkinsError::Rejected {
            job: "app-build".to_string(),
            status: 400,
            body: "This job does not support parameters".to_string(),
        }
        .into_trigger_error("app-build");
        match err {
            TriggerError::Failed { job, reason } => {
                assert_eq!(job, "app-build");
                assert!(reason.contains("400"));
                assert!(reason.contains("does not support parameters"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
