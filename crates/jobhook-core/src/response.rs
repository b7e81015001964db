//! Mapping of dispatch outcomes onto caller-facing responses.
//!
//! A hosting layer (HTTP handler, CLI) turns a [`Response`] into its own
//! representation; [`Response::status_code`] and [`Response::exit_code`]
//! give the two conventional encodings.

use serde::Serialize;

use crate::dispatch::{DispatchSummary, JobInvocation};
use crate::error::DispatchError;
use crate::ingress::Ingress;

/// Message returned when an event matched no rule.
pub const NO_MATCH: &str = "No match found";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// Answer to a ping.
    Pong { msg: String },
    /// Event type not handled; nothing was done.
    Ignored { msg: String },
    /// Jobs queued (possibly none, e.g. for a branch deletion).
    Started { jobs: Vec<JobInvocation> },
    /// Nothing to do: no match, unsupported event, rule without jobs or
    /// unknown job.
    NotFound { msg: String },
    /// Unexpected fault.
    ServerError { msg: String },
}

impl Response {
    /// Immediate answer for events that never reach the dispatcher.
    pub fn for_ingress(ingress: &Ingress) -> Option<Self> {
        match ingress {
            Ingress::Ping => Some(Response::Pong {
                msg: "Hi!".to_string(),
            }),
            Ingress::Unsupported(_) => Some(Response::Ignored {
                msg: "wrong event type".to_string(),
            }),
            Ingress::Supported(_) => None,
        }
    }

    /// Map a dispatch outcome; no matched rule becomes [`NO_MATCH`].
    pub fn from_dispatch(result: Result<DispatchSummary, DispatchError>) -> Self {
        match result {
            Ok(summary) if !summary.deleted && summary.matched_rules.is_empty() => {
                Response::NotFound {
                    msg: NO_MATCH.to_string(),
                }
            }
            Ok(summary) => Response::Started { jobs: summary.jobs },
            Err(
                e @ (DispatchError::UnsupportedEvent(_)
                | DispatchError::NoJobsConfigured { .. }
                | DispatchError::JobNotFound { .. }),
            ) => Response::NotFound { msg: e.to_string() },
            Err(e @ DispatchError::MalformedPayload { .. }) => {
                Response::ServerError { msg: e.to_string() }
            }
        }
    }

    /// HTTP status for a webhook server.
    pub fn status_code(&self) -> u16 {
        match self {
            Response::Pong { .. } | Response::Ignored { .. } | Response::Started { .. } => 200,
            Response::NotFound { .. } => 404,
            Response::ServerError { .. } => 500,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            Response::Pong { .. } | Response::Ignored { .. } | Response::Started { .. } => 0,
            Response::NotFound { .. } => 2,
            Response::ServerError { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, EventType};
    use crate::trigger::JobParams;

    fn summary(deleted: bool, matched: &[&str], jobs: &[&str]) -> DispatchSummary {
        DispatchSummary {
            deleted,
            event_type: (!deleted).then_some(EventType::Push),
            matched_rules: matched.iter().map(|s| s.to_string()).collect(),
            jobs: jobs
                .iter()
                .map(|j| JobInvocation {
                    name: j.to_string(),
                    params: JobParams::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn ingress_answers() {
        assert_eq!(
            Response::for_ingress(&Ingress::Ping),
            Some(Response::Pong {
                msg: "Hi!".to_string()
            })
        );
        assert!(matches!(
            Response::for_ingress(&Ingress::Unsupported("issues".into())),
            Some(Response::Ignored { .. })
        ));
        assert!(Response::for_ingress(&Ingress::Supported(EventKind::Push)).is_none());
    }

    #[test]
    fn no_matched_rule_is_not_found() {
        let r = Response::from_dispatch(Ok(summary(false, &[], &[])));
        assert_eq!(
            r,
            Response::NotFound {
                msg: NO_MATCH.to_string()
            }
        );
        assert_eq!(r.status_code(), 404);
        assert_eq!(r.exit_code(), 2);
    }

    #[test]
    fn deletion_is_an_empty_success() {
        let r = Response::from_dispatch(Ok(summary(true, &[], &[])));
        assert_eq!(r, Response::Started { jobs: vec![] });
        assert_eq!(r.status_code(), 200);
    }

    #[test]
    fn matched_rules_with_skipped_jobs_still_succeed() {
        let r = Response::from_dispatch(Ok(summary(false, &["#0 foo/bar"], &[])));
        assert_eq!(r, Response::Started { jobs: vec![] });
    }

    #[test]
    fn configuration_faults_are_not_found_class() {
        for err in [
            DispatchError::UnsupportedEvent("issues".into()),
            DispatchError::NoJobsConfigured {
                rule: "#1 foo/bar".into(),
            },
            DispatchError::JobNotFound {
                job: "job1".into(),
                rule: "#1 foo/bar".into(),
            },
        ] {
            assert_eq!(Response::from_dispatch(Err(err)).status_code(), 404);
        }
    }

    #[test]
    fn malformed_payload_is_server_error() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let r = Response::from_dispatch(Err(DispatchError::MalformedPayload {
            event: "push".into(),
            source,
        }));
        assert_eq!(r.status_code(), 500);
        assert_eq!(r.exit_code(), 1);
    }

    #[test]
    fn serializes_with_status_tag() {
        let r = Response::Started {
            jobs: vec![JobInvocation {
                name: "job3".into(),
                params: JobParams::from([("branch".to_string(), "master".to_string())]),
            }],
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "started");
        assert_eq!(v["jobs"][0]["name"], "job3");
        assert_eq!(v["jobs"][0]["params"]["branch"], "master");
    }
}
