//! GitHub event payloads and their normalization into [`EventMetadata`].
//!
//! Each supported event kind has its own typed payload. [`GithubEvent`]
//! decodes the raw JSON into the matching variant, computes the wrapped
//! [`EventType`] used by rules, and flattens the payload into the canonical
//! metadata record the matcher works on.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, Result};
use crate::trigger::JobParams;

/// Raw event kinds accepted from GitHub (`X-GitHub-Event`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
    PullRequestReviewComment,
}

impl EventKind {
    /// Parse a raw event type; `None` for anything unsupported.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "push" => Some(EventKind::Push),
            "pull_request" => Some(EventKind::PullRequest),
            "pull_request_review_comment" => Some(EventKind::PullRequestReviewComment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Push => "push",
            EventKind::PullRequest => "pull_request",
            EventKind::PullRequestReviewComment => "pull_request_review_comment",
        }
    }
}

/// Event type as seen by rules. Identical to the raw kind except for merged
/// pull requests, which get their own synthetic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Push,
    PullRequest,
    PullRequestMerged,
    PullRequestReviewComment,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Push => "push",
            EventType::PullRequest => "pull_request",
            EventType::PullRequestMerged => "pull_request_merged",
            EventType::PullRequestReviewComment => "pull_request_review_comment",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EventKind> for EventType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Push => EventType::Push,
            EventKind::PullRequest => EventType::PullRequest,
            EventKind::PullRequestReviewComment => EventType::PullRequestReviewComment,
        }
    }
}

/// Canonical, per-request view of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// `owner/name` of the repository.
    pub repo: String,
    pub branch: String,
    /// Merge target; empty for events without one.
    pub target_branch: String,
    pub author: Option<String>,
    pub email: Option<String>,
    pub commit: Option<String>,
    pub comment: Option<String>,
    pub labels: BTreeSet<String>,
    pub action: Option<String>,
    pub pull_num: Option<u64>,
}

impl EventMetadata {
    /// Default job parameters: `repo`, `branch`, `commit`, `author`, `email`
    /// and `pull_num`, whichever are present.
    pub fn default_job_params(&self) -> JobParams {
        let mut params = JobParams::new();
        params.insert("repo".to_string(), self.repo.clone());
        params.insert("branch".to_string(), self.branch.clone());

        let optional = [
            ("commit", self.commit.clone()),
            ("author", self.author.clone()),
            ("email", self.email.clone()),
            ("pull_num", self.pull_num.map(|n| n.to_string())),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.insert(key.to_string(), value);
            }
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    pub id: String,
    pub author: CommitAuthor,
}

/// `push` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: Repository,
    pub head_commit: HeadCommit,
}

/// Head or base of a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub merged: Option<bool>,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// `pull_request` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    #[serde(default)]
    pub action: Option<String>,
    pub repository: Repository,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewComment {
    #[serde(default)]
    pub body: Option<String>,
}

/// `pull_request_review_comment` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewCommentPayload {
    pub repository: Repository,
    pub pull_request: PullRequest,
    pub comment: ReviewComment,
}

/// A decoded event of one of the supported kinds.
#[derive(Debug, Clone)]
pub enum GithubEvent {
    Push(PushPayload),
    PullRequest(PullRequestPayload),
    ReviewComment(ReviewCommentPayload),
}

impl GithubEvent {
    /// Decode `payload` as an event of the given kind.
    pub fn decode(kind: EventKind, payload: &Value) -> Result<Self> {
        let malformed = |source| DispatchError::MalformedPayload {
            event: kind.as_str().to_string(),
            source,
        };
        let event = match kind {
            EventKind::Push => {
                GithubEvent::Push(PushPayload::deserialize(payload).map_err(malformed)?)
            }
            EventKind::PullRequest => GithubEvent::PullRequest(
                PullRequestPayload::deserialize(payload).map_err(malformed)?,
            ),
            EventKind::PullRequestReviewComment => GithubEvent::ReviewComment(
                ReviewCommentPayload::deserialize(payload).map_err(malformed)?,
            ),
        };
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            GithubEvent::Push(_) => EventKind::Push,
            GithubEvent::PullRequest(_) => EventKind::PullRequest,
            GithubEvent::ReviewComment(_) => EventKind::PullRequestReviewComment,
        }
    }

    /// Event type presented to rules: a closed and merged pull request
    /// becomes `pull_request_merged`.
    pub fn wrapped_type(&self) -> EventType {
        match self {
            GithubEvent::PullRequest(p)
                if p.pull_request.state == "closed" && p.pull_request.merged == Some(true) =>
            {
                EventType::PullRequestMerged
            }
            other => other.kind().into(),
        }
    }

    /// Flatten the payload into canonical metadata.
    pub fn metadata(&self) -> EventMetadata {
        match self {
            GithubEvent::Push(p) => EventMetadata {
                repo: p.repository.full_name.clone(),
                branch: p
                    .git_ref
                    .strip_prefix("refs/heads/")
                    .unwrap_or(&p.git_ref)
                    .to_string(),
                target_branch: String::new(),
                author: Some(p.head_commit.author.name.clone()),
                email: p.head_commit.author.email.clone(),
                commit: Some(p.head_commit.id.clone()),
                ..EventMetadata::default()
            },
            GithubEvent::PullRequest(p) => {
                let pr = &p.pull_request;
                EventMetadata {
                    repo: p.repository.full_name.clone(),
                    branch: pr.head.name.clone(),
                    target_branch: pr.base.name.clone(),
                    commit: Some(pr.head.sha.clone()),
                    comment: pr.body.clone(),
                    labels: pr.labels.iter().map(|l| l.name.clone()).collect(),
                    action: p.action.clone(),
                    pull_num: Some(pr.number),
                    ..EventMetadata::default()
                }
            }
            GithubEvent::ReviewComment(p) => {
                let pr = &p.pull_request;
                EventMetadata {
                    repo: p.repository.full_name.clone(),
                    branch: pr.head.name.clone(),
                    target_branch: pr.base.name.clone(),
                    commit: Some(pr.head.sha.clone()),
                    comment: p.comment.body.clone(),
                    pull_num: Some(pr.number),
                    ..EventMetadata::default()
                }
            }
        }
    }
}

/// Whether the payload reports a deleted branch. Such payloads lack the
/// head commit and are never normalized.
pub fn is_deletion(payload: &Value) -> bool {
    payload.get("deleted").and_then(Value::as_bool) == Some(true)
}

/// Normalize a raw event into its wrapped type and metadata.
pub fn normalize(raw_event_type: &str, payload: &Value) -> Result<(EventType, EventMetadata)> {
    let kind = EventKind::parse(raw_event_type)
        .ok_or_else(|| DispatchError::UnsupportedEvent(raw_event_type.to_string()))?;
    let event = GithubEvent::decode(kind, payload)?;
    Ok((event.wrapped_type(), event.metadata()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn push_payload() -> Value {
        json!({
            "ref": "refs/heads/feature/login",
            "deleted": false,
            "repository": { "full_name": "Wikia/app", "name": "app" },
            "head_commit": {
                "id": "4d2ab4e76d0d405d17d1a0f2b8a6071394e3ab40",
                "author": { "name": "Kyle Daigle", "email": "kyle.daigle@github.com" }
            }
        })
    }

    fn pull_request_payload(state: &str, merged: bool) -> Value {
        json!({
            "action": "closed",
            "repository": { "full_name": "Wikia/sparrow" },
            "pull_request": {
                "number": 31,
                "state": state,
                "merged": merged,
                "body": "please test @WikiaSparrow",
                "head": { "ref": "test-branch", "sha": "f96bc53e" },
                "base": { "ref": "master", "sha": "9049f126" },
                "labels": [ { "name": "bug" }, { "name": "ready" } ]
            }
        })
    }

    #[test]
    fn push_strips_ref_prefix_and_reads_head_commit() {
        let (ty, meta) = normalize("push", &push_payload()).unwrap();
        assert_eq!(ty, EventType::Push);
        assert_eq!(meta.repo, "Wikia/app");
        assert_eq!(meta.branch, "feature/login");
        assert_eq!(meta.target_branch, "");
        assert_eq!(meta.author.as_deref(), Some("Kyle Daigle"));
        assert_eq!(meta.email.as_deref(), Some("kyle.daigle@github.com"));
        assert_eq!(
            meta.commit.as_deref(),
            Some("4d2ab4e76d0d405d17d1a0f2b8a6071394e3ab40")
        );
        assert!(meta.comment.is_none());
        assert!(meta.pull_num.is_none());
    }

    #[test]
    fn pull_request_extracts_head_base_labels_and_action() {
        let (ty, meta) = normalize("pull_request", &pull_request_payload("open", false)).unwrap();
        assert_eq!(ty, EventType::PullRequest);
        assert_eq!(meta.branch, "test-branch");
        assert_eq!(meta.target_branch, "master");
        assert_eq!(meta.commit.as_deref(), Some("f96bc53e"));
        assert_eq!(meta.comment.as_deref(), Some("please test @WikiaSparrow"));
        assert_eq!(meta.pull_num, Some(31));
        assert_eq!(meta.action.as_deref(), Some("closed"));
        assert!(meta.labels.contains("bug"));
        assert!(meta.labels.contains("ready"));
        assert!(meta.author.is_none());
    }

    #[test]
    fn closed_and_merged_pull_request_is_wrapped() {
        let (ty, _) = normalize("pull_request", &pull_request_payload("closed", true)).unwrap();
        assert_eq!(ty, EventType::PullRequestMerged);
        assert_eq!(ty.to_string(), "pull_request_merged");
    }

    #[test]
    fn closed_unmerged_pull_request_keeps_raw_type() {
        let (ty, _) = normalize("pull_request", &pull_request_payload("closed", false)).unwrap();
        assert_eq!(ty, EventType::PullRequest);
    }

    #[test]
    fn review_comment_uses_comment_body() {
        let payload = json!({
            "action": "created",
            "repository": { "full_name": "Wikia/sparrow" },
            "comment": { "body": "@WikiaSparrow run it" },
            "pull_request": {
                "number": 31,
                "state": "open",
                "body": "original description",
                "head": { "ref": "test-branch", "sha": "f96bc53e" },
                "base": { "ref": "dev", "sha": "9049f126" }
            }
        });
        let (ty, meta) = normalize("pull_request_review_comment", &payload).unwrap();
        assert_eq!(ty, EventType::PullRequestReviewComment);
        assert_eq!(meta.comment.as_deref(), Some("@WikiaSparrow run it"));
        assert_eq!(meta.target_branch, "dev");
        assert_eq!(meta.pull_num, Some(31));
        assert!(meta.action.is_none());
    }

    #[test]
    fn unsupported_event_type_is_an_explicit_error() {
        let err = normalize("issues", &json!({})).unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedEvent(ref t) if t == "issues"));
    }

    #[test]
    fn missing_head_commit_is_malformed() {
        let payload = json!({
            "ref": "refs/heads/gone",
            "repository": { "full_name": "Wikia/app" },
            "head_commit": null
        });
        let err = normalize("push", &payload).unwrap_err();
        assert!(matches!(err, DispatchError::MalformedPayload { ref event, .. } if event == "push"));
    }

    #[test]
    fn deletion_flag_detection() {
        assert!(is_deletion(&json!({ "deleted": true })));
        assert!(!is_deletion(&json!({ "deleted": false })));
        assert!(!is_deletion(&json!({ "deleted": "true" })));
        assert!(!is_deletion(&push_payload()));
    }

    #[test]
    fn default_params_include_only_present_fields() {
        let (_, meta) = normalize("push", &push_payload()).unwrap();
        let params = meta.default_job_params();
        let keys: Vec<_> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["author", "branch", "commit", "email", "repo"]);

        let (_, meta) = normalize("pull_request", &pull_request_payload("open", false)).unwrap();
        let params = meta.default_job_params();
        assert_eq!(params["pull_num"], "31");
        assert!(!params.contains_key("author"));
        assert!(!params.contains_key("target_branch"));
        assert!(!params.contains_key("comment"));
    }

    #[test]
    fn raw_kind_round_trips_through_as_str() {
        for raw in ["push", "pull_request", "pull_request_review_comment"] {
            assert_eq!(EventKind::parse(raw).unwrap().as_str(), raw);
        }
        assert!(EventKind::parse("ping").is_none());
    }
}
