//! Jenkins remote API client
//!
//! Queues builds through Jenkins' `build` / `buildWithParameters`
//! endpoints. One pooled HTTP client is reused for every call.

use std::time::Duration;

use async_trait::async_trait;
use jobhook_core::{JenkinsEndpoint, JobParams, JobTrigger, TriggerError};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::JenkinsError;
use crate::Result;

/// Environment variable overriding the Jenkins URL
pub const URL_ENV: &str = "JOBHOOK_JENKINS_URL";
/// Environment variable overriding the Jenkins user
pub const USER_ENV: &str = "JOBHOOK_JENKINS_USER";
/// Environment variable overriding the Jenkins password or API token
pub const PASS_ENV: &str = "JOBHOOK_JENKINS_PASS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Jenkins connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JenkinsConfig {
    /// Jenkins root URL
    pub url: String,
    /// User for basic auth (optional for anonymous instances)
    pub user: Option<String>,
    /// Password or API token
    pub pass: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl JenkinsConfig {
    /// Create config for a specific server
    pub fn new(url: &str) -> Self {
        JenkinsConfig {
            url: url.to_string(),
            user: None,
            pass: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from the config document's `jenkins` block; environment
    /// variables take precedence over file values.
    pub fn from_endpoint(endpoint: &JenkinsEndpoint) -> Self {
        Self::from_endpoint_with(endpoint, |key| std::env::var(key).ok())
    }

    fn from_endpoint_with(
        endpoint: &JenkinsEndpoint,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        JenkinsConfig {
            url: lookup(URL_ENV).unwrap_or_else(|| endpoint.url.clone()),
            user: lookup(USER_ENV).or_else(|| endpoint.user.clone()),
            pass: lookup(PASS_ENV).or_else(|| endpoint.pass.clone()),
            timeout: endpoint
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

/// Subset of `GET /job/<name>/api/json` needed to pick the build endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobInfo {
    #[serde(default)]
    property: Vec<JobProperty>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct JobProperty {
    #[serde(default, rename = "parameterDefinitions")]
    parameter_definitions: Vec<ParameterDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
struct ParameterDefinition {
    name: String,
}

impl JobInfo {
    /// Names of the parameters the job declares
    pub fn parameter_names(&self) -> Vec<&str> {
        self.property
            .iter()
            .flat_map(|p| p.parameter_definitions.iter())
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Whether the job accepts parameters at all
    pub fn has_params(&self) -> bool {
        self.property
            .iter()
            .any(|p| !p.parameter_definitions.is_empty())
    }
}

/// Jenkins client for queueing builds
pub struct JenkinsClient {
    config: JenkinsConfig,
    base: Url,
    http_client: reqwest::Client,
}

impl JenkinsClient {
    /// Create a new Jenkins client
    pub fn new(config: JenkinsConfig) -> Result<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| JenkinsError::Config(format!("invalid url {}: {e}", config.url)))?;
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("jobhook/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| JenkinsError::Config(e.to_string()))?;

        Ok(JenkinsClient {
            config,
            base,
            http_client,
        })
    }

    /// URL of `job` (folder jobs as `folder/name`) followed by `suffix`
    pub fn job_url(&self, job: &str, suffix: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| JenkinsError::Config(format!("{} cannot be a base", self.base)))?;
            segments.pop_if_empty();
            for part in job.split('/').filter(|p| !p.is_empty()) {
                segments.push("job").push(part);
            }
            segments.extend(suffix);
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.user {
            Some(user) => request.basic_auth(user, self.config.pass.as_deref()),
            None => request,
        }
    }

    /// Fetch the job description
    pub async fn job_info(&self, job: &str) -> Result<JobInfo> {
        let url = self.job_url(job, &["api", "json"])?;
        debug!(%url, "fetching job info");

        let response = self.authorize(self.http_client.get(url)).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        check_status(job, status, &body)?;

        serde_json::from_str(&body).map_err(|e| JenkinsError::InvalidJobInfo {
            job: job.to_string(),
            reason: e.to_string(),
        })
    }

    /// Queue one build of `job`. Parameters are dropped for jobs that do
    /// not declare any, which Jenkins would otherwise reject.
    pub async fn build_job(&self, job: &str, params: &JobParams) -> Result<()> {
        let info = self.job_info(job).await?;

        let request = if info.has_params() {
            debug!(declared = ?info.parameter_names(), "job parameters");
            info!("Running {} with params: {:?}", job, params);
            let url = self.job_url(job, &["buildWithParameters"])?;
            self.http_client.post(url).form(params)
        } else {
            info!("Running {} (job takes no parameters)", job);
            let url = self.job_url(job, &["build"])?;
            self.http_client.post(url)
        };

        let response = self.authorize(request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        check_status(job, status, &body)?;

        debug!("Run of {} job scheduled", job);
        Ok(())
    }
}

/// Map a Jenkins response status onto the error taxonomy
fn check_status(job: &str, status: u16, body: &str) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(JenkinsError::JobNotFound(job.to_string())),
        _ => Err(JenkinsError::Rejected {
            job: job.to_string(),
            status,
            body: body.trim().chars().take(512).collect(),
        }),
    }
}

#[async_trait]
impl JobTrigger for JenkinsClient {
    async fn trigger(&self, job: &str, params: &JobParams) -> std::result::Result<(), TriggerError> {
        self.build_job(job, params)
            .await
            .map_err(|e| e.into_trigger_error(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> JenkinsEndpoint {
        JenkinsEndpoint {
            url: "https://jenkins.example.com".to_string(),
            user: Some("dummy".to_string()),
            pass: Some("dummy_pass".to_string()),
            timeout_secs: None,
        }
    }

    #[test]
    fn test_config_from_endpoint_without_env() {
        let config = JenkinsConfig::from_endpoint_with(&endpoint(), |_| None);
        assert_eq!(config.url, "https://jenkins.example.com");
        assert_eq!(config.user.as_deref(), Some("dummy"));
        assert_eq!(config.pass.as_deref(), Some("dummy_pass"));
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_env_overrides_endpoint() {
        let mut ep = endpoint();
        ep.timeout_secs = Some(5);
        let config = JenkinsConfig::from_endpoint_with(&ep, |key| match key {
            PASS_ENV => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(config.pass.as_deref(), Some("from-env"));
        assert_eq!(config.user.as_deref(), Some("dummy"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_job_urls() {
        let client =
            JenkinsClient::new(JenkinsConfig::new("https://ci.example.com/jenkins/")).unwrap();
        assert_eq!(
            client.job_url("app-build", &["build"]).unwrap().as_str(),
            "https://ci.example.com/jenkins/job/app-build/build"
        );
        assert_eq!(
            client
                .job_url("team/app build", &["api", "json"])
                .unwrap()
                .as_str(),
            "https://ci.example.com/jenkins/job/team/job/app%20build/api/json"
        );
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let err = JenkinsClient::new(JenkinsConfig::new("not a url")).err().unwrap();
        assert!(matches!(err, JenkinsError::Config(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status("j", 201, "").is_ok());
        assert!(matches!(
            check_status("j", 404, "Not Found"),
            Err(JenkinsError::JobNotFound(_))
        ));
        assert!(matches!(
            check_status("j", 500, "  boom  "),
            Err(JenkinsError::Rejected { status: 500, ref body, .. }) if body == "boom"
        ));
    }

    #[test]
    fn test_job_info_parameters() {
        let with_params: JobInfo = serde_json::from_str(
            r#"{
                "name": "app-build",
                "property": [
                    { "_class": "hudson.model.ParametersDefinitionProperty",
                      "parameterDefinitions": [ { "name": "branch" }, { "name": "commit" } ] },
                    { "_class": "jenkins.model.BuildDiscarderProperty" }
                ]
            }"#,
        )
        .unwrap();
        assert!(with_params.has_params());
        assert_eq!(with_params.parameter_names(), vec!["branch", "commit"]);

        let without: JobInfo =
            serde_json::from_str(r#"{ "name": "nightly", "property": [] }"#).unwrap();
        assert!(!without.has_params());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_generic_failure() {
        let client = JenkinsClient::new(
            JenkinsConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let err = client
            .trigger("app-build", &JobParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TriggerError::Failed { .. }));
    }
}
