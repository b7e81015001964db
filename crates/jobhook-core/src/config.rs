//! The rule document.
//!
//! ```yaml
//! jenkins:
//!   url: https://jenkins.example.com
//!   user: ci-bot
//!   pass: secret
//! repos:
//!   - repo: Wikia/app
//!     events: [push]
//!     branches: ["release-*"]
//!     jobs: [app-build]
//! ```
//!
//! The document is loaded once at startup; [`Config::rule_set`] compiles the
//! `repos` list into the immutable [`RuleSet`] used for every request.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::rules::{Rule, RuleSet};

/// Where and how to reach the build server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JenkinsEndpoint {
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
    /// Per-request timeout; the client default applies when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Parsed config document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub jenkins: JenkinsEndpoint,
    pub repos: Vec<Rule>,
}

/// A suspicious but loadable rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintWarning {
    pub index: usize,
    pub repo: String,
    pub message: String,
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule #{} ({}): {}", self.index, self.repo, self.message)
    }
}

impl Config {
    /// Parse a config document from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse the config document at `path`.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "reading config");
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Compile `repos` into the immutable rule set.
    pub fn rule_set(&self) -> Result<RuleSet, ConfigError> {
        RuleSet::new(self.repos.clone())
    }

    /// Report rules that load fine but cannot behave as intended.
    pub fn lint(&self) -> Vec<LintWarning> {
        let mut warnings = Vec::new();
        let mut declared: HashMap<&str, usize> = HashMap::new();
        for (index, rule) in self.repos.iter().enumerate() {
            if let Some(name) = rule.name.as_deref() {
                declared.entry(name).or_insert(index);
            }
        }

        for (index, rule) in self.repos.iter().enumerate() {
            let mut warn = |message: String| {
                warnings.push(LintWarning {
                    index,
                    repo: rule.repo.clone(),
                    message,
                })
            };

            match rule.jobs.as_deref() {
                None => warn("no jobs declared; a match fails the whole dispatch".to_string()),
                Some([]) => warn("empty jobs list".to_string()),
                Some(_) => {}
            }
            if rule.branches.is_some() && rule.branches_not.is_some() {
                warn("both branches and branches_not set; branches_not is ignored".to_string());
            }
            if rule.target_branches.is_some() && rule.target_branches_not.is_some() {
                warn(
                    "both target_branches and target_branches_not set; target_branches_not is ignored"
                        .to_string(),
                );
            }
            if let Some(target) = rule.ifnot.as_deref() {
                match declared.get(target) {
                    None => warn(format!("ifnot refers to unknown rule name '{target}'")),
                    Some(&at) if at >= index => warn(format!(
                        "ifnot refers to '{target}' which is not declared before this rule"
                    )),
                    Some(_) => {}
                }
            }
        }

        warnings
    }
}
