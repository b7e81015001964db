//! Declarative trigger rules and the immutable [`RuleSet`].
//!
//! A [`Rule`] is one entry of the `repos` list in the config document. Rules
//! are compiled once into [`CompiledRule`]s, which cache the glob matchers for
//! their branch filters, and collected into a [`RuleSet`] that never changes
//! after construction.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::event::{EventMetadata, EventType};
use crate::glob::GlobMatcher;
use crate::matcher;

/// A job parameter override as written in the config document.
///
/// `Null` removes the parameter from the resolved set instead of sending it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => Ok(()),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::UInt(u) => write!(f, "{u}"),
            // Debug keeps the fractional part, so `1.0` is not sent as `1`.
            ParamValue::Float(x) => write!(f, "{x:?}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

/// One declarative rule. Every filter is optional; an absent filter accepts
/// every event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Repository the rule applies to, as `owner/name`.
    pub repo: String,

    /// Event types (after wrapping) the rule accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,

    /// Source branch must match one of these globs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<String>>,

    /// Source branch must match none of these globs. Ignored when
    /// `branches` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches_not: Option<Vec<String>>,

    /// Target branch must match one of these globs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_branches: Option<Vec<String>>,

    /// Target branch must match none of these globs. Ignored when
    /// `target_branches` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_branches_not: Option<Vec<String>>,

    /// The event comment must contain one of these substrings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentions: Option<Vec<String>>,

    /// The event must carry at least one of these labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,

    /// The event action must be one of these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,

    /// Name other rules can refer to through `ifnot`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Suppress this rule when the named rule already matched earlier in
    /// the same pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifnot: Option<String>,

    /// Jobs to trigger, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<String>>,

    /// Overrides merged on top of the default job parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub job_params: BTreeMap<String, ParamValue>,
}

impl Rule {
    /// Start a rule for `repo` with no filters (builder pattern).
    pub fn for_repo(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            ..Self::default()
        }
    }

    /// Accept only these event types.
    pub fn with_events(mut self, events: &[&str]) -> Self {
        self.events = Some(to_owned(events));
        self
    }

    /// Require the source branch to match one of `patterns`.
    pub fn with_branches(mut self, patterns: &[&str]) -> Self {
        self.branches = Some(to_owned(patterns));
        self
    }

    /// Reject source branches matching any of `patterns`.
    pub fn with_branches_not(mut self, patterns: &[&str]) -> Self {
        self.branches_not = Some(to_owned(patterns));
        self
    }

    /// Require the merge target to match one of `patterns`.
    pub fn with_target_branches(mut self, patterns: &[&str]) -> Self {
        self.target_branches = Some(to_owned(patterns));
        self
    }

    /// Reject merge targets matching any of `patterns`.
    pub fn with_target_branches_not(mut self, patterns: &[&str]) -> Self {
        self.target_branches_not = Some(to_owned(patterns));
        self
    }

    /// Require one of `mentions` in the pull request or comment body.
    pub fn with_mentions(mut self, mentions: &[&str]) -> Self {
        self.mentions = Some(to_owned(mentions));
        self
    }

    /// Require one of `labels` on the pull request.
    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = Some(to_owned(labels));
        self
    }

    /// Accept only these payload actions.
    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.actions = Some(to_owned(actions));
        self
    }

    /// Name the rule so later rules can refer to it with `ifnot`.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Skip this rule when the named rule already matched.
    pub fn with_ifnot(mut self, name: &str) -> Self {
        self.ifnot = Some(name.to_string());
        self
    }

    /// Jobs to trigger on a match.
    pub fn with_jobs(mut self, jobs: &[&str]) -> Self {
        self.jobs = Some(to_owned(jobs));
        self
    }

    /// Override one job parameter.
    pub fn with_param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.job_params.insert(key.to_string(), value.into());
        self
    }
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Include/exclude filter over one branch field.
#[derive(Debug, Clone)]
pub enum BranchFilter {
    /// Value must match.
    Only(GlobMatcher),
    /// Value must not match.
    Except(GlobMatcher),
}

impl BranchFilter {
    /// Build the filter from a rule's include/exclude lists. The include list
    /// takes precedence when both are present.
    fn compile(
        include: Option<&[String]>,
        exclude: Option<&[String]>,
    ) -> Result<Option<Self>, regex::Error> {
        match (include, exclude) {
            (Some(patterns), _) => Ok(Some(BranchFilter::Only(GlobMatcher::compile(patterns)?))),
            (None, Some(patterns)) => Ok(Some(BranchFilter::Except(GlobMatcher::compile(
                patterns,
            )?))),
            (None, None) => Ok(None),
        }
    }

    /// Whether `value` passes this filter.
    pub fn allows(&self, value: &str) -> bool {
        match self {
            BranchFilter::Only(m) => m.matches(value),
            BranchFilter::Except(m) => !m.matches(value),
        }
    }
}

/// A rule together with its precompiled branch filters.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    index: usize,
    rule: Rule,
    branch: Option<BranchFilter>,
    target_branch: Option<BranchFilter>,
}

impl CompiledRule {
    fn compile(index: usize, rule: Rule) -> Result<Self, ConfigError> {
        let invalid = |field: &'static str| {
            let repo = rule.repo.clone();
            move |source: regex::Error| ConfigError::InvalidPattern {
                index,
                repo,
                field,
                source,
            }
        };

        let branch = BranchFilter::compile(rule.branches.as_deref(), rule.branches_not.as_deref())
            .map_err(invalid("branch"))?;
        let target_branch = BranchFilter::compile(
            rule.target_branches.as_deref(),
            rule.target_branches_not.as_deref(),
        )
        .map_err(invalid("target branch"))?;

        Ok(Self {
            index,
            rule,
            branch,
            target_branch,
        })
    }

    /// Position of the rule in the config document.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn branch_filter(&self) -> Option<&BranchFilter> {
        self.branch.as_ref()
    }

    pub fn target_branch_filter(&self) -> Option<&BranchFilter> {
        self.target_branch.as_ref()
    }

    /// Human-readable identifier for logs and errors: the rule name when
    /// set, otherwise its position and repository.
    pub fn label(&self) -> String {
        match &self.rule.name {
            Some(name) => name.clone(),
            None => format!("#{} {}", self.index, self.rule.repo),
        }
    }
}

/// Ordered, immutable collection of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile `rules`, keeping their declaration order.
    pub fn new(rules: Vec<Rule>) -> Result<Self, ConfigError> {
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| CompiledRule::compile(index, rule))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    /// Rules matching the event, in declaration order.
    pub fn get_matches(&self, event_type: EventType, meta: &EventMetadata) -> Vec<&CompiledRule> {
        matcher::get_matches(event_type, meta, self)
    }
}
