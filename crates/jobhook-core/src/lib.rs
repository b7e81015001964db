//! jobhook core library
//!
//! Matches source-control webhook events against a declarative rule set and
//! triggers the jobs of every matching rule through a [`JobTrigger`].
//!
//! Pipeline: [`event::normalize`] → [`RuleSet::get_matches`] →
//! [`Dispatcher`] → [`JobTrigger::trigger`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod fakes;
pub mod glob;
pub mod ingress;
pub mod matcher;
pub mod metrics;
pub mod obs;
pub mod response;
pub mod rules;
pub mod telemetry;
pub mod trigger;

pub use config::{Config, JenkinsEndpoint, LintWarning};
pub use dispatch::{
    resolve_params, DispatchPlan, DispatchSummary, Dispatcher, JobInvocation, PlannedRule,
};
pub use error::{ConfigError, DispatchError, Result};
pub use event::{normalize, EventKind, EventMetadata, EventType, GithubEvent};
pub use glob::GlobMatcher;
pub use ingress::{classify, Ingress};
pub use matcher::get_matches;
pub use metrics::METRICS;
pub use response::Response;
pub use rules::{BranchFilter, CompiledRule, ParamValue, Rule, RuleSet};
pub use telemetry::{init_tracing, LogFormat};
pub use trigger::{JobParams, JobTrigger, TriggerError};

/// jobhook version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
