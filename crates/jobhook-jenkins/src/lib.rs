//! jobhook-jenkins: Jenkins integration for jobhook
//!
//! Implements [`jobhook_core::JobTrigger`] on top of the Jenkins remote
//! access API. Jobs are looked up first so that "job not found" can be told
//! apart from Jenkins refusing a build, and so that parameterless jobs are
//! started without parameters.

pub mod client;
pub mod error;

pub use client::{JenkinsClient, JenkinsConfig, JobInfo};
pub use error::JenkinsError;

/// Result type for Jenkins operations
pub type Result<T> = std::result::Result<T, JenkinsError>;
