//! jobhook - trigger Jenkins jobs from GitHub webhook events
//!
//! ## Commands
//!
//! - `dispatch`: run one event through the rule set and queue the matched jobs
//! - `matches`: show which rules and jobs an event would trigger, without
//!   queueing anything
//! - `check-config`: load, compile and lint the configuration

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobhook_core::{
    classify, init_tracing, obs, Config, Dispatcher, JobTrigger, LogFormat, Response, METRICS,
};
use jobhook_jenkins::{JenkinsClient, JenkinsConfig};
use serde_json::Value;
use tracing::{info, warn, Instrument, Level};

#[derive(Parser)]
#[command(name = "jobhook")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rule-driven Jenkins triggering for GitHub webhooks", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to the YAML configuration
    #[arg(
        short,
        long,
        global = true,
        env = "JOBHOOK_CONFIG",
        default_value = "config.yaml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch one webhook event and queue the matched jobs
    Dispatch {
        /// Event type, as sent in the X-GitHub-Event header
        #[arg(short, long)]
        event: String,

        /// JSON payload file, or `-` for stdin
        #[arg(short, long)]
        payload: PathBuf,

        /// Delivery id for log correlation (random when omitted)
        #[arg(long)]
        delivery: Option<String>,
    },

    /// Print the rules and jobs an event would trigger
    Matches {
        /// Event type, as sent in the X-GitHub-Event header
        #[arg(short, long)]
        event: String,

        /// JSON payload file, or `-` for stdin
        #[arg(short, long)]
        payload: PathBuf,
    },

    /// Validate the configuration and report suspicious rules
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    };
    init_tracing(format, level);

    let code = match cli.command {
        Commands::Dispatch {
            event,
            payload,
            delivery,
        } => cmd_dispatch(&cli.config, &event, &payload, delivery).await?,
        Commands::Matches { event, payload } => cmd_matches(&cli.config, &event, &payload)?,
        Commands::CheckConfig => cmd_check_config(&cli.config)?,
    };
    Ok(ExitCode::from(code))
}

/// Load the configuration and build a dispatcher backed by Jenkins.
fn build_dispatcher(config_path: &Path) -> Result<Dispatcher<JenkinsClient>> {
    let config = Config::from_path(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let rules = config.rule_set().context("Failed to compile rules")?;
    let client = JenkinsClient::new(JenkinsConfig::from_endpoint(&config.jenkins))
        .context("Failed to create Jenkins client")?;
    Ok(Dispatcher::new(Arc::new(rules), Arc::new(client)))
}

async fn cmd_dispatch(
    config_path: &Path,
    event: &str,
    payload_path: &Path,
    delivery: Option<String>,
) -> Result<u8> {
    let delivery = delivery.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let response = match Response::for_ingress(&classify(event)) {
        Some(answer) => answer,
        None => {
            let payload = read_payload(payload_path)?;
            let dispatcher = build_dispatcher(config_path)?;
            run_dispatch(&dispatcher, event, &payload, &delivery).await
        }
    };

    print_json(&response)?;
    METRICS.flush();
    Ok(response.exit_code())
}

/// Dispatch within a span carrying the delivery id.
async fn run_dispatch<T: JobTrigger>(
    dispatcher: &Dispatcher<T>,
    event: &str,
    payload: &Value,
    delivery: &str,
) -> Response {
    let result = dispatcher
        .dispatch(event, payload)
        .instrument(obs::delivery_span(delivery))
        .await;
    if let Err(e) = &result {
        warn!(error = %e, "dispatch failed");
    }
    Response::from_dispatch(result)
}

fn cmd_matches(config_path: &Path, event: &str, payload_path: &Path) -> Result<u8> {
    if let Some(answer) = Response::for_ingress(&classify(event)) {
        print_json(&answer)?;
        return Ok(answer.exit_code());
    }

    let payload = read_payload(payload_path)?;
    let dispatcher = build_dispatcher(config_path)?;
    match dispatcher.plan(event, &payload) {
        Ok(plan) => {
            print_json(&plan)?;
            Ok(if plan.deleted || !plan.rules.is_empty() {
                0
            } else {
                2
            })
        }
        Err(e) => {
            let answer = Response::from_dispatch(Err(e));
            print_json(&answer)?;
            Ok(answer.exit_code())
        }
    }
}

fn cmd_check_config(config_path: &Path) -> Result<u8> {
    let config = Config::from_path(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let rules = config.rule_set().context("Failed to compile rules")?;
    info!(rules = rules.len(), "configuration compiled");

    println!("Config:  {}", config_path.display());
    println!("Jenkins: {}", config.jenkins.url);
    println!("Rules:   {}", rules.len());
    for compiled in rules.iter() {
        let jobs = compiled
            .rule()
            .jobs
            .as_deref()
            .map(|jobs| jobs.join(", "))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<32} {}", compiled.label(), jobs);
    }

    let warnings = config.lint();
    if warnings.is_empty() {
        println!("\n✓ No problems found");
    } else {
        println!();
        for warning in &warnings {
            println!("warning: {}", warning);
        }
    }
    Ok(0)
}

/// Read a JSON payload from `path`, or from stdin when `path` is `-`.
fn read_payload(path: &Path) -> Result<Value> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read payload from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload {}", path.display()))?
    };
    serde_json::from_str(&raw).context("Payload is not valid JSON")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
