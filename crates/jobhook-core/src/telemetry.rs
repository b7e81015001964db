//! Tracing initialisation for jobhook binaries.
//!
//! Call [`init_tracing`] once at program start. Log lines go to stderr so
//! stdout stays free for command output. `RUST_LOG` takes priority
//! over the level passed in; `JOBHOOK_LOG_FORMAT=json` selects JSON lines
//! when the caller defers to the environment via [`LogFormat::from_env`].
//! Later calls are ignored because the global subscriber can only be set once.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted by [`LogFormat::from_env`].
pub const LOG_FORMAT_ENV: &str = "JOBHOOK_LOG_FORMAT";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// Newline-delimited JSON, for log aggregation.
    Json,
}

impl LogFormat {
    /// `Json` when [`LOG_FORMAT_ENV`] is `json` (any case), else `Text`.
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Install the global subscriber with an `EnvFilter` defaulting to `level`.
pub fn init_tracing(format: LogFormat, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok(),
    };
}
