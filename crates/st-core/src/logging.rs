//! Structured logging foundation for st-core.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSON lines for daemon/agent workflows
//!
//! stdout is reserved for command payloads (JSON output); stderr receives
//! all log output. Respects the `ST_LOG` and `ST_LOG_FORMAT` environment
//! variables.

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Jsonl,
}

/// Logging configuration resolved from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Human,
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Resolve from environment, with optional overrides from the CLI.
    pub fn from_env(format: Option<LogFormat>, level: Option<&str>) -> Self {
        let env_format = match std::env::var("ST_LOG_FORMAT").ok().as_deref() {
            Some("jsonl") => Some(LogFormat::Jsonl),
            Some("human") => Some(LogFormat::Human),
            _ => None,
        };
        let env_level = std::env::var("ST_LOG").ok();

        Self {
            format: format.or(env_format).unwrap_or_default(),
            level: level
                .map(str::to_string)
                .or(env_level)
                .unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Initialize the logging subsystem.
///
/// Must be called once at startup before any logging occurs.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("st_core={}", config.level)));

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Jsonl => {
            let jsonl_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(jsonl_layer)
                .init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("run-{}", &uuid.to_string()[..12])
}
