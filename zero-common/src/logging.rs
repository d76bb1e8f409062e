//! Logging setup for the Zero chat bot.
//!
//! HTTP client internals (hyper, reqwest, h2, rustls) are held at `warn` so
//! request-level chatter does not drown out conversation logs. Output goes to
//! stderr; stdout carries replies.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Modules capped at `warn` regardless of the base level.
pub const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Anything other than `"json"` is pretty.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

fn build_directives(log_level: &str) -> String {
    NOISY_MODULES
        .iter()
        .fold(log_level.to_string(), |mut acc, module| {
            acc.push(',');
            acc.push_str(module);
            acc.push_str("=warn");
            acc
        })
}

/// `RUST_LOG` wins over the configured level when set.
fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(build_directives(log_level)))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(log_level: &str, log_format: &str) {
    let format = LogFormat::parse(log_format);
    let registry = tracing_subscriber::registry().with(build_filter(log_level));

    let installed = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(log_level, ?format, "Logging initialized");
    }
}
