//! Tracing setup for binaries and tests that embed the loader.
//!
//! Output is controlled by two environment variables:
//!
//! - `SPRIG_LOG`: filter directives with `RUST_LOG` syntax, e.g.
//!   `sprig_loader=info,sprig::console=info`. Falls back to `RUST_LOG`.
//! - `SPRIG_LOG_FORMAT`: `text` (default) or `json`.
//!
//! Nothing is installed when neither filter variable is set.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain text lines (default).
    Text,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse a `SPRIG_LOG_FORMAT` value. Unknown values mean text.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("SPRIG_LOG_FORMAT").unwrap_or_default())
    }
}

fn build_filter() -> EnvFilter {
    match std::env::var("SPRIG_LOG") {
        Ok(directives) => EnvFilter::builder().parse_lossy(directives),
        Err(_) => EnvFilter::from_default_env(),
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Returns `false` when no filter variable is set or a subscriber is
/// already installed.
pub fn init_tracing() -> bool {
    if std::env::var_os("SPRIG_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
        return false;
    }

    let filter = build_filter();
    match LogFormat::from_env() {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(layer).try_init().is_ok()
        }
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse("tree"), LogFormat::Text);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
    }
}
