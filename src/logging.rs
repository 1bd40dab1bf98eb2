//! Structured logging with tracing.
//!
//! `KILN_LOG` takes precedence over the configured level and accepts full
//! `EnvFilter` directives (`KILN_LOG=kiln=debug,hyper=warn`).

use tracing::{Level, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

use crate::config::LoggerConfig;
use crate::error::{Error, Result};

/// Environment variable overriding the configured filter.
pub const LOG_ENV: &str = "KILN_LOG";

/// Installs the global subscriber described by `config`.
///
/// Does nothing when logging is inactive. Fails if the level is invalid or
/// a global subscriber is already installed.
pub fn init_logging(config: &LoggerConfig) -> Result<()> {
    if !config.active {
        return Ok(());
    }

    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| {
            EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
        });

    let installed = if config.json {
        let layer = fmt::layer().json().with_target(true).with_current_span(true);
        Registry::default().with(filter).with(layer).try_init()
    } else {
        let layer = fmt::layer().with_target(true);
        Registry::default().with(filter).with(layer).try_init()
    };
    installed.map_err(|e| Error::invalid_configuration(format!("logger already installed: {e}")))?;

    info!(channel = %config.channel, level = %level, json = config.json, "logging initialized");
    Ok(())
}

/// Parses a level name; `warning` is accepted for `warn`.
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(Error::invalid_configuration(format!(
            "invalid log level `{level}`; use trace, debug, info, warn or error"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn inactive_logger_installs_nothing() {
        let config = LoggerConfig { active: false, ..LoggerConfig::default() };
        assert!(init_logging(&config).is_ok());
    }
}
