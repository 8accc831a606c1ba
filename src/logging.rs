//! Logging configuration for the chain organizer.
//!
//! The organizer logs through `tracing`; hosts embedding it will usually
//! install their own subscriber. These helpers cover standalone use and
//! tests.

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging initialization failures.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Type alias for logging operation results.
pub type LoggingResult<T> = std::result::Result<T, LoggingError>;

/// Install a console subscriber at the given level.
///
/// The `RUST_LOG` environment variable refines the filter when set.
pub fn init_console_logging(level: LevelFilter) -> LoggingResult<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|error| LoggingError::AlreadyInstalled(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent_enough() {
        // First call may succeed or collide with another test's subscriber;
        // the second must report the collision rather than panic.
        let _ = init_console_logging(LevelFilter::WARN);
        assert!(init_console_logging(LevelFilter::WARN).is_err());
    }
}
