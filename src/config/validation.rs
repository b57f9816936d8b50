//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that deserialize fine but
//! cannot work at runtime. All errors are collected, not just the first.

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} must be host:port or :port")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("timeouts.connect_secs must be greater than zero")]
    ZeroConnectTimeout,

    #[error("limits.max_request_head_bytes must be at least {min}, got {actual}")]
    HeadLimitTooSmall { min: usize, actual: usize },

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),
}

/// Smallest head limit that still fits a minimal request line.
pub const MIN_REQUEST_HEAD_BYTES: usize = 256;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_valid_bind_address(&config.listener.bind_address) {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.listener.max_connections == Some(0) {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    if config.limits.max_request_head_bytes < MIN_REQUEST_HEAD_BYTES {
        errors.push(ValidationError::HeadLimitTooSmall {
            min: MIN_REQUEST_HEAD_BYTES,
            actual: config.limits.max_request_head_bytes,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_bind_address(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((_, port)) => port.parse::<u16>().is_ok(),
        None => false,
    }
}
