//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, concurrency cap).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Build a configuration listening on `address` with everything else defaulted.
    pub fn with_bind_address(address: impl Into<String>) -> Self {
        Self {
            listener: ListenerConfig {
                bind_address: address.into(),
                ..ListenerConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., ":8080" or "127.0.0.1:3128").
    ///
    /// A leading `:` binds every interface on that port.
    pub bind_address: String,

    /// Maximum concurrent connections.
    ///
    /// `None` leaves concurrency unbounded.
    pub max_connections: Option<usize>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: ":8080".to_string(),
            max_connections: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Dial timeout for target connections in seconds. `None` waits forever.
    pub connect_secs: Option<u64>,
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted request line plus header block, in bytes.
    pub max_request_head_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_head_bytes: 64 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, ":8080");
        assert!(config.listener.max_connections.is_none());
        assert!(config.timeouts.connect_secs.is_none());
        assert_eq!(config.limits.max_request_head_bytes, 65536);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            max_connections = 64

            [timeouts]
            connect_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, ":8080");
        assert_eq!(config.listener.max_connections, Some(64));
        assert_eq!(config.timeouts.connect_secs, Some(3));
    }
}
