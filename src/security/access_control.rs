//! Self-proxy access control.
//! Refuses requests aimed at the proxy itself or at `localhost`.

use std::net::SocketAddr;

/// Decides whether a requested host points back at this proxy.
///
/// Matching such requests would loop the proxy into itself or expose local
/// services through it.
#[derive(Debug, Clone)]
pub struct SelfProxyGuard {
    /// Listen address exactly as configured (e.g. ":8080").
    configured: String,
    /// Address the listener actually bound to.
    bound: Option<SocketAddr>,
}

impl SelfProxyGuard {
    pub fn new(configured: impl Into<String>, bound: Option<SocketAddr>) -> Self {
        Self {
            configured: configured.into(),
            bound,
        }
    }

    /// True when `host` must be rejected with `400 Bad Request`.
    pub fn is_self_target(&self, host: &str) -> bool {
        if host == self.configured {
            return true;
        }
        if let Some(bound) = self.bound {
            if host == bound.to_string() {
                return true;
            }
        }
        starts_with_localhost(host)
    }
}

fn starts_with_localhost(host: &str) -> bool {
    const LOCALHOST: &str = "localhost";
    host.get(..LOCALHOST.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(LOCALHOST))
}
