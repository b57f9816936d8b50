//! Target and listen address helpers.

/// Default port for plain HTTP targets.
pub const HTTP_DEFAULT_PORT: u16 = 80;

/// Default port for `CONNECT` tunnel targets.
pub const HTTPS_DEFAULT_PORT: u16 = 443;

/// Append `default_port` to `host` unless it already carries a port.
///
/// Bracketed IPv6 literals are understood: `[::1]` gets a port, `[::1]:8443`
/// is returned unchanged.
pub fn resolve_address(host: &str, default_port: u16) -> String {
    if has_port(host) {
        host.to_string()
    } else {
        format!("{host}:{default_port}")
    }
}

fn has_port(host: &str) -> bool {
    if host.starts_with('[') {
        return match host.rfind(']') {
            Some(end) => host[end + 1..].starts_with(':'),
            None => false,
        };
    }
    host.contains(':')
}

/// Turn a listen address into something `TcpListener::bind` accepts.
///
/// `:8080` means every interface on port 8080.
pub fn bind_target(address: &str) -> String {
    if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    }
}
