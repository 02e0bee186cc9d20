use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const MONITOR_API_ADDR: &str = "MONITOR_API_ADDR";

const DEFAULT_PORT: u16 = 8080;

const DEFAULT_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), DEFAULT_PORT);

pub fn get_bind_addr() -> SocketAddr {
    let addr_from_env = std::env::var(MONITOR_API_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

const MONITOR_API_TOKEN: &str = "MONITOR_API_TOKEN";

pub fn get_api_token() -> Option<String> {
    let token_from_env = std::env::var(MONITOR_API_TOKEN);
    token_from_env.ok().filter(|token| !token.is_empty())
}

/// Rough check that `host` could be an IP address or DNS name
///
/// The device performs the real resolution; this only rejects input that
/// can never be valid so callers get a 4xx instead of a device error.
pub fn is_plausible_host(host: &str) -> bool {
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }

    if host.is_empty() || host.len() > 253 || host.starts_with('-') || host.starts_with('.') {
        return false;
    }

    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
