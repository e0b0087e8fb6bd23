//! Resolution of the `server` field recorded for each run.

use crate::types::UNKNOWN;

/// Pick the server name for a run: the configured `server_name` if set,
/// otherwise the host name of this machine, otherwise `"unknown"`.
pub fn resolve_server_name(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(system_hostname)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME")
        .ok()
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_name_wins() {
        assert_eq!(resolve_server_name(Some("gpu-node-3")), "gpu-node-3");
    }

    #[test]
    fn blank_configured_name_falls_back() {
        let name = resolve_server_name(Some("   "));
        assert!(!name.trim().is_empty());
    }
}
