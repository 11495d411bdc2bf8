//! Validation of the model API base URL
//!
//! Keeps a misconfigured `api_base_url` from pointing the relay (and its API
//! key) at cloud metadata services or internal hosts.

use std::net::IpAddr;
use thiserror::Error;
use url::{Host, Url};

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL scheme '{0}' is not allowed, only HTTPS is permitted")]
    InsecureScheme(String),

    #[error("Host '{0}' is blocked")]
    BlockedHost(String),

    #[error("URL must have a host")]
    MissingHost,
}

/// Hosts that are never valid model endpoints
const METADATA_HOSTS: &[&str] = &["metadata.google.internal", "metadata.goog"];

/// Validate and normalize a model API base URL.
///
/// HTTPS is required and loopback/private hosts are rejected unless
/// `allow_insecure` is set (local stubs, development). Link-local addresses
/// and metadata hostnames are rejected unconditionally.
pub fn validate_endpoint(raw: &str, allow_insecure: bool) -> Result<Url, EndpointError> {
    let url = Url::parse(raw.trim())?;

    match url.scheme() {
        "https" => {}
        "http" if allow_insecure => {}
        scheme => return Err(EndpointError::InsecureScheme(scheme.to_string())),
    }

    match url.host().ok_or(EndpointError::MissingHost)? {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            let blocked = METADATA_HOSTS
                .iter()
                .any(|h| domain == *h || domain.ends_with(&format!(".{}", h)));
            let local = domain == "localhost" || domain.ends_with(".localhost");
            if blocked || (local && !allow_insecure) {
                return Err(EndpointError::BlockedHost(domain));
            }
        }
        Host::Ipv4(v4) => check_ip(IpAddr::V4(v4), allow_insecure)?,
        Host::Ipv6(v6) => check_ip(IpAddr::V6(v6), allow_insecure)?,
    }

    Ok(url)
}

fn check_ip(ip: IpAddr, allow_insecure: bool) -> Result<(), EndpointError> {
    if is_link_local(&ip) || (!allow_insecure && (ip.is_loopback() || is_private(&ip))) {
        return Err(EndpointError::BlockedHost(ip.to_string()));
    }
    Ok(())
}

fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_unspecified(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xfe00) == 0xfc00 || v6.is_unspecified(),
    }
}

/// 169.254.0.0/16 (includes the metadata endpoint) and fe80::/10
fn is_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gemini_endpoint_valid() {
        let url = validate_endpoint("https://generativelanguage.googleapis.com", false).unwrap();
        assert_eq!(url.host_str(), Some("generativelanguage.googleapis.com"));
    }

    #[test]
    fn test_http_requires_insecure_flag() {
        assert!(matches!(
            validate_endpoint("http://api.example.com", false),
            Err(EndpointError::InsecureScheme(_))
        ));
        assert!(validate_endpoint("http://api.example.com", true).is_ok());
    }

    #[test]
    fn test_local_hosts_require_insecure_flag() {
        for raw in ["https://localhost:8080", "https://127.0.0.1:8080", "https://10.0.0.1", "https://[::1]:9000"] {
            assert!(
                matches!(validate_endpoint(raw, false), Err(EndpointError::BlockedHost(_))),
                "{} should be blocked",
                raw
            );
            assert!(validate_endpoint(raw, true).is_ok(), "{} should be allowed", raw);
        }
    }

    #[test]
    fn test_metadata_always_blocked() {
        assert!(validate_endpoint("http://169.254.169.254/latest", true).is_err());
        assert!(validate_endpoint("https://metadata.google.internal", true).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(validate_endpoint("not a url", false), Err(EndpointError::InvalidUrl(_))));
    }
}
