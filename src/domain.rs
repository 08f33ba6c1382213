//! Registrable-domain extraction.

use url::{Host, Url};

use crate::DomainError;

/// Extracts the registrable domain from a URL.
///
/// This is a heuristic, not public-suffix aware: a hostname with more than two
/// labels is cut down to its last two, so `https://example.com.do` yields
/// `com.do`. IP hosts and two-label hostnames are returned unchanged.
pub fn extract_domain(input: &str) -> Result<String, DomainError> {
    let url = Url::parse(input).map_err(|_| DomainError::InvalidUrl)?;

    let hostname = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain,
        Some(Host::Ipv4(addr)) => return Ok(addr.to_string()),
        Some(Host::Ipv6(addr)) => return Ok(addr.to_string()),
        _ => return Err(DomainError::InvalidUrl),
    };

    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() > 2 {
        return Ok(labels[labels.len() - 2..].join("."));
    }
    Ok(hostname.to_owned())
}
