//! SSRF guard (spec §4.B).
//!
//! Pure over an injected resolver so tests never touch the network or the
//! system DNS configuration.

use std::net::IpAddr;

use async_trait::async_trait;
use ipnet::IpNet;
use url::Url;

/// Outcome of validating a URL against the allowlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsrfDecision {
    Approved,
    Rejected(String),
}

/// Resolves a hostname to the set of addresses it would actually connect to.
/// The system resolver implementation lives in `fetcher.rs`; tests inject a
/// fixed map.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Vec<IpAddr>;
}

/// One allowlist entry: literal hostname, `*.suffix` wildcard, or CIDR block.
#[derive(Debug, Clone)]
enum AllowlistEntry {
    Host(String),
    Suffix(String),
    Cidr(IpNet),
}

fn parse_allowlist(entries: &[String]) -> Vec<AllowlistEntry> {
    entries
        .iter()
        .filter_map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            if let Ok(cidr) = raw.parse::<IpNet>() {
                return Some(AllowlistEntry::Cidr(cidr));
            }
            if let Some(suffix) = raw.strip_prefix("*.") {
                return Some(AllowlistEntry::Suffix(suffix.to_lowercase()));
            }
            Some(AllowlistEntry::Host(raw.to_lowercase()))
        })
        .collect()
}

fn is_disallowed_address(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unspecified()
                || v6.to_ipv4_mapped().is_some() // IPv4-mapped IPv6 is its own reject category
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // link-local
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // unique local
        }
    }
}

fn matches_allowlist(host: &str, addrs: &[IpAddr], allowlist: &[AllowlistEntry]) -> bool {
    let host_lower = host.to_lowercase();
    allowlist.iter().any(|entry| match entry {
        AllowlistEntry::Host(h) => *h == host_lower,
        AllowlistEntry::Suffix(suffix) => host_lower.ends_with(&format!(".{suffix}")),
        AllowlistEntry::Cidr(cidr) => addrs.iter().any(|a| cidr.contains(a)),
    })
}

/// Validates a URL per spec §4.B's four ordered rules.
pub async fn validate_url(
    url: &str,
    resolver: &dyn HostResolver,
    allowlist: &[String],
) -> SsrfDecision {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return SsrfDecision::Rejected(format!("invalid url: {e}")),
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return SsrfDecision::Rejected(format!("unsupported scheme: {}", parsed.scheme()));
    }

    let host = match parsed.host_str() {
        Some(h) => h,
        None => return SsrfDecision::Rejected("url has no host".to_string()),
    };

    let addrs = resolver.resolve(host).await;
    if addrs.is_empty() {
        return SsrfDecision::Rejected(format!("unresolvable host: {host}"));
    }

    if addrs.iter().any(is_disallowed_address) {
        let entries = parse_allowlist(allowlist);
        if !matches_allowlist(host, &addrs, &entries) {
            return SsrfDecision::Rejected(format!(
                "{host} resolves to a private/internal address not on the allowlist"
            ));
        }
        return SsrfDecision::Approved;
    }

    let entries = parse_allowlist(allowlist);
    if entries.is_empty() {
        return SsrfDecision::Approved;
    }

    if matches_allowlist(host, &addrs, &entries) {
        SsrfDecision::Approved
    } else {
        SsrfDecision::Rejected(format!("{host} does not match the configured allowlist"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver(Vec<IpAddr>);

    #[async_trait]
    impl HostResolver for FixedResolver {
        async fn resolve(&self, _host: &str) -> Vec<IpAddr> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn rejects_loopback_with_empty_allowlist() {
        let resolver = FixedResolver(vec!["127.0.0.1".parse().unwrap()]);
        let decision = validate_url("http://localhost/health", &resolver, &[]).await;
        assert!(matches!(decision, SsrfDecision::Rejected(_)));
    }

    #[tokio::test]
    async fn approves_public_address_with_empty_allowlist() {
        let resolver = FixedResolver(vec!["93.184.216.34".parse().unwrap()]);
        let decision = validate_url("https://example.com/health", &resolver, &[]).await;
        assert_eq!(decision, SsrfDecision::Approved);
    }

    #[tokio::test]
    async fn cidr_allowlist_permits_private_address() {
        let resolver = FixedResolver(vec!["10.0.5.9".parse().unwrap()]);
        let allowlist = vec!["10.0.0.0/8".to_string()];
        let decision = validate_url("http://internal.svc/health", &resolver, &allowlist).await;
        assert_eq!(decision, SsrfDecision::Approved);
    }

    #[tokio::test]
    async fn wildcard_suffix_matches() {
        let resolver = FixedResolver(vec!["198.51.100.7".parse().unwrap()]);
        let allowlist = vec!["*.internal.example.com".to_string()];
        let decision =
            validate_url("https://svc.internal.example.com/health", &resolver, &allowlist).await;
        assert_eq!(decision, SsrfDecision::Approved);
    }

    #[tokio::test]
    async fn unresolvable_host_rejected() {
        let resolver = FixedResolver(vec![]);
        let decision = validate_url("https://nowhere.invalid/health", &resolver, &[]).await;
        assert!(matches!(decision, SsrfDecision::Rejected(_)));
    }

    #[tokio::test]
    async fn rejects_ipv4_mapped_ipv6_even_when_embedded_v4_is_public() {
        let resolver = FixedResolver(vec!["::ffff:93.184.216.34".parse().unwrap()]);
        let decision = validate_url("https://example.com/health", &resolver, &[]).await;
        assert!(matches!(decision, SsrfDecision::Rejected(_)));
    }

    #[tokio::test]
    async fn rejects_unsupported_scheme() {
        let resolver = FixedResolver(vec!["93.184.216.34".parse().unwrap()]);
        let decision = validate_url("ftp://example.com/health", &resolver, &[]).await;
        assert!(matches!(decision, SsrfDecision::Rejected(_)));
    }
}
