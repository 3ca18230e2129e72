//! Mirror/proxy candidate resolution.
//!
//! A resolver turns the configured server list into the ordered candidate
//! list the fetch command carries. The orchestrator treats resolvers as
//! black boxes: candidates are best-to-worst-effort ordered, proxy health
//! is the resolver's own concern, and an empty answer falls back to the
//! configured servers verbatim at the consuming edge.

use tracing::debug;

/// Produces the ordered candidate URL list for a server list.
pub trait ProxyResolver {
    fn resolve(&self, default_urls: &[String]) -> Vec<String>;
}

/// No proxying: candidates are the configured servers, unchanged.
#[derive(Debug, Clone, Default)]
pub struct DirectResolver;

impl ProxyResolver for DirectResolver {
    fn resolve(&self, default_urls: &[String]) -> Vec<String> {
        default_urls.to_vec()
    }
}

/// Fronts each server through the configured proxy domains.
///
/// For every server URL and every proxy domain, emits a variant whose host
/// is suffixed with the proxy domain (`https://srv.example` +
/// `proxy.internal` → `https://srv.example.proxy.internal`). The original
/// servers are appended last as the fallback tier.
#[derive(Debug, Clone)]
pub struct ProxyChain {
    proxy_domains: Vec<String>,
}

impl ProxyChain {
    pub fn new(proxy_domains: Vec<String>) -> Self {
        Self { proxy_domains }
    }

    fn proxied(url: &str, proxy_domain: &str) -> Option<String> {
        let (scheme, rest) = url.split_once("://")?;
        let (host, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        if host.is_empty() {
            return None;
        }
        Some(format!("{scheme}://{host}.{proxy_domain}{path}"))
    }
}

impl ProxyResolver for ProxyChain {
    fn resolve(&self, default_urls: &[String]) -> Vec<String> {
        let mut candidates = Vec::new();
        for url in default_urls {
            for domain in &self.proxy_domains {
                match Self::proxied(url, domain) {
                    Some(candidate) => candidates.push(candidate),
                    None => debug!(event = "proxy.unfrontable", url = %url),
                }
            }
        }
        candidates.extend(default_urls.iter().cloned());
        candidates
    }
}
