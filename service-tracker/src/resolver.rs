//! Name-resolution backends for the tracker.

use std::collections::HashSet;
use std::net::IpAddr;
use anyhow::{Context, Result};

#[cfg(any(test, feature = "test-util"))]
pub use scripted::ScriptedResolver;

/// Resolves a service name to the addresses currently behind it.
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    /// Return the addresses for `name` in the order the backend produced them.
    /// An empty list is a successful answer meaning "no endpoints".
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>>;
}

/// Resolver backed by the host's resolver (`getaddrinfo`).
#[derive(Debug, Clone, Default)]
pub struct SystemResolver;

#[async_trait::async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((name, 0))
            .await
            .with_context(|| format!("Failed to resolve {}", name))?;

        // getaddrinfo repeats each address once per socket type
        let mut seen = HashSet::new();
        Ok(addrs
            .map(|addr| addr.ip())
            .filter(|ip| seen.insert(*ip))
            .collect())
    }
}

/// Test double that replays a fixed sequence of answers.
#[cfg(any(test, feature = "test-util"))]
mod scripted {
    use std::collections::VecDeque;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use anyhow::{anyhow, Result};
    use parking_lot::Mutex;
    use super::Resolver;

    /// Replays a fixed sequence of answers, one per call.
    /// Once the script runs out every call fails.
    #[derive(Debug, Default)]
    pub struct ScriptedResolver {
        script: Mutex<VecDeque<std::result::Result<Vec<IpAddr>, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedResolver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a successful answer.
        pub fn push(&self, addrs: impl IntoIterator<Item = IpAddr>) -> &Self {
            self.script.lock().push_back(Ok(addrs.into_iter().collect()));
            self
        }

        /// Queue a resolution failure.
        pub fn push_failure(&self, reason: impl Into<String>) -> &Self {
            self.script.lock().push_back(Err(reason.into()));
            self
        }

        /// Number of resolve calls made so far
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Resolver for ScriptedResolver {
        async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().pop_front() {
                Some(Ok(addrs)) => Ok(addrs),
                Some(Err(reason)) => Err(anyhow!("lookup of {} failed: {}", name, reason)),
                None => Err(anyhow!("no scripted answer left for {}", name)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ips(addrs: &[&str]) -> Vec<IpAddr> {
        addrs.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_scripted_replays_in_order() {
        let resolver = ScriptedResolver::new();
        resolver.push(ips(&["10.0.0.1"])).push_failure("SERVFAIL").push(ips(&[]));

        assert_eq!(resolver.resolve("svc").await.unwrap(), ips(&["10.0.0.1"]));
        assert!(resolver.resolve("svc").await.is_err());
        assert!(resolver.resolve("svc").await.unwrap().is_empty());
        assert!(resolver.resolve("svc").await.is_err(), "Exhausted script should fail");
        assert_eq!(resolver.calls(), 4);
    }

    #[tokio::test]
    async fn test_system_resolver_localhost() {
        let addrs = SystemResolver.resolve("localhost").await.unwrap();
        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(|ip| ip.is_loopback()));

        let unique: HashSet<_> = addrs.iter().collect();
        assert_eq!(unique.len(), addrs.len(), "Addresses should be deduplicated");
    }

    #[tokio::test]
    async fn test_system_resolver_ip_literal() {
        let addrs = SystemResolver.resolve("127.0.0.1").await.unwrap();
        assert_eq!(addrs, ips(&["127.0.0.1"]));
    }
}
