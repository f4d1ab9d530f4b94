use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use shared::address::Address;
use shared::types::{Endpoint, Snapshot};
use crate::config::TrackerConfig;
use crate::resolver::Resolver;

/// What a single reconciliation cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Resolution failed or timed out; membership was left untouched
    Skipped,
    Applied {
        added: usize,
        reactivated: usize,
        removed: usize,
    },
}

/// Transitions applied by one cycle, collected under the lock and logged after it
#[derive(Debug, Default)]
struct Changes {
    added: Vec<Address>,
    reactivated: Vec<Address>,
    removed: Vec<Address>,
}

/// Endpoint map and update timestamp. Always accessed through one mutex.
struct Membership {
    endpoints: HashMap<Address, Endpoint>,
    last_update: DateTime<Utc>,
}

impl Membership {
    fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
            last_update: Utc::now(),
        }
    }

    fn add(&mut self, address: Address) {
        self.endpoints.insert(address, Endpoint::new(address));
        self.last_update = Utc::now();
    }

    /// Returns true if the endpoint came back from removed.
    fn update(&mut self, address: &Address) -> bool {
        let Some(endpoint) = self.endpoints.get_mut(address) else {
            return false;
        };
        let changed = endpoint.mark_active();
        if changed {
            self.last_update = Utc::now();
        }
        changed
    }

    /// Removal never touches `last_update`.
    fn remove(&mut self, address: &Address) -> bool {
        match self.endpoints.get_mut(address) {
            Some(endpoint) if !endpoint.is_removed() => {
                endpoint.mark_removed();
                true
            }
            _ => false,
        }
    }

    /// Apply one successful resolution. Additions and reactivations follow
    /// `resolved` order, removals come after.
    fn apply(&mut self, resolved: &[Address]) -> Changes {
        let mut changes = Changes::default();
        let present: HashSet<Address> = resolved.iter().copied().collect();

        for address in resolved {
            if self.endpoints.contains_key(address) {
                if self.update(address) {
                    changes.reactivated.push(*address);
                }
            } else {
                self.add(*address);
                changes.added.push(*address);
            }
        }

        let absent: Vec<Address> = self
            .endpoints
            .keys()
            .filter(|address| !present.contains(address))
            .copied()
            .collect();
        for address in absent {
            if self.remove(&address) {
                changes.removed.push(address);
            }
        }
        changes.removed.sort();

        changes
    }

    fn collect(&self, keep: impl Fn(&Endpoint) -> bool) -> Vec<Endpoint> {
        let mut result: Vec<Endpoint> = self
            .endpoints
            .values()
            .filter(|endpoint| keep(*endpoint))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.address.cmp(&b.address));
        result
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            active: self.collect(Endpoint::is_active),
            removed: self.collect(Endpoint::is_removed),
            last_update: self.last_update,
        }
    }
}

struct Inner {
    name: String,
    resolver: Arc<dyn Resolver>,
    config: TrackerConfig,
    membership: Mutex<Membership>,
}

/// Keeps a live view of the endpoints behind one service name.
///
/// Cloning is cheap; every clone shares the same membership.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<Inner>,
}

impl Tracker {
    /// Build a tracker without starting its loop. Use [`Tracker::run`] or
    /// [`Tracker::reconcile_once`] to drive it.
    pub fn new(
        name: impl Into<String>,
        resolver: Arc<dyn Resolver>,
        config: TrackerConfig,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            bail!("service name must not be empty");
        }

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                resolver,
                config,
                membership: Mutex::new(Membership::new()),
            }),
        })
    }

    /// Build a tracker and start its loop on the current tokio runtime.
    /// The loop runs until `cancel` fires. Fails when called outside a runtime.
    pub fn spawn(
        name: impl Into<String>,
        resolver: Arc<dyn Resolver>,
        config: TrackerConfig,
        cancel: CancellationToken,
    ) -> Result<(Self, JoinHandle<()>)> {
        let runtime = Handle::try_current()
            .context("Tracker::spawn must be called from within a tokio runtime")?;
        let tracker = Self::new(name, resolver, config)?;
        let runner = tracker.clone();
        let handle = runtime.spawn(async move { runner.run(cancel).await });
        Ok((tracker, handle))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Resolve, reconcile, sleep; repeat until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let interval = self.inner.config.interval();
        tracing::info!("Tracking {} every {:?}", self.inner.name, interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.reconcile_once() => {
                    tracing::debug!("Cycle for {}: {:?}", self.inner.name, outcome);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        tracing::info!("Tracker for {} shutting down", self.inner.name);
    }

    /// Run exactly one reconciliation cycle.
    pub async fn reconcile_once(&self) -> CycleOutcome {
        let name = &self.inner.name;

        let ips = match self.resolve().await {
            Ok(ips) => ips,
            Err(e) => {
                tracing::warn!("Skipping cycle for {}: {:#}", name, e);
                return CycleOutcome::Skipped;
            }
        };

        let resolved: Vec<Address> = ips.into_iter().map(Address::from_ip).collect();

        let changes = self.inner.membership.lock().apply(&resolved);

        for address in &changes.added {
            tracing::info!("New endpoint for {}: {}", name, address);
        }
        for address in &changes.reactivated {
            tracing::info!("Endpoint for {} reactivated: {}", name, address);
        }
        for address in &changes.removed {
            tracing::info!("Endpoint for {} removed: {}", name, address);
        }

        CycleOutcome::Applied {
            added: changes.added.len(),
            reactivated: changes.reactivated.len(),
            removed: changes.removed.len(),
        }
    }

    async fn resolve(&self) -> Result<Vec<IpAddr>> {
        let name = &self.inner.name;
        let lookup = self.inner.resolver.resolve(name);

        match self.inner.config.resolve_timeout() {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .with_context(|| format!("Resolution of {} timed out after {:?}", name, limit))?,
            None => lookup.await,
        }
    }

    /// Active endpoints, ascending by address
    pub fn active_endpoints(&self) -> Vec<Endpoint> {
        self.inner.membership.lock().collect(Endpoint::is_active)
    }

    /// Removed endpoints, ascending by address
    pub fn removed_endpoints(&self) -> Vec<Endpoint> {
        self.inner.membership.lock().collect(Endpoint::is_removed)
    }

    /// Last time an endpoint was added or reactivated
    pub fn last_update(&self) -> DateTime<Utc> {
        self.inner.membership.lock().last_update
    }

    /// Active set, removed set and update time taken under a single lock
    pub fn snapshot(&self) -> Snapshot {
        self.inner.membership.lock().snapshot()
    }

    pub fn endpoint(&self, address: &Address) -> Option<Endpoint> {
        self.inner.membership.lock().endpoints.get(address).cloned()
    }

    /// Number of endpoints ever seen, active or removed
    pub fn len(&self) -> usize {
        self.inner.membership.lock().endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
