use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use crate::address::Address;

/// Membership status of a tracked endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Active,
    Removed,
}

/// One network address backing a tracked service name.
/// Identity is the address; an endpoint is never deleted, only marked removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Canonical address, e.g. "10.4.0.17"
    pub address: Address,

    /// Current membership status
    pub status: EndpointStatus,

    /// Last cycle in which this address was present in resolution results
    pub last_active: DateTime<Utc>,
}

impl Endpoint {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            status: EndpointStatus::Active,
            last_active: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EndpointStatus::Active
    }

    pub fn is_removed(&self) -> bool {
        self.status == EndpointStatus::Removed
    }

    /// Mark the endpoint active and refresh `last_active`.
    /// Returns true only if the status changed.
    pub fn mark_active(&mut self) -> bool {
        let changed = self.status != EndpointStatus::Active;
        self.status = EndpointStatus::Active;
        self.last_active = Utc::now();
        changed
    }

    /// Mark the endpoint removed. `last_active` is left as history.
    pub fn mark_removed(&mut self) {
        self.status = EndpointStatus::Removed;
    }
}

/// Point-in-time view of a tracker's membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Active endpoints, ascending by address
    pub active: Vec<Endpoint>,

    /// Removed endpoints, ascending by address
    pub removed: Vec<Endpoint>,

    /// Last time an endpoint was added or reactivated
    pub last_update: DateTime<Utc>,
}
