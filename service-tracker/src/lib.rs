//! Live membership tracking for the endpoints behind a service name.
//!
//! A [`Tracker`] periodically resolves one name through a [`Resolver`] and
//! reconciles the answer against what it has seen before. Endpoints that
//! disappear are marked removed rather than forgotten, so an address that
//! comes back is the same endpoint as before. Readers take owned snapshots
//! at any time from any task.

pub mod config;
pub mod resolver;
pub mod tracker;

pub use config::{Config, ReportConfig, TrackerConfig};
pub use resolver::{Resolver, SystemResolver};
#[cfg(any(test, feature = "test-util"))]
pub use resolver::ScriptedResolver;
pub use shared::address::Address;
pub use shared::types::{Endpoint, EndpointStatus, Snapshot};
pub use tracker::{CycleOutcome, Tracker};
