//! Relay Registry Module
//!
//! Canonical set of known relay nodes and their identity keys. The
//! discovery pass merges topology responses into the registry; the
//! polling pass writes per-node runtime fields. Identity equality is
//! deliberately loose: a member descriptor matches an existing entry if
//! any of {id, hostname, cluster node id} match, which prevents duplicate
//! entries when membership ids change across restarts.

mod store;
mod types;

pub use store::{ReconciliationDelta, RelayRegistry};
pub use types::{
    hostname_from_address, short_id, ClusterInfo, ClusterMetadata, ClusterNode, MemoryUsage,
    MetricsPayload, RelayNode, RelayStatus, RuntimeState, StatsCounters, StatsPayload,
};
