//! relay-monitor: live monitoring for a cluster of relay servers.
//!
//! The crate discovers the full relay topology from a handful of seed
//! relays, keeps a de-duplicated registry of every node it has seen, and
//! polls each node's runtime metrics on a fixed cadence. Results are
//! rendered in a terminal dashboard.
//!
//! ```text
//!  seeds ──> DiscoveryService ──reconcile──> RelayRegistry <──poll── StatsPoller
//!                   │                             │                      │
//!                   └── node_added/node_updated ──┴──── TuiEvent ────────┘
//!                                        │
//!                                        v
//!                                   run_tui(App)
//! ```
//!
//! Discovery owns the identity and topology fields of each registry
//! entry; the poller owns the runtime fields. The two never write the
//! same data, so they share the registry behind a single `RwLock`
//! without coordinating beyond it.

#![warn(unreachable_pub)]
#![warn(clippy::use_self)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod location;
pub mod poller;
pub mod registry;
pub mod tui;
pub mod view;

pub use config::{MonitorConfig, SeedRelay};
pub use discovery::{DiscoveryService, HttpTopologySource, TopologySource, probe_seeds};
pub use error::MonitorError;
pub use location::{LocationResolver, fallback_location};
pub use poller::{NetworkTotals, StatsPoller, estimate_load, parse_uptime};
pub use registry::{
    ClusterInfo, ClusterMetadata, ClusterNode, ReconciliationDelta, RelayNode, RelayRegistry,
    RelayStatus, RuntimeState,
};
pub use tui::{App, TuiEvent, run_tui};
pub use view::{TuiSink, ViewSink};
