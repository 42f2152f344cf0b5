//! Node and wire types for the relay registry.
//!
//! `RelayNode` is the canonical registry entry. Identity and topology
//! fields are written by the discovery pass; `RuntimeState` is written by
//! the polling pass. The two field sets are disjoint by design.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SeedRelay;

/// Derive a relay's short id from a hostname: the first DNS label,
/// lowercased (`shu04.example.net` -> `shu04`).
pub fn short_id(hostname: &str) -> String {
    hostname
        .split('.')
        .next()
        .unwrap_or(hostname)
        .to_ascii_lowercase()
}

/// Extract the hostname from a cluster member address (`host:port`).
pub fn hostname_from_address(address: &str) -> &str {
    address.split(':').next().unwrap_or(address)
}

/// Last-known operational status of a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayStatus {
    /// Relay answered its last poll.
    Online,
    /// Relay answered but reported itself idle.
    Idle,
    /// No poll has completed yet.
    #[default]
    Connecting,
    /// Relay failed its last poll.
    Offline,
}

impl RelayStatus {
    /// Display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Offline => "offline",
        }
    }

    /// Parse from an endpoint-provided string. Unknown values are
    /// treated as online, matching the endpoints' default.
    pub fn parse(s: &str) -> Self {
        match s {
            "online" => Self::Online,
            "idle" => Self::Idle,
            "connecting" => Self::Connecting,
            "offline" => Self::Offline,
            _ => Self::Online,
        }
    }

    /// Whether this status counts toward the active-relay total.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Online | Self::Idle)
    }
}

/// Opaque cluster-membership fields, passed through from the topology
/// response and not interpreted further.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterMetadata {
    /// Inter-node address as reported by the membership protocol.
    pub cluster_address: Option<String>,
    /// SQL endpoint address.
    pub sql_address: Option<String>,
    /// Range count.
    pub ranges: Option<u64>,
    /// Lease count.
    pub leases: Option<u64>,
    /// Node start time (verbatim).
    pub started_at: Option<String>,
    /// Server version string.
    pub server_version: Option<String>,
}

impl ClusterMetadata {
    /// Build from a topology member descriptor.
    pub fn from_member(member: &ClusterNode) -> Self {
        Self {
            cluster_address: Some(member.address.clone()),
            sql_address: member.sql_address.clone(),
            ranges: member.ranges,
            leases: member.leases,
            started_at: member.started_at.clone(),
            server_version: member.server_version.clone(),
        }
    }
}

/// Mutable operational fields, owned by the polling component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeState {
    /// Current status.
    pub status: RelayStatus,
    /// Active client connections.
    pub connections: u64,
    /// Messages processed since relay start.
    pub messages_processed: u64,
    /// Messages sent since relay start.
    pub messages_sent: u64,
    /// Events stored (cluster-wide figure reported per relay).
    pub events_stored: u64,
    /// Events per second.
    pub events_per_second: f64,
    /// Active subscriptions.
    pub active_subscriptions: u64,
    /// Uptime in seconds.
    pub uptime_secs: u64,
    /// Measured response time in milliseconds.
    pub response_time_ms: u64,
    /// Load percentage (0-100).
    pub load_percentage: f64,
    /// Error rate reported by the relay.
    pub error_rate: f64,
    /// Allocated memory in bytes.
    pub memory_alloc: u64,
    /// Total memory reserved from the OS in bytes.
    pub memory_sys: u64,
    /// When the last poll for this relay completed.
    pub last_seen: Option<DateTime<Utc>>,
}

impl RuntimeState {
    /// State recorded when a poll fails: offline with zeroed counters,
    /// but a fresh `last_seen` so staleness is visible.
    pub fn offline() -> Self {
        Self {
            status: RelayStatus::Offline,
            last_seen: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// A relay participating in the network.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayNode {
    /// Stable local identifier, derived from the hostname.
    pub id: String,
    /// Fully-qualified domain name.
    pub hostname: String,
    /// WebSocket endpoint.
    pub ws_url: String,
    /// HTTP API base URL.
    pub api_url: String,
    /// Identifier assigned by the cluster membership protocol. May change
    /// across restarts; never the sole de-duplication key.
    pub cluster_node_id: Option<u64>,
    /// True for statically configured bootstrap relays.
    pub is_seed: bool,
    /// Last-known liveness from the topology response. `None` means the
    /// topology has not reported on this node yet.
    pub is_live: Option<bool>,
    /// Resolved display location. Once set, never cleared.
    pub location: Option<String>,
    /// Passthrough cluster-membership fields.
    pub cluster: ClusterMetadata,
    /// Operational fields written by the polling pass.
    pub runtime: RuntimeState,
}

impl RelayNode {
    /// Create a registry entry for a configured seed.
    pub fn from_seed(seed: &SeedRelay) -> Self {
        Self {
            id: seed.id.clone(),
            hostname: seed.hostname.clone(),
            ws_url: seed.ws_url.clone(),
            api_url: seed.api_url.clone(),
            cluster_node_id: None,
            is_seed: true,
            is_live: None,
            location: None,
            cluster: ClusterMetadata::default(),
            runtime: RuntimeState::default(),
        }
    }

    /// Create a registry entry for a node discovered from a topology
    /// response.
    pub fn discovered(member: &ClusterNode) -> Self {
        let hostname = hostname_from_address(&member.address).to_string();
        Self {
            id: short_id(&hostname),
            ws_url: format!("wss://{hostname}"),
            api_url: format!("https://{hostname}"),
            hostname,
            cluster_node_id: member.node_id,
            is_seed: false,
            is_live: member.is_live,
            location: None,
            cluster: ClusterMetadata::from_member(member),
            runtime: RuntimeState::default(),
        }
    }

    /// Apply topology fields from a member descriptor in place. Identity
    /// and runtime fields are untouched.
    pub fn apply_member(&mut self, member: &ClusterNode) {
        self.cluster_node_id = member.node_id;
        self.is_live = member.is_live;
        self.cluster = ClusterMetadata::from_member(member);
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One member descriptor from the cluster metadata endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterNode {
    /// Inter-node address, `host:port`.
    pub address: String,
    /// Membership-protocol node id.
    #[serde(default)]
    pub node_id: Option<u64>,
    /// Liveness as seen by the responding node.
    #[serde(default)]
    pub is_live: Option<bool>,
    /// Range count.
    #[serde(default)]
    pub ranges: Option<u64>,
    /// Lease count.
    #[serde(default)]
    pub leases: Option<u64>,
    /// Node start time.
    #[serde(default)]
    pub started_at: Option<String>,
    /// Server version.
    #[serde(default)]
    pub server_version: Option<String>,
    /// SQL endpoint address.
    #[serde(default)]
    pub sql_address: Option<String>,
}

/// Cluster membership payload from a seed's metadata endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterInfo {
    /// All known cluster members.
    #[serde(default)]
    pub all_nodes: Vec<ClusterNode>,
}

/// Memory usage block from the metrics endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryUsage {
    /// Allocated bytes.
    #[serde(default)]
    pub alloc: Option<u64>,
    /// Bytes reserved from the OS.
    #[serde(default)]
    pub sys: Option<u64>,
}

/// Enhanced metrics payload (`/api/metrics`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsPayload {
    /// Relay-reported status string.
    #[serde(default)]
    pub status: Option<String>,
    /// Active client connections.
    #[serde(default)]
    pub active_connections: u64,
    /// Messages processed since start.
    #[serde(default)]
    pub messages_processed: u64,
    /// Messages sent since start.
    #[serde(default)]
    pub messages_sent: u64,
    /// Events stored.
    #[serde(default)]
    pub events_stored: u64,
    /// Events per second.
    #[serde(default)]
    pub events_per_second: f64,
    /// Uptime in seconds.
    #[serde(default)]
    pub uptime_seconds: u64,
    /// Average response time in milliseconds.
    #[serde(default)]
    pub average_response_time: f64,
    /// Load percentage.
    #[serde(default)]
    pub load_percentage: f64,
    /// Error rate.
    #[serde(default)]
    pub error_rate: f64,
    /// Memory usage.
    #[serde(default)]
    pub memory_usage: MemoryUsage,
    /// Active subscriptions.
    #[serde(default)]
    pub active_subscriptions: u64,
    /// Relay-reported identifier.
    #[serde(default)]
    pub relay_id: Option<String>,
    /// Cluster membership block, present on seeds that expose topology.
    #[serde(default)]
    pub cluster: Option<ClusterInfo>,
}

/// Counter block nested inside the basic stats payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsCounters {
    /// Active client connections.
    #[serde(default)]
    pub active_connections: u64,
    /// Messages processed since start.
    #[serde(default)]
    pub messages_processed: u64,
    /// Messages sent since start.
    #[serde(default)]
    pub messages_sent: u64,
    /// Events stored.
    #[serde(default)]
    pub events_stored: u64,
    /// Events per second.
    #[serde(default)]
    pub events_per_second: f64,
    /// Average response time in milliseconds.
    #[serde(default)]
    pub average_response_time_ms: f64,
    /// Load percentage.
    #[serde(default)]
    pub load_percentage: f64,
    /// Error rate.
    #[serde(default)]
    pub error_rate: f64,
    /// Memory usage.
    #[serde(default)]
    pub memory_usage: MemoryUsage,
    /// Active subscriptions.
    #[serde(default)]
    pub active_subscriptions: u64,
}

/// Basic stats payload (`/api/stats`), the fallback when the enhanced
/// metrics endpoint is unavailable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsPayload {
    /// Human-readable uptime such as `"1d 2h 44m"`.
    #[serde(default)]
    pub uptime: Option<String>,
    /// Nested counters.
    #[serde(default)]
    pub stats: Option<StatsCounters>,
}

impl StatsPayload {
    /// Reshape the basic stats payload into the enhanced metrics form.
    pub fn into_metrics(self) -> MetricsPayload {
        let uptime_seconds = self
            .uptime
            .as_deref()
            .map(crate::poller::parse_uptime)
            .unwrap_or(0);
        let stats = self.stats.unwrap_or_default();
        MetricsPayload {
            status: Some("online".to_string()),
            active_connections: stats.active_connections,
            messages_processed: stats.messages_processed,
            messages_sent: stats.messages_sent,
            events_stored: stats.events_stored,
            events_per_second: stats.events_per_second,
            uptime_seconds,
            average_response_time: stats.average_response_time_ms,
            load_percentage: stats.load_percentage,
            error_rate: stats.error_rate,
            memory_usage: stats.memory_usage,
            active_subscriptions: stats.active_subscriptions,
            relay_id: None,
            cluster: None,
        }
    }
}
