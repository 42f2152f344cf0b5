//! Cluster topology discovery.
//!
//! A discovery pass queries seed relays for cluster membership, merges
//! the response into the registry, resolves locations for newly
//! discovered nodes, and publishes the resulting delta to the view sink.
//! Passes run at startup and on a fixed interval; a failed pass degrades
//! to the seed-only view and never raises.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::SeedRelay;
use crate::error::MonitorError;
use crate::location::LocationResolver;
use crate::registry::{ClusterInfo, MetricsPayload, ReconciliationDelta, RelayRegistry};
use crate::view::ViewSink;

/// Source of cluster membership data. The HTTP implementation queries
/// seed relays; tests substitute canned responses.
pub trait TopologySource: Send + Sync {
    /// Fetch one topology snapshot.
    fn fetch_topology(
        &self,
    ) -> impl std::future::Future<Output = Result<ClusterInfo, MonitorError>> + Send;
}

/// Topology source that queries each seed's metadata endpoint in
/// configured order and returns the first well-formed membership payload.
#[derive(Debug)]
pub struct HttpTopologySource {
    client: reqwest::Client,
    seeds: Vec<SeedRelay>,
}

impl HttpTopologySource {
    /// Create a source over the configured seeds.
    pub fn new(seeds: Vec<SeedRelay>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            seeds,
        }
    }
}

impl TopologySource for HttpTopologySource {
    async fn fetch_topology(&self) -> Result<ClusterInfo, MonitorError> {
        for seed in &self.seeds {
            let url = format!("{}/api/metrics", seed.api_url);
            // A failed seed is skipped silently; the next one is tried.
            // No retries within a pass.
            let payload: MetricsPayload = match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => match response.json().await {
                    Ok(payload) => payload,
                    Err(e) => {
                        debug!(seed = %seed.id, error = %e, "malformed metrics payload");
                        continue;
                    }
                },
                Ok(response) => {
                    debug!(seed = %seed.id, status = %response.status(), "metrics request rejected");
                    continue;
                }
                Err(e) => {
                    debug!(seed = %seed.id, error = %e, "metrics request failed");
                    continue;
                }
            };

            if let Some(cluster) = payload.cluster {
                if !cluster.all_nodes.is_empty() {
                    debug!(seed = %seed.id, nodes = cluster.all_nodes.len(), "got cluster info");
                    return Ok(cluster);
                }
            }
        }

        Err(MonitorError::NoClusterInfo)
    }
}

/// Probe each seed's stats endpoint in parallel and return the seeds that
/// answered. Used once at startup to report initial reachability; seeds
/// that fail the probe stay in the registry (they are merely marked
/// offline until a poll succeeds).
pub async fn probe_seeds(seeds: &[SeedRelay], timeout: Duration) -> Vec<SeedRelay> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default();

    let probes = seeds.iter().map(|seed| {
        let client = client.clone();
        let seed = seed.clone();
        async move {
            let url = format!("{}/api/stats", seed.api_url);
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => Some(seed),
                _ => None,
            }
        }
    });

    futures::future::join_all(probes)
        .await
        .into_iter()
        .flatten()
        .collect()
}

/// Periodic topology discovery over a shared registry.
pub struct DiscoveryService<S> {
    source: S,
    registry: Arc<RwLock<RelayRegistry>>,
    resolver: Arc<LocationResolver>,
    sink: Arc<dyn ViewSink>,
    interval: Duration,
}

impl<S: TopologySource> DiscoveryService<S> {
    /// Create a discovery service.
    pub fn new(
        source: S,
        registry: Arc<RwLock<RelayRegistry>>,
        resolver: Arc<LocationResolver>,
        sink: Arc<dyn ViewSink>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            resolver,
            sink,
            interval,
        }
    }

    /// Startup sequence: publish the seed entries to the view (resolving
    /// their locations), then run the first topology pass.
    pub async fn bootstrap(&self) {
        let seeds = self.registry.read().await.snapshot();
        for node in seeds {
            let location = match node.location.clone() {
                Some(location) => location,
                None => {
                    let location = self.resolver.resolve(&node.hostname).await;
                    self.registry.write().await.set_location(&node.id, &location);
                    location
                }
            };
            let mut node = node;
            node.location = Some(location);
            self.sink.node_added(&node);
        }

        self.run_pass().await;
    }

    /// Run one topology pass. Returns the reconciliation delta; a failed
    /// fetch yields an empty delta and leaves the registry untouched.
    pub async fn run_pass(&self) -> ReconciliationDelta {
        let topology = match self.source.fetch_topology().await {
            Ok(topology) => topology,
            Err(e) => {
                warn!(error = %e, "topology discovery failed, operating on seed-only view");
                return ReconciliationDelta::default();
            }
        };

        let delta = self.registry.write().await.reconcile(&topology);

        if !delta.newly_discovered.is_empty() {
            info!(
                count = delta.newly_discovered.len(),
                total = delta.nodes.len(),
                "discovered new cluster nodes"
            );
        }

        // Resolve locations for new nodes only, off the registry lock.
        for node in &delta.newly_discovered {
            let location = self.resolver.resolve(&node.hostname).await;
            self.registry.write().await.set_location(&node.id, &location);

            let mut node = node.clone();
            node.location = Some(location);
            self.sink.node_added(&node);
        }

        for node in &delta.updated {
            self.sink.node_updated(node);
        }

        delta
    }

    /// Re-discover topology on the configured interval, forever.
    pub async fn run(&self) {
        loop {
            tokio::time::sleep(self.interval).await;
            self.run_pass().await;
        }
    }
}
