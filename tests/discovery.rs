//! End-to-end discovery tests: canned topology sources driving the full
//! reconcile-and-publish path.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_monitor::{
    ClusterInfo, ClusterNode, DiscoveryService, LocationResolver, MonitorConfig, MonitorError,
    RelayNode, RelayRegistry, TopologySource, ViewSink,
};
use tokio::sync::RwLock;

/// Topology source that replays a fixed queue of responses.
struct ScriptedSource {
    responses: Mutex<Vec<Result<ClusterInfo, MonitorError>>>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<ClusterInfo, MonitorError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

impl TopologySource for ScriptedSource {
    async fn fetch_topology(&self) -> Result<ClusterInfo, MonitorError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(MonitorError::NoClusterInfo);
        }
        responses.remove(0)
    }
}

/// Sink that records every published node id.
#[derive(Default)]
struct RecordingSink {
    added: Mutex<Vec<String>>,
    updated: Mutex<Vec<String>>,
}

impl ViewSink for RecordingSink {
    fn node_added(&self, node: &RelayNode) {
        self.added.lock().unwrap().push(node.id.clone());
    }

    fn node_updated(&self, node: &RelayNode) {
        self.updated.lock().unwrap().push(node.id.clone());
    }
}

fn member(address: &str, node_id: u64, is_live: bool) -> ClusterNode {
    ClusterNode {
        address: address.to_string(),
        node_id: Some(node_id),
        is_live: Some(is_live),
        ranges: None,
        leases: None,
        started_at: None,
        server_version: None,
        sql_address: None,
    }
}

fn topology(members: Vec<ClusterNode>) -> ClusterInfo {
    ClusterInfo { all_nodes: members }
}

/// Full cluster response: the three seeds plus one node the seeds alone
/// do not know about.
fn four_node_topology() -> ClusterInfo {
    topology(vec![
        member("shu01.shugur.net:26257", 1, true),
        member("shu02.shugur.net:26257", 2, true),
        member("shu03.shugur.net:26257", 3, true),
        member("shu04.example.net:7777", 4, true),
    ])
}

/// Resolver with every hostname pre-cached so no network traffic occurs.
fn offline_resolver() -> Arc<LocationResolver> {
    let resolver = LocationResolver::new(Duration::from_millis(0));
    for host in [
        "shu01.shugur.net",
        "shu02.shugur.net",
        "shu03.shugur.net",
        "shu04.example.net",
        "shu05.example.net",
    ] {
        resolver.prime(host, relay_monitor::fallback_location(host).as_str());
    }
    Arc::new(resolver)
}

fn service(
    responses: Vec<Result<ClusterInfo, MonitorError>>,
) -> (
    DiscoveryService<ScriptedSource>,
    Arc<RwLock<RelayRegistry>>,
    Arc<RecordingSink>,
) {
    let config = MonitorConfig::default();
    let registry = Arc::new(RwLock::new(RelayRegistry::from_seeds(&config.seeds)));
    let sink = Arc::new(RecordingSink::default());
    let service = DiscoveryService::new(
        ScriptedSource::new(responses),
        Arc::clone(&registry),
        offline_resolver(),
        Arc::clone(&sink) as Arc<dyn ViewSink>,
        config.topology_interval,
    );
    (service, registry, sink)
}

#[tokio::test]
async fn discovers_unknown_node_from_topology() {
    let (service, registry, sink) = service(vec![Ok(four_node_topology())]);

    let delta = service.run_pass().await;

    let new_ids: Vec<&str> = delta.newly_discovered.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(new_ids, ["shu04"]);

    let registry = registry.read().await;
    assert_eq!(registry.len(), 4);
    let ids: Vec<&str> = registry.nodes().iter().map(|n| n.id.as_str()).collect();
    // Seeds keep configured order; discovered nodes follow in encounter
    // order.
    assert_eq!(ids, ["shu01", "shu02", "shu03", "shu04"]);

    let shu04 = registry.get("shu04").unwrap();
    assert_eq!(shu04.hostname, "shu04.example.net");
    assert_eq!(shu04.cluster_node_id, Some(4));
    assert!(!shu04.is_seed);
    // Location was resolved and stored before publication.
    assert_eq!(shu04.location.as_deref(), Some("Singapore, Singapore"));

    assert_eq!(sink.added.lock().unwrap().as_slice(), ["shu04"]);
}

#[tokio::test]
async fn second_identical_pass_adds_nothing() {
    let (service, registry, sink) =
        service(vec![Ok(four_node_topology()), Ok(four_node_topology())]);

    service.run_pass().await;
    let delta = service.run_pass().await;

    assert!(delta.newly_discovered.is_empty());
    // Matched members still count as updates.
    assert_eq!(delta.updated.len(), 4);

    let registry = registry.read().await;
    assert_eq!(registry.len(), 4);
    let ids: Vec<&str> = registry.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["shu01", "shu02", "shu03", "shu04"]);

    // One add total, across both passes.
    assert_eq!(sink.added.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_discovery_degrades_to_seed_view() {
    let (service, registry, sink) = service(vec![Err(MonitorError::NoClusterInfo)]);

    let delta = service.run_pass().await;

    assert!(delta.is_empty());
    let registry = registry.read().await;
    assert_eq!(registry.len(), 3);
    assert!(registry.nodes().iter().all(|n| n.is_seed));
    assert!(sink.added.lock().unwrap().is_empty());
}

#[tokio::test]
async fn changed_cluster_node_id_updates_in_place() {
    // Same hostnames, restarted cluster handing out fresh node ids.
    let restarted = topology(vec![
        member("shu01.shugur.net:26257", 11, true),
        member("shu02.shugur.net:26257", 12, true),
        member("shu03.shugur.net:26257", 13, false),
        member("shu04.example.net:7777", 14, true),
    ]);
    let (service, registry, _sink) =
        service(vec![Ok(four_node_topology()), Ok(restarted)]);

    service.run_pass().await;
    let delta = service.run_pass().await;

    assert!(delta.newly_discovered.is_empty());

    let registry = registry.read().await;
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.get("shu01").unwrap().cluster_node_id, Some(11));
    assert_eq!(registry.get("shu03").unwrap().is_live, Some(false));
    assert_eq!(registry.get("shu04").unwrap().cluster_node_id, Some(14));
    // Seed flags survive topology updates.
    assert!(registry.get("shu01").unwrap().is_seed);
}

#[tokio::test]
async fn bootstrap_publishes_seeds_then_discovers() {
    let (service, registry, sink) = service(vec![Ok(four_node_topology())]);

    service.bootstrap().await;

    // Seeds published first, in configured order, then the discovery.
    assert_eq!(
        sink.added.lock().unwrap().as_slice(),
        ["shu01", "shu02", "shu03", "shu04"]
    );

    let registry = registry.read().await;
    assert_eq!(
        registry.get("shu01").unwrap().location.as_deref(),
        Some("New York, United States")
    );
}
