//! Insertion-ordered relay registry with multi-key identity matching.
//!
//! The registry is the only shared mutable structure in the monitor. The
//! discovery pass is its sole writer of identity/topology fields and the
//! polling pass is sole writer of runtime fields; the field sets are
//! disjoint, so interleaved passes cannot corrupt an entry.

use std::collections::HashSet;

use tracing::warn;

use crate::config::SeedRelay;
use crate::registry::types::{hostname_from_address, short_id, ClusterInfo, RelayNode, RuntimeState};

/// Result of merging one topology response into the registry.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationDelta {
    /// Full node list after the pass: seeds first in configured order,
    /// then discovered nodes in encounter order.
    pub nodes: Vec<RelayNode>,
    /// Nodes that matched no identity key and were appended to the
    /// registry during this pass.
    pub newly_discovered: Vec<RelayNode>,
    /// Previously known nodes whose topology fields were refreshed.
    pub updated: Vec<RelayNode>,
}

impl ReconciliationDelta {
    /// Whether the pass changed nothing.
    pub fn is_empty(&self) -> bool {
        self.newly_discovered.is_empty() && self.updated.is_empty()
    }
}

/// Canonical set of known relay nodes.
///
/// Entries are created at startup from seed configuration or during
/// reconciliation, updated in place, and never deleted for the process
/// lifetime. Topology responses are additive and corrective, never
/// authoritative for removal.
#[derive(Debug)]
pub struct RelayRegistry {
    nodes: Vec<RelayNode>,
    /// Configured seed API URLs, used for the seed-by-hostname-substring
    /// match during reconciliation.
    seed_api_urls: Vec<String>,
}

impl RelayRegistry {
    /// Create a registry seeded with the configured bootstrap relays.
    pub fn from_seeds(seeds: &[SeedRelay]) -> Self {
        Self {
            nodes: seeds.iter().map(RelayNode::from_seed).collect(),
            seed_api_urls: seeds.iter().map(|s| s.api_url.clone()).collect(),
        }
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> &[RelayNode] {
        &self.nodes
    }

    /// Snapshot of all nodes.
    pub fn snapshot(&self) -> Vec<RelayNode> {
        self.nodes.clone()
    }

    /// Look up a node by id.
    pub fn get(&self, id: &str) -> Option<&RelayNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of seed nodes.
    pub fn seed_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_seed).count()
    }

    /// Set a node's resolved location. Returns true when the stored value
    /// actually changed; an equal value or unknown id is a no-op.
    pub fn set_location(&mut self, id: &str, location: &str) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) if node.location.as_deref() != Some(location) => {
                node.location = Some(location.to_string());
                true
            }
            _ => false,
        }
    }

    /// Replace a node's runtime state. Called only by the polling pass.
    pub fn apply_runtime(&mut self, id: &str, runtime: RuntimeState) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.runtime = runtime;
        }
    }

    /// Indices of all entries matching any of the three identity keys.
    fn matching_indices(&self, id: &str, hostname: &str, node_id: Option<u64>) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                n.id == id
                    || n.hostname == hostname
                    || (node_id.is_some() && n.cluster_node_id == node_id)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Merge a topology response into the registry.
    ///
    /// Idempotent: a second pass with the same response produces no new
    /// entries and converges metadata rather than oscillating. Conflicting
    /// multi-key matches are merged into the first matching entry with a
    /// warning, never duplicated.
    pub fn reconcile(&mut self, info: &ClusterInfo) -> ReconciliationDelta {
        let mut newly_discovered = Vec::new();
        let mut updated_ids: Vec<String> = Vec::new();

        for member in &info.all_nodes {
            let hostname = hostname_from_address(&member.address);
            let id = short_id(hostname);

            // Configured seeds are matched by hostname substring against
            // the seed API URLs and updated in place, never duplicated.
            let is_seed_member = self.seed_api_urls.iter().any(|u| u.contains(hostname));
            if is_seed_member {
                if let Some(idx) = self
                    .nodes
                    .iter()
                    .position(|n| n.id == id || n.hostname == hostname)
                {
                    self.nodes[idx].apply_member(member);
                    updated_ids.push(self.nodes[idx].id.clone());
                }
                continue;
            }

            let matches = self.matching_indices(&id, hostname, member.node_id);
            match matches.first() {
                Some(&idx) => {
                    if matches.len() > 1 {
                        warn!(
                            id,
                            hostname,
                            node_id = ?member.node_id,
                            entries = matches.len(),
                            "conflicting identity match, merging into first entry"
                        );
                        // The membership id moves to the winning entry;
                        // release it from the losers so at most one entry
                        // carries any given id.
                        if member.node_id.is_some() {
                            for &other in &matches[1..] {
                                if self.nodes[other].cluster_node_id == member.node_id {
                                    self.nodes[other].cluster_node_id = None;
                                }
                            }
                        }
                    }
                    self.nodes[idx].apply_member(member);
                    updated_ids.push(self.nodes[idx].id.clone());
                }
                None => {
                    // No identity key matched, so this descriptor appends
                    // a fresh entry; every appended entry is published as
                    // a discovery so its location gets resolved.
                    let node = RelayNode::discovered(member);
                    newly_discovered.push(node.clone());
                    self.nodes.push(node);
                }
            }
        }

        let mut seen = HashSet::new();
        updated_ids.retain(|id| seen.insert(id.clone()));
        let updated = updated_ids
            .iter()
            .filter_map(|id| self.get(id).cloned())
            .collect();

        ReconciliationDelta {
            nodes: self.snapshot(),
            newly_discovered,
            updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedRelay;
    use crate::registry::types::ClusterNode;

    fn seeds() -> Vec<SeedRelay> {
        vec![
            SeedRelay::from_hostname("shu01.shugur.net"),
            SeedRelay::from_hostname("shu02.shugur.net"),
            SeedRelay::from_hostname("shu03.shugur.net"),
        ]
    }

    fn member(address: &str, node_id: u64) -> ClusterNode {
        ClusterNode {
            address: address.to_string(),
            node_id: Some(node_id),
            is_live: Some(true),
            ranges: Some(10),
            leases: Some(2),
            started_at: None,
            server_version: Some("v24.1".to_string()),
            sql_address: None,
        }
    }

    fn four_node_topology() -> ClusterInfo {
        ClusterInfo {
            all_nodes: vec![
                member("shu01.shugur.net:26257", 1),
                member("shu02.shugur.net:26257", 2),
                member("shu03.shugur.net:26257", 3),
                member("shu04.example.net:7777", 4),
            ],
        }
    }

    #[test]
    fn test_seeds_update_in_place() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        let delta = registry.reconcile(&four_node_topology());

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.seed_count(), 3);
        let shu01 = registry.get("shu01").unwrap();
        assert!(shu01.is_seed);
        assert_eq!(shu01.cluster_node_id, Some(1));
        assert_eq!(shu01.is_live, Some(true));
        assert_eq!(delta.updated.len(), 3);
    }

    #[test]
    fn test_new_node_discovered() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        let delta = registry.reconcile(&four_node_topology());

        assert_eq!(delta.newly_discovered.len(), 1);
        let shu04 = &delta.newly_discovered[0];
        assert_eq!(shu04.id, "shu04");
        assert_eq!(shu04.hostname, "shu04.example.net");
        assert!(!shu04.is_seed);

        // Seeds first, discovered nodes after, in encounter order.
        let ids: Vec<&str> = registry.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["shu01", "shu02", "shu03", "shu04"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        let topology = four_node_topology();

        registry.reconcile(&topology);
        let first = registry.snapshot();
        let delta = registry.reconcile(&topology);

        assert!(delta.newly_discovered.is_empty());
        assert_eq!(registry.snapshot(), first);
    }

    #[test]
    fn test_changed_cluster_node_id_updates_existing_entry() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        registry.reconcile(&four_node_topology());

        // Same hostname, new membership id after a restart.
        let mut topology = four_node_topology();
        topology.all_nodes[3].node_id = Some(9);
        let delta = registry.reconcile(&topology);

        assert!(delta.newly_discovered.is_empty());
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("shu04").unwrap().cluster_node_id, Some(9));
    }

    #[test]
    fn test_match_by_cluster_node_id_alone() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        registry.reconcile(&four_node_topology());

        // Hostname changed but the membership id is known: update, don't
        // duplicate.
        let topology = ClusterInfo {
            all_nodes: vec![member("shu04-renamed.example.net:7777", 4)],
        };
        let delta = registry.reconcile(&topology);

        assert!(delta.newly_discovered.is_empty());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_seed_permanence_across_shrinking_topologies() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        registry.reconcile(&four_node_topology());

        // A later response naming only one node removes nothing.
        let topology = ClusterInfo {
            all_nodes: vec![member("shu01.shugur.net:26257", 1)],
        };
        registry.reconcile(&topology);

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.seed_count(), 3);
    }

    #[test]
    fn test_location_set_once_preserved() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        registry.reconcile(&four_node_topology());

        assert!(registry.set_location("shu04", "Singapore, Singapore"));
        // Same value again is a no-op.
        assert!(!registry.set_location("shu04", "Singapore, Singapore"));

        registry.reconcile(&four_node_topology());
        assert_eq!(
            registry.get("shu04").unwrap().location.as_deref(),
            Some("Singapore, Singapore")
        );

        // A genuinely different resolution updates it.
        assert!(registry.set_location("shu04", "Jurong East, Singapore"));
    }

    #[test]
    fn test_runtime_fields_survive_reconciliation() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        registry.reconcile(&four_node_topology());

        let mut runtime = RuntimeState::default();
        runtime.connections = 17;
        registry.apply_runtime("shu02", runtime);

        registry.reconcile(&four_node_topology());
        assert_eq!(registry.get("shu02").unwrap().runtime.connections, 17);
    }

    #[test]
    fn test_conflicting_match_releases_membership_id_from_loser() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        let mut topology = four_node_topology();
        topology.all_nodes.push(member("shu05.example.net:7777", 5));
        registry.reconcile(&topology);

        // Hostname points at shu04 while the membership id belongs to
        // shu05: the first match wins the id, the loser gives it up.
        let conflict = ClusterInfo {
            all_nodes: vec![member("shu04.example.net:7777", 5)],
        };
        let delta = registry.reconcile(&conflict);

        assert!(delta.newly_discovered.is_empty());
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get("shu04").unwrap().cluster_node_id, Some(5));
        assert_eq!(registry.get("shu05").unwrap().cluster_node_id, None);

        let holders = registry
            .nodes()
            .iter()
            .filter(|n| n.cluster_node_id == Some(5))
            .count();
        assert_eq!(holders, 1);
    }

    #[test]
    fn test_repeated_descriptor_reported_once() {
        let mut registry = RelayRegistry::from_seeds(&seeds());

        // The same member listed twice, non-adjacently.
        let topology = ClusterInfo {
            all_nodes: vec![
                member("shu01.shugur.net:26257", 1),
                member("shu03.shugur.net:26257", 3),
                member("shu01.shugur.net:26257", 1),
            ],
        };
        let delta = registry.reconcile(&topology);

        let updated: Vec<&str> = delta.updated.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(updated, vec!["shu01", "shu03"]);
    }

    #[test]
    fn test_recycled_membership_id_still_publishes_discovery() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        registry.reconcile(&four_node_topology());

        // shu04's id is reassigned in the same pass that hands its old id
        // to a brand-new host; the new host must still surface as a
        // discovery.
        let topology = ClusterInfo {
            all_nodes: vec![
                member("shu04.example.net:7777", 9),
                member("shu06.example.net:7777", 4),
            ],
        };
        let delta = registry.reconcile(&topology);

        assert_eq!(registry.len(), 5);
        assert_eq!(delta.newly_discovered.len(), 1);
        assert_eq!(delta.newly_discovered[0].id, "shu06");
        assert_eq!(registry.get("shu06").unwrap().cluster_node_id, Some(4));
    }

    #[test]
    fn test_identity_uniqueness() {
        let mut registry = RelayRegistry::from_seeds(&seeds());
        registry.reconcile(&four_node_topology());
        registry.reconcile(&four_node_topology());

        let mut ids = HashSet::new();
        let mut hostnames = HashSet::new();
        for node in registry.nodes() {
            assert!(ids.insert(node.id.clone()), "duplicate id {}", node.id);
            assert!(
                hostnames.insert(node.hostname.clone()),
                "duplicate hostname {}",
                node.hostname
            );
        }
    }
}
