//! Per-node runtime polling.
//!
//! Every refresh interval the poller fans out over all registered relays,
//! fetches the enhanced metrics endpoint (falling back to the basic stats
//! endpoint), writes runtime state into the registry, and publishes
//! per-node updates, network totals, and delta samples to the UI channel.
//! A failed fetch marks the relay offline; nothing propagates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::registry::{
    MemoryUsage, MetricsPayload, RelayRegistry, RelayStatus, RuntimeState, StatsPayload,
};
use crate::tui::TuiEvent;

/// Network-wide aggregates computed from one polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkTotals {
    /// All registered relays.
    pub total_relays: usize,
    /// Relays whose last poll succeeded.
    pub active_relays: usize,
    /// Sum of active client connections.
    pub total_connections: u64,
    /// Sum of messages processed.
    pub total_messages: u64,
    /// Cluster-wide events-stored figure, taken from the first online
    /// relay reporting a non-zero value.
    pub cluster_events: u64,
    /// Sum of allocated memory in bytes.
    pub total_memory_bytes: u64,
    /// Share of relays currently online, in percent.
    pub uptime_percentage: f64,
}

/// Parse a human-readable uptime string such as `"1d 2h 44m"` into
/// seconds. Unparseable input counts as zero uptime.
pub fn parse_uptime(s: &str) -> u64 {
    humantime::parse_duration(s.trim())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Weighted load estimate for relays that do not report a load figure:
/// memory pressure at 40%, connection count at 30% (capped at 50 points),
/// event throughput at 30% (capped at 30 points).
pub fn estimate_load(memory: MemoryUsage, connections: u64, events_per_second: f64) -> f64 {
    let mut load = 0.0;

    if let (Some(alloc), Some(sys)) = (memory.alloc, memory.sys) {
        if sys > 0 {
            load += (alloc as f64 / sys as f64) * 100.0 * 0.4;
        }
    }

    if connections > 0 {
        load += (connections as f64).min(50.0) * 0.3;
    }

    if events_per_second > 0.0 {
        load += (events_per_second * 10.0).min(30.0) * 0.3;
    }

    load.min(100.0)
}

/// Periodic runtime poller over the shared registry.
pub struct StatsPoller {
    client: reqwest::Client,
    registry: Arc<RwLock<RelayRegistry>>,
    events: mpsc::Sender<TuiEvent>,
    interval: Duration,
    /// Totals from the previous pass, for delta samples. `None` until the
    /// first pass completes.
    previous: Option<(u64, u64)>,
}

impl StatsPoller {
    /// Create a poller.
    pub fn new(
        registry: Arc<RwLock<RelayRegistry>>,
        events: mpsc::Sender<TuiEvent>,
        fetch_timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(fetch_timeout)
                .build()
                .unwrap_or_default(),
            registry,
            events,
            interval,
            previous: None,
        }
    }

    /// Poll forever on the configured interval. The first pass runs
    /// immediately.
    pub async fn run(mut self) {
        loop {
            self.poll_pass().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Run one polling pass over every registered relay.
    pub async fn poll_pass(&mut self) {
        let targets: Vec<(String, String)> = self
            .registry
            .read()
            .await
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), n.api_url.clone()))
            .collect();

        let this = &*self;
        let fetches = targets.iter().map(|(id, api_url)| {
            let id = id.clone();
            let api_url = api_url.clone();
            async move { (id, this.fetch_runtime(&api_url).await) }
        });
        let results = futures::future::join_all(fetches).await;

        let mut totals = NetworkTotals {
            total_relays: targets.len(),
            ..NetworkTotals::default()
        };
        let mut online = 0usize;
        let mut cluster_events_set = false;

        for (id, runtime) in results {
            if runtime.status.is_active() {
                totals.active_relays += 1;
            }
            if runtime.status == RelayStatus::Online {
                online += 1;
            }
            totals.total_connections += runtime.connections;
            totals.total_messages += runtime.messages_processed;
            totals.total_memory_bytes += runtime.memory_alloc;

            // The events-stored counter is cluster-wide; take it from the
            // first online relay that reports one.
            if !cluster_events_set
                && runtime.status == RelayStatus::Online
                && runtime.events_stored > 0
            {
                totals.cluster_events = runtime.events_stored;
                cluster_events_set = true;
            }

            let snapshot = {
                let mut registry = self.registry.write().await;
                registry.apply_runtime(&id, runtime);
                registry.get(&id).cloned()
            };
            if let Some(node) = snapshot {
                let _ = self.events.try_send(TuiEvent::NodeRuntime(Box::new(node)));
            }
        }

        if totals.total_relays > 0 {
            totals.uptime_percentage = online as f64 / totals.total_relays as f64 * 100.0;
        }

        // Delta samples: the first completed pass only establishes the
        // baseline and records a zero point.
        let (messages_delta, events_delta) = match self.previous {
            None => (0, 0),
            Some((prev_messages, prev_events)) => (
                totals.total_messages.saturating_sub(prev_messages),
                totals.cluster_events.saturating_sub(prev_events),
            ),
        };
        self.previous = Some((totals.total_messages, totals.cluster_events));

        let _ = self.events.try_send(TuiEvent::Totals(totals));
        let _ = self.events.try_send(TuiEvent::Sample {
            messages: messages_delta,
            events: events_delta,
        });
    }

    /// Fetch one relay's runtime state, measuring the request round-trip
    /// as its response time. Any failure yields the offline state.
    async fn fetch_runtime(&self, api_url: &str) -> RuntimeState {
        let started = Instant::now();
        let payload = match self.fetch_metrics(api_url).await {
            Some(payload) => payload,
            None => {
                debug!(api_url, "poll failed, marking relay offline");
                return RuntimeState::offline();
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let status = payload
            .status
            .as_deref()
            .map(RelayStatus::parse)
            .unwrap_or(RelayStatus::Online);

        let mut load = payload.load_percentage;
        if load == 0.0 {
            load = estimate_load(
                payload.memory_usage,
                payload.active_connections,
                payload.events_per_second,
            );
        }

        RuntimeState {
            status,
            connections: payload.active_connections,
            messages_processed: payload.messages_processed,
            messages_sent: payload.messages_sent,
            events_stored: payload.events_stored,
            events_per_second: payload.events_per_second,
            active_subscriptions: payload.active_subscriptions,
            uptime_secs: payload.uptime_seconds,
            response_time_ms: elapsed_ms,
            load_percentage: load,
            error_rate: payload.error_rate,
            memory_alloc: payload.memory_usage.alloc.unwrap_or(0),
            memory_sys: payload.memory_usage.sys.unwrap_or(0),
            last_seen: Some(Utc::now()),
        }
    }

    /// Enhanced metrics endpoint, with the basic stats endpoint as
    /// fallback.
    async fn fetch_metrics(&self, api_url: &str) -> Option<MetricsPayload> {
        let url = format!("{api_url}/api/metrics");
        if let Ok(response) = self.client.get(&url).send().await {
            if response.status().is_success() {
                if let Ok(payload) = response.json::<MetricsPayload>().await {
                    return Some(payload);
                }
            }
        }

        let url = format!("{api_url}/api/stats");
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let stats: StatsPayload = response.json().await.ok()?;
        Some(stats.into_metrics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("45s"), 45);
        assert_eq!(parse_uptime("12m"), 12 * 60);
        assert_eq!(parse_uptime("1d 2h 44m"), 86400 + 2 * 3600 + 44 * 60);
        assert_eq!(parse_uptime("garbage"), 0);
        assert_eq!(parse_uptime(""), 0);
    }

    #[test]
    fn test_estimate_load_weights() {
        // No signals at all: zero load.
        assert_eq!(estimate_load(MemoryUsage::default(), 0, 0.0), 0.0);

        // Memory only: half-used heap contributes 50 * 0.4 = 20.
        let memory = MemoryUsage {
            alloc: Some(512),
            sys: Some(1024),
        };
        assert!((estimate_load(memory, 0, 0.0) - 20.0).abs() < 0.001);

        // Connection contribution caps at 50 points before weighting.
        let load = estimate_load(MemoryUsage::default(), 10_000, 0.0);
        assert!((load - 15.0).abs() < 0.001);

        // Everything saturated still caps at 100.
        let memory = MemoryUsage {
            alloc: Some(1024),
            sys: Some(1024),
        };
        assert!(estimate_load(memory, 10_000, 1_000.0) <= 100.0);
    }

    #[test]
    fn test_totals_default() {
        let totals = NetworkTotals::default();
        assert_eq!(totals.total_relays, 0);
        assert_eq!(totals.uptime_percentage, 0.0);
    }
}
