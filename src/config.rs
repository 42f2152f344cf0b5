//! Monitor configuration: seed relays, intervals, and timeouts.

use std::time::Duration;

/// Statically configured bootstrap relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRelay {
    /// Short identifier, derived from the hostname's first label.
    pub id: String,
    /// Fully-qualified domain name.
    pub hostname: String,
    /// WebSocket endpoint.
    pub ws_url: String,
    /// HTTP API base URL.
    pub api_url: String,
}

impl SeedRelay {
    /// Create a seed entry from a hostname, deriving id and endpoints.
    pub fn from_hostname(hostname: &str) -> Self {
        Self {
            id: crate::registry::short_id(hostname),
            hostname: hostname.to_string(),
            ws_url: format!("wss://{hostname}"),
            api_url: format!("https://{hostname}"),
        }
    }
}

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Bootstrap relays, in configured order. Other relays are discovered
    /// dynamically from cluster metadata.
    pub seeds: Vec<SeedRelay>,
    /// Runtime polling interval.
    pub refresh_interval: Duration,
    /// Topology rediscovery interval.
    pub topology_interval: Duration,
    /// Timeout for the startup connectivity probe.
    pub probe_timeout: Duration,
    /// Timeout for per-node metrics/stats requests.
    pub fetch_timeout: Duration,
    /// Timeout for cluster-metadata requests.
    pub topology_timeout: Duration,
    /// Pause before each third-party resolver call, to stay under
    /// free-tier rate limits.
    pub resolver_delay: Duration,
    /// Maximum points kept in each delta series.
    pub max_series_points: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            seeds: vec![
                SeedRelay::from_hostname("shu01.shugur.net"),
                SeedRelay::from_hostname("shu02.shugur.net"),
                SeedRelay::from_hostname("shu03.shugur.net"),
            ],
            refresh_interval: Duration::from_secs(5),
            topology_interval: Duration::from_secs(300),
            probe_timeout: Duration::from_secs(3),
            fetch_timeout: Duration::from_secs(5),
            topology_timeout: Duration::from_secs(8),
            resolver_delay: Duration::from_millis(200),
            max_series_points: 20,
        }
    }
}

impl MonitorConfig {
    /// Replace the default seed list with the given hostnames.
    pub fn with_seeds<I, S>(mut self, hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seeds: Vec<SeedRelay> = hostnames
            .into_iter()
            .map(|h| SeedRelay::from_hostname(h.as_ref()))
            .collect();
        if !seeds.is_empty() {
            self.seeds = seeds;
        }
        self
    }
}
