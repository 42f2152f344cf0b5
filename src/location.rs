//! Hostname-to-location resolution with a process-lifetime cache.
//!
//! Resolution goes hostname -> IPv4 (DNS-over-HTTPS) -> "City, Country"
//! (IP geolocation). Both collaborators are free-tier public services, so
//! each lookup is preceded by a short delay and every hostname is resolved
//! at most once per run. Any failure falls back to a deterministic
//! hostname-pattern heuristic; the resolver never fails outward.

use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::MonitorError;

/// DNS A record type.
const DNS_TYPE_A: u16 = 1;

/// One record from the DNS-over-HTTPS `Answer` array.
#[derive(Debug, Deserialize)]
struct DnsRecord {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

/// DNS-over-HTTPS response.
#[derive(Debug, Deserialize)]
struct DnsResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DnsRecord>,
}

/// IP geolocation response.
#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
}

/// Resolves relay hostnames to human-readable locations.
#[derive(Debug)]
pub struct LocationResolver {
    client: reqwest::Client,
    cache: DashMap<String, String>,
    delay: Duration,
}

impl LocationResolver {
    /// Create a resolver with the given rate-limit delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
            cache: DashMap::new(),
            delay,
        }
    }

    /// Seed the cache with a known location, bypassing network lookup.
    pub fn prime(&self, hostname: &str, location: &str) {
        self.cache
            .insert(hostname.to_string(), location.to_string());
    }

    /// Resolve a hostname to a display location. Never fails: any error
    /// along the way yields the hostname-pattern heuristic instead, and
    /// whatever string is produced is cached for the process lifetime.
    pub async fn resolve(&self, hostname: &str) -> String {
        if let Some(cached) = self.cache.get(hostname) {
            return cached.clone();
        }

        let location = match self.lookup(hostname).await {
            Ok(location) => location,
            Err(e) => {
                debug!(hostname, error = %e, "location lookup failed, using heuristic");
                fallback_location(hostname)
            }
        };

        self.cache.insert(hostname.to_string(), location.clone());
        location
    }

    /// Network path: DNS-over-HTTPS then IP geolocation.
    async fn lookup(&self, hostname: &str) -> Result<String, MonitorError> {
        let ip = self.resolve_ipv4(hostname).await;

        // Short pause before the geolocation call to avoid free-tier rate
        // limiting.
        tokio::time::sleep(self.delay).await;

        let url = format!("https://ipapi.co/{ip}/json/");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MonitorError::malformed(
                &url,
                format!("status {}", response.status()),
            ));
        }
        let geo: GeoResponse = response.json().await?;
        if geo.error {
            return Err(MonitorError::malformed(
                &url,
                geo.reason.unwrap_or_else(|| "location lookup failed".to_string()),
            ));
        }

        let mut parts = Vec::new();
        if let Some(city) = geo.city.filter(|c| !c.is_empty()) {
            parts.push(city);
        }
        if let Some(country) = geo.country_name.filter(|c| !c.is_empty()) {
            parts.push(country);
        }
        if parts.is_empty() {
            return Ok("Unknown Location".to_string());
        }
        Ok(parts.join(", "))
    }

    /// Resolve a hostname to its first IPv4 address. On failure the
    /// hostname itself is returned; the geolocation service accepts
    /// hostnames for some lookups.
    async fn resolve_ipv4(&self, hostname: &str) -> String {
        let url = format!("https://dns.google/resolve?name={hostname}&type=A");
        let result: Result<DnsResponse, MonitorError> = async {
            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(MonitorError::malformed(
                    &url,
                    format!("status {}", response.status()),
                ));
            }
            Ok(response.json().await?)
        }
        .await;

        match result {
            Ok(dns) => dns
                .answer
                .iter()
                .find(|r| r.record_type == DNS_TYPE_A)
                .map(|r| r.data.clone())
                .unwrap_or_else(|| hostname.to_string()),
            Err(e) => {
                debug!(hostname, error = %e, "DNS resolution failed, using hostname directly");
                hostname.to_string()
            }
        }
    }
}

/// Deterministic location heuristic from hostname naming conventions.
/// Used whenever network resolution is unavailable.
pub fn fallback_location(hostname: &str) -> String {
    let host = hostname.to_ascii_lowercase();

    // Known deployment sites, city-and-country form.
    for (pattern, location) in [
        ("shu01", "New York, United States"),
        ("shu02", "Los Angeles, United States"),
        ("shu03", "Frankfurt, Germany"),
        ("shu04", "Singapore, Singapore"),
        ("shu05", "Sydney, Australia"),
        ("shu06", "São Paulo, Brazil"),
        ("shu07", "Cape Town, South Africa"),
        ("shu08", "Dubai, UAE"),
    ] {
        if host.contains(pattern) {
            return location.to_string();
        }
    }

    // Any other shuNN host.
    if let Some(num) = digits_after(&host, "shu") {
        return format!("Shugur Node {num}");
    }

    // Generic cluster naming.
    if host.contains("node-") {
        return match digits_after(&host, "node-") {
            Some(num) => format!("Cluster Node {num}"),
            None => "Cluster Node".to_string(),
        };
    }

    let short = host.split('.').next().unwrap_or(&host);

    // Other hosts on the known network domain.
    if host.contains("shugur.net") {
        return format!("Shugur Network ({})", short.to_ascii_uppercase());
    }

    format!("Relay Server ({})", short.to_ascii_uppercase())
}

/// Digits immediately following the first occurrence of `prefix`, if any.
fn digits_after(host: &str, prefix: &str) -> Option<String> {
    let rest = &host[host.find(prefix)? + prefix.len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}
