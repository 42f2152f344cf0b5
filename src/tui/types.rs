//! TUI type definitions for the relay dashboard.

use crate::registry::RelayStatus;

/// Bounded series of per-interval delta samples, rendered as a sparkline.
#[derive(Debug, Clone)]
pub struct DeltaSeries {
    points: Vec<u64>,
    cap: usize,
}

impl DeltaSeries {
    /// Create an empty series keeping at most `cap` points.
    pub fn new(cap: usize) -> Self {
        Self {
            points: Vec::with_capacity(cap),
            cap,
        }
    }

    /// Append a sample, dropping the oldest when full.
    pub fn push(&mut self, value: u64) {
        self.points.push(value);
        if self.points.len() > self.cap {
            self.points.remove(0);
        }
    }

    /// Samples, oldest first.
    pub fn data(&self) -> &[u64] {
        &self.points
    }

    /// Whether no sample has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<u64> {
        self.points.last().copied()
    }
}

/// Human status label for a node card.
pub fn status_label(status: RelayStatus) -> &'static str {
    match status {
        RelayStatus::Online => "Online",
        RelayStatus::Idle => "Idle",
        RelayStatus::Connecting => "Connecting",
        RelayStatus::Offline => "Offline",
    }
}

/// Format an uptime in seconds as `45s`, `12m`, `3h 20m`, or `2d 5h`.
pub fn format_uptime(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

/// Format a byte count as a whole number of mebibytes.
pub fn format_mebibytes(bytes: u64) -> String {
    format!("{}MB", bytes / (1024 * 1024))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_series_caps_points() {
        let mut series = DeltaSeries::new(3);
        for v in 1..=5 {
            series.push(v);
        }
        assert_eq!(series.data(), &[3, 4, 5]);
        assert_eq!(series.latest(), Some(5));
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(45), "45s");
        assert_eq!(format_uptime(12 * 60), "12m");
        assert_eq!(format_uptime(3 * 3600 + 20 * 60), "3h 20m");
        assert_eq!(format_uptime(2 * 86400 + 5 * 3600), "2d 5h");
    }

    #[test]
    fn test_format_mebibytes() {
        assert_eq!(format_mebibytes(0), "0MB");
        assert_eq!(format_mebibytes(128 * 1024 * 1024), "128MB");
    }
}
