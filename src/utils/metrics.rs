//! Runtime Metrics
//!
//! Counters, gauges and bounded histograms for the packet, click and
//! transport paths. Recording takes `&self` so the collector can be shared
//! behind an `Arc` between the engine and the periodic reporter.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::info;

/// Observations kept per histogram; older values are discarded
pub const HISTOGRAM_WINDOW: usize = 1024;

/// Metrics collector
#[derive(Debug)]
pub struct MetricsCollector {
    counters: RwLock<BTreeMap<&'static str, u64>>,
    gauges: RwLock<BTreeMap<&'static str, f64>>,
    histograms: RwLock<BTreeMap<&'static str, Histogram>>,
    start_time: Instant,
}

impl MetricsCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
            histograms: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Increment a counter
    pub fn increment_counter(&self, name: &'static str, value: u64) {
        *self.counters.write().entry(name).or_insert(0) += value;
    }

    /// Set a gauge value
    pub fn set_gauge(&self, name: &'static str, value: f64) {
        self.gauges.write().insert(name, value);
    }

    /// Record a histogram observation
    pub fn record_histogram(&self, name: &'static str, value: f64) {
        self.histograms
            .write()
            .entry(name)
            .or_insert_with(Histogram::new)
            .record(value);
    }

    /// Counter value
    pub fn get_counter(&self, name: &str) -> Option<u64> {
        self.counters.read().get(name).copied()
    }

    /// Gauge value
    pub fn get_gauge(&self, name: &str) -> Option<f64> {
        self.gauges.read().get(name).copied()
    }

    /// Histogram statistics over the retained window
    pub fn get_histogram(&self, name: &str) -> Option<HistogramStats> {
        self.histograms.read().get(name).map(Histogram::stats)
    }

    /// Point-in-time copy of everything collected
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            counters: self
                .counters
                .read()
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            gauges: self
                .gauges
                .read()
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            histograms: self
                .histograms
                .read()
                .iter()
                .map(|(k, v)| (k.to_string(), v.stats()))
                .collect(),
        }
    }

    /// Log a one-line summary at info level
    pub fn log_summary(&self) {
        let counters = self.counters.read();
        let count = |name: &str| counters.get(name).copied().unwrap_or(0);
        let interval = self
            .get_histogram(metric_names::PACKET_INTERVAL_MS)
            .unwrap_or_default();

        info!(
            "📊 frames={} samples={} dropped={} clicks={}/{} (debounced {}) hovers={} reconnects={} packet interval p50={:.1}ms p95={:.1}ms",
            count(metric_names::FRAMES_RECEIVED),
            count(metric_names::SAMPLES_ACCEPTED),
            count(metric_names::SAMPLES_DROPPED),
            count(metric_names::CLICKS_PHYSICAL),
            count(metric_names::CLICKS_DWELL),
            count(metric_names::CLICKS_DEBOUNCED),
            count(metric_names::HOVER_EVENTS),
            count(metric_names::RECONNECTS),
            interval.p50,
            interval.p95,
        );
    }

    /// Clear everything
    pub fn reset(&self) {
        self.counters.write().clear();
        self.gauges.write().clear();
        self.histograms.write().clear();
    }

    /// Snapshot as pretty JSON
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Sliding window of observations
#[derive(Debug, Clone)]
struct Histogram {
    values: VecDeque<f64>,
    total: u64,
}

impl Histogram {
    fn new() -> Self {
        Self {
            values: VecDeque::with_capacity(HISTOGRAM_WINDOW),
            total: 0,
        }
    }

    fn record(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if self.values.len() == HISTOGRAM_WINDOW {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.total += 1;
    }

    fn stats(&self) -> HistogramStats {
        if self.values.is_empty() {
            return HistogramStats::default();
        }

        let mut sorted: Vec<f64> = self.values.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let sum: f64 = sorted.iter().sum();
        HistogramStats {
            count: self.total,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: sum / sorted.len() as f64,
            p50: percentile(&sorted, 0.50),
            p95: percentile(&sorted, 0.95),
        }
    }
}

/// Lower-interpolation percentile over sorted values
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[index.min(sorted.len() - 1)]
}

/// Histogram statistics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistogramStats {
    /// Observations ever recorded
    pub count: u64,
    /// Window minimum
    pub min: f64,
    /// Window maximum
    pub max: f64,
    /// Window mean
    pub mean: f64,
    /// Window median
    pub p50: f64,
    /// Window 95th percentile
    pub p95: f64,
}

/// Snapshot of all collected metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Time since the collector was created
    pub uptime: Duration,
    /// Counter values
    pub counters: BTreeMap<String, u64>,
    /// Gauge values
    pub gauges: BTreeMap<String, f64>,
    /// Histogram statistics
    pub histograms: BTreeMap<String, HistogramStats>,
}

pub mod metric_names {
    //! Metric names used across the crate.

    /// Transport text frames received
    pub const FRAMES_RECEIVED: &str = "frames_received";
    /// Samples that passed validation
    pub const SAMPLES_ACCEPTED: &str = "samples_accepted";
    /// Samples dropped as malformed
    pub const SAMPLES_DROPPED: &str = "samples_dropped";
    /// Clicks from button rising edges
    pub const CLICKS_PHYSICAL: &str = "clicks_physical";
    /// Clicks from dwell expiry
    pub const CLICKS_DWELL: &str = "clicks_dwell";
    /// Clicks swallowed by the debounce window
    pub const CLICKS_DEBOUNCED: &str = "clicks_debounced";
    /// Hover events injected
    pub const HOVER_EVENTS: &str = "hover_events";
    /// Transport reconnect attempts
    pub const RECONNECTS: &str = "reconnects";
    /// Time between consecutive transport frames (ms)
    pub const PACKET_INTERVAL_MS: &str = "packet_interval_ms";
    /// Devices currently connected
    pub const DEVICES_CONNECTED: &str = "devices_connected";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let metrics = MetricsCollector::new();
        metrics.increment_counter(metric_names::CLICKS_DWELL, 1);
        metrics.increment_counter(metric_names::CLICKS_DWELL, 2);
        assert_eq!(metrics.get_counter(metric_names::CLICKS_DWELL), Some(3));
        assert_eq!(metrics.get_counter(metric_names::RECONNECTS), None);
    }

    #[test]
    fn test_gauge() {
        let metrics = MetricsCollector::new();
        metrics.set_gauge(metric_names::DEVICES_CONNECTED, 2.0);
        assert_eq!(metrics.get_gauge(metric_names::DEVICES_CONNECTED), Some(2.0));
    }

    #[test]
    fn test_histogram_window() {
        let metrics = MetricsCollector::new();
        for i in 0..(HISTOGRAM_WINDOW + 10) {
            metrics.record_histogram(metric_names::PACKET_INTERVAL_MS, i as f64);
        }
        metrics.record_histogram(metric_names::PACKET_INTERVAL_MS, f64::NAN);

        let stats = metrics
            .get_histogram(metric_names::PACKET_INTERVAL_MS)
            .unwrap();
        assert_eq!(stats.count, (HISTOGRAM_WINDOW + 10) as u64);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, (HISTOGRAM_WINDOW + 9) as f64);
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 0.50), 5.0);
        assert_eq!(percentile(&values, 0.95), 9.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = MetricsCollector::new();
        metrics.increment_counter(metric_names::HOVER_EVENTS, 10);
        metrics.record_histogram(metric_names::PACKET_INTERVAL_MS, 16.0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counters.get("hover_events"), Some(&10));
        assert!(snapshot.histograms.contains_key("packet_interval_ms"));
        assert!(metrics.export_json().unwrap().contains("hover_events"));

        metrics.reset();
        assert_eq!(metrics.get_counter(metric_names::HOVER_EVENTS), None);
    }
}
