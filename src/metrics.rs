//! Metrics and monitoring for the model serving core
//!
//! This module collects counters, gauges, and latency histograms for the
//! request path. Series names carry their labels preformatted, so the
//! exposition endpoint can render them directly.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Histogram samples kept per series before old ones rotate out
const MAX_SAMPLES: usize = 4096;

/// Metrics collector for the serving core
pub struct MetricsCollector {
    counters: Arc<RwLock<HashMap<String, u64>>>,
    gauges: Arc<RwLock<HashMap<String, f64>>>,
    histograms: Arc<RwLock<HashMap<String, Vec<f64>>>>,
    start_time: Instant,
}

/// Metrics snapshot at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: u64,
    pub uptime_seconds: f64,
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    pub histograms: HashMap<String, HistogramStats>,
}

/// Histogram statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            counters: Arc::new(RwLock::new(HashMap::new())),
            gauges: Arc::new(RwLock::new(HashMap::new())),
            histograms: Arc::new(RwLock::new(HashMap::new())),
            start_time: Instant::now(),
        }
    }

    /// Record one finished request for a model
    pub fn observe_request(&self, model: &str, outcome: &str, latency_ms: f64) {
        self.increment_counter(
            &format!(
                "requests_total{{model=\"{}\",outcome=\"{}\"}}",
                model, outcome
            ),
            1,
        );
        self.record_histogram(
            &format!("request_latency_ms{{model=\"{}\"}}", model),
            latency_ms,
        );
    }

    /// Increment a counter metric
    pub fn increment_counter(&self, name: &str, value: u64) {
        let mut counters = self.counters.write();
        *counters.entry(name.to_string()).or_insert(0) += value;
    }

    /// Set a gauge metric
    pub fn set_gauge(&self, name: &str, value: f64) {
        let mut gauges = self.gauges.write();
        gauges.insert(name.to_string(), value);
    }

    /// Record a value in a histogram
    pub fn record_histogram(&self, name: &str, value: f64) {
        let mut histograms = self.histograms.write();
        let samples = histograms.entry(name.to_string()).or_insert_with(Vec::new);
        if samples.len() >= MAX_SAMPLES {
            samples.remove(0);
        }
        samples.push(value);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.read().clone();
        let gauges = self.gauges.read().clone();

        let histograms = {
            let histograms = self.histograms.read();
            histograms
                .iter()
                .map(|(name, values)| {
                    let stats = Self::calculate_histogram_stats(values);
                    (name.clone(), stats)
                })
                .collect()
        };

        MetricsSnapshot {
            timestamp: chrono::Utc::now().timestamp() as u64,
            uptime_seconds: self.start_time.elapsed().as_secs_f64(),
            counters,
            gauges,
            histograms,
        }
    }

    /// Calculate statistics for a histogram
    fn calculate_histogram_stats(values: &[f64]) -> HistogramStats {
        if values.is_empty() {
            return HistogramStats {
                count: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                p50: 0.0,
                p95: 0.0,
                p99: 0.0,
            };
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = sorted.len();
        let min = sorted[0];
        let max = sorted[count - 1];
        let mean = sorted.iter().sum::<f64>() / count as f64;

        let p50 = Self::percentile(&sorted, 0.5);
        let p95 = Self::percentile(&sorted, 0.95);
        let p99 = Self::percentile(&sorted, 0.99);

        HistogramStats {
            count,
            min,
            max,
            mean,
            p50,
            p95,
            p99,
        }
    }

    /// Calculate a percentile from sorted values
    fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
        if sorted_values.is_empty() {
            return 0.0;
        }

        if sorted_values.len() == 1 {
            return sorted_values[0];
        }

        let index = percentile * (sorted_values.len() - 1) as f64;
        let lower_index = index.floor() as usize;
        let upper_index = index.ceil() as usize;

        if lower_index == upper_index {
            sorted_values[lower_index]
        } else {
            let lower_value = sorted_values[lower_index];
            let upper_value = sorted_values[upper_index];
            let weight = index - lower_index as f64;
            lower_value + weight * (upper_value - lower_value)
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
