/*!
 * # Metrics Module
 *
 * In-process metrics for the search service, exposed in Prometheus text
 * format at `/metrics` and as JSON at `/metrics/json`.
 *
 * Recorded series:
 * - `search_requests_total{kind}` style counters, one per search operation
 * - `search_geo_candidates` histogram of candidates loaded per geo query
 * - `search_geo_candidate_cap_hits_total` when the corpus cap truncated a load
 * - `<operation>_duration_ms` histograms written by `tracing::with_metrics`
 */

use dashmap::DashMap;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Count/sum histogram. The sum is kept as f64 bits so sub-unit
/// observations (milliseconds, kilometres) are not truncated.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    sum_bits: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, value: f64) {
        // fetch_update only fails when the closure returns None
        let _ = self
            .sum_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum(&self) -> f64 {
        f64::from_bits(self.sum_bits.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<String, Counter>,
    histograms: DashMap<String, Histogram>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_counter(&self, name: &str) -> Counter {
        self.counters
            .entry(name.to_string())
            .or_insert_with(Counter::new)
            .clone()
    }

    pub fn get_or_create_histogram(&self, name: &str) -> Histogram {
        self.histograms
            .entry(name.to_string())
            .or_insert_with(Histogram::new)
            .clone()
    }

    /// Prometheus text exposition, series sorted by name.
    pub fn export_metrics(&self) -> String {
        let mut output = String::new();

        let mut counters: Vec<(String, u64)> = self
            .counters
            .iter()
            .map(|e| (e.key().clone(), e.value().get()))
            .collect();
        counters.sort();
        for (name, value) in counters {
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!("{} {}\n", name, value));
        }

        let mut histograms: Vec<(String, u64, f64)> = self
            .histograms
            .iter()
            .map(|e| (e.key().clone(), e.value().get_count(), e.value().get_sum()))
            .collect();
        histograms.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, count, sum) in histograms {
            output.push_str(&format!("# TYPE {} histogram\n", name));
            output.push_str(&format!("{}_count {}\n", name, count));
            output.push_str(&format!("{}_sum {}\n", name, sum));
        }

        output
    }

    pub fn export_metrics_json(&self) -> serde_json::Value {
        let mut counters = serde_json::Map::new();
        for entry in self.counters.iter() {
            counters.insert(entry.key().clone(), json!(entry.value().get()));
        }

        let mut histograms = serde_json::Map::new();
        for entry in self.histograms.iter() {
            histograms.insert(
                entry.key().clone(),
                json!({
                    "count": entry.value().get_count(),
                    "sum": entry.value().get_sum(),
                }),
            );
        }

        json!({
            "counters": counters,
            "histograms": histograms,
        })
    }
}

// Global metrics registry
lazy_static::lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
    pub static ref SEARCH_METRICS: SearchMetrics = SearchMetrics::new();
}

pub fn increment_counter(name: &str) {
    METRICS.get_or_create_counter(name).inc();
}

pub fn observe_histogram(name: &str, value: f64) {
    METRICS.get_or_create_histogram(name).observe(value);
}

pub struct SearchMetrics {
    pub nearby_requests: Counter,
    pub combined_requests: Counter,
    pub listing_requests: Counter,
    pub validation_failures: Counter,
    pub geo_candidates: Histogram,
    pub geo_cap_hits: Counter,
    pub ratings_written: Counter,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self {
            nearby_requests: METRICS.get_or_create_counter("search_nearby_requests_total"),
            combined_requests: METRICS.get_or_create_counter("search_all_requests_total"),
            listing_requests: METRICS.get_or_create_counter("search_listing_requests_total"),
            validation_failures: METRICS
                .get_or_create_counter("search_validation_failures_total"),
            geo_candidates: METRICS.get_or_create_histogram("search_geo_candidates"),
            geo_cap_hits: METRICS.get_or_create_counter("search_geo_candidate_cap_hits_total"),
            ratings_written: METRICS.get_or_create_counter("ratings_written_total"),
        }
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn metrics_handler() -> String {
    METRICS.export_metrics()
}

pub async fn metrics_json_handler() -> axum::Json<serde_json::Value> {
    axum::Json(METRICS.export_metrics_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_and_histogram_export() {
        let registry = MetricsRegistry::new();
        let b = registry.get_or_create_counter("b_total");
        b.inc();
        b.inc();
        b.inc();
        registry.get_or_create_counter("a_total").inc();
        let h = registry.get_or_create_histogram("latency_ms");
        h.observe(0.25);
        h.observe(0.5);

        let text = registry.export_metrics();
        let a = text.find("a_total 1").unwrap();
        let b = text.find("b_total 3").unwrap();
        assert!(a < b, "series are exported in name order");
        assert!(text.contains("latency_ms_count 2"));
        assert!(text.contains("latency_ms_sum 0.75"));
    }

    #[test]
    fn json_export_carries_counters_and_histograms() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_counter("ratings_written_total").inc();
        registry.get_or_create_histogram("search_geo_candidates").observe(2.5);

        let json = registry.export_metrics_json();
        assert_eq!(json["counters"]["ratings_written_total"], json!(1));
        assert_eq!(json["histograms"]["search_geo_candidates"]["sum"], json!(2.5));
    }
}
