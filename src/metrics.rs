//! Request metrics for the prediction endpoints.

use crate::error::FailureClass;
use crate::types::Domain;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept per domain before the oldest half is dropped.
const LATENCY_WINDOW: usize = 10_000;

#[derive(Default)]
struct DomainCounters {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    /// Latencies of completed pipeline runs (in microseconds)
    latencies: RwLock<Vec<u64>>,
}

/// Metrics collector shared by every request handler
pub struct GatewayMetrics {
    domains: [DomainCounters; 3],
    failures_by_class: RwLock<HashMap<FailureClass, u64>>,
    /// Anomaly verdicts that were flagged for review
    flagged_anomalies: AtomicU64,
    /// Sentinel verdicts (unknown risk tier or segment)
    unrecognized_outputs: AtomicU64,
    start_time: Instant,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self {
            domains: Default::default(),
            failures_by_class: RwLock::new(HashMap::new()),
            flagged_anomalies: AtomicU64::new(0),
            unrecognized_outputs: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    fn counters(&self, domain: Domain) -> &DomainCounters {
        &self.domains[domain.index()]
    }

    /// Record a prediction that produced a verdict
    pub fn record_success(&self, domain: Domain, latency: Duration) {
        let counters = self.counters(domain);
        counters.requests.fetch_add(1, Ordering::Relaxed);
        counters.successes.fetch_add(1, Ordering::Relaxed);
        self.record_latency(counters, latency);
    }

    /// Record a request that failed, before or inside the pipeline
    pub fn record_failure(&self, domain: Domain, class: FailureClass) {
        let counters = self.counters(domain);
        counters.requests.fetch_add(1, Ordering::Relaxed);
        counters.failures.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_class) = self.failures_by_class.write() {
            *by_class.entry(class).or_insert(0) += 1;
        }
    }

    pub fn record_flagged(&self) {
        self.flagged_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unrecognized(&self) {
        self.unrecognized_outputs.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, counters: &DomainCounters, latency: Duration) {
        if let Ok(mut times) = counters.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > LATENCY_WINDOW {
                times.drain(0..LATENCY_WINDOW / 2);
            }
        }
    }

    /// Latency percentiles for one domain
    pub fn latency_stats(&self, domain: Domain) -> LatencyStats {
        let Ok(times) = self.counters(domain).latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let domains = Domain::ALL
            .iter()
            .map(|&domain| {
                let counters = self.counters(domain);
                DomainStats {
                    domain,
                    requests: counters.requests.load(Ordering::Relaxed),
                    successes: counters.successes.load(Ordering::Relaxed),
                    failures: counters.failures.load(Ordering::Relaxed),
                    latency: self.latency_stats(domain),
                }
            })
            .collect();

        let failures_by_class = self
            .failures_by_class
            .read()
            .map(|by_class| {
                by_class
                    .iter()
                    .map(|(class, count)| (class.as_str().to_string(), *count))
                    .collect()
            })
            .unwrap_or_default();

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            domains,
            failures_by_class,
            flagged_anomalies: self.flagged_anomalies.load(Ordering::Relaxed),
            unrecognized_outputs: self.unrecognized_outputs.load(Ordering::Relaxed),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              PREDICTION GATEWAY - METRICS SUMMARY            ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        for stats in &snapshot.domains {
            info!(
                "║ {:<12} requests={:>7} ok={:>7} failed={:>6} p50={:>6}μs p99={:>6}μs",
                stats.domain.title(),
                stats.requests,
                stats.successes,
                stats.failures,
                stats.latency.p50_us,
                stats.latency.p99_us
            );
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        for (class, count) in &snapshot.failures_by_class {
            info!("║   {:<16}: {:>8}", class, count);
        }
        info!(
            "║ Flagged anomalies: {:>8}  │  Unrecognized outputs: {:>6}",
            snapshot.flagged_anomalies, snapshot.unrecognized_outputs
        );
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics (microseconds)
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainStats {
    pub domain: Domain,
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub latency: LatencyStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub domains: Vec<DomainStats>,
    pub failures_by_class: BTreeMap<String, u64>,
    pub flagged_anomalies: u64,
    pub unrecognized_outputs: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<GatewayMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<GatewayMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
