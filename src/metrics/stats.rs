use hdrhistogram::Histogram;
use std::time::Duration;

/// Latency collector owned by a single worker; merged by the coordinator after join.
#[derive(Clone)]
pub struct LatencyStats {
    // Nanosecond precision
    latency_hist: Histogram<u64>,
    total_elapsed: Duration,
    count: u64,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            // 1ns to 60s range, 3 significant digits; longer samples saturate
            latency_hist: Histogram::new_with_bounds(1, 60_000_000_000, 3)
                .expect("static histogram bounds are valid"),
            total_elapsed: Duration::ZERO,
            count: 0,
        }
    }

    /// Record one completed request.
    pub fn record(&mut self, elapsed: Duration) {
        self.total_elapsed += elapsed;
        self.count += 1;
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.latency_hist.saturating_record(ns.max(1));
    }

    /// Fold another collector into this one.
    pub fn merge(&mut self, other: &LatencyStats) {
        self.total_elapsed += other.total_elapsed;
        self.count += other.count;
        // Same bounds on both sides, so `add` cannot fail.
        let _ = self.latency_hist.add(&other.latency_hist);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }

    pub fn total_elapsed_ms(&self) -> u64 {
        u64::try_from(self.total_elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// `total elapsed / count` in milliseconds; zero when nothing completed.
    pub fn average_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_elapsed.as_secs_f64() * 1000.0 / self.count as f64
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let hist = &self.latency_hist;
        let empty = hist.len() == 0;
        let q = |quantile: f64| if empty { 0 } else { hist.value_at_quantile(quantile) };
        StatsSnapshot {
            count: self.count,
            total_elapsed_ms: self.total_elapsed_ms(),
            avg_ms: self.average_ms(),
            latency_ns_p50: q(0.5),
            latency_ns_p95: q(0.95),
            latency_ns_p99: q(0.99),
            latency_ns_min: if empty { 0 } else { hist.min() },
            latency_ns_max: if empty { 0 } else { hist.max() },
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub count: u64,
    pub total_elapsed_ms: u64,
    pub avg_ms: f64,
    pub latency_ns_p50: u64,
    pub latency_ns_p95: u64,
    pub latency_ns_p99: u64,
    pub latency_ns_min: u64,
    pub latency_ns_max: u64,
}

impl StatsSnapshot {
    /// Convert to CSV columns (no leading/trailing separator)
    pub fn to_csv_fields(&self) -> String {
        format!(
            "{},{},{:.2},{:.3},{:.3},{:.3},{:.3},{:.3}",
            self.count,
            self.total_elapsed_ms,
            self.avg_ms,
            ns_to_ms(self.latency_ns_p50),
            ns_to_ms(self.latency_ns_p95),
            ns_to_ms(self.latency_ns_p99),
            ns_to_ms(self.latency_ns_min),
            ns_to_ms(self.latency_ns_max),
        )
    }

    pub fn csv_header() -> &'static str {
        "completed,total_ms,avg_ms,p50_ms,p95_ms,p99_ms,min_ms,max_ms"
    }
}

fn ns_to_ms(ns: u64) -> f64 {
    ns as f64 / 1_000_000.0
}
