use crate::config::QuerySettings;
use crate::metrics::stats::LatencyStats;
use crate::record::decode_line;
use crate::service::{Connector, QueryRequest, SearchService};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct QueryRunnerConfig {
    pub endpoint: String,
    /// Request handler path the queries are sent to.
    pub component: String,
    pub workers: usize,
    pub settings: QuerySettings,
}

/// What one worker did with its partition.
#[derive(Clone)]
pub struct WorkerResult {
    pub worker: usize,
    pub stats: LatencyStats,
    pub assigned: usize,
    /// Queries left unrun after a failure stopped the worker.
    pub remaining: usize,
}

impl WorkerResult {
    pub fn completed(&self) -> u64 {
        self.stats.count()
    }
}

pub struct RunSummary {
    pub workers: Vec<WorkerResult>,
    /// Queries no partition covered.
    pub unassigned: usize,
    pub total: LatencyStats,
}

impl RunSummary {
    fn from_workers(workers: Vec<WorkerResult>, unassigned: usize) -> Self {
        let mut total = LatencyStats::new();
        for w in &workers {
            total.merge(&w.stats);
        }
        Self { workers, unassigned, total }
    }

    pub fn completed(&self) -> u64 {
        self.total.count()
    }

    /// `sum(worker elapsed) / sum(worker completed)` in milliseconds.
    pub fn average_ms(&self) -> f64 {
        self.total.average_ms()
    }
}

/// One query per line, kept verbatim. Undecodable bytes become U+FFFD.
pub async fn load_queries(path: &Path) -> Result<Vec<String>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read query file {}", path.display()))?;
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let body = bytes.strip_suffix(b"\n").unwrap_or(&bytes);
    Ok(body
        .split(|b| *b == b'\n')
        .map(|line| decode_line(line).into_owned())
        .collect())
}

/// Contiguous, equal-size ranges of `len / workers` items each, in order.
/// The `len % workers` tail is left out.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    if workers == 0 {
        return Vec::new();
    }
    let per = len / workers;
    (0..workers).map(|i| i * per..(i + 1) * per).collect()
}

/// Replay `queries` over `config.workers` independent connections and aggregate latency.
///
/// With a single worker everything runs on the calling task. Otherwise every
/// connection is opened before any worker starts, so a bad endpoint fails the
/// run before a single query is sent.
pub async fn run_query_runner(
    config: &QueryRunnerConfig,
    queries: Vec<String>,
    connector: &dyn Connector,
) -> Result<RunSummary> {
    anyhow::ensure!(config.workers >= 1, "worker count must be at least 1");
    info!(
        endpoint = %config.endpoint,
        path = %config.component,
        queries = queries.len(),
        workers = config.workers,
        "Starting query runner"
    );
    let queries: Arc<[String]> = queries.into();

    if config.workers == 1 {
        let service = connector.connect().await.context("connect")?;
        let result = run_worker(
            1,
            queries.clone(),
            0..queries.len(),
            service,
            config.component.clone(),
            config.settings.clone(),
        )
        .await;
        let summary = RunSummary::from_workers(vec![result], 0);
        log_summary(1, &summary);
        return Ok(summary);
    }

    let ranges = partition(queries.len(), config.workers);
    let assigned: usize = ranges.iter().map(|r| r.len()).sum();
    let unassigned = queries.len() - assigned;
    if unassigned > 0 {
        warn!(
            "{} of {} queries not assigned to any worker ({} per worker)",
            unassigned,
            queries.len(),
            assigned / config.workers
        );
    }

    let mut services = Vec::with_capacity(ranges.len());
    for _ in &ranges {
        services.push(connector.connect().await.context("connect")?);
    }

    let mut handles = Vec::with_capacity(ranges.len());
    for (i, (range, service)) in ranges.into_iter().zip(services).enumerate() {
        let queries = queries.clone();
        let path = config.component.clone();
        let settings = config.settings.clone();
        handles.push(tokio::spawn(async move {
            run_worker(i + 1, queries, range, service, path, settings).await
        }));
    }

    // Join barrier: nothing is aggregated until every worker has finished.
    let mut results = Vec::with_capacity(handles.len());
    for joined in join_all(handles).await {
        results.push(joined.context("query worker panicked")?);
    }

    let summary = RunSummary::from_workers(results, unassigned);
    log_summary(config.workers, &summary);
    Ok(summary)
}

/// Run one partition in order. The first failing query ends the worker.
pub async fn run_worker(
    worker: usize,
    queries: Arc<[String]>,
    range: Range<usize>,
    service: Box<dyn SearchService>,
    path: String,
    settings: QuerySettings,
) -> WorkerResult {
    let assigned = range.len();
    let mut stats = LatencyStats::new();
    let mut remaining = 0;

    for (done, q) in queries[range].iter().enumerate() {
        let request = QueryRequest {
            path: path.clone(),
            q: q.clone(),
            fields: settings.fields.clone(),
        };
        let start = Instant::now();
        match service.query(&request).await {
            Ok(_) => {
                stats.record(start.elapsed());
                if settings.log_every > 0 && stats.count() % settings.log_every == 0 {
                    info!("worker-{} nq: {} avg: {:.2}", worker, stats.count(), stats.average_ms());
                }
            }
            Err(e) => {
                error!(error = %e, "worker-{} error running query", worker);
                remaining = assigned - done;
                break;
            }
        }
    }

    info!("worker-{} nq: {} avg: {:.2}", worker, stats.count(), stats.average_ms());
    WorkerResult { worker, stats, assigned, remaining }
}

fn log_summary(workers: usize, summary: &RunSummary) {
    info!(
        "Over {} workers: {} queries avg time: {:.2}ms",
        workers,
        summary.completed(),
        summary.average_ms()
    );
}
