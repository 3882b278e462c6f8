use crate::config::IngestSettings;
use crate::record::{Batch, IngestRecord, decode_line};
use crate::service::SearchService;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

pub struct IngestConfig {
    pub endpoint: String,
    pub files: Vec<PathBuf>,
    pub settings: IngestSettings,
}

/// Per-file outcome. `records_added` counts records handed to the service,
/// including those in batches the service rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub records_added: u64,
    pub lines_skipped: u64,
    pub batches_submitted: u64,
    pub batches_failed: u64,
    pub elapsed: Duration,
}

impl IngestReport {
    /// Records per second since the start of the file; zero before any time has passed.
    pub fn throughput(&self) -> f64 {
        rate(self.records_added, self.elapsed)
    }
}

fn rate(added: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { added as f64 / secs } else { 0.0 }
}

/// Load every file in order over one connection. I/O errors abort the run;
/// malformed lines and rejected batches do not.
pub async fn run_ingest(config: &IngestConfig, service: &dyn SearchService) -> Result<Vec<IngestReport>> {
    info!(
        endpoint = %config.endpoint,
        files = config.files.len(),
        batch_size = config.settings.batch_size,
        "Starting ingest"
    );
    let mut reports = Vec::with_capacity(config.files.len());
    for (i, path) in config.files.iter().enumerate() {
        info!("{}/{} {}", i + 1, config.files.len(), path.display());
        reports.push(ingest_file(path, service, &config.settings).await?);
    }
    if config.settings.commit {
        match service.commit().await {
            Ok(()) => info!("Committed"),
            Err(e) => error!(error = %e, "Error committing docs"),
        }
    }
    Ok(reports)
}

pub async fn ingest_file(
    path: &Path,
    service: &dyn SearchService,
    settings: &IngestSettings,
) -> Result<IngestReport> {
    let file = File::open(path)
        .await
        .with_context(|| format!("open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let start = Instant::now();
    let mut report = IngestReport::default();
    let mut batch = Batch::new(settings.batch_size);
    let mut line_no = 0u64;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .await
            .with_context(|| format!("read {} after line {}", path.display(), line_no))?;
        if n == 0 {
            break;
        }
        line_no += 1;
        let line = decode_line(&buf);
        let Some(record) = IngestRecord::parse(&line, settings.separator) else {
            warn!("Weird line at {} of file {}", line_no, path.display());
            report.lines_skipped += 1;
            continue;
        };
        batch.push(record);
        report.records_added += 1;
        if batch.is_full() {
            let elapsed = start.elapsed();
            if flush(&mut batch, service, settings, &mut report).await {
                info!(
                    "Added {} docs in {}ms {:.2} docs/s",
                    report.records_added,
                    elapsed.as_millis(),
                    rate(report.records_added, elapsed)
                );
            }
        }
    }
    if !batch.is_empty() {
        flush(&mut batch, service, settings, &mut report).await;
    }

    report.elapsed = start.elapsed();
    info!(
        "Finished {}: {} docs, {} skipped lines, {} batches ({} failed) in {}ms",
        path.display(),
        report.records_added,
        report.lines_skipped,
        report.batches_submitted,
        report.batches_failed,
        report.elapsed.as_millis()
    );
    Ok(report)
}

/// Submit and clear the batch. Returns whether the service accepted it.
async fn flush(
    batch: &mut Batch,
    service: &dyn SearchService,
    settings: &IngestSettings,
    report: &mut IngestReport,
) -> bool {
    let docs = batch.to_documents(&settings.key_field, &settings.payload_field);
    batch.clear();
    report.batches_submitted += 1;
    match service.add(&docs).await {
        Ok(()) => true,
        Err(e) => {
            report.batches_failed += 1;
            error!(error = %e, docs = docs.len(), "Error indexing docs");
            false
        }
    }
}
