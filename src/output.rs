use crate::metrics::stats::StatsSnapshot;
use crate::roles::query_runner::RunSummary;
use anyhow::Result;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

pub enum OutputWriter {
    Csv(BufWriter<tokio::fs::File>),
    Stdout,
}

impl OutputWriter {
    pub async fn new_csv(path: String) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = std::path::Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.ok();
            }
        }
        let file = File::create(&path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(csv_header().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        tracing::info!("Writing CSV summary to: {}", path);
        Ok(Self::Csv(writer))
    }

    pub fn new_stdout() -> Self {
        println!("{}", csv_header());
        Self::Stdout
    }

    /// One row per worker followed by an `all` row with the merged totals.
    pub async fn write_summary(&mut self, run_id: &str, summary: &RunSummary) -> Result<()> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let mut rows = Vec::with_capacity(summary.workers.len() + 1);
        for w in &summary.workers {
            rows.push(summary_row(
                &timestamp,
                run_id,
                &w.worker.to_string(),
                w.assigned,
                w.remaining,
                &w.stats.snapshot(),
            ));
        }
        let assigned: usize = summary.workers.iter().map(|w| w.assigned).sum();
        let remaining: usize = summary.workers.iter().map(|w| w.remaining).sum();
        rows.push(summary_row(
            &timestamp,
            run_id,
            "all",
            assigned,
            remaining,
            &summary.total.snapshot(),
        ));

        match self {
            Self::Csv(writer) => {
                for row in rows {
                    writer.write_all(row.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                }
                writer.flush().await?;
            }
            Self::Stdout => {
                for row in rows {
                    println!("{}", row);
                }
            }
        }
        Ok(())
    }
}

fn csv_header() -> String {
    format!("timestamp,run_id,worker,assigned,remaining,{}", StatsSnapshot::csv_header())
}

fn summary_row(
    timestamp: &str,
    run_id: &str,
    worker: &str,
    assigned: usize,
    remaining: usize,
    snap: &StatsSnapshot,
) -> String {
    format!(
        "{},{},{},{},{},{}",
        timestamp,
        run_id,
        worker,
        assigned,
        remaining,
        snap.to_csv_fields()
    )
}
