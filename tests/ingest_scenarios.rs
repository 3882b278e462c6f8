#![cfg(feature = "service-mock")]
use hashr_bench::config::IngestSettings;
use hashr_bench::roles::ingest::{IngestConfig, ingest_file, run_ingest};
use hashr_bench::service::mock::MockService;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    // Thread-local default; #[tokio::test] polls on the current thread.
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

fn fp_file(lines: &[String]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    for l in lines {
        writeln!(f, "{}", l).unwrap();
    }
    f
}

fn well_formed(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("TR{:05} {} {} {}", i, i * 3, i * 3 + 1, i * 3 + 2)).collect()
}

async fn batch_sizes(mock: &MockService) -> Vec<usize> {
    mock.batches().await.iter().map(Vec::len).collect()
}

#[tokio::test]
async fn six_hundred_fifty_records_make_three_batches() {
    let file = fp_file(&well_formed(650));
    let mock = MockService::new();

    let report = ingest_file(file.path(), &mock, &IngestSettings::default()).await.unwrap();

    assert_eq!(batch_sizes(&mock).await, vec![300, 300, 50]);
    assert_eq!(report.records_added, 650);
    assert_eq!(report.batches_submitted, 3);
    assert_eq!(report.batches_failed, 0);
    assert_eq!(mock.commits(), 0);
}

#[tokio::test]
async fn exact_multiple_has_no_trailing_batch() {
    let file = fp_file(&well_formed(600));
    let mock = MockService::new();
    ingest_file(file.path(), &mock, &IngestSettings::default()).await.unwrap();
    assert_eq!(batch_sizes(&mock).await, vec![300, 300]);
}

#[tokio::test]
async fn empty_file_submits_nothing() {
    let file = fp_file(&[]);
    let mock = MockService::new();
    let report = ingest_file(file.path(), &mock, &IngestSettings::default()).await.unwrap();
    assert!(mock.batches().await.is_empty());
    assert_eq!(report.batches_submitted, 0);
}

#[tokio::test]
async fn malformed_line_is_skipped() {
    let mut lines = vec!["no-separator-here".to_string()];
    lines.extend(well_formed(2));
    let file = fp_file(&lines);
    let mock = MockService::new();
    let (logs, _guard) = capture_logs();

    let report = ingest_file(file.path(), &mock, &IngestSettings::default()).await.unwrap();

    let expected = format!("Weird line at 1 of file {}", file.path().display());
    assert_eq!(logs.text().matches("Weird line at").count(), 1);
    assert!(logs.text().contains(&expected));
    assert_eq!(report.lines_skipped, 1);
    assert_eq!(report.records_added, 2);
    let batches = mock.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0][0].get("track_id"), Some("TR00000"));
    assert_eq!(batches[0][0].get("fp"), Some("0 1 2"));
    assert!(batches[0].iter().all(|d| d.get("track_id") != Some("no-separator-here")));
}

#[tokio::test]
async fn failed_batch_is_dropped_and_loading_continues() {
    let file = fp_file(&well_formed(7));
    let mock = MockService::new().fail_add_call(2);
    let settings = IngestSettings { batch_size: 3, ..IngestSettings::default() };

    let report = ingest_file(file.path(), &mock, &settings).await.unwrap();

    // Three add calls, no retry of the rejected second one.
    assert_eq!(batch_sizes(&mock).await, vec![3, 3, 1]);
    assert_eq!(report.batches_failed, 1);
    assert_eq!(report.records_added, 7);
}

#[tokio::test]
async fn files_load_in_order_and_commit_once() {
    let first = fp_file(&["A 1".to_string(), "B 2".to_string()]);
    let second = fp_file(&["C 3".to_string()]);
    let mock = MockService::new();
    let config = IngestConfig {
        endpoint: "mock://".into(),
        files: vec![first.path().to_path_buf(), second.path().to_path_buf()],
        settings: IngestSettings { commit: true, ..IngestSettings::default() },
    };

    let reports = run_ingest(&config, &mock).await.unwrap();

    assert_eq!(reports.len(), 2);
    let keys: Vec<Vec<String>> = mock
        .batches()
        .await
        .iter()
        .map(|b| b.iter().map(|d| d.get("track_id").unwrap_or_default().to_string()).collect())
        .collect();
    assert_eq!(keys, vec![vec!["A".to_string(), "B".to_string()], vec!["C".to_string()]]);
    assert_eq!(mock.commits(), 1);
}

#[tokio::test]
async fn missing_file_aborts_the_run() {
    let good = fp_file(&well_formed(1));
    let mock = MockService::new();
    let config = IngestConfig {
        endpoint: "mock://".into(),
        files: vec![PathBuf::from("/nonexistent/fp.dat"), good.path().to_path_buf()],
        settings: IngestSettings::default(),
    };

    let err = run_ingest(&config, &mock).await.unwrap_err();

    assert!(format!("{:#}", err).contains("/nonexistent/fp.dat"));
    assert!(mock.batches().await.is_empty());
}

#[tokio::test]
async fn repeated_runs_partition_identically() {
    let mut lines = well_formed(410);
    lines.insert(17, "broken".to_string());
    let file = fp_file(&lines);
    let settings = IngestSettings { batch_size: 100, ..IngestSettings::default() };

    let first = MockService::new();
    let second = MockService::new();
    ingest_file(file.path(), &first, &settings).await.unwrap();
    ingest_file(file.path(), &second, &settings).await.unwrap();

    assert_eq!(first.batches().await, second.batches().await);
    assert_eq!(batch_sizes(&first).await, vec![100, 100, 100, 100, 10]);
}

#[tokio::test]
async fn undecodable_bytes_do_not_abort_the_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"A 1\nB \xff 2\r\nC 3\n").unwrap();
    let mock = MockService::new();

    let report = ingest_file(file.path(), &mock, &IngestSettings::default()).await.unwrap();

    assert_eq!(report.records_added, 3);
    assert_eq!(report.lines_skipped, 0);
    let batches = mock.batches().await;
    assert_eq!(batches.len(), 1);
    let keys: Vec<&str> = batches[0].iter().filter_map(|d| d.get("track_id")).collect();
    assert_eq!(keys, vec!["A", "B", "C"]);
    assert_eq!(batches[0][1].get("fp"), Some("\u{FFFD} 2"));
}
