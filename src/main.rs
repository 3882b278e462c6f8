use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hashr_bench::config::BenchConfig;
use hashr_bench::logging;
use hashr_bench::output::OutputWriter;
use hashr_bench::roles::ingest::{IngestConfig, run_ingest};
use hashr_bench::roles::query_runner::{QueryRunnerConfig, load_queries, run_query_runner};
use hashr_bench::service::ServiceBuilder;
use hashr_bench::service::config::{parse_connect_kv, parse_engine};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hashr-bench")]
#[command(about = "Fingerprint bulk loader and query-replay benchmark for a search service")]
struct Cli {
    /// Run ID for tagging outputs
    #[arg(long, default_value = "")]
    run_id: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Optional YAML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service engine (solr/mock); overrides the settings file
    #[arg(long)]
    engine: Option<String>,

    /// Extra connect options as key=value (e.g. timeout_ms=5000)
    #[arg(long = "connect")]
    connect: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index `<key> <fingerprint>` lines in fixed-size batches
    Ingest {
        /// Service URL, e.g. http://localhost:8983/solr/fp
        url: Option<String>,

        /// Input files, processed in order
        files: Vec<PathBuf>,

        /// Records per bulk-add call
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        batch_size: Option<u64>,

        /// Commit once after all files are loaded
        #[arg(long)]
        commit: bool,
    },
    /// Replay a query file from concurrent workers and report latency
    QueryRunner {
        /// Service URL
        url: Option<String>,

        /// Request handler path, e.g. /select
        component: Option<String>,

        /// One query per line
        query_file: Option<PathBuf>,

        /// Number of concurrent workers
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        workers: Option<u32>,

        /// Optional CSV output file path (stdout if omitted)
        #[arg(long)]
        csv: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level)?;

    let mut bench = match &cli.config {
        Some(path) => BenchConfig::load(path)?,
        None => BenchConfig::default(),
    };
    if let Some(engine) = &cli.engine {
        bench.engine = engine.clone();
    }
    bench.connect.extend(cli.connect.iter().cloned());
    let engine = parse_engine(&bench.engine)
        .with_context(|| format!("unknown engine '{}'", bench.engine))?;

    let run_id = if cli.run_id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        cli.run_id.clone()
    };

    match cli.command {
        Commands::Ingest {
            url,
            files,
            batch_size,
            commit,
        } => {
            let Some(url) = url else {
                eprintln!("Usage: hashr-bench ingest <service URL> <dat file> <dat file>...");
                return Ok(());
            };
            let mut settings = bench.ingest.clone();
            if let Some(n) = batch_size {
                settings.batch_size = usize::try_from(n).context("batch size")?;
            }
            settings.commit |= commit;

            let opts = parse_connect_kv(&url, &bench.connect);
            let service = ServiceBuilder::connect(engine, opts)
                .await
                .with_context(|| format!("connect to {}", url))?;
            let config = IngestConfig {
                endpoint: url,
                files,
                settings,
            };
            run_ingest(&config, service.as_ref()).await?;
            Ok(())
        }
        Commands::QueryRunner {
            url,
            component,
            query_file,
            workers,
            csv,
        } => {
            const USAGE: &str =
                "Usage: hashr-bench query-runner <service URL> <component> <query file> <n workers>";
            let Some(url) = url else {
                eprintln!("{}", USAGE);
                return Ok(());
            };
            let (Some(component), Some(query_file), Some(workers)) = (component, query_file, workers)
            else {
                anyhow::bail!(USAGE);
            };

            let queries = load_queries(&query_file).await?;
            let mut output = if let Some(path) = csv {
                OutputWriter::new_csv(path).await?
            } else {
                OutputWriter::new_stdout()
            };
            let connector = ServiceBuilder::new(engine, parse_connect_kv(&url, &bench.connect));
            let config = QueryRunnerConfig {
                endpoint: url,
                component,
                workers: workers as usize,
                settings: bench.query.clone(),
            };
            let summary = run_query_runner(&config, queries, &connector).await?;
            output.write_summary(&run_id, &summary).await?;
            Ok(())
        }
    }
}
