pub mod ingest;
pub mod query_runner;
