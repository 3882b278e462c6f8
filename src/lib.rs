//! Bulk fingerprint loader and concurrent query-replay benchmark for a remote search service.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod record;
pub mod roles;
pub mod service;
