//! Search service abstraction: trait, request/response types, and builder factory.

pub mod config;
#[cfg(any(test, feature = "service-mock"))]
pub mod mock;
#[cfg(feature = "service-solr")]
pub mod solr;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Engine {
    Solr,
    #[cfg(any(test, feature = "service-mock"))]
    Mock,
}

#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    pub params: BTreeMap<String, String>,
}

impl ConnectOptions {
    pub fn with_endpoint(endpoint: &str) -> Self {
        let mut opts = Self::default();
        opts.params.insert("endpoint".into(), endpoint.to_string());
        opts
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("connect: {0}")]
    Connect(String),
    #[error("add: {0}")]
    Add(String),
    #[error("query: {0}")]
    Query(String),
    #[error("commit: {0}")]
    Commit(String),
    #[error("decode: {0}")]
    Decode(String),
}

/// A flat document as submitted to the index: field name to value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    /// Request handler path on the service, e.g. `/select`.
    pub path: String,
    pub q: String,
    /// Field list; `*,score` asks for every stored field plus relevance.
    pub fields: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryResponse {
    pub num_found: Option<u64>,
    pub qtime_ms: Option<u64>,
}

#[async_trait::async_trait]
pub trait SearchService: Send + Sync {
    async fn add(&self, docs: &[Document]) -> Result<(), ServiceError>;
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ServiceError>;
    async fn commit(&self) -> Result<(), ServiceError>;
}

/// Opens independent connections; query workers each take one of their own.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn SearchService>, ServiceError>;
}

pub struct ServiceBuilder {
    engine: Engine,
    opts: ConnectOptions,
}

impl ServiceBuilder {
    pub fn new(engine: Engine, opts: ConnectOptions) -> Self {
        Self { engine, opts }
    }

    pub async fn connect(
        engine: Engine,
        opts: ConnectOptions,
    ) -> Result<Box<dyn SearchService>, ServiceError> {
        match engine {
            Engine::Solr => {
                #[cfg(feature = "service-solr")]
                {
                    return crate::service::solr::connect(opts).await;
                }
                #[cfg(not(feature = "service-solr"))]
                {
                    let _ = opts;
                    Err(ServiceError::Connect("solr feature disabled".into()))
                }
            }
            #[cfg(any(test, feature = "service-mock"))]
            Engine::Mock => {
                return crate::service::mock::connect(opts).await;
            }
        }
    }
}

#[async_trait::async_trait]
impl Connector for ServiceBuilder {
    async fn connect(&self) -> Result<Box<dyn SearchService>, ServiceError> {
        ServiceBuilder::connect(self.engine.clone(), self.opts.clone()).await
    }
}
