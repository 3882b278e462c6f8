//! Solr adapter (feature `service-solr`), speaking the JSON update and select APIs over reqwest.
use crate::service::{ConnectOptions, Document, QueryRequest, QueryResponse, SearchService, ServiceError};
use reqwest::{Client, Url};
use std::time::Duration;

#[derive(Clone)]
pub struct SolrService {
    client: Client,
    base: String,
}

pub async fn connect(opts: ConnectOptions) -> Result<Box<dyn SearchService>, ServiceError> {
    let endpoint = opts
        .params
        .get("endpoint")
        .ok_or_else(|| ServiceError::Connect("missing endpoint".into()))?;
    let base = validate_base(endpoint)?;

    let mut builder = Client::builder();
    // No request timeout unless asked for; a hung request blocks its caller.
    if let Some(ms) = opts.params.get("timeout_ms").and_then(|s| s.parse::<u64>().ok()) {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    let client = builder
        .build()
        .map_err(|e| ServiceError::Connect(e.to_string()))?;
    Ok(Box::new(SolrService { client, base }))
}

fn validate_base(endpoint: &str) -> Result<String, ServiceError> {
    let url = Url::parse(endpoint).map_err(|e| ServiceError::Connect(format!("{}: {}", endpoint, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ServiceError::Connect(format!("{}: unsupported scheme '{}'", endpoint, other)));
        }
    }
    if url.host_str().is_none() {
        return Err(ServiceError::Connect(format!("{}: missing host", endpoint)));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

fn join_path(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

fn decode_response(body: &serde_json::Value) -> QueryResponse {
    QueryResponse {
        num_found: body.pointer("/response/numFound").and_then(|v| v.as_u64()),
        qtime_ms: body.pointer("/responseHeader/QTime").and_then(|v| v.as_u64()),
    }
}

#[async_trait::async_trait]
impl SearchService for SolrService {
    async fn add(&self, docs: &[Document]) -> Result<(), ServiceError> {
        self.client
            .post(join_path(&self.base, "/update"))
            .query(&[("wt", "json")])
            .json(docs)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::Add(e.to_string()))?;
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ServiceError> {
        let resp = self
            .client
            .get(join_path(&self.base, &request.path))
            .query(&[
                ("q", request.q.as_str()),
                ("fl", request.fields.as_str()),
                ("wt", "json"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::Query(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        Ok(decode_response(&body))
    }

    async fn commit(&self) -> Result<(), ServiceError> {
        self.client
            .post(join_path(&self.base, "/update"))
            .query(&[("commit", "true"), ("wt", "json")])
            .json(&serde_json::json!({ "commit": {} }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::Commit(e.to_string()))?;
        Ok(())
    }
}
