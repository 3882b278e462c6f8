//! In-memory service (feature `service-mock`). Records every call; selected add calls
//! and query texts can be scripted to fail.
use crate::service::{
    ConnectOptions, Connector, Document, QueryRequest, QueryResponse, SearchService, ServiceError,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct MockState {
    batches: Mutex<Vec<Vec<Document>>>,
    queries: Mutex<Vec<(usize, String)>>,
    add_calls: AtomicUsize,
    commits: AtomicUsize,
    connections: AtomicUsize,
    failing_adds: HashSet<usize>,
    failing_queries: HashSet<String>,
    latency: Option<Duration>,
}

/// Handle onto shared mock state. Clones observe the same recordings; each
/// connection handed out by [`Connector::connect`] gets its own id.
#[derive(Clone, Default)]
pub struct MockService {
    state: Arc<MockState>,
    conn: usize,
}

pub async fn connect(opts: ConnectOptions) -> Result<Box<dyn SearchService>, ServiceError> {
    let mut svc = MockService::new();
    if let Some(ms) = opts.params.get("latency_ms").and_then(|s| s.parse::<u64>().ok()) {
        svc = svc.with_latency(Duration::from_millis(ms));
    }
    Ok(Box::new(svc))
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    // Builder methods only apply before the first `connect`; later calls are ignored.
    fn configure(mut self, f: impl FnOnce(&mut MockState)) -> Self {
        match Arc::get_mut(&mut self.state) {
            Some(state) => f(state),
            None => debug_assert!(false, "mock configured after a connection was handed out"),
        }
        self
    }

    /// Fail the n-th add call (1-based, counted across all connections).
    pub fn fail_add_call(self, n: usize) -> Self {
        self.configure(|s| {
            s.failing_adds.insert(n);
        })
    }

    /// Fail every query whose text equals `q`.
    pub fn fail_query(self, q: &str) -> Self {
        self.configure(|s| {
            s.failing_queries.insert(q.to_string());
        })
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.configure(|s| s.latency = Some(latency))
    }

    /// Every batch that reached the service, successful or not, in call order.
    pub async fn batches(&self) -> Vec<Vec<Document>> {
        self.state.batches.lock().await.clone()
    }

    /// `(connection id, query text)` for every query issued, in arrival order.
    pub async fn queries(&self) -> Vec<(usize, String)> {
        self.state.queries.lock().await.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.commits.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(d) = self.state.latency {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait::async_trait]
impl SearchService for MockService {
    async fn add(&self, docs: &[Document]) -> Result<(), ServiceError> {
        self.simulate_latency().await;
        let call = self.state.add_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.batches.lock().await.push(docs.to_vec());
        if self.state.failing_adds.contains(&call) {
            return Err(ServiceError::Add(format!("scripted failure on add call {}", call)));
        }
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ServiceError> {
        self.simulate_latency().await;
        self.state.queries.lock().await.push((self.conn, request.q.clone()));
        if self.state.failing_queries.contains(&request.q) {
            return Err(ServiceError::Query(format!("scripted failure for '{}'", request.q)));
        }
        Ok(QueryResponse { num_found: Some(0), qtime_ms: Some(0) })
    }

    async fn commit(&self) -> Result<(), ServiceError> {
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Connector for MockService {
    async fn connect(&self) -> Result<Box<dyn SearchService>, ServiceError> {
        let conn = self.state.connections.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockService { state: self.state.clone(), conn }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[cfg_attr(debug_assertions, should_panic(expected = "mock configured after a connection was handed out"))]
    async fn late_configuration_is_ignored() {
        let mock = MockService::new();
        let conn = mock.connect().await.unwrap();
        let _late = mock.clone().fail_query("late");
        let req = QueryRequest { path: "/select".into(), q: "late".into(), fields: "*".into() };
        assert!(conn.query(&req).await.is_ok());
    }
}
