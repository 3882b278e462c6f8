#![cfg(feature = "service-mock")]
use hashr_bench::service::mock::MockService;
use hashr_bench::service::{ConnectOptions, Connector, Document, Engine, QueryRequest, ServiceBuilder};

#[tokio::test]
async fn add_and_query_mock_smoke() {
    let t = ServiceBuilder::connect(Engine::Mock, ConnectOptions::with_endpoint("mock://"))
        .await
        .expect("connect");
    let mut doc = Document::new();
    doc.add_field("track_id", "T1");
    t.add(&[doc]).await.expect("add");
    let resp = t
        .query(&QueryRequest { path: "/select".into(), q: "fp:1".into(), fields: "*,score".into() })
        .await
        .expect("query");
    assert_eq!(resp.num_found, Some(0));
    t.commit().await.expect("commit");
}

#[tokio::test]
async fn connections_share_recordings() {
    let mock = MockService::new().fail_query("bad");
    let a = mock.connect().await.expect("connect a");
    let b = mock.connect().await.expect("connect b");
    let req = |q: &str| QueryRequest { path: "/select".into(), q: q.into(), fields: "*".into() };

    a.query(&req("one")).await.expect("one");
    assert!(b.query(&req("bad")).await.is_err());

    assert_eq!(mock.connections(), 2);
    assert_eq!(mock.queries().await, vec![(1, "one".to_string()), (2, "bad".to_string())]);
}
