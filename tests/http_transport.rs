#![cfg(feature = "server")]

use std::net::SocketAddr;
use std::sync::Arc;

use hybrid_pir::math::GaussianSampler;
use hybrid_pir::server::{demo_database, http, HybridPirServer};
use hybrid_pir::{DispatchConfig, HttpTransport, HybridPirClient, HybridPirError, RetrievalParams, Target};
use tokio::net::TcpListener;

fn test_params() -> RetrievalParams {
    RetrievalParams {
        db_size: 4096 * 16,
        element_size: 16,
        raidpir_redundancy: 2,
        raidpir_size: 16,
        sealpir_degree: 1024,
        sealpir_log: 12,
        sealpir_d: 2,
    }
}

async fn spawn_replica(db: Vec<u8>, replica: usize, servers: usize) -> SocketAddr {
    let server = HybridPirServer::new(db, replica, servers, test_params()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, http::router(Arc::new(server))).await.unwrap();
    });
    addr
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retrieve_over_http() {
    let params = test_params();
    let db = demo_database(params.element_count(), params.element_size, 7);

    let mut targets = Vec::new();
    for replica in 0..2 {
        let addr = spawn_replica(db.clone(), replica, 2).await;
        targets.push(Target::new(addr.to_string(), replica));
    }

    let client = HybridPirClient::new(params.clone(), targets, GaussianSampler::with_seed(3.2, 9)).unwrap();
    let transport = Arc::new(HttpTransport::new());
    for index in [0, 2048, 4095] {
        let got = client
            .retrieve(&transport, index, &DispatchConfig::default())
            .await
            .unwrap();
        assert_eq!(got.bytes, &db[index * 16..(index + 1) * 16]);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_endpoint() {
    let params = test_params();
    let db = demo_database(params.element_count(), params.element_size, 7);
    let addr = spawn_replica(db, 1, 2).await;

    let body = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let health: http::HealthResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.replica, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_replica() {
    let params = test_params();
    let db = demo_database(params.element_count(), params.element_size, 7);
    let live = spawn_replica(db, 0, 2).await;

    // bound then dropped, so nothing listens there
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

    let targets = vec![Target::new(live.to_string(), 0), Target::new(dead.to_string(), 1)];
    let client = HybridPirClient::new(params, targets, GaussianSampler::with_seed(3.2, 9)).unwrap();
    let err = client
        .retrieve(&Arc::new(HttpTransport::new()), 5, &DispatchConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HybridPirError::Quorum { required: 2, received: 1 }));
}
