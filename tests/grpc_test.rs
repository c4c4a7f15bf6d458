use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tonic::Code;

use grpc_discovery::config::Config;
use grpc_discovery::discovery::dns_client::DnsClient;
use grpc_discovery::discovery::{GetRequest, PostRequest};
use grpc_discovery::server::{build_registry, serve_grpc};
use grpc_discovery::services::registry::CounterObserver;
use grpc_discovery::storage::StorageFactory;

fn post(service_name: &str, operation: &str, host: &str) -> PostRequest {
    PostRequest {
        service_name: service_name.to_string(),
        operation: operation.to_string(),
        host: host.to_string(),
    }
}

#[tokio::test]
async fn test_grpc_round_trip() {
    let shutdown = CancellationToken::new();
    let registry = build_registry(
        &Config::default(),
        &StorageFactory::with_defaults(),
        Arc::new(CounterObserver::new()),
        shutdown.clone(),
    )
    .await
    .expect("memory registry should build");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_grpc(
        listener,
        registry,
        Duration::from_secs(1),
        shutdown.clone(),
    ));

    let mut client = DnsClient::connect(format!("http://{addr}"))
        .await
        .expect("Failed to connect to gRPC server");

    client.post_service(post("svc", "add", "192.0.0.1:8081")).await.unwrap();
    client.post_service(post("svc", "add", "192.0.0.2:8081")).await.unwrap();

    let hosts = client
        .get_service(GetRequest {
            service_name: "svc".to_string(),
        })
        .await
        .unwrap()
        .into_inner()
        .hosts;
    assert_eq!(hosts, vec!["192.0.0.1:8081", "192.0.0.2:8081"]);

    let status = client
        .post_service(post("svc", "add", "192.0.0.1:8081"))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::AlreadyExists);

    let status = client
        .post_service(post("missing-svc", "delete", "x"))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    shutdown.cancel();
    server.await.unwrap().unwrap();
}
