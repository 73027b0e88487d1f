use super::{Client, Delivery};
use crate::broker::Broker;
use crate::config::{HeartbeatSettings, Settings};
use crate::connection::{ConnectionRegistry, Session, connect};
use crate::heartbeat::HeartbeatOutcome;
use crate::protocol::{self, no_messages_notice};
use crate::transport::serve;
use crate::utils::BrokerError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_server() -> (SocketAddr, Arc<Broker>, ConnectionRegistry) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let broker = Arc::new(Broker::new());
    let registry = ConnectionRegistry::new();
    tokio::spawn(serve(
        listener,
        broker.clone(),
        registry.clone(),
        HeartbeatSettings::default(),
    ));
    (addr, broker, registry)
}

fn delivery(topic: &str, message: &str) -> Delivery {
    Delivery {
        topic: topic.to_string(),
        message: message.to_string(),
    }
}

#[tokio::test]
async fn test_publish_then_fetch() {
    let (addr, broker, _) = spawn_server().await;
    let client = Client::new(addr, Settings::default());

    client.publish("news", &["hello", "world"]).await.unwrap();
    assert_eq!(broker.snapshot("news")[0].payload, "hello world ");

    let fetched = client.fetch("news").await.unwrap();
    assert_eq!(fetched, vec![delivery("news", "hello world ")]);
    assert!(client.registry().is_empty());
}

#[tokio::test]
async fn test_subscribe_many_topics_keeps_request_order() {
    let (addr, _, _) = spawn_server().await;
    let client = Client::new(addr, Settings::default());
    client.publish("a", &["one"]).await.unwrap();
    client.publish("a", &["two"]).await.unwrap();
    client.publish("b", &["three"]).await.unwrap();

    let results = client.subscribe(&["b", "missing", "a"]).await;
    let topics: Vec<&str> = results.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(topics, vec!["b", "missing", "a"]);

    let mut results = results.into_iter().map(|(_, r)| r.unwrap());
    assert_eq!(results.next().unwrap(), vec![delivery("b", "three ")]);
    assert_eq!(
        results.next().unwrap(),
        vec![delivery("missing", &no_messages_notice("missing"))]
    );
    assert_eq!(
        results.next().unwrap(),
        vec![delivery("a", "one "), delivery("a", "two ")]
    );
}

#[tokio::test]
async fn test_publish_to_absent_broker_is_refused() {
    let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = unused.local_addr().unwrap();
    drop(unused);

    let client = Client::new(addr, Settings::default());
    let err = client.publish("t", &["x"]).await.unwrap_err();
    assert!(matches!(err, BrokerError::ConnectionRefused(_)));
    assert!(client.registry().is_empty());
}

#[tokio::test]
async fn test_missing_ack_times_out_and_still_disconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let silent = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let first = protocol::read_frame(&mut stream).await.unwrap();
        let second = protocol::read_frame(&mut stream).await.unwrap();
        (first, second)
    });

    let mut settings = Settings::default();
    settings.client.ack_timeout_ms = 50;
    let client = Client::new(addr, settings);

    let err = client.publish("t", &["x"]).await.unwrap_err();
    assert!(matches!(err, BrokerError::Timeout(_)));

    let (first, second) = silent.await.unwrap();
    assert_eq!(first, "publish$t$x ");
    assert_eq!(second, "Disconnect");
}

#[tokio::test]
async fn test_absurd_announced_count_fails_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let lying = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        protocol::read_frame(&mut stream).await.unwrap();
        protocol::write_ack(&mut stream).await.unwrap();
        protocol::write_frame(&mut stream, &usize::MAX.to_string()).await.unwrap();
        protocol::write_frame(&mut stream, "t$only one").await.unwrap();
    });

    let client = Client::new(addr, Settings::default());
    let err = client.fetch("t").await.unwrap_err();
    assert!(err.is_disconnect(), "{err:?}");
    assert!(client.registry().is_empty());
    lying.await.unwrap();
}

#[tokio::test]
async fn test_single_ping_round_trip() {
    let (addr, _, registry) = spawn_server().await;
    let client = Client::new(addr, Settings::default());

    let rtt = client.ping().await.unwrap();
    assert!(rtt < Duration::from_secs(10));
    assert!(client.registry().is_empty());

    for _ in 0..200 {
        if registry.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_pinger_runs_while_other_connections_are_open() {
    let (addr, _, _) = spawn_server().await;
    let mut settings = Settings::default();
    settings.heartbeat.interval_ms = 20;
    settings.heartbeat.timeout_ms = 500;
    settings.heartbeat.warmup_ms = 0;
    let client = Client::new(addr, settings);

    // Stand-in for in-flight publish/subscribe work.
    let work = Session::outbound(connect(addr).await.unwrap(), client.registry()).unwrap();

    let pinger = client.spawn_pinger().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!pinger.is_finished());
    assert_eq!(client.registry().len(), 2);

    work.close(true).await;
    let outcome = tokio::time::timeout(Duration::from_secs(5), pinger)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome, HeartbeatOutcome::PeerGone);
    assert!(client.registry().is_empty());
}

#[tokio::test]
async fn test_pong_responder_binds_configured_port() {
    let mut settings = Settings::default();
    settings.heartbeat.pong_port = 0;
    let client = Client::new("127.0.0.1:1".parse().unwrap(), settings);

    let responder = client.pong_responder().await.unwrap();
    assert_ne!(responder.local_addr().unwrap().port(), 0);
}
