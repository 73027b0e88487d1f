use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::broker::Broker;
use crate::config::HeartbeatSettings;
use crate::connection::{ConnectionRegistry, Session, connect};
use crate::heartbeat::{HeartbeatMonitor, LivenessGate};
use crate::transport::handler::handle_connection;
use crate::utils::Result;

/// Bind `addr` and serve connections until the task is dropped.
pub async fn start_broker_server(
    addr: String,
    broker: Arc<Broker>,
    registry: ConnectionRegistry,
    heartbeat: HeartbeatSettings,
) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Broker listening on {}", listener.local_addr()?);
    serve(listener, broker, registry, heartbeat).await
}

/// Accept loop. Each connection is registered, optionally put under a
/// heartbeat, and handed to its own task.
pub async fn serve(
    listener: TcpListener,
    broker: Arc<Broker>,
    registry: ConnectionRegistry,
    heartbeat: HeartbeatSettings,
) -> Result<()> {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };

        let session = match Session::accepted(stream, &registry) {
            Ok(session) => session,
            Err(e) => {
                warn!("Dropping connection from {}: {}", addr, e);
                continue;
            }
        };
        info!("Connection from {} ({} open)", addr, registry.len());

        if heartbeat.enabled {
            run_heartbeat(addr, registry.clone(), heartbeat.clone());
        }

        let broker = broker.clone();
        tokio::spawn(async move {
            let reason = handle_connection(session, broker).await;
            info!("Connection from {} closed: {}", addr, reason);
        });
    }
}

/// Open a probe connection to the peer's pong responder and monitor the
/// peer over it. A peer without a responder is served unmonitored.
pub fn run_heartbeat(peer: SocketAddr, registry: ConnectionRegistry, settings: HeartbeatSettings) {
    tokio::spawn(async move {
        let probe_addr = SocketAddr::new(peer.ip(), settings.pong_port);
        let probe = match connect(probe_addr).await.and_then(Session::detached) {
            Ok(probe) => probe,
            Err(e) => {
                warn!("No heartbeat for {}: {}", peer, e);
                return;
            }
        };

        let monitor = HeartbeatMonitor::new(peer, registry.clone(), LivenessGate::PeerRecord, &settings);
        let handle = monitor.spawn(probe);
        if registry.attach_heartbeat(&peer, handle.abort_handle()) {
            info!("Heartbeat for {} running via {}", peer, probe_addr);
        }
    });
}
