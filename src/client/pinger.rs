use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

use crate::client::Client;
use crate::connection::Session;
use crate::heartbeat::{HeartbeatMonitor, HeartbeatOutcome, LivenessGate, PongResponder};
use crate::protocol::Instruction;
use crate::protocol::instruction::PONG;
use crate::utils::{BrokerError, Result};

impl Client {
    /// Send a single PING to the broker and return the round-trip time.
    pub async fn ping(&self) -> Result<Duration> {
        let mut session = self.open().await?;
        let started = Instant::now();
        let result = ping_once(&mut session, self.settings.client.ack_timeout())
            .await
            .map(|()| started.elapsed());
        if let Ok(rtt) = &result {
            info!("PONG from {} in {:?}", self.server, rtt);
        }
        session.close(true).await;
        result
    }

    /// Ping the broker every heartbeat interval over a connection of its own,
    /// for as long as some other outbound connection is open.
    pub async fn spawn_pinger(&self) -> Result<JoinHandle<HeartbeatOutcome>> {
        let session = self.open().await?;
        let heartbeat = &self.settings.heartbeat;
        let monitor = HeartbeatMonitor::new(
            session.key(),
            self.registry.clone(),
            LivenessGate::OtherConnections,
            heartbeat,
        )
        .with_warmup(heartbeat.warmup());
        Ok(monitor.spawn(session))
    }

    /// Bind the responder that answers the broker's probes on the pong port.
    pub async fn pong_responder(&self) -> Result<PongResponder> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.settings.heartbeat.pong_port));
        PongResponder::bind(addr, self.registry.clone()).await
    }
}

async fn ping_once(session: &mut Session, limit: Duration) -> Result<()> {
    session.send(&Instruction::Ping).await?;
    let reply = session.recv_within(limit).await?;
    if reply.contains(PONG) {
        Ok(())
    } else {
        Err(BrokerError::UnexpectedReply(reply))
    }
}
