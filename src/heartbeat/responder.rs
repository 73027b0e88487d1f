//! Pong responder
//!
//! Runs on the client. Listens on the pre-agreed pong port for the broker's
//! probe connections and answers every `PING` with `PONG`, for as long as the
//! client still has an outbound connection registered.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionRegistry, Session};
use crate::protocol::Instruction;
use crate::protocol::instruction::{DISCONNECT, PING};
use crate::utils::Result;

/// How often the accept loop re-checks whether the responder is still needed.
const IDLE_POLL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct PongResponder {
    listener: TcpListener,
    registry: ConnectionRegistry,
    poll: Duration,
}

impl PongResponder {
    pub async fn bind(addr: SocketAddr, registry: ConnectionRegistry) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Pong responder listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            registry,
            poll: IDLE_POLL,
        })
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve probe connections until the registry, having held at least one
    /// connection, is empty again. Returns how many probes were served.
    pub async fn run(self) -> usize {
        let mut probes = JoinSet::new();
        let mut served = 0;
        let mut seen_active = false;

        loop {
            if !self.registry.is_empty() {
                seen_active = true;
            } else if seen_active {
                break;
            }

            let accepted = match tokio::time::timeout(self.poll, self.listener.accept()).await {
                Err(_) => continue,
                Ok(accepted) => accepted,
            };
            let stream = match accepted {
                Ok((stream, addr)) => {
                    info!("Heartbeat probe connected from {}", addr);
                    stream
                }
                Err(e) => {
                    warn!("Pong responder accept failed: {}", e);
                    continue;
                }
            };
            match Session::detached(stream) {
                Ok(probe) => {
                    served += 1;
                    probes.spawn(answer(probe, self.registry.clone()));
                }
                Err(e) => warn!("Dropping probe connection: {}", e),
            }
        }

        // Probes still open have nothing left to answer for.
        probes.shutdown().await;
        info!("Pong responder stopped after serving {} probe(s)", served);
        served
    }
}

async fn answer(mut probe: Session, registry: ConnectionRegistry) {
    let peer = probe.peer();

    loop {
        match probe.recv().await {
            Ok(payload) if payload.contains(PING) => {
                if registry.is_empty() {
                    debug!("No outbound connections left, not answering {}", peer);
                    break;
                }
                if let Err(e) = probe.send(&Instruction::Pong).await {
                    debug!("Could not answer PING from {}: {}", peer, e);
                    break;
                }
            }
            Ok(payload) if payload == DISCONNECT => {
                debug!("Probe from {} said Disconnect", peer);
                break;
            }
            Ok(other) => debug!("Ignoring {:?} on probe from {}", other, peer),
            Err(e) => {
                debug!("Probe from {} ended: {}", peer, e);
                break;
            }
        }
    }

    probe.close(false).await;
}
