//! Connection record
//!
//! `Connection` is the registry's view of one live socket: the shared write
//! half (so tasks other than the owner can push a `Disconnect` into it), the
//! signal that wakes the owning task when the connection is closed from
//! outside, and the heartbeat state. The read half always stays with the
//! owning task.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, Notify};
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::protocol::Instruction;
use crate::utils::Result;

pub type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

#[derive(Debug)]
pub struct Connection {
    pub addr: SocketAddr,
    pub writer: SharedWriter,
    /// Notified once when the connection is closed by someone other than
    /// its owner.
    pub shutdown: Arc<Notify>,
    /// Consecutive missed heartbeats. Only ever incremented.
    pub missed_heartbeats: u32,
    /// Cancels the heartbeat task bound to this connection, if any.
    pub heartbeat: Option<AbortHandle>,
    pub connected_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(addr: SocketAddr, writer: SharedWriter) -> Self {
        Self {
            addr,
            writer,
            shutdown: Arc::new(Notify::new()),
            missed_heartbeats: 0,
            heartbeat: None,
            connected_at: Utc::now(),
        }
    }

    /// Abort the heartbeat task bound to this connection.
    pub fn cancel_heartbeat(&mut self) {
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
    }

    /// Forget the heartbeat handle without aborting it. Used by the heartbeat
    /// task itself when it tears its own connection down.
    pub fn detach_heartbeat(&mut self) {
        self.heartbeat = None;
    }

    pub async fn send(&self, instruction: &Instruction) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&instruction.to_wire()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Send `Disconnect`, close the write side and wake the owning task.
    /// Failures are logged, the peer may already be gone.
    pub async fn disconnect(mut self) {
        self.cancel_heartbeat();

        if let Err(e) = self.send(&Instruction::Disconnect).await {
            debug!("Could not send Disconnect to {}: {}", self.addr, e);
        }
        if let Err(e) = self.writer.lock().await.shutdown().await {
            debug!("Shutdown of {} failed: {}", self.addr, e);
        }
        self.shutdown.notify_one();

        let lifetime = Utc::now() - self.connected_at;
        info!(
            "Disconnected {} after {}s",
            self.addr,
            lifetime.num_seconds()
        );
    }
}
