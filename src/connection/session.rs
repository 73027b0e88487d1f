//! Per-socket session
//!
//! A `Session` owns the read half of one TCP connection and shares its write
//! half with the registry. Both the broker's connection handler and the
//! peer-side publisher/subscriber/pinger talk through it.
//!
//! Reads return explicit results: `Ok(payload)`, `Err(Timeout)` when a bounded
//! wait expires, `Err(ConnectionReset)` when the peer vanished and
//! `Err(ConnectionClosed)` when the registry closed the connection from
//! under us.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, MutexGuard, Notify};
use tracing::debug;

use crate::connection::record::SharedWriter;
use crate::connection::registry::ConnectionRegistry;
use crate::protocol::{self, Instruction};
use crate::utils::{BrokerError, Result};

#[derive(Debug)]
pub struct Session {
    key: SocketAddr,
    peer: SocketAddr,
    reader: OwnedReadHalf,
    writer: SharedWriter,
    shutdown: Arc<Notify>,
    registry: Option<ConnectionRegistry>,
}

impl Session {
    /// Register a connection accepted by the broker, keyed by the peer address.
    pub fn accepted(stream: TcpStream, registry: &ConnectionRegistry) -> Result<Self> {
        let peer = stream.peer_addr()?;
        Ok(Self::registered(stream, peer, peer, registry))
    }

    /// Register an outbound connection, keyed by its local address.
    pub fn outbound(stream: TcpStream, registry: &ConnectionRegistry) -> Result<Self> {
        let key = stream.local_addr()?;
        let peer = stream.peer_addr()?;
        Ok(Self::registered(stream, key, peer, registry))
    }

    /// A session that is not tracked anywhere, such as a heartbeat probe.
    pub fn detached(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            key: peer,
            peer,
            reader,
            writer: Arc::new(Mutex::new(writer)),
            shutdown: Arc::new(Notify::new()),
            registry: None,
        })
    }

    fn registered(
        stream: TcpStream,
        key: SocketAddr,
        peer: SocketAddr,
        registry: &ConnectionRegistry,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        let writer = Arc::new(Mutex::new(writer));
        let shutdown = registry.register(key, writer.clone());
        Self {
            key,
            peer,
            reader,
            writer,
            shutdown,
            registry: Some(registry.clone()),
        }
    }

    /// Registry key of this session.
    pub fn key(&self) -> SocketAddr {
        self.key
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_registered(&self) -> bool {
        self.registry
            .as_ref()
            .is_some_and(|registry| registry.contains(&self.key))
    }

    /// Hold the write half for a multi-frame reply.
    pub async fn lock_writer(&self) -> MutexGuard<'_, OwnedWriteHalf> {
        self.writer.lock().await
    }

    pub async fn send(&self, instruction: &Instruction) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&instruction.to_wire()).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn send_frame(&self, payload: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        protocol::write_frame(&mut *writer, payload).await
    }

    /// Wait for the next frame.
    pub async fn recv(&mut self) -> Result<String> {
        let shutdown = self.shutdown.clone();
        tokio::select! {
            _ = shutdown.notified() => Err(BrokerError::ConnectionClosed),
            frame = protocol::read_frame(&mut self.reader) => frame,
        }
    }

    /// Wait for the next frame, at most `limit`.
    pub async fn recv_within(&mut self, limit: Duration) -> Result<String> {
        tokio::time::timeout(limit, self.recv())
            .await
            .map_err(|_| BrokerError::Timeout(limit))?
    }

    /// Wait for the one-byte acknowledgement, at most `limit`.
    pub async fn recv_ack(&mut self, limit: Duration) -> Result<()> {
        let shutdown = self.shutdown.clone();
        let ack = async {
            tokio::select! {
                _ = shutdown.notified() => Err(BrokerError::ConnectionClosed),
                ack = protocol::read_ack(&mut self.reader) => ack,
            }
        };
        tokio::time::timeout(limit, ack)
            .await
            .map_err(|_| BrokerError::Timeout(limit))?
    }

    /// Close the session: deregister it if it is still tracked, optionally
    /// say `Disconnect`, then shut the write half. Returns `true` if this call
    /// removed the registry record.
    pub async fn close(self, say_goodbye: bool) -> bool {
        let removed = match &self.registry {
            Some(registry) => match registry.remove(&self.key) {
                Some(mut connection) => {
                    connection.cancel_heartbeat();
                    true
                }
                None => false,
            },
            None => false,
        };

        let mut writer = self.writer.lock().await;
        if say_goodbye {
            if let Err(e) = protocol::write_frame(&mut *writer, protocol::instruction::DISCONNECT).await
            {
                debug!("Could not say Disconnect to {}: {}", self.peer, e);
            }
        }
        if let Err(e) = writer.shutdown().await {
            debug!("Shutdown of {} failed: {}", self.peer, e);
        }

        removed
    }
}
