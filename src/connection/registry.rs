//! Connection registry
//!
//! Tracks every live connection by address. Connection tasks register and
//! deregister themselves; heartbeat tasks bump failure counters and may
//! remove a record that its owner is about to close too. Whoever gets the
//! record back from [`ConnectionRegistry::remove`] is the one that closes it,
//! so a connection is torn down exactly once.
//!
//! The map sits behind a `std::sync::Mutex` that is never held across an
//! `.await`; the async helpers take records out first and talk to the
//! sockets afterwards.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::connection::record::{Connection, SharedWriter};

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<HashMap<SocketAddr, Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SocketAddr, Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a new connection and return the signal its owner should listen
    /// to for external closes.
    pub fn register(&self, addr: SocketAddr, writer: SharedWriter) -> Arc<Notify> {
        let connection = Connection::new(addr, writer);
        let shutdown = connection.shutdown.clone();
        if let Some(mut stale) = self.lock().insert(addr, connection) {
            warn!("Replacing stale connection record for {}", addr);
            stale.cancel_heartbeat();
            stale.shutdown.notify_one();
        }
        shutdown
    }

    pub fn remove(&self, addr: &SocketAddr) -> Option<Connection> {
        self.lock().remove(addr)
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.lock().contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.lock().keys().copied().collect()
    }

    /// True if anything other than `addr` is tracked.
    pub fn has_others(&self, addr: &SocketAddr) -> bool {
        self.lock().keys().any(|other| other != addr)
    }

    pub fn missed_heartbeats(&self, addr: &SocketAddr) -> Option<u32> {
        self.lock().get(addr).map(|c| c.missed_heartbeats)
    }

    /// Count one more missed heartbeat and return the new total, or `None`
    /// if the connection is gone.
    pub fn record_missed_heartbeat(&self, addr: &SocketAddr) -> Option<u32> {
        self.lock().get_mut(addr).map(|c| {
            c.missed_heartbeats += 1;
            c.missed_heartbeats
        })
    }

    /// Bind a heartbeat task to a connection. If the connection is already
    /// gone the task is aborted and `false` returned.
    pub fn attach_heartbeat(&self, addr: &SocketAddr, handle: AbortHandle) -> bool {
        match self.lock().get_mut(addr) {
            Some(connection) => {
                connection.cancel_heartbeat();
                connection.heartbeat = Some(handle);
                true
            }
            None => {
                handle.abort();
                false
            }
        }
    }

    /// Remove and return every tracked connection.
    pub fn drain(&self) -> Vec<Connection> {
        self.lock().drain().map(|(_, c)| c).collect()
    }

    /// Send `Disconnect` to every tracked connection and close them all.
    /// Returns how many were closed.
    pub async fn disconnect_all(&self) -> usize {
        let connections = self.drain();
        let count = connections.len();
        for connection in connections {
            connection.disconnect().await;
        }
        if count > 0 {
            info!("Broadcast Disconnect to {} connection(s)", count);
        }
        count
    }
}
