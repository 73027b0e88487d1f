//! The `client` module is the peer side of the protocol.
//!
//! A [`Client`] knows the broker's address and keeps its own
//! `ConnectionRegistry` of outbound connections. Every publish, subscribe
//! and ping opens a fresh connection, registered for as long as it is in
//! use; the pong responder and the recurring pinger watch that registry to
//! decide when the client has gone idle.

pub mod pinger;
pub mod publisher;
pub mod subscriber;

pub use subscriber::Delivery;

use std::net::SocketAddr;

use crate::config::Settings;
use crate::connection::{ConnectionRegistry, Session, connect};
use crate::utils::Result;

#[derive(Debug, Clone)]
pub struct Client {
    server: SocketAddr,
    registry: ConnectionRegistry,
    settings: Settings,
}

impl Client {
    pub fn new(server: SocketAddr, settings: Settings) -> Self {
        Self {
            server,
            registry: ConnectionRegistry::new(),
            settings,
        }
    }

    /// Outbound connections currently open.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    async fn open(&self) -> Result<Session> {
        let stream = connect(self.server).await?;
        Session::outbound(stream, &self.registry)
    }
}

#[cfg(test)]
mod tests;
