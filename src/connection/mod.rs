//! The `connection` module tracks live TCP connections.
//!
//! It provides the `Connection` record, the shared `ConnectionRegistry` the
//! broker and heartbeat tasks coordinate through, and the `Session` wrapper
//! every task uses to read and write frames on its socket.

pub mod record;
pub mod registry;
pub mod session;

pub use record::{Connection, SharedWriter};
pub use registry::ConnectionRegistry;
pub use session::Session;

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::utils::{BrokerError, Result};

/// Open a TCP connection, reporting a refused connection as such.
pub async fn connect(addr: SocketAddr) -> Result<TcpStream> {
    TcpStream::connect(addr).await.map_err(|e| match e.kind() {
        io::ErrorKind::ConnectionRefused => BrokerError::ConnectionRefused(addr.to_string()),
        _ => BrokerError::from(e),
    })
}
