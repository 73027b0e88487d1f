//! The `transport` module is responsible for the broker's side of the
//! network: the TCP accept loop and the per-connection state machine that
//! turns instruction frames into topic store operations.

pub mod handler;
pub mod tcp;

pub use handler::{CloseReason, ConnectionState, handle_connection};
pub use tcp::{serve, start_broker_server};
