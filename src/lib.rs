//! # msgbroker
//!
//! `msgbroker` is a minimal, in-memory publish/subscribe broker that speaks a
//! length-prefixed protocol over plain TCP. Publishers append messages to
//! named topics; subscribers fetch everything recorded for a topic at the
//! moment they ask. An optional heartbeat lets the broker drop peers that
//! stopped answering.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `protocol`: The 64-byte length-header framing and the instructions carried in frames.
//! - `broker`: The topic store, mapping topic names to their ordered messages.
//! - `connection`: The registry of live connections and the per-socket `Session`.
//! - `transport`: The TCP accept loop and the per-connection state machine.
//! - `heartbeat`: The liveness monitor and the client-side pong responder.
//! - `client`: Publisher, subscriber and pinger, the peer side of the protocol.
//! - `config`: Handles loading and managing configuration.
//! - `utils`: Contains shared utilities, such as error handling and logging.

pub mod broker;
pub mod client;
pub mod config;
pub mod connection;
pub mod heartbeat;
pub mod protocol;
pub mod transport;
pub mod utils;
