//! The `heartbeat` module detects peers that stopped responding.
//!
//! A [`HeartbeatMonitor`] probes one peer with `PING` on a fixed period and
//! disconnects it after [`FAILURE_THRESHOLD`] missed replies. The
//! [`PongResponder`] is the client-side listener that answers the broker's
//! probes.

pub mod monitor;
pub mod responder;

pub use monitor::{HeartbeatMonitor, HeartbeatOutcome, LivenessGate};
pub use responder::PongResponder;

/// Consecutive missed heartbeats after which a peer is disconnected.
pub const FAILURE_THRESHOLD: u32 = 3;
