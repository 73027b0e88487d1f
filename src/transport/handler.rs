//! Connection handler
//!
//! Drives one accepted connection through
//! `AwaitingInstruction -> Processing -> (AwaitingInstruction | Closed)`.
//! Every publish and subscribe is confirmed with the raw acknowledgement
//! byte; a subscribe then streams the announced count followed by one
//! `<topic>$<message>` frame per result.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::broker::Broker;
use crate::connection::Session;
use crate::protocol::{self, Instruction, no_messages_notice, result_frame};
use crate::utils::{BrokerError, Result};

#[derive(Debug)]
pub enum ConnectionState {
    AwaitingInstruction,
    Processing(Instruction),
    Closed(CloseReason),
}

/// Why a connection left the state machine.
#[derive(Debug)]
pub enum CloseReason {
    /// The peer said `Disconnect`.
    Disconnected,
    /// Empty payload, reset or unreadable header: the peer is gone.
    PeerGone,
    /// Closed from outside, by a heartbeat teardown or a shutdown broadcast.
    Evicted,
    Failed(BrokerError),
}

impl From<BrokerError> for CloseReason {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::ConnectionClosed => CloseReason::Evicted,
            err if err.is_disconnect() => CloseReason::PeerGone,
            err => CloseReason::Failed(err),
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Disconnected => write!(f, "peer disconnected"),
            CloseReason::PeerGone => write!(f, "peer went away"),
            CloseReason::Evicted => write!(f, "closed by broker"),
            CloseReason::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Run the state machine until the connection closes, then deregister it.
pub async fn handle_connection(mut session: Session, broker: Arc<Broker>) -> CloseReason {
    let peer = session.peer();
    let mut state = ConnectionState::AwaitingInstruction;

    loop {
        state = match state {
            ConnectionState::AwaitingInstruction => next_instruction(&mut session).await,
            ConnectionState::Processing(instruction) => {
                match process(&session, &broker, instruction).await {
                    Ok(next) => next,
                    Err(err) => ConnectionState::Closed(err.into()),
                }
            }
            ConnectionState::Closed(reason) => {
                let removed = session.close(false).await;
                debug!("Closed {} (record removed here: {})", peer, removed);
                return reason;
            }
        };
    }
}

async fn next_instruction(session: &mut Session) -> ConnectionState {
    let payload = match session.recv().await {
        Ok(payload) => payload,
        Err(err) => return ConnectionState::Closed(err.into()),
    };

    if payload.is_empty() {
        return ConnectionState::Closed(CloseReason::PeerGone);
    }

    match Instruction::parse(&payload) {
        Some(instruction) => ConnectionState::Processing(instruction),
        None => {
            warn!("Ignoring malformed instruction from {}: {:?}", session.peer(), payload);
            ConnectionState::AwaitingInstruction
        }
    }
}

async fn process(
    session: &Session,
    broker: &Broker,
    instruction: Instruction,
) -> Result<ConnectionState> {
    let peer = session.peer();

    match instruction {
        Instruction::Disconnect => {
            info!("{} said Disconnect", peer);
            return Ok(ConnectionState::Closed(CloseReason::Disconnected));
        }
        Instruction::Publish { topic, payload } => {
            // Stored before the ack goes out, so an ack means the message is visible.
            broker.publish(&topic, &payload);
            session.send(&Instruction::Acknowledge).await?;
        }
        Instruction::Subscribe { topic } => {
            let count = send_subscription(session, broker, &topic).await?;
            info!("{} subscribed to '{}' ({} message(s))", peer, topic, count);
        }
        Instruction::Ping => {
            debug!("PING from {}", peer);
            session.send(&Instruction::Pong).await?;
        }
        other => debug!("Ignoring {:?} from {}", other, peer),
    }

    Ok(ConnectionState::AwaitingInstruction)
}

/// Acknowledge a subscribe and stream the topic's snapshot. The write half
/// stays locked for the whole reply so no other writer can interleave.
/// Returns how many stored messages were sent.
async fn send_subscription(session: &Session, broker: &Broker, topic: &str) -> Result<usize> {
    let mut writer = session.lock_writer().await;
    protocol::write_ack(&mut *writer).await?;

    let messages = broker.snapshot(topic);
    let frames: Vec<String> = if messages.is_empty() {
        vec![result_frame(topic, &no_messages_notice(topic))]
    } else {
        messages
            .iter()
            .map(|message| result_frame(topic, &message.payload))
            .collect()
    };

    protocol::write_frame(&mut *writer, &frames.len().to_string()).await?;
    for frame in &frames {
        protocol::write_frame(&mut *writer, frame).await?;
    }

    Ok(messages.len())
}
