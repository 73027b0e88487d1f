//! Instructions carried inside frames
//!
//! Publish and subscribe are `$`-joined fields in one frame
//! (`publish$<topic>$<payload>`, `subscribe$<topic>`); the liveness and
//! teardown instructions are bare tokens. Subscribe results travel back as
//! `<topic>$<message>` frames.

use super::frame::{self, ACK_BYTE};

pub const PING: &str = "PING";
pub const PONG: &str = "PONG";
pub const DISCONNECT: &str = "Disconnect";

const PUBLISH: &str = "publish";
const SUBSCRIBE: &str = "subscribe";
const SEPARATOR: char = '$';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Publish { topic: String, payload: String },
    Subscribe { topic: String },
    Ping,
    Pong,
    Disconnect,
    /// The raw `'1'` byte confirming a publish or subscribe.
    Acknowledge,
}

impl Instruction {
    /// Build a publish instruction the way the command line does: every
    /// argument is followed by a single space.
    pub fn publish<S: AsRef<str>>(topic: &str, args: &[S]) -> Self {
        let payload = args.iter().map(|arg| format!("{} ", arg.as_ref())).collect();
        Instruction::Publish {
            topic: topic.to_string(),
            payload,
        }
    }

    pub fn subscribe(topic: &str) -> Self {
        Instruction::Subscribe {
            topic: topic.to_string(),
        }
    }

    /// Decode a frame payload. Returns `None` for anything that is not a
    /// well-formed instruction.
    pub fn parse(payload: &str) -> Option<Self> {
        if payload == DISCONNECT {
            return Some(Instruction::Disconnect);
        }

        let mut fields = payload.splitn(3, SEPARATOR);
        match fields.next() {
            Some(PUBLISH) => {
                let topic = fields.next().filter(|t| !t.is_empty())?;
                let payload = fields.next()?;
                return Some(Instruction::Publish {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                });
            }
            Some(SUBSCRIBE) => {
                let (_, topic) = payload.split_once(SEPARATOR)?;
                if topic.is_empty() {
                    return None;
                }
                return Some(Instruction::subscribe(topic));
            }
            _ => {}
        }

        if payload.contains(PING) {
            Some(Instruction::Ping)
        } else if payload.contains(PONG) {
            Some(Instruction::Pong)
        } else {
            None
        }
    }

    /// The frame payload for this instruction; `None` for the unframed
    /// acknowledgement.
    pub fn to_payload(&self) -> Option<String> {
        match self {
            Instruction::Publish { topic, payload } => {
                Some(format!("{PUBLISH}{SEPARATOR}{topic}{SEPARATOR}{payload}"))
            }
            Instruction::Subscribe { topic } => Some(format!("{SUBSCRIBE}{SEPARATOR}{topic}")),
            Instruction::Ping => Some(PING.to_string()),
            Instruction::Pong => Some(PONG.to_string()),
            Instruction::Disconnect => Some(DISCONNECT.to_string()),
            Instruction::Acknowledge => None,
        }
    }

    /// Bytes to put on the socket.
    pub fn to_wire(&self) -> Vec<u8> {
        match self.to_payload() {
            Some(payload) => frame::encode(&payload),
            None => vec![ACK_BYTE],
        }
    }
}

/// Notice sent in place of results for a topic nobody has published to.
pub fn no_messages_notice(topic: &str) -> String {
    format!("< There wasn't any published message for {topic} topic >")
}

/// One subscribe result frame: `<topic>$<message>`.
pub fn result_frame(topic: &str, message: &str) -> String {
    format!("{topic}{SEPARATOR}{message}")
}

/// Split a subscribe result frame back into topic and message.
pub fn split_result(frame: &str) -> Option<(&str, &str)> {
    frame.split_once(SEPARATOR)
}
