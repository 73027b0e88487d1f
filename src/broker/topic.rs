//! Topic log
//!
//! A `Topic` is an append-only log of the messages published to one name.
//! Order is publish order and nothing is deduplicated or removed.
//!
//! Concurrency note: callers must synchronize access to `Topic` (the broker
//! keeps each one behind its own lock).

use crate::broker::message::Message;

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub messages: Vec<Message>,
}

impl Topic {
    /// Create a new, empty topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            messages: Vec::new(),
        }
    }

    pub fn append(&mut self, payload: &str) {
        self.messages.push(Message::new(&self.name, payload));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
