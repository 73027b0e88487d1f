//! Broker engine
//!
//! The in-memory topic store. Topics are created lazily on first publish and
//! never deleted.
//!
//! Concurrency and usage notes:
//! - `Broker` is shared as `Arc<Broker>` between connection tasks; all
//!   methods take `&self`.
//! - The topic map sits behind an `RwLock` and every topic behind its own
//!   `Mutex`, so publishes to the same topic are serialized while unrelated
//!   topics proceed independently. The map lock is only held long enough to
//!   find or insert a topic.
//! - Locks are never held across `.await`; snapshots are cloned out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::info;

use crate::broker::message::Message;
use crate::broker::topic::Topic;

#[derive(Debug, Default)]
pub struct Broker {
    topics: RwLock<HashMap<String, Arc<Mutex<Topic>>>>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Append `payload` to `topic`, creating the topic if needed.
    pub fn publish(&self, topic: &str, payload: &str) {
        let entry = self.topic_entry(topic);
        let mut topic = entry.lock().unwrap_or_else(PoisonError::into_inner);
        topic.append(payload);
        info!("New message on '{}' ({} stored): {}", topic.name, topic.len(), payload);
    }

    /// Every message recorded for `topic`, in publish order. Empty when the
    /// topic has never been published to.
    pub fn snapshot(&self, topic: &str) -> Vec<Message> {
        let entry = {
            let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
            topics.get(topic).cloned()
        };

        let Some(entry) = entry else {
            return Vec::new();
        };
        let topic = entry.lock().unwrap_or_else(PoisonError::into_inner);
        topic.messages.clone()
    }

    /// Names of every topic published to so far.
    pub fn topic_names(&self) -> Vec<String> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = topics.keys().cloned().collect();
        names.sort();
        names
    }

    fn topic_entry(&self, topic: &str) -> Arc<Mutex<Topic>> {
        if let Some(entry) = self
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
        {
            return entry.clone();
        }

        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Topic::new(topic))))
            .clone()
    }
}
