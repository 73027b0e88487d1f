/// A message recorded on a topic.
///
/// - `topic` - The name of the topic this message belongs to.
/// - `payload` - The message text exactly as it was published.
/// - `timestamp` - Milliseconds since the Unix epoch when the broker stored it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub timestamp: i64,
}

impl Message {
    /// Stamp a new message with the current time.
    pub fn new(topic: &str, payload: &str) -> Self {
        Self {
            topic: topic.to_string(),
            payload: payload.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
