use std::io;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::client::Client;
use crate::connection::Session;
use crate::protocol::{Instruction, split_result};
use crate::utils::{BrokerError, Result};

/// One result frame of a subscribe: a stored message or the broker's
/// "no messages" notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub message: String,
}

impl Client {
    /// Fetch every message stored for `topic` over a connection of its own.
    pub async fn fetch(&self, topic: &str) -> Result<Vec<Delivery>> {
        let mut session = self.open().await?;
        let result = receive(&mut session, topic, self.settings.client.ack_timeout()).await;
        if let Err(e) = &result {
            warn!("Subscribe to '{}' failed: {}", topic, e);
        }
        session.close(true).await;
        result
    }

    /// Fetch several topics at once, one task per topic. Results come back
    /// in the order the topics were given.
    pub async fn subscribe<S: AsRef<str>>(&self, topics: &[S]) -> Vec<(String, Result<Vec<Delivery>>)> {
        let names: Vec<String> = topics.iter().map(|t| t.as_ref().to_string()).collect();
        let tasks = names.iter().cloned().map(|topic| {
            let client = self.clone();
            tokio::spawn(async move { client.fetch(&topic).await })
        });

        let joined = join_all(tasks).await;
        names
            .into_iter()
            .zip(joined)
            .map(|(topic, joined)| {
                let result = joined.unwrap_or_else(|e| Err(BrokerError::Io(io::Error::other(e))));
                (topic, result)
            })
            .collect()
    }
}

async fn receive(session: &mut Session, topic: &str, limit: Duration) -> Result<Vec<Delivery>> {
    session.send(&Instruction::subscribe(topic)).await?;
    session.recv_ack(limit).await?;

    let announced = session.recv_within(limit).await?;
    let count: usize = announced
        .trim()
        .parse()
        .map_err(|_| BrokerError::UnexpectedReply(announced.clone()))?;
    debug!("'{}' announced {} result(s)", topic, count);

    let mut deliveries = Vec::new();
    for _ in 0..count {
        let frame = session.recv_within(limit).await?;
        let Some((topic, message)) = split_result(&frame) else {
            return Err(BrokerError::UnexpectedReply(frame));
        };
        deliveries.push(Delivery {
            topic: topic.to_string(),
            message: message.to_string(),
        });
    }
    Ok(deliveries)
}
