use std::time::Duration;

use tracing::{info, warn};

use crate::client::Client;
use crate::connection::Session;
use crate::protocol::Instruction;
use crate::utils::Result;

impl Client {
    /// Publish `args` to `topic`, each argument followed by a space, and wait
    /// for the broker's acknowledgement. The connection is closed with
    /// `Disconnect` whatever the outcome.
    pub async fn publish<S: AsRef<str>>(&self, topic: &str, args: &[S]) -> Result<()> {
        let mut session = self.open().await?;
        let instruction = Instruction::publish(topic, args);

        let outcome = send_and_confirm(&mut session, &instruction, self.settings.client.ack_timeout()).await;
        match &outcome {
            Ok(()) => info!("Published to '{}' on {}", topic, self.server),
            Err(e) => warn!("Publish to '{}' not confirmed: {}", topic, e),
        }

        session.close(true).await;
        outcome
    }
}

async fn send_and_confirm(session: &mut Session, instruction: &Instruction, limit: Duration) -> Result<()> {
    session.send(instruction).await?;
    session.recv_ack(limit).await
}
