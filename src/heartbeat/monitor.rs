//! Heartbeat monitor
//!
//! One monitor runs per probed peer. On every tick it checks that the peer's
//! connection record still exists and is below the failure threshold, sends
//! `PING` over its probe connection and waits a bounded time for `PONG`.
//! A miss (timeout, reset or wrong reply) bumps the record's failure counter;
//! successes never lower it. When the counter reaches
//! [`FAILURE_THRESHOLD`](super::FAILURE_THRESHOLD) the monitor says
//! `Disconnect` on the probe, closes the peer's connection, removes its
//! record and then disconnects every other tracked connection.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::HeartbeatSettings;
use crate::connection::{ConnectionRegistry, Session};
use crate::heartbeat::FAILURE_THRESHOLD;
use crate::protocol::Instruction;
use crate::protocol::instruction::PONG;
use crate::utils::{BrokerError, Result};

/// What must still hold, besides the record itself, for probing to go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessGate {
    /// Keep probing while the monitored record exists. Used by the broker.
    PeerRecord,
    /// Keep probing while some other connection is tracked. Used by the
    /// client, whose pinger only matters while it has work in flight.
    OtherConnections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The peer went away or the gate closed; the monitor stood down.
    PeerGone,
    /// The peer missed too many probes and was disconnected.
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    monitored: SocketAddr,
    registry: ConnectionRegistry,
    gate: LivenessGate,
    interval: Duration,
    timeout: Duration,
    warmup: Duration,
}

impl HeartbeatMonitor {
    /// Monitor the record at `monitored`. The first probe goes out one full
    /// interval after start unless [`with_warmup`](Self::with_warmup) says otherwise.
    pub fn new(
        monitored: SocketAddr,
        registry: ConnectionRegistry,
        gate: LivenessGate,
        settings: &HeartbeatSettings,
    ) -> Self {
        Self {
            monitored,
            registry,
            gate,
            interval: settings.interval(),
            timeout: settings.timeout(),
            warmup: settings.interval(),
        }
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn spawn(self, probe: Session) -> JoinHandle<HeartbeatOutcome> {
        tokio::spawn(self.run(probe))
    }

    /// Probe until the peer is gone or has been disconnected.
    pub async fn run(self, mut probe: Session) -> HeartbeatOutcome {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.warmup, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if !self.is_live() {
                self.stand_down(probe).await;
                return HeartbeatOutcome::PeerGone;
            }

            let err = match self.probe(&mut probe).await {
                Ok(()) => {
                    debug!("Heartbeat answered by {}", self.monitored);
                    continue;
                }
                Err(err) => err,
            };

            let Some(missed) = self.registry.record_missed_heartbeat(&self.monitored) else {
                self.stand_down(probe).await;
                return HeartbeatOutcome::PeerGone;
            };
            warn!(
                "Heartbeat missed by {} ({}/{}): {}",
                self.monitored, missed, FAILURE_THRESHOLD, err
            );

            if missed >= FAILURE_THRESHOLD {
                self.tear_down(probe).await;
                return HeartbeatOutcome::Disconnected;
            }
        }
    }

    fn is_live(&self) -> bool {
        match self.registry.missed_heartbeats(&self.monitored) {
            None => false,
            Some(missed) if missed >= FAILURE_THRESHOLD => false,
            Some(_) => match self.gate {
                LivenessGate::PeerRecord => true,
                LivenessGate::OtherConnections => self.registry.has_others(&self.monitored),
            },
        }
    }

    async fn probe(&self, probe: &mut Session) -> Result<()> {
        self.discard_late_replies(probe).await?;
        probe.send(&Instruction::Ping).await?;
        let reply = probe.recv_within(self.timeout).await?;
        if reply.contains(PONG) {
            Ok(())
        } else {
            Err(BrokerError::UnexpectedReply(reply))
        }
    }

    /// Drop replies to earlier, timed-out probes that have arrived since, so
    /// they cannot be taken as the answer to the next PING.
    async fn discard_late_replies(&self, probe: &mut Session) -> Result<()> {
        loop {
            match probe.recv_within(Duration::ZERO).await {
                Ok(stale) => debug!("Discarding late reply {:?} from {}", stale, self.monitored),
                Err(BrokerError::Timeout(_)) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    async fn stand_down(&self, probe: Session) {
        debug!("Heartbeat for {} standing down", self.monitored);
        probe.close(true).await;
    }

    async fn tear_down(&self, probe: Session) {
        warn!(
            "{} missed {} heartbeats in a row, disconnecting",
            self.monitored, FAILURE_THRESHOLD
        );

        probe.close(true).await;

        if let Some(mut peer) = self.registry.remove(&self.monitored) {
            // This task is the record's heartbeat; it must not abort itself.
            peer.detach_heartbeat();
            peer.disconnect().await;
        }

        let others = self.registry.disconnect_all().await;
        info!(
            "Heartbeat teardown for {} finished, {} other connection(s) closed",
            self.monitored, others
        );
    }
}
