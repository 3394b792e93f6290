use super::{metrics::OutcomeLabel, Completion, Metrics, Probe, Resolution, ResolverStatus};
use crate::Error;
use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};
use std::time::Duration;
use tracing::debug;

/// Messages that can be sent to the probe actor.
pub enum Message {
    /// Issue a probe under `base_name` and resolve it on `ens_chain_id`.
    Issue {
        base_name: String,
        ens_chain_id: u64,
        response: oneshot::Sender<Probe>,
    },

    /// The data layer was asked to resolve `name` on `chain_id`.
    ///
    /// Responds with whether the first label of `name` is a pending probe.
    Intercept {
        name: String,
        chain_id: u64,
        response: oneshot::Sender<bool>,
    },

    /// The waiter gave up on a probe.
    Expire { id: String },
}

/// Resolution results delivered back to the actor.
pub(super) type Resolved = (String, Result<Resolution, Error>);

/// A way to send messages to the probe actor.
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
    metrics: Metrics,
}

impl Mailbox {
    pub(super) fn new(sender: mpsc::Sender<Message>, metrics: Metrics) -> Self {
        Self { sender, metrics }
    }

    /// Issue a probe under `base_name`, resolved through the ENS deployment on `ens_chain_id`.
    ///
    /// Returns as soon as the probe is registered; resolution proceeds in the background.
    ///
    /// Panics if the send fails.
    pub async fn issue(&mut self, base_name: String, ens_chain_id: u64) -> Probe {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(Message::Issue {
                base_name,
                ens_chain_id,
                response,
            })
            .await
            .expect("Failed to send issue");
        receiver.await.expect("Failed to receive probe")
    }

    /// Record that the data layer was asked to resolve `name` on `chain_id`.
    ///
    /// Returns true if `name` is a probe the gateway is waiting for.
    ///
    /// Panics if the send fails.
    pub async fn intercept(&mut self, name: String, chain_id: u64) -> bool {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(Message::Intercept {
                name,
                chain_id,
                response,
            })
            .await
            .expect("Failed to send intercept");
        receiver.await.expect("Failed to receive intercept")
    }

    /// Wait at most `timeout` for `probe` to complete and evaluate it against
    /// `expected_chain_id`.
    ///
    /// A probe that does not complete in time yields
    /// [ResolverStatus::BaseDomainNotPointingHere]. A failed on-chain resolution is returned as
    /// an error.
    ///
    /// Panics if the send fails.
    pub async fn await_result(
        &mut self,
        probe: Probe,
        expected_chain_id: u64,
        timeout: Duration,
    ) -> Result<ResolverStatus, Error> {
        let Probe { id, receiver } = probe;
        let status = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(Ok(completion))) => Self::evaluate(&id, &completion, expected_chain_id),
            Ok(Ok(Err(err))) => return Err(err),
            Ok(Err(oneshot::Canceled)) => return Err(Error::ProbeCanceled),
            Err(_) => {
                debug!(probe = %id, "probe timed out");
                self.sender
                    .send(Message::Expire { id })
                    .await
                    .expect("Failed to send expire");
                ResolverStatus::BaseDomainNotPointingHere
            }
        };
        self.metrics
            .outcomes
            .get_or_create(&OutcomeLabel {
                status: status.as_str().to_string(),
            })
            .inc();
        Ok(status)
    }

    fn evaluate(id: &str, completion: &Completion, expected_chain_id: u64) -> ResolverStatus {
        let status = completion.evaluate(expected_chain_id);
        debug!(
            probe = id,
            on_chain_name = %completion.on_chain_name,
            address = ?completion.address,
            chain_id = completion.chain_id,
            expected_chain_id,
            ?status,
            "probe completed"
        );
        status
    }
}
