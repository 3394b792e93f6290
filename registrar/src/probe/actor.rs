use super::{
    ingress::{Mailbox, Message, Resolved},
    Completion, Config, Metrics, NameResolver, Probe, Resolution,
};
use crate::Error;
use alloy_primitives::hex;
use futures::{
    channel::{mpsc, oneshot},
    future::BoxFuture,
    stream::FuturesUnordered,
    StreamExt,
};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Number of pending probes above which probes whose waiter went away are pruned.
const PRUNE_THRESHOLD: usize = 1024;

/// A probe that has been issued but not yet consumed.
struct Pending {
    /// Set when the data layer sees the probe name.
    intercept: Option<(String, u64)>,

    /// Set when the on-chain resolution returns.
    resolution: Option<Resolution>,

    /// Receives the completion.
    waiter: oneshot::Sender<Result<Completion, Error>>,
}

impl Pending {
    fn complete(&self) -> bool {
        self.intercept.is_some()
            && self
                .resolution
                .as_ref()
                .is_some_and(|r| !r.on_chain_name.is_empty())
    }
}

/// Tracks issued probes and correlates intercepts with on-chain resolutions.
pub struct Actor<R: NameResolver> {
    resolver: R,
    mailbox: mpsc::Receiver<Message>,
    pending: HashMap<String, Pending>,

    /// Resolutions in flight, keyed by the probe they belong to
    resolutions: FuturesUnordered<BoxFuture<'static, Resolved>>,

    metrics: Metrics,
}

impl<R: NameResolver> Actor<R> {
    pub fn new(cfg: Config<R>) -> (Self, Mailbox) {
        let (sender, receiver) = mpsc::channel(cfg.mailbox_size);
        (
            Self {
                resolver: cfg.resolver,
                mailbox: receiver,
                pending: HashMap::new(),
                resolutions: FuturesUnordered::new(),
                metrics: cfg.metrics.clone(),
            },
            Mailbox::new(sender, cfg.metrics),
        )
    }

    /// Run the actor on the current tokio runtime.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                msg = self.mailbox.next() => {
                    let Some(msg) = msg else {
                        debug!("mailbox closed");
                        return;
                    };
                    self.handle(msg);
                },
                Some((id, result)) = self.resolutions.next(), if !self.resolutions.is_empty() => {
                    self.resolved(id, result);
                },
            }
            self.metrics.pending.set(self.pending.len() as i64);
        }
    }

    fn handle(&mut self, msg: Message) {
        match msg {
            Message::Issue {
                base_name,
                ens_chain_id,
                response,
            } => {
                if self.pending.len() >= PRUNE_THRESHOLD {
                    self.pending.retain(|_, pending| !pending.waiter.is_canceled());
                }

                // Probe ids double as unguessable correlation tokens
                let id = loop {
                    let mut bytes = [0u8; 8];
                    OsRng.fill_bytes(&mut bytes);
                    let id = hex::encode(bytes);
                    if !self.pending.contains_key(&id) {
                        break id;
                    }
                };
                let name = format!("{id}.{base_name}");
                debug!(probe = %id, %name, ens_chain_id, "issuing probe");

                let (waiter, receiver) = oneshot::channel();
                self.pending.insert(
                    id.clone(),
                    Pending {
                        intercept: None,
                        resolution: None,
                        waiter,
                    },
                );
                let resolver = self.resolver.clone();
                let probe_id = id.clone();
                self.resolutions.push(Box::pin(async move {
                    let result = resolver.resolve(ens_chain_id, &name).await;
                    (probe_id, result)
                }));
                self.metrics.issued.inc();

                let _ = response.send(Probe::new(id, receiver));
            }
            Message::Intercept {
                name,
                chain_id,
                response,
            } => {
                let Some((label, _)) = name.split_once('.') else {
                    let _ = response.send(false);
                    return;
                };
                let Some(pending) = self.pending.get_mut(label) else {
                    let _ = response.send(false);
                    return;
                };
                debug!(probe = label, %name, chain_id, "intercepted probe");
                let id = label.to_string();
                pending.intercept = Some((name, chain_id));
                let _ = response.send(true);
                self.try_complete(id);
            }
            Message::Expire { id } => {
                if self.pending.remove(&id).is_some() {
                    debug!(probe = %id, "expired probe");
                }
            }
        }
    }

    fn resolved(&mut self, id: String, result: Result<Resolution, Error>) {
        match result {
            Ok(resolution) => {
                let Some(pending) = self.pending.get_mut(&id) else {
                    debug!(probe = %id, "resolution for expired probe");
                    return;
                };
                if resolution.on_chain_name.is_empty() {
                    debug!(probe = %id, "probe name has no resolver");
                }
                pending.resolution = Some(resolution);
                self.try_complete(id);
            }
            Err(err) => {
                warn!(probe = %id, ?err, "probe resolution failed");
                let Some(pending) = self.pending.remove(&id) else {
                    return;
                };
                let _ = pending.waiter.send(Err(err));
            }
        }
    }

    fn try_complete(&mut self, id: String) {
        if !self.pending.get(&id).is_some_and(Pending::complete) {
            return;
        }
        let Some(pending) = self.pending.remove(&id) else {
            return;
        };
        let (Some((intercepted_name, chain_id)), Some(resolution)) =
            (pending.intercept, pending.resolution)
        else {
            error!(probe = %id, "completed probe missing a half");
            return;
        };
        let completion = Completion {
            intercepted_name,
            chain_id,
            on_chain_name: resolution.on_chain_name,
            address: resolution.address,
        };
        if pending.waiter.send(Ok(completion)).is_err() {
            debug!(probe = %id, "waiter dropped before completion");
        }
    }
}
