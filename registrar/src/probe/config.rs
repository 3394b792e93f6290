use super::{Metrics, NameResolver};

/// Configuration for the probe actor.
pub struct Config<R: NameResolver> {
    /// Resolves probe names through the on-chain path
    pub resolver: R,

    /// The maximum size of the mailbox backlog
    pub mailbox_size: usize,

    /// Metrics shared by the actor and its mailboxes
    pub metrics: Metrics,
}
