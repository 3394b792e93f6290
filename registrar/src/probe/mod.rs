//! Prove that a base domain's on-chain resolver delegates to this gateway.
//!
//! # Overview
//!
//! A probe is a random 8-byte label, hex-encoded, issued under a candidate base domain
//! (`{probe}.alpha.eth`). The [Actor] asks a [NameResolver] to resolve that name through the
//! ordinary on-chain path. If the base domain's resolver points at this gateway, the resolution
//! reaches the gateway's own data layer, which recognizes the probe label, records the chain id
//! the gateway was asked about ([Mailbox::intercept]), and answers with [SENTINEL].
//!
//! A probe completes once both halves have arrived: the intercept and the resolution result.
//! The caller holds the receiving half of the probe and waits for completion with
//! [Mailbox::await_result], which turns the completion into a [ResolverStatus]:
//!
//! 1. a zero address means the delegation chain broke before reaching the gateway
//!    ([ResolverStatus::IntermediateDomainNotSet]);
//! 2. an intercept on a different chain than expected is rejected as a likely spoof
//!    ([ResolverStatus::ChainMismatch]), even if the address is the sentinel;
//! 3. the sentinel address means the round trip closed through this gateway
//!    ([ResolverStatus::CorrectlySetup]);
//! 4. any other address means some resolver answered, but not this gateway
//!    ([ResolverStatus::UnexpectedAddress]).
//!
//! If the probe does not complete within the timeout, the result is
//! [ResolverStatus::BaseDomainNotPointingHere] and the probe is forgotten. A resolution that
//! arrives later is dropped.
//!
//! Each [Probe] can be awaited exactly once: it is consumed by [Mailbox::await_result].

use crate::Error;
use alloy_primitives::{address, Address};
use futures::channel::oneshot;
use std::future::Future;

mod actor;
pub use actor::Actor;
mod config;
pub use config::Config;
mod ingress;
pub use ingress::{Mailbox, Message};
mod metrics;
pub use metrics::Metrics;

/// Address the data layer answers for probe names.
pub const SENTINEL: Address = address!("0000000000000000000000000000000000000060");

/// Outcome of a resolver configuration check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolverStatus {
    CorrectlySetup,
    IntermediateDomainNotSet,
    BaseDomainNotPointingHere,
    ChainMismatch,
    UnexpectedAddress,
}

impl ResolverStatus {
    /// Label used in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverStatus::CorrectlySetup => "correctly_setup",
            ResolverStatus::IntermediateDomainNotSet => "intermediate_domain_not_set",
            ResolverStatus::BaseDomainNotPointingHere => "base_domain_not_pointing_here",
            ResolverStatus::ChainMismatch => "chain_mismatch",
            ResolverStatus::UnexpectedAddress => "unexpected_address",
        }
    }

    /// Human-readable explanation of the outcome for `base_name` on `chain_id`.
    pub fn reason(&self, base_name: &str, chain_id: u64) -> String {
        match self {
            ResolverStatus::CorrectlySetup => {
                format!("Resolver for {base_name} correctly set for gateway.")
            }
            ResolverStatus::IntermediateDomainNotSet => {
                format!("Intermediate name resolver {base_name} not set correctly.")
            }
            ResolverStatus::BaseDomainNotPointingHere => {
                "Resolver not correctly set for gateway.".to_string()
            }
            ResolverStatus::ChainMismatch => {
                format!("Chain mismatch for {base_name} and {chain_id}.")
            }
            ResolverStatus::UnexpectedAddress => {
                format!("Resolver for {base_name} answered with an address not issued by this gateway.")
            }
        }
    }
}

/// The result of resolving a probe name on-chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Name at which the resolver was found (empty if there was none).
    pub on_chain_name: String,
    /// Address the resolver answered.
    pub address: Address,
}

/// Resolves ENS names through the on-chain path.
pub trait NameResolver: Clone + Send + Sync + 'static {
    fn resolve(
        &self,
        chain_id: u64,
        name: &str,
    ) -> impl Future<Output = Result<Resolution, Error>> + Send;
}

/// Everything observed about a completed probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Full name the data layer was asked about.
    pub intercepted_name: String,
    /// Chain id the data layer was asked about.
    pub chain_id: u64,
    /// Name at which the on-chain resolver was found.
    pub on_chain_name: String,
    /// Address the on-chain resolution returned.
    pub address: Address,
}

impl Completion {
    /// Evaluate the completion against the chain the registration is for.
    pub fn evaluate(&self, expected_chain_id: u64) -> ResolverStatus {
        if self.address == Address::ZERO {
            ResolverStatus::IntermediateDomainNotSet
        } else if self.chain_id != expected_chain_id {
            ResolverStatus::ChainMismatch
        } else if self.address == SENTINEL {
            ResolverStatus::CorrectlySetup
        } else {
            ResolverStatus::UnexpectedAddress
        }
    }
}

/// An issued probe, awaitable once.
#[derive(Debug)]
pub struct Probe {
    id: String,
    receiver: oneshot::Receiver<Result<Completion, Error>>,
}

impl Probe {
    pub(crate) fn new(id: String, receiver: oneshot::Receiver<Result<Completion, Error>>) -> Self {
        Self { id, receiver }
    }

    /// The probe label.
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks;
    use futures::future::join_all;
    use prometheus_client::registry::Registry;
    use std::{collections::HashSet, time::Duration};
    use test_case::test_case;
    use tokio::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(20);

    fn start(resolver: mocks::Resolver) -> Mailbox {
        let mut registry = Registry::default();
        let (actor, mailbox) = Actor::new(Config {
            resolver: resolver.clone(),
            mailbox_size: 1024,
            metrics: Metrics::init(&mut registry),
        });
        resolver.connect(mailbox.clone());
        actor.start();
        mailbox
    }

    fn completion(chain_id: u64, address: Address) -> Completion {
        Completion {
            intercepted_name: "0011223344556677.alpha.eth".to_string(),
            chain_id,
            on_chain_name: "alpha.eth".to_string(),
            address,
        }
    }

    #[test_case(1, Address::ZERO, ResolverStatus::IntermediateDomainNotSet; "zero address")]
    #[test_case(5, Address::ZERO, ResolverStatus::IntermediateDomainNotSet; "zero address wrong chain")]
    #[test_case(5, SENTINEL, ResolverStatus::ChainMismatch; "sentinel wrong chain")]
    #[test_case(1, SENTINEL, ResolverStatus::CorrectlySetup; "sentinel")]
    #[test_case(1, address!("00000000000000000000000000000000000000ff"), ResolverStatus::UnexpectedAddress; "other address")]
    fn test_evaluate(chain_id: u64, address: Address, expected: ResolverStatus) {
        assert_eq!(completion(chain_id, address).evaluate(1), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_correctly_setup() {
        let resolver = mocks::Resolver::pointing_here(1, Duration::from_secs(2));
        let mut mailbox = start(resolver.clone());

        let probe = mailbox.issue("alpha.eth".to_string(), 1).await;
        let id = probe.id().to_string();
        let status = mailbox.await_result(probe, 1, TIMEOUT).await.unwrap();
        assert_eq!(status, ResolverStatus::CorrectlySetup);
        assert_eq!(resolver.requests(), vec![(1, format!("{id}.alpha.eth"))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_mismatch_precedes_sentinel() {
        let resolver = mocks::Resolver::pointing_here(5, Duration::from_secs(1));
        let mut mailbox = start(resolver);

        let probe = mailbox.issue("alpha.eth".to_string(), 1).await;
        let status = mailbox.await_result(probe, 1, TIMEOUT).await.unwrap();
        assert_eq!(status, ResolverStatus::ChainMismatch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_exact() {
        let resolver = mocks::Resolver::silent();
        let mut mailbox = start(resolver);

        let probe = mailbox.issue("alpha.eth".to_string(), 1).await;
        let started = Instant::now();
        let status = mailbox.await_result(probe, 1, TIMEOUT).await.unwrap();
        assert_eq!(status, ResolverStatus::BaseDomainNotPointingHere);
        assert_eq!(started.elapsed(), TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_without_intercept_times_out() {
        // Some other resolver answered: the gateway never saw the probe
        let resolver = mocks::Resolver::elsewhere(
            address!("00000000000000000000000000000000000000ff"),
            Duration::from_secs(1),
        );
        let mut mailbox = start(resolver);

        let probe = mailbox.issue("alpha.eth".to_string(), 1).await;
        let started = Instant::now();
        let status = mailbox.await_result(probe, 1, TIMEOUT).await.unwrap();
        assert_eq!(status, ResolverStatus::BaseDomainNotPointingHere);
        assert_eq!(started.elapsed(), TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_resolution_is_dropped() {
        let resolver = mocks::Resolver::pointing_here(1, Duration::from_secs(30));
        let mut mailbox = start(resolver.clone());

        let probe = mailbox.issue("alpha.eth".to_string(), 1).await;
        let id = probe.id().to_string();
        let status = mailbox.await_result(probe, 1, TIMEOUT).await.unwrap();
        assert_eq!(status, ResolverStatus::BaseDomainNotPointingHere);

        // The late intercept finds nothing pending
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(resolver.intercepts(), vec![false]);
        assert!(!mailbox.intercept(format!("{id}.alpha.eth"), 1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_read_failure_propagates() {
        let resolver = mocks::Resolver::failing();
        let mut mailbox = start(resolver);

        let probe = mailbox.issue("alpha.eth".to_string(), 1).await;
        let err = mailbox.await_result(probe, 1, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::ChainRead(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_are_independent() {
        let resolver = mocks::Resolver::pointing_here(1, Duration::from_secs(1));
        let mut mailbox = start(resolver);

        let waits = ["alpha.eth", "beta.eth", "gamma.eth"].map(|base| {
            let mut mailbox = mailbox.clone();
            async move {
                let probe = mailbox.issue(base.to_string(), 1).await;
                mailbox.await_result(probe, 1, TIMEOUT).await.unwrap()
            }
        });
        for status in join_all(waits).await {
            assert_eq!(status, ResolverStatus::CorrectlySetup);
        }
        assert!(!mailbox.intercept("alpha.eth".to_string(), 1).await);
    }

    #[tokio::test]
    async fn test_probe_ids_are_unique() {
        let resolver = mocks::Resolver::silent();
        let mut mailbox = start(resolver);

        let mut ids = HashSet::new();
        for _ in 0..10_000 {
            let probe = mailbox.issue("alpha.eth".to_string(), 1).await;
            assert_eq!(probe.id().len(), 16);
            assert!(probe.id().chars().all(|c| c.is_ascii_hexdigit()));
            ids.insert(probe.id().to_string());
        }
        assert_eq!(ids.len(), 10_000);
    }
}
