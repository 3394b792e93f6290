//! Registration flows and the data layer behind the gateway.
//!
//! The [Service] is shared by every HTTP handler. Registration flows run their synchronous
//! pre-checks first (name, signature, uniqueness), then the slow checks (probe, signature
//! recovery, chain reads), and only write to the [Store] once every check has passed.

use crate::{
    account,
    ownership::Verifier,
    probe::{self, ResolverStatus},
    store::Store,
    validation::NAME_LIMIT,
    ChainReader, Error, OwnerReader,
};
use std::time::Duration;

mod data;
mod register;
pub use register::{AddressRequest, BaseDomainRequest, ContentRequest, SubdomainRequest, TextRequest};

/// Configuration for the [Service].
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum name length, in characters
    pub name_limit: usize,

    /// How long a base domain probe may take to complete
    pub resolver_timeout: Duration,

    /// ENS deployment probes are resolved on when a request does not name one
    pub default_ens_chain_id: u64,

    /// Token-bound account derivation
    pub account: account::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name_limit: NAME_LIMIT,
            resolver_timeout: Duration::from_secs(20),
            default_ens_chain_id: 1,
            account: account::Config::default(),
        }
    }
}

/// Registers names and answers the data-layer reads for them.
#[derive(Clone)]
pub struct Service<S: Store, C: OwnerReader + ChainReader> {
    cfg: Config,
    store: S,
    chain: C,
    ownership: Verifier<C>,
    probes: probe::Mailbox,
}

impl<S: Store, C: OwnerReader + ChainReader> Service<S, C> {
    pub fn new(
        cfg: Config,
        store: S,
        chain: C,
        ownership: Verifier<C>,
        probes: probe::Mailbox,
    ) -> Self {
        Self {
            cfg,
            store,
            chain,
            ownership,
            probes,
        }
    }

    /// Prove that `base_name` delegates to this gateway.
    ///
    /// The probe is resolved on `ens_chain_id` and must come back through the gateway for
    /// `chain_id`.
    async fn check_resolver(
        &self,
        base_name: &str,
        ens_chain_id: u64,
        chain_id: u64,
    ) -> Result<(), Error> {
        let mut probes = self.probes.clone();
        let probe = probes.issue(base_name.to_string(), ens_chain_id).await;
        let status = probes
            .await_result(probe, chain_id, self.cfg.resolver_timeout)
            .await?;
        if status != ResolverStatus::CorrectlySetup {
            return Err(Error::Status {
                status,
                base_name: base_name.to_string(),
                chain_id,
            });
        }
        Ok(())
    }
}
