//! Chain and resolver doubles for tests.

use crate::{
    probe::{Mailbox, NameResolver, Resolution, SENTINEL},
    ChainReader, Error, OwnerReader,
};
use alloy_primitives::{Address, U256};
use futures::future::{self, BoxFuture};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Answers the data-layer address request a resolution ends in.
pub type Hook = Arc<dyn Fn(String, u64) -> BoxFuture<'static, Address> + Send + Sync>;

#[derive(Clone)]
enum Behavior {
    /// Resolve through the gateway, which sees chain `chain_id`.
    Gateway { chain_id: u64, delay: Duration },
    /// Some other resolver answers `address`.
    Elsewhere { address: Address, delay: Duration },
    /// Never complete.
    Silent,
    /// Fail the RPC.
    Failing,
}

#[derive(Default)]
struct ResolverState {
    hook: Option<Hook>,
    requests: Vec<(u64, String)>,
    intercepts: Vec<bool>,
}

/// A [NameResolver] that plays the part of the chain in a probe round trip.
#[derive(Clone)]
pub struct Resolver {
    behavior: Behavior,
    state: Arc<Mutex<ResolverState>>,
}

impl Resolver {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            state: Arc::new(Mutex::new(ResolverState::default())),
        }
    }

    /// The base domain delegates to the gateway, which is asked about `chain_id` after `delay`.
    pub fn pointing_here(chain_id: u64, delay: Duration) -> Self {
        Self::with(Behavior::Gateway { chain_id, delay })
    }

    /// The base domain resolves through some other resolver.
    pub fn elsewhere(address: Address, delay: Duration) -> Self {
        Self::with(Behavior::Elsewhere { address, delay })
    }

    /// Resolution never completes.
    pub fn silent() -> Self {
        Self::with(Behavior::Silent)
    }

    /// Resolution fails with a chain read error.
    pub fn failing() -> Self {
        Self::with(Behavior::Failing)
    }

    /// Route gateway requests straight to the probe actor.
    pub fn connect(&self, mailbox: Mailbox) {
        self.connect_hook(Arc::new(move |name: String, chain_id: u64| -> BoxFuture<'static, Address> {
            let mut mailbox = mailbox.clone();
            Box::pin(async move {
                if mailbox.intercept(name, chain_id).await {
                    SENTINEL
                } else {
                    Address::ZERO
                }
            })
        }));
    }

    /// Route gateway requests through `hook`.
    pub fn connect_hook(&self, hook: Hook) {
        self.state.lock().unwrap().hook = Some(hook);
    }

    /// Names resolved so far, with the chain they were resolved on.
    pub fn requests(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().requests.clone()
    }

    /// For each gateway request, whether the gateway recognized the probe.
    pub fn intercepts(&self) -> Vec<bool> {
        self.state.lock().unwrap().intercepts.clone()
    }
}

impl NameResolver for Resolver {
    async fn resolve(&self, chain_id: u64, name: &str) -> Result<Resolution, Error> {
        let hook = {
            let mut state = self.state.lock().unwrap();
            state.requests.push((chain_id, name.to_string()));
            state.hook.clone()
        };
        let on_chain_name = name
            .split_once('.')
            .map(|(_, base)| base.to_string())
            .unwrap_or_default();
        match self.behavior.clone() {
            Behavior::Gateway { chain_id, delay } => {
                tokio::time::sleep(delay).await;
                let hook = hook.ok_or_else(|| Error::ChainRead("gateway not connected".into()))?;
                let address = hook(name.to_string(), chain_id).await;
                self.state
                    .lock()
                    .unwrap()
                    .intercepts
                    .push(address == SENTINEL);
                Ok(Resolution {
                    on_chain_name,
                    address,
                })
            }
            Behavior::Elsewhere { address, delay } => {
                tokio::time::sleep(delay).await;
                Ok(Resolution {
                    on_chain_name,
                    address,
                })
            }
            Behavior::Silent => future::pending().await,
            Behavior::Failing => Err(Error::ChainRead("rpc unavailable".to_string())),
        }
    }
}

#[derive(Default)]
struct ChainState {
    tokens: HashMap<(u64, Address, U256), Address>,
    domains: HashMap<(u64, String), Address>,
    owner_reads: usize,
    failing: bool,
}

/// An [OwnerReader] and [ChainReader] backed by maps, counting token owner reads.
#[derive(Clone, Default)]
pub struct Chain {
    state: Arc<Mutex<ChainState>>,
}

impl Chain {
    pub fn set_token_owner(&self, chain_id: u64, contract: Address, token_id: U256, owner: Address) {
        self.state
            .lock()
            .unwrap()
            .tokens
            .insert((chain_id, contract, token_id), owner);
    }

    pub fn set_domain_owner(&self, chain_id: u64, name: &str, owner: Address) {
        self.state
            .lock()
            .unwrap()
            .domains
            .insert((chain_id, name.to_string()), owner);
    }

    /// Make every subsequent read fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Number of `ownerOf` reads served.
    pub fn owner_reads(&self) -> usize {
        self.state.lock().unwrap().owner_reads
    }
}

impl OwnerReader for Chain {
    async fn owner_of(
        &self,
        chain_id: u64,
        contract: Address,
        token_id: U256,
    ) -> Result<Address, Error> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(Error::ChainRead("rpc unavailable".to_string()));
        }
        state.owner_reads += 1;
        state
            .tokens
            .get(&(chain_id, contract, token_id))
            .copied()
            .ok_or_else(|| Error::ChainRead("execution reverted".to_string()))
    }
}

impl ChainReader for Chain {
    async fn domain_owner(&self, chain_id: u64, name: &str) -> Result<Address, Error> {
        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(Error::ChainRead("rpc unavailable".to_string()));
        }
        Ok(state
            .domains
            .get(&(chain_id, name.to_string()))
            .copied()
            .unwrap_or(Address::ZERO))
    }
}
