//! Registered base domains, names and their records.

use crate::Error;
use alloy_primitives::{Address, U256};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

/// A base domain bound to a token contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseDomain {
    pub name: String,
    pub token_contract: Address,
    pub chain_id: u64,
    pub owner: Address,
}

/// A subdomain registered for one token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameRecord {
    pub name: String,
    /// Address the name resolves to on its token chain.
    pub address: Address,
    /// Chain the token lives on.
    pub chain_id: u64,
    pub token_id: U256,
    /// Last known token holder.
    pub owner: Address,
    /// Chain the ENS name was registered for, if given.
    pub ens_chain_id: Option<u64>,
}

/// Persistence for registrations and records.
///
/// Inserts enforce uniqueness atomically so that two concurrent registrations cannot both pass.
pub trait Store: Clone + Send + Sync + 'static {
    fn base_domain(&self, name: &str) -> Option<BaseDomain>;

    fn base_domain_for_contract(&self, chain_id: u64, contract: Address) -> Option<BaseDomain>;

    /// Fails if the name or the `(chain, contract)` pair is already registered.
    fn insert_base_domain(&self, domain: BaseDomain) -> Result<(), Error>;

    fn name(&self, name: &str) -> Option<NameRecord>;

    /// Fails if the name is taken.
    fn insert_name(&self, record: NameRecord) -> Result<(), Error>;

    fn set_owner(&self, name: &str, owner: Address);

    fn text(&self, name: &str, key: &str) -> Option<String>;

    fn set_text(&self, name: &str, key: &str, value: &str);

    /// The sha2-256 multihash of the name's IPFS content.
    fn contenthash(&self, name: &str) -> Option<Vec<u8>>;

    fn set_contenthash(&self, name: &str, multihash: Vec<u8>);

    fn addr_override(&self, name: &str, coin_type: u64) -> Option<Address>;

    fn set_addr_override(&self, name: &str, coin_type: u64, address: Address);

    /// Name registered for `token_id` under the base domain bound to `(chain, contract)`.
    fn name_by_token(&self, chain_id: u64, contract: Address, token_id: U256) -> Option<String>;

    /// Number of registered names.
    fn count(&self) -> usize;
}

#[derive(Default)]
struct Records {
    texts: BTreeMap<String, String>,
    contenthash: Option<Vec<u8>>,
    addresses: BTreeMap<u64, Address>,
}

#[derive(Default)]
struct State {
    base_domains: HashMap<String, BaseDomain>,
    contracts: HashMap<(u64, Address), String>,
    names: HashMap<String, NameRecord>,
    records: HashMap<String, Records>,
}

/// A [Store] held in memory.
#[derive(Clone, Default)]
pub struct Memory {
    state: Arc<Mutex<State>>,
}

impl Store for Memory {
    fn base_domain(&self, name: &str) -> Option<BaseDomain> {
        self.state.lock().unwrap().base_domains.get(name).cloned()
    }

    fn base_domain_for_contract(&self, chain_id: u64, contract: Address) -> Option<BaseDomain> {
        let state = self.state.lock().unwrap();
        let name = state.contracts.get(&(chain_id, contract))?;
        state.base_domains.get(name).cloned()
    }

    fn insert_base_domain(&self, domain: BaseDomain) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if state.base_domains.contains_key(&domain.name) {
            return Err(Error::BaseNameRegistered(domain.name));
        }
        let key = (domain.chain_id, domain.token_contract);
        if state.contracts.contains_key(&key) {
            return Err(Error::TokenContractRegistered {
                chain_id: domain.chain_id,
                contract: domain.token_contract,
            });
        }
        state.contracts.insert(key, domain.name.clone());
        state.base_domains.insert(domain.name.clone(), domain);
        Ok(())
    }

    fn name(&self, name: &str) -> Option<NameRecord> {
        self.state.lock().unwrap().names.get(name).cloned()
    }

    fn insert_name(&self, record: NameRecord) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if state.names.contains_key(&record.name) {
            return Err(Error::NameUnavailable);
        }
        state.names.insert(record.name.clone(), record);
        Ok(())
    }

    fn set_owner(&self, name: &str, owner: Address) {
        if let Some(record) = self.state.lock().unwrap().names.get_mut(name) {
            record.owner = owner;
        }
    }

    fn text(&self, name: &str, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.records.get(name)?.texts.get(key).cloned()
    }

    fn set_text(&self, name: &str, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        let records = state.records.entry(name.to_string()).or_default();
        records.texts.insert(key.to_string(), value.to_string());
    }

    fn contenthash(&self, name: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.records.get(name)?.contenthash.clone()
    }

    fn set_contenthash(&self, name: &str, multihash: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        state.records.entry(name.to_string()).or_default().contenthash = Some(multihash);
    }

    fn addr_override(&self, name: &str, coin_type: u64) -> Option<Address> {
        let state = self.state.lock().unwrap();
        state.records.get(name)?.addresses.get(&coin_type).copied()
    }

    fn set_addr_override(&self, name: &str, coin_type: u64, address: Address) {
        let mut state = self.state.lock().unwrap();
        let records = state.records.entry(name.to_string()).or_default();
        records.addresses.insert(coin_type, address);
    }

    fn name_by_token(&self, chain_id: u64, contract: Address, token_id: U256) -> Option<String> {
        let state = self.state.lock().unwrap();
        let base = state.contracts.get(&(chain_id, contract))?;
        let suffix = format!(".{base}");
        state
            .names
            .values()
            .find(|record| {
                record.chain_id == chain_id
                    && record.token_id == token_id
                    && record.name.ends_with(&suffix)
            })
            .map(|record| record.name.clone())
    }

    fn count(&self) -> usize {
        self.state.lock().unwrap().names.len()
    }
}
