use super::Service;
use crate::{probe::SENTINEL, store::Store, ChainReader, OwnerReader};
use alloy_primitives::{Address, U256};
use ensgate_resolver::{coin_type, name::split_first};
use tracing::debug;

/// ENSIP-7 prefix of an IPFS (dag-pb) contenthash.
const IPFS_CONTENTHASH_PREFIX: [u8; 4] = [0xe3, 0x01, 0x01, 0x70];

/// Probe labels are 8 bytes of hex.
fn is_probe_label(label: &str) -> bool {
    label.len() == 16 && label.bytes().all(|b| b.is_ascii_hexdigit())
}

impl<S: Store, C: OwnerReader + ChainReader> Service<S, C> {
    /// Address of `name` for `coin_type`, as asked by the gateway serving chain `chain_id`.
    ///
    /// Probe names answer [SENTINEL]. Otherwise a stored override for the coin type wins, then
    /// the name's pointed address if the coin type is its token chain, else the zero address.
    pub async fn addr(&self, name: &str, coin_type: u64, chain_id: u64) -> Address {
        if split_first(name).is_some_and(|(label, _)| is_probe_label(label)) {
            let mut probes = self.probes.clone();
            if probes.intercept(name.to_string(), chain_id).await {
                return SENTINEL;
            }
        }
        if let Some(address) = self.store.addr_override(name, coin_type) {
            return address;
        }
        let Some(record) = self.store.name(name) else {
            return Address::ZERO;
        };
        if coin_type::to_chain_id(coin_type) == Some(record.chain_id) {
            return record.address;
        }
        debug!(name, coin_type, chain_id = record.chain_id, "coin type not served");
        Address::ZERO
    }

    /// Text record `key` of `name`, or the empty string.
    pub fn text(&self, name: &str, key: &str) -> String {
        self.store.text(name, key).unwrap_or_default()
    }

    /// ENSIP-7 contenthash of `name`, or empty.
    pub fn contenthash(&self, name: &str) -> Vec<u8> {
        match self.store.contenthash(name) {
            Some(multihash) => [IPFS_CONTENTHASH_PREFIX.as_slice(), &multihash].concat(),
            None => Vec::new(),
        }
    }

    /// Returns true if `name` can still be registered.
    pub fn is_available(&self, name: &str) -> bool {
        self.store.name(name).is_none()
    }

    /// Token id `name` was registered for on `chain_id`.
    pub fn token_id(&self, chain_id: u64, name: &str) -> Option<U256> {
        self.store
            .name(name)
            .filter(|record| record.chain_id == chain_id)
            .map(|record| record.token_id)
    }

    /// Name registered for `token_id` of `contract` on `chain_id`.
    pub fn name_for_token(&self, chain_id: u64, contract: Address, token_id: U256) -> Option<String> {
        self.store.name_by_token(chain_id, contract, token_id)
    }

    /// Number of registered names.
    pub fn count(&self) -> usize {
        self.store.count()
    }
}
