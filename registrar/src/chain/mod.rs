//! Read ERC-721 owners and ENS state over JSON-RPC.
//!
//! [Client] is the production [OwnerReader], [ChainReader] and [NameResolver]. ENS resolution
//! walks up the name to find its resolver ([ENSIP-10](https://docs.ens.domains/ensip/10)) and
//! follows `OffchainLookup` reverts through their gateways, so that resolving a probe name under a
//! base domain that delegates to this gateway makes the full round trip back to it.

use crate::{
    probe::{NameResolver, Resolution},
    ChainReader, Error, OwnerReader,
};
use alloy_primitives::{address, Address, U256};
use alloy_sol_types::SolCall;
use ensgate_resolver::name::{dns_encode, namehash, parent};
use std::{collections::HashMap, time::Duration};
use tracing::debug;

pub mod offchain;
pub mod rpc;

mod abi {
    alloy_sol_types::sol! {
        function resolver(bytes32 node) external view returns (address);
        function owner(bytes32 node) external view returns (address);
        function ownerOf(uint256 tokenId) external view returns (address);
        function supportsInterface(bytes4 interfaceId) external view returns (bool);
        function resolve(bytes name, bytes data) external view returns (bytes);
        function addr(bytes32 node) external view returns (address);

        error OffchainLookup(address sender, string[] urls, bytes callData, bytes4 callbackFunction, bytes extraData);
    }
}

/// Interface id of `IExtendedResolver`.
const EXTENDED_RESOLVER: [u8; 4] = [0x90, 0x61, 0xb9, 0x23];

/// Configuration for the chain [Client].
#[derive(Clone, Debug)]
pub struct Config {
    /// JSON-RPC endpoint per chain id
    pub endpoints: HashMap<u64, String>,

    /// ENS registry (same address on every chain ENS is deployed to)
    pub ens_registry: Address,

    /// NameWrapper per chain id
    pub name_wrappers: HashMap<u64, Address>,

    /// Maximum number of `OffchainLookup`s followed per call
    pub max_redirects: usize,

    /// Timeout for each HTTP request
    pub request_timeout: Duration,
}

impl Config {
    /// Configuration with the public ENS deployments.
    pub fn new(endpoints: HashMap<u64, String>) -> Self {
        Self {
            endpoints,
            ens_registry: address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e"),
            name_wrappers: HashMap::from([
                (1, address!("D4416b13d2b3a9aBae7AcD5D6C2BbDBE25686401")),
                (11155111, address!("0635513f179D50A207757E05759CbD106d7dFcE8")),
            ]),
            max_redirects: 4,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Reads chain state for the registrar.
#[derive(Clone)]
pub struct Client {
    rpc: rpc::Rpc,
    offchain: offchain::Client,
    ens_registry: Address,
    name_wrappers: HashMap<u64, Address>,
}

impl Client {
    pub fn new(cfg: Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|err| Error::ChainRead(err.to_string()))?;
        let rpc = rpc::Rpc::new(http.clone(), cfg.endpoints)?;
        Ok(Self {
            offchain: offchain::Client::new(rpc.clone(), http, cfg.max_redirects),
            rpc,
            ens_registry: cfg.ens_registry,
            name_wrappers: cfg.name_wrappers,
        })
    }

    /// Find the resolver for `name`, walking up to its ancestors.
    ///
    /// Returns the resolver and the name it was found at.
    async fn find_resolver(&self, chain_id: u64, name: &str) -> Result<Option<(Address, String)>, Error> {
        let mut current = Some(name);
        while let Some(candidate) = current.filter(|c| !c.is_empty()) {
            let call = abi::resolverCall {
                node: namehash(candidate),
            };
            let data = self
                .rpc
                .call(chain_id, self.ens_registry, &call.abi_encode())
                .await?
                .success()?;
            let resolver = abi::resolverCall::abi_decode_returns(&data, true)
                .map_err(|err| Error::ChainRead(err.to_string()))?
                ._0;
            if resolver != Address::ZERO {
                return Ok(Some((resolver, candidate.to_string())));
            }
            current = parent(candidate);
        }
        Ok(None)
    }

    async fn supports_extended(&self, chain_id: u64, resolver: Address) -> Result<bool, Error> {
        let call = abi::supportsInterfaceCall {
            interfaceId: EXTENDED_RESOLVER.into(),
        };
        match self
            .rpc
            .call(chain_id, resolver, &call.abi_encode())
            .await?
        {
            rpc::Call::Success(data) => Ok(abi::supportsInterfaceCall::abi_decode_returns(&data, true)
                .map(|r| r._0)
                .unwrap_or(false)),
            rpc::Call::Revert(_) => Ok(false),
        }
    }
}

impl OwnerReader for Client {
    async fn owner_of(&self, chain_id: u64, contract: Address, token_id: U256) -> Result<Address, Error> {
        let call = abi::ownerOfCall { tokenId: token_id };
        let data = self
            .rpc
            .call(chain_id, contract, &call.abi_encode())
            .await?
            .success()?;
        let owner = abi::ownerOfCall::abi_decode_returns(&data, true)
            .map_err(|err| Error::ChainRead(err.to_string()))?
            ._0;
        Ok(owner)
    }
}

impl ChainReader for Client {
    async fn domain_owner(&self, chain_id: u64, name: &str) -> Result<Address, Error> {
        let node = namehash(name);
        let call = abi::ownerCall { node };
        let data = self
            .rpc
            .call(chain_id, self.ens_registry, &call.abi_encode())
            .await?
            .success()?;
        let owner = abi::ownerCall::abi_decode_returns(&data, true)
            .map_err(|err| Error::ChainRead(err.to_string()))?
            ._0;

        // Wrapped names are held by the NameWrapper; the real owner holds the ERC-1155 token
        match self.name_wrappers.get(&chain_id) {
            Some(wrapper) if *wrapper == owner => {
                let token_id = U256::from_be_bytes(node.0);
                self.owner_of(chain_id, owner, token_id).await
            }
            _ => Ok(owner),
        }
    }
}

impl NameResolver for Client {
    async fn resolve(&self, chain_id: u64, name: &str) -> Result<Resolution, Error> {
        let Some((resolver, on_chain_name)) = self.find_resolver(chain_id, name).await? else {
            debug!(chain_id, name, "no resolver");
            return Ok(Resolution {
                on_chain_name: String::new(),
                address: Address::ZERO,
            });
        };
        let node = namehash(name);
        let inner = abi::addrCall { node }.abi_encode();

        let address = if self.supports_extended(chain_id, resolver).await? {
            let encoded = dns_encode(name).map_err(|err| Error::InvalidName(err.to_string()))?;
            let call = abi::resolveCall {
                name: encoded.into(),
                data: inner.into(),
            };
            let data = self
                .offchain
                .call(chain_id, resolver, call.abi_encode())
                .await?;
            let result = abi::resolveCall::abi_decode_returns(&data, true)
                .map_err(|err| Error::ChainRead(err.to_string()))?
                ._0;
            abi::addrCall::abi_decode_returns(&result, true)
                .map_err(|err| Error::ChainRead(err.to_string()))?
                ._0
        } else if on_chain_name == name {
            let data = self.offchain.call(chain_id, resolver, inner).await?;
            abi::addrCall::abi_decode_returns(&data, true)
                .map_err(|err| Error::ChainRead(err.to_string()))?
                ._0
        } else {
            Address::ZERO
        };
        debug!(chain_id, name, %on_chain_name, ?resolver, ?address, "resolved");
        Ok(Resolution {
            on_chain_name,
            address,
        })
    }
}
