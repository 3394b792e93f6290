//! Decode resolver calls and dispatch them to a [Lookup].

use crate::{abi, coin_type::ETH_COIN_TYPE, name, Error, Lookup, Record};
use alloy_primitives::{hex, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, warn};

/// A resolver call the gateway knows how to answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// `addr(bytes32)`
    Addr { node: B256 },
    /// `addr(bytes32,uint256)`
    AddrMulticoin { node: B256, coin_type: U256 },
    /// `text(bytes32,string)`
    Text { node: B256, key: String },
    /// `contenthash(bytes32)`
    Contenthash { node: B256 },
}

impl Query {
    /// Decode ABI-encoded call data.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or(Error::MalformedCall)?;
        if selector == abi::addr::addrCall::SELECTOR {
            let call =
                abi::addr::addrCall::abi_decode(data, true).map_err(|_| Error::MalformedCall)?;
            Ok(Self::Addr { node: call.node })
        } else if selector == abi::multicoin::addrCall::SELECTOR {
            let call = abi::multicoin::addrCall::abi_decode(data, true)
                .map_err(|_| Error::MalformedCall)?;
            Ok(Self::AddrMulticoin {
                node: call.node,
                coin_type: call.coinType,
            })
        } else if selector == abi::textCall::SELECTOR {
            let call = abi::textCall::abi_decode(data, true).map_err(|_| Error::MalformedCall)?;
            Ok(Self::Text {
                node: call.node,
                key: call.key,
            })
        } else if selector == abi::contenthashCall::SELECTOR {
            let call =
                abi::contenthashCall::abi_decode(data, true).map_err(|_| Error::MalformedCall)?;
            Ok(Self::Contenthash { node: call.node })
        } else {
            Err(Error::UnsupportedFunction(format!(
                "0x{}",
                hex::encode(selector)
            )))
        }
    }

    /// The node the call is about.
    pub fn node(&self) -> B256 {
        match self {
            Self::Addr { node }
            | Self::AddrMulticoin { node, .. }
            | Self::Text { node, .. }
            | Self::Contenthash { node } => *node,
        }
    }

    /// The Solidity signature of the call.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::Addr { .. } => abi::addr::addrCall::SIGNATURE,
            Self::AddrMulticoin { .. } => abi::multicoin::addrCall::SIGNATURE,
            Self::Text { .. } => abi::textCall::SIGNATURE,
            Self::Contenthash { .. } => abi::contenthashCall::SIGNATURE,
        }
    }
}

/// The encoded answer to a [Query].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    /// ABI-encoded return values of the resolver call.
    pub result: Vec<u8>,
    /// Seconds since the epoch after which the answer must not be accepted.
    pub valid_until: u64,
}

/// Answers resolver calls using a [Lookup].
///
/// Lookup failures never fail a call: addresses fall back to the zero address and text and
/// contenthash records fall back to empty values, all valid for `fallback_ttl`.
#[derive(Clone)]
pub struct Dispatcher<L: Lookup> {
    lookup: L,
    fallback_ttl: u64,
}

impl<L: Lookup> Dispatcher<L> {
    pub fn new(lookup: L, fallback_ttl: u64) -> Self {
        Self {
            lookup,
            fallback_ttl,
        }
    }

    /// Answer `data` (a resolver call) about the DNS-encoded `encoded_name`, on behalf of the
    /// `resolver` contract, at `now` (seconds since the epoch).
    pub async fn handle(
        &self,
        resolver: Address,
        encoded_name: &[u8],
        data: &[u8],
        now: u64,
    ) -> Result<(Query, Answer), Error> {
        let name = name::dns_decode(encoded_name)?;
        let query = Query::decode(data)?;
        if !name::is_normalized(&name) {
            return Err(Error::NameNotNormalized);
        }
        if name::namehash(&name) != query.node() {
            return Err(Error::NameMismatch);
        }
        debug!(%name, function = query.signature(), ?resolver, "dispatching query");

        let (result, ttl) = match &query {
            Query::Addr { .. } => {
                let record = self.addr(&name, ETH_COIN_TYPE, resolver).await;
                (
                    abi::addr::addrCall::abi_encode_returns(&(record.value,)),
                    record.ttl,
                )
            }
            Query::AddrMulticoin { coin_type, .. } => {
                let record = match u64::try_from(*coin_type) {
                    Ok(coin_type) => self.addr(&name, coin_type, resolver).await,
                    Err(_) => {
                        debug!(%name, %coin_type, "coin type out of range");
                        self.fallback(Address::ZERO)
                    }
                };
                let value = Bytes::copy_from_slice(record.value.as_slice());
                (
                    abi::multicoin::addrCall::abi_encode_returns(&(value,)),
                    record.ttl,
                )
            }
            Query::Text { key, .. } => {
                let record = match self.lookup.text(&name, key, resolver).await {
                    Ok(record) => record,
                    Err(err) => {
                        warn!(?err, %name, %key, "text lookup failed");
                        self.fallback(String::new())
                    }
                };
                (abi::textCall::abi_encode_returns(&(record.value,)), record.ttl)
            }
            Query::Contenthash { .. } => {
                let record = match self.lookup.contenthash(&name, resolver).await {
                    Ok(record) => record,
                    Err(err) => {
                        warn!(?err, %name, "contenthash lookup failed");
                        self.fallback(Bytes::new())
                    }
                };
                (
                    abi::contenthashCall::abi_encode_returns(&(record.value,)),
                    record.ttl,
                )
            }
        };
        let answer = Answer {
            result,
            valid_until: now.saturating_add(ttl),
        };
        Ok((query, answer))
    }

    async fn addr(&self, name: &str, coin_type: u64, resolver: Address) -> Record<Address> {
        match self.lookup.addr(name, coin_type, resolver).await {
            Ok(record) => record,
            Err(err) => {
                warn!(?err, name, coin_type, "address lookup failed");
                self.fallback(Address::ZERO)
            }
        }
    }

    fn fallback<T>(&self, value: T) -> Record<T> {
        Record {
            value,
            ttl: self.fallback_ttl,
        }
    }
}
