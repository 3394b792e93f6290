//! Verify gateway delegation and register token-bound ENS subdomains.
//!
//! A collection owner registers a base domain (`alpha.eth`) for a token contract. Before the
//! registration is accepted, the [probe] actor proves that the base domain's on-chain resolver
//! really delegates to this gateway: it resolves a random label under the base domain and waits
//! for that resolution to come back through the gateway's own data layer. Token holders then
//! register subdomains (`one.alpha.eth`) that resolve to the token-bound account of their token,
//! after [ownership] confirms they hold it.
//!
//! [service::Service] composes the flows and answers the data-layer reads the gateway issues.

use alloy_primitives::{Address, U256};
use std::future::Future;
use thiserror::Error;

pub mod account;
pub mod chain;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod ownership;
pub mod probe;
pub mod service;
pub mod store;
pub mod validation;

use probe::ResolverStatus;

/// Errors that can occur while registering or reading names.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("This name contains illegal characters {name} vs {sanitized}")]
    IllegalCharacters { name: String, sanitized: String },
    #[error("Domain name too long, limit is {0} characters.")]
    NameTooLong(usize),
    #[error("Signature must be 130 to 132 hex characters, got {0}")]
    MalformedSignature(usize),
    #[error("Invalid address {0}")]
    MalformedAddress(String),
    #[error("Invalid token id {0}")]
    MalformedTokenId(String),
    #[error("Invalid name {0}")]
    InvalidName(String),
    #[error("Base name {0} already registered")]
    BaseNameRegistered(String),
    #[error("Token Contract {chain_id} : {contract} already registered")]
    TokenContractRegistered { chain_id: u64, contract: Address },
    #[error("Name Unavailable")]
    NameUnavailable,
    #[error("Basename {0} not registered on the server, cannot create this domain name")]
    BaseNameNotRegistered(String),
    #[error("Name not registered")]
    NameNotRegistered,
    #[error("User does not own the NFT or signature is invalid")]
    NotOwner,
    #[error("Signature does not match owner")]
    SignerMismatch,
    #[error("Content hash {0} is not an IPFS CIDv0")]
    InvalidContentHash(String),
    #[error("{}", status_reason(.status, .base_name, .chain_id))]
    Status {
        status: ResolverStatus,
        base_name: String,
        chain_id: u64,
    },
    #[error("signature recovery failed: {0}")]
    Recovery(#[from] ensgate_cryptography::Error),
    #[error("chain read failed: {0}")]
    ChainRead(String),
    #[error("no endpoint configured for chain {0}")]
    UnsupportedChain(u64),
    #[error("probe canceled")]
    ProbeCanceled,
}

fn status_reason(status: &ResolverStatus, base_name: &str, chain_id: &u64) -> String {
    status.reason(base_name, *chain_id)
}

/// How an [Error] should be reported to a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// The request was well-formed but may not proceed.
    Rejected,
    /// The request could not be parsed.
    Malformed,
    /// A chain read failed; the request failed closed.
    ChainRead,
    /// The gateway itself failed.
    Internal,
}

impl Error {
    pub fn kind(&self) -> Kind {
        match self {
            Error::MalformedSignature(_)
            | Error::MalformedAddress(_)
            | Error::MalformedTokenId(_)
            | Error::InvalidName(_)
            | Error::Recovery(_) => Kind::Malformed,
            Error::IllegalCharacters { .. }
            | Error::NameTooLong(_)
            | Error::BaseNameRegistered(_)
            | Error::TokenContractRegistered { .. }
            | Error::NameUnavailable
            | Error::BaseNameNotRegistered(_)
            | Error::NameNotRegistered
            | Error::NotOwner
            | Error::SignerMismatch
            | Error::InvalidContentHash(_)
            | Error::Status { .. } => Kind::Rejected,
            Error::ChainRead(_) | Error::UnsupportedChain(_) => Kind::ChainRead,
            Error::ProbeCanceled => Kind::Internal,
        }
    }
}

/// Reads ERC-721 token ownership.
pub trait OwnerReader: Clone + Send + Sync + 'static {
    /// Returns the current holder of `token_id` in `contract` on `chain_id`.
    fn owner_of(
        &self,
        chain_id: u64,
        contract: Address,
        token_id: U256,
    ) -> impl Future<Output = Result<Address, Error>> + Send;
}

/// Reads ENS name ownership.
pub trait ChainReader: Clone + Send + Sync + 'static {
    /// Returns the owner of `name` in the ENS registry on `chain_id`, looking through the
    /// NameWrapper when the name is wrapped.
    fn domain_owner(
        &self,
        chain_id: u64,
        name: &str,
    ) -> impl Future<Output = Result<Address, Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Error::IllegalCharacters { name: "a b".into(), sanitized: "ab".into() }, Kind::Rejected ; "illegal characters")]
    #[test_case(Error::NameTooLong(80), Kind::Rejected ; "too long")]
    #[test_case(Error::BaseNameRegistered("alpha.eth".into()), Kind::Rejected ; "base name taken")]
    #[test_case(Error::TokenContractRegistered { chain_id: 137, contract: Address::ZERO }, Kind::Rejected ; "contract taken")]
    #[test_case(Error::NameUnavailable, Kind::Rejected ; "unavailable")]
    #[test_case(Error::BaseNameNotRegistered("alpha.eth".into()), Kind::Rejected ; "unknown base name")]
    #[test_case(Error::NameNotRegistered, Kind::Rejected ; "unknown name")]
    #[test_case(Error::NotOwner, Kind::Rejected ; "not owner")]
    #[test_case(Error::SignerMismatch, Kind::Rejected ; "signer mismatch")]
    #[test_case(Error::InvalidContentHash("0x".into()), Kind::Rejected ; "content hash")]
    #[test_case(Error::Status { status: ResolverStatus::ChainMismatch, base_name: "alpha.eth".into(), chain_id: 137 }, Kind::Rejected ; "resolver status")]
    #[test_case(Error::MalformedSignature(4), Kind::Malformed ; "signature")]
    #[test_case(Error::MalformedAddress("0x12".into()), Kind::Malformed ; "address")]
    #[test_case(Error::MalformedTokenId("seven".into()), Kind::Malformed ; "token id")]
    #[test_case(Error::InvalidName("".into()), Kind::Malformed ; "name")]
    #[test_case(Error::Recovery(ensgate_cryptography::Error::InvalidSignature), Kind::Malformed ; "recovery")]
    #[test_case(Error::ChainRead("timeout".into()), Kind::ChainRead ; "chain read")]
    #[test_case(Error::UnsupportedChain(10), Kind::ChainRead ; "unsupported chain")]
    #[test_case(Error::ProbeCanceled, Kind::Internal ; "canceled")]
    fn test_kind(err: Error, kind: Kind) {
        assert_eq!(err.kind(), kind);
    }
}
