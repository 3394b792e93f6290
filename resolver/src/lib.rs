//! Answer ENS resolver queries for CCIP-Read gateways.
//!
//! An ENSIP-10 resolver that reverts with `OffchainLookup` hands the gateway a DNS-encoded name
//! and the ABI-encoded resolver call it could not answer on-chain. [query::Dispatcher] decodes
//! that call, validates it against the name, and asks a [Lookup] for the value. [service::Service]
//! wraps the answer in the signed envelope the on-chain verifier expects.

use alloy_primitives::{Address, Bytes};
use std::future::Future;
use thiserror::Error;

pub mod abi;
pub mod coin_type;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod name;
pub mod query;
pub mod service;

/// Errors that can occur when answering a resolver query.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid DNS-encoded name: {0}")]
    InvalidName(&'static str),
    #[error("name must be normalised")]
    NameNotNormalized,
    #[error("name does not match namehash")]
    NameMismatch,
    #[error("unsupported query function {0}")]
    UnsupportedFunction(String),
    #[error("malformed resolver call")]
    MalformedCall,
    #[error("malformed request")]
    MalformedRequest,
    #[error("no implementation for function with selector {0}")]
    UnknownEntryPoint(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("signing failed: {0}")]
    Signing(#[from] ensgate_cryptography::Error),
}

impl Error {
    /// Returns true if the error was caused by the caller rather than the gateway.
    pub fn is_protocol(&self) -> bool {
        !matches!(self, Error::Lookup(_) | Error::Signing(_))
    }
}

/// A value returned by a [Lookup] and how long it may be cached for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record<T> {
    pub value: T,
    /// Seconds the answer stays valid.
    pub ttl: u64,
}

/// Lookup is the data layer the dispatcher consults for record values.
///
/// `resolver` is the contract that issued the `OffchainLookup`.
pub trait Lookup: Clone + Send + Sync + 'static {
    /// Resolve the address of `name` for an ENSIP-11 coin type.
    fn addr(
        &self,
        name: &str,
        coin_type: u64,
        resolver: Address,
    ) -> impl Future<Output = Result<Record<Address>, Error>> + Send;

    /// Resolve a text record.
    fn text(
        &self,
        name: &str,
        key: &str,
        resolver: Address,
    ) -> impl Future<Output = Result<Record<String>, Error>> + Send;

    /// Resolve the ENSIP-7 contenthash.
    fn contenthash(
        &self,
        name: &str,
        resolver: Address,
    ) -> impl Future<Output = Result<Record<Bytes>, Error>> + Send;
}
