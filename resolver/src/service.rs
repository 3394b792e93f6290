//! Sign answers to `IResolverService.resolve` calls.

use crate::{abi, query::Dispatcher, Error, Lookup};
use alloy_primitives::{hex, Address, Bytes};
use alloy_sol_types::SolCall;
use ensgate_cryptography::{ccip, Secp256k1};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Configuration for the [Service].
#[derive(Clone, Debug)]
pub struct Config {
    /// Key that signs every response.
    pub signer: Secp256k1,

    /// Seconds an answer stays valid when the lookup could not supply a TTL.
    pub ttl: u64,
}

/// Label for query metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FunctionLabel {
    /// Solidity signature of the resolver call.
    pub function: String,
}

/// Metrics for the [Service].
#[derive(Clone, Default)]
pub struct Metrics {
    /// Number of answered queries by function
    pub queries: Family<FunctionLabel, Counter>,
    /// Number of queries that could not be answered
    pub errors: Counter,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given registry.
    pub fn init(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register(
            "ccip_queries",
            "Number of answered queries by function",
            metrics.queries.clone(),
        );
        registry.register(
            "ccip_errors",
            "Number of queries that could not be answered",
            metrics.errors.clone(),
        );
        metrics
    }
}

/// Answers `resolve(bytes,bytes)` calls with signed responses.
#[derive(Clone)]
pub struct Service<L: Lookup> {
    dispatcher: Dispatcher<L>,
    signer: Secp256k1,
    metrics: Metrics,
}

impl<L: Lookup> Service<L> {
    pub fn new(cfg: Config, lookup: L, metrics: Metrics) -> Self {
        Self {
            dispatcher: Dispatcher::new(lookup, cfg.ttl),
            signer: cfg.signer,
            metrics,
        }
    }

    /// Address that verifiers should trust.
    pub fn signer(&self) -> Address {
        self.signer.address()
    }

    /// Answer `data`, an ABI-encoded `resolve(bytes,bytes)` call sent to `sender`.
    ///
    /// Returns `abi.encode(result, expires, sig)`.
    pub async fn resolve(&self, sender: Address, data: &[u8]) -> Result<Bytes, Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let response = self.resolve_at(sender, data, now).await;
        if let Err(err) = &response {
            self.metrics.errors.inc();
            warn!(?err, ?sender, "failed to answer query");
        }
        response
    }

    async fn resolve_at(&self, sender: Address, data: &[u8], now: u64) -> Result<Bytes, Error> {
        let selector = data.get(..4).ok_or(Error::MalformedRequest)?;
        if selector != abi::resolveCall::SELECTOR {
            return Err(Error::UnknownEntryPoint(format!("0x{}", hex::encode(selector))));
        }
        let call = abi::resolveCall::abi_decode(data, true).map_err(|_| Error::MalformedRequest)?;

        let (query, answer) = self
            .dispatcher
            .handle(sender, &call.name, &call.data, now)
            .await?;
        let sig = ccip::sign(&self.signer, &sender, answer.valid_until, data, &answer.result)?;
        self.metrics
            .queries
            .get_or_create(&FunctionLabel {
                function: query.signature().to_string(),
            })
            .inc();
        debug!(
            function = query.signature(),
            valid_until = answer.valid_until,
            "signed answer"
        );

        let encoded = abi::resolveCall::abi_encode_returns(&(
            Bytes::from(answer.result),
            answer.valid_until,
            Bytes::copy_from_slice(&sig),
        ));
        Ok(encoded.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mocks,
        name::{dns_encode, namehash},
    };
    use alloy_primitives::{address, U256};

    const RESOLVER: Address = address!("00000000000000000000000000000000000000aa");

    fn service(lookup: mocks::Lookup) -> (Service<mocks::Lookup>, Registry) {
        let mut registry = Registry::default();
        let metrics = Metrics::init(&mut registry);
        let cfg = Config {
            signer: Secp256k1::from_seed(5),
            ttl: 300,
        };
        (Service::new(cfg, lookup, metrics), registry)
    }

    fn request(name: &str, inner: Vec<u8>) -> Vec<u8> {
        abi::resolveCall {
            name: dns_encode(name).unwrap().into(),
            data: inner.into(),
        }
        .abi_encode()
    }

    #[tokio::test]
    async fn test_signed_response_recovers_signer() {
        let lookup = mocks::Lookup::new(60);
        let account = address!("3333333333333333333333333333333333333333");
        lookup.set_addr("one.alpha.eth", 0x8000_0089, account);
        let (service, _) = service(lookup);

        let inner = abi::multicoin::addrCall {
            node: namehash("one.alpha.eth"),
            coinType: U256::from(0x8000_0089u64),
        }
        .abi_encode();
        let data = request("one.alpha.eth", inner);
        let response = service.resolve_at(RESOLVER, &data, 1_000).await.unwrap();

        let decoded = abi::resolveCall::abi_decode_returns(&response, true).unwrap();
        assert_eq!(decoded.expires, 1_060);
        assert_eq!(decoded.sig.len(), 64);
        let recovered = ccip::recover(
            &decoded.sig,
            &RESOLVER,
            decoded.expires,
            &data,
            &decoded.result,
        )
        .unwrap();
        assert_eq!(recovered, service.signer());

        let inner = abi::multicoin::addrCall::abi_decode_returns(&decoded.result, true).unwrap();
        assert_eq!(inner._0.as_ref(), account.as_slice());
    }

    #[tokio::test]
    async fn test_unknown_entry_point() {
        let (service, _) = service(mocks::Lookup::new(60));
        let err = service
            .resolve(RESOLVER, &[0xde, 0xad, 0xbe, 0xef])
            .await
            .unwrap_err();
        assert_eq!(err, Error::UnknownEntryPoint("0xdeadbeef".to_string()));
        assert_eq!(service.metrics.errors.get(), 1);
    }

    #[tokio::test]
    async fn test_protocol_errors_propagate() {
        let (service, _) = service(mocks::Lookup::new(60));
        let inner = abi::addr::addrCall {
            node: namehash("other.eth"),
        }
        .abi_encode();
        let data = request("alpha.eth", inner);
        assert_eq!(
            service.resolve(RESOLVER, &data).await.unwrap_err(),
            Error::NameMismatch
        );
    }

    #[tokio::test]
    async fn test_metrics_by_function() {
        let (service, registry) = service(mocks::Lookup::new(60));
        let inner = abi::addr::addrCall {
            node: namehash("alpha.eth"),
        }
        .abi_encode();
        service
            .resolve(RESOLVER, &request("alpha.eth", inner))
            .await
            .unwrap();

        let mut encoded = String::new();
        prometheus_client::encoding::text::encode(&mut encoded, &registry).unwrap();
        assert!(encoded.contains("ccip_queries_total{function=\"addr(bytes32)\"} 1"));
    }
}
