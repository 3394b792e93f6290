//! `eth_call` over one provider per chain.

use crate::Error;
use alloy_primitives::{hex, Address, Bytes};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{BlockId, TransactionInput, TransactionRequest};
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use reqwest::Url;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

/// Outcome of an `eth_call` that reached a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// The call returned.
    Success(Bytes),
    /// The call reverted with this data.
    Revert(Bytes),
}

impl Call {
    /// Return data of a successful call; a revert is a chain read failure.
    pub fn success(self) -> Result<Bytes, Error> {
        match self {
            Call::Success(data) => Ok(data),
            Call::Revert(data) => Err(Error::ChainRead(format!(
                "execution reverted: 0x{}",
                hex::encode(&data)
            ))),
        }
    }
}

/// Sends `eth_call`s through a [RootProvider] per chain.
#[derive(Clone)]
pub struct Rpc {
    providers: Arc<HashMap<u64, RootProvider>>,
}

impl Rpc {
    /// Connect to `endpoints` (chain id to URL), sending requests with `http`.
    pub fn new(http: reqwest::Client, endpoints: HashMap<u64, String>) -> Result<Self, Error> {
        let mut providers = HashMap::with_capacity(endpoints.len());
        for (chain_id, endpoint) in endpoints {
            let url = Url::parse(&endpoint)
                .map_err(|err| Error::ChainRead(format!("invalid endpoint {endpoint}: {err}")))?;
            let client = RpcClient::new(Http::with_client(http.clone(), url), false);
            providers.insert(chain_id, RootProvider::new(client));
        }
        Ok(Self {
            providers: Arc::new(providers),
        })
    }

    /// Execute `data` against `to` at the latest block of `chain_id`.
    pub async fn call(&self, chain_id: u64, to: Address, data: &[u8]) -> Result<Call, Error> {
        let provider = self
            .providers
            .get(&chain_id)
            .ok_or(Error::UnsupportedChain(chain_id))?;
        let tx = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(Bytes::copy_from_slice(data)));
        trace!(chain_id, ?to, "eth_call");
        classify(provider.call(&tx).block(BlockId::latest()).await)
    }
}

/// Separate reverts (which carry data the caller may act on) from failed reads.
fn classify(result: Result<Bytes, TransportError>) -> Result<Call, Error> {
    match result {
        Ok(data) => Ok(Call::Success(data)),
        Err(err) => match err.as_error_resp().and_then(|payload| payload.as_revert_data()) {
            Some(data) => Ok(Call::Revert(data)),
            None => Err(Error::ChainRead(err.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_json_rpc::ErrorPayload;
    use alloy_primitives::bytes;
    use alloy_transport::RpcError;

    fn error(raw: &str) -> Result<Bytes, TransportError> {
        let payload: ErrorPayload = serde_json::from_str(raw).unwrap();
        Err(RpcError::ErrorResp(payload))
    }

    #[test]
    fn test_success() {
        let call = classify(Ok(bytes!("0102"))).unwrap();
        assert_eq!(call, Call::Success(bytes!("0102")));
    }

    #[test]
    fn test_revert() {
        let call = classify(error(
            r#"{"code":3,"message":"execution reverted","data":"0x556f1830"}"#,
        ))
        .unwrap();
        assert_eq!(call, Call::Revert(bytes!("556f1830")));
        assert!(matches!(call.success(), Err(Error::ChainRead(_))));
    }

    #[test]
    fn test_nested_revert() {
        let call = classify(error(
            r#"{"code":-32000,"message":"execution reverted","data":{"data":"0xdead"}}"#,
        ))
        .unwrap();
        assert_eq!(call, Call::Revert(bytes!("dead")));
    }

    #[test]
    fn test_rpc_error() {
        let err = classify(error(r#"{"code":-32005,"message":"rate limited"}"#)).unwrap_err();
        assert!(matches!(err, Error::ChainRead(message) if message.contains("rate limited")));
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = Rpc::new(
            reqwest::Client::new(),
            HashMap::from([(1, "not a url".to_string())]),
        );
        assert!(matches!(result, Err(Error::ChainRead(_))));
    }

    #[tokio::test]
    async fn test_unknown_chain() {
        let rpc = Rpc::new(reqwest::Client::new(), HashMap::new()).unwrap();
        let err = rpc.call(10, Address::ZERO, &[]).await.unwrap_err();
        assert_eq!(err, Error::UnsupportedChain(10));
    }
}
