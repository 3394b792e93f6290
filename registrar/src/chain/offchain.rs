//! Follow [EIP-3668](https://eips.ethereum.org/EIPS/eip-3668) `OffchainLookup` reverts.

use super::{
    abi::OffchainLookup,
    rpc::{Call, Rpc},
};
use crate::Error;
use alloy_primitives::{hex, Address, Bytes};
use alloy_sol_types::{SolError, SolValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Serialize)]
struct Body<'a> {
    data: &'a str,
    sender: &'a str,
}

#[derive(Deserialize)]
struct Reply {
    data: Bytes,
}

/// Substitute `{sender}` and `{data}` in a gateway URL template.
pub(super) fn render(template: &str, sender: &str, data: &str) -> String {
    template.replace("{sender}", sender).replace("{data}", data)
}

/// Decode an `OffchainLookup` revert issued by `target`.
pub(super) fn decode(target: Address, revert: &[u8]) -> Result<OffchainLookup, Error> {
    let lookup = OffchainLookup::abi_decode(revert, true)
        .map_err(|err| Error::ChainRead(format!("unexpected revert: {err}")))?;
    if lookup.sender != target {
        return Err(Error::ChainRead(format!(
            "offchain lookup sender {} is not {target}",
            lookup.sender
        )));
    }
    Ok(lookup)
}

/// Call data for the lookup's callback: `callbackFunction ‖ abi.encode(response, extraData)`.
pub(super) fn callback(lookup: &OffchainLookup, response: Bytes) -> Vec<u8> {
    let mut data = lookup.callbackFunction.to_vec();
    data.extend((response, lookup.extraData.clone()).abi_encode_params());
    data
}

/// Runs `eth_call`s, resolving `OffchainLookup` reverts through their gateways.
#[derive(Clone)]
pub struct Client {
    rpc: Rpc,
    http: reqwest::Client,
    max_redirects: usize,
}

impl Client {
    pub fn new(rpc: Rpc, http: reqwest::Client, max_redirects: usize) -> Self {
        Self {
            rpc,
            http,
            max_redirects,
        }
    }

    /// Execute `data` against `to`, following at most `max_redirects` offchain lookups.
    pub async fn call(&self, chain_id: u64, to: Address, data: Vec<u8>) -> Result<Bytes, Error> {
        let mut data = data;
        for _ in 0..=self.max_redirects {
            let revert = match self.rpc.call(chain_id, to, &data).await? {
                Call::Success(result) => return Ok(result),
                Call::Revert(revert) => revert,
            };
            let lookup = decode(to, &revert)?;
            let response = self.fetch(&lookup).await?;
            data = callback(&lookup, response);
        }
        Err(Error::ChainRead(format!(
            "too many offchain lookups from {to}"
        )))
    }

    /// Query the lookup's gateways in order until one answers.
    async fn fetch(&self, lookup: &OffchainLookup) -> Result<Bytes, Error> {
        let sender = lookup.sender.to_string().to_lowercase();
        let data = format!("0x{}", hex::encode(&lookup.callData));
        for template in &lookup.urls {
            let url = render(template, &sender, &data);
            let request = if template.contains("{data}") {
                self.http.get(&url)
            } else {
                self.http.post(&url).json(&Body {
                    data: &data,
                    sender: &sender,
                })
            };
            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    warn!(%url, ?err, "gateway unreachable");
                    continue;
                }
            };
            let status = response.status();
            if status.is_server_error() {
                warn!(%url, %status, "gateway failed");
                continue;
            }
            if !status.is_success() {
                return Err(Error::ChainRead(format!("gateway {url} returned {status}")));
            }
            let reply: Reply = response
                .json()
                .await
                .map_err(|err| Error::ChainRead(err.to_string()))?;
            debug!(%url, len = reply.data.len(), "gateway answered");
            return Ok(reply.data);
        }
        Err(Error::ChainRead("no gateway answered".to_string()))
    }
}
