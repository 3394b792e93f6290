//! Read record values from the registrar's data endpoints.

use alloy_primitives::{Address, Bytes};
use ensgate_resolver::{Error, Lookup, Record};
use reqwest::Url;
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::trace;

/// Configuration for the [HttpLookup].
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the data endpoints
    pub base_url: String,

    /// Seconds each answer stays valid
    pub ttl: u64,

    /// Token chain served by each resolver contract
    pub resolvers: HashMap<Address, u64>,

    /// Chain used for resolver contracts that are not mapped
    pub default_chain_id: u64,

    /// Timeout for each request
    pub request_timeout: Duration,
}

#[derive(Deserialize)]
struct AddrResponse {
    addr: Address,
}

/// A [Lookup] over the registrar's HTTP data endpoints.
#[derive(Clone)]
pub struct HttpLookup {
    http: reqwest::Client,
    base: Url,
    ttl: u64,
    resolvers: Arc<HashMap<Address, u64>>,
    default_chain_id: u64,
}

impl HttpLookup {
    pub fn new(cfg: Config) -> Result<Self, Error> {
        let base = Url::parse(&cfg.base_url).map_err(|err| Error::Lookup(err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(Error::Lookup(format!("{base} cannot be a base URL")));
        }
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|err| Error::Lookup(err.to_string()))?;
        Ok(Self {
            http,
            base,
            ttl: cfg.ttl,
            resolvers: Arc::new(cfg.resolvers),
            default_chain_id: cfg.default_chain_id,
        })
    }

    /// Chain the names behind `resolver` live on.
    pub fn chain_id(&self, resolver: &Address) -> u64 {
        self.resolvers
            .get(resolver)
            .copied()
            .unwrap_or(self.default_chain_id)
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, segments: &[&str]) -> Result<reqwest::Response, Error> {
        let url = self.url(segments);
        trace!(%url, "lookup");
        self.http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| Error::Lookup(err.to_string()))
    }

    fn record<T>(&self, value: T) -> Record<T> {
        Record {
            value,
            ttl: self.ttl,
        }
    }
}

impl Lookup for HttpLookup {
    async fn addr(
        &self,
        name: &str,
        coin_type: u64,
        resolver: Address,
    ) -> Result<Record<Address>, Error> {
        let chain_id = self.chain_id(&resolver).to_string();
        let coin_type = coin_type.to_string();
        let response: AddrResponse = self
            .get(&["addr", name, &coin_type, &chain_id])
            .await?
            .json()
            .await
            .map_err(|err| Error::Lookup(err.to_string()))?;
        Ok(self.record(response.addr))
    }

    async fn text(&self, name: &str, key: &str, resolver: Address) -> Result<Record<String>, Error> {
        let chain_id = self.chain_id(&resolver).to_string();
        let value = self
            .get(&["text", name, key, &chain_id])
            .await?
            .text()
            .await
            .map_err(|err| Error::Lookup(err.to_string()))?;
        Ok(self.record(value))
    }

    async fn contenthash(&self, name: &str, resolver: Address) -> Result<Record<Bytes>, Error> {
        let chain_id = self.chain_id(&resolver).to_string();
        let raw = self
            .get(&["contenthash", name, &chain_id])
            .await?
            .text()
            .await
            .map_err(|err| Error::Lookup(err.to_string()))?;
        let value = raw
            .trim()
            .parse::<Bytes>()
            .map_err(|err| Error::Lookup(err.to_string()))?;
        Ok(self.record(value))
    }
}
