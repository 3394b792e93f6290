//! Verify NFT ownership with a short-lived verdict cache.
//!
//! Registration attempts are cheap to send and `ownerOf` reads are not, so every verdict (positive
//! or negative) is cached for `cache_timeout`. A stale verdict is never used. A sweep every
//! `cache_timeout` drops stale verdicts that were not re-queried, so none is held longer than
//! `2 × cache_timeout`.

use crate::{Error, OwnerReader};
use alloy_primitives::{Address, U256};
use prometheus_client::{metrics::counter::Counter, registry::Registry};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{task::JoinHandle, time::Instant};
use tracing::debug;

/// Configuration for the [Verifier].
#[derive(Clone, Debug)]
pub struct Config {
    /// How long a verdict may be trusted
    pub cache_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_timeout: Duration::from_secs(30),
        }
    }
}

/// Metrics for the [Verifier].
#[derive(Clone, Default)]
pub struct Metrics {
    /// Number of checks answered from the cache
    pub cache_hits: Counter,
    /// Number of checks that needed a chain read
    pub cache_misses: Counter,
    /// Number of `ownerOf` reads issued
    pub chain_reads: Counter,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given registry.
    pub fn init(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register(
            "ownership_cache_hits",
            "Number of checks answered from the cache",
            metrics.cache_hits.clone(),
        );
        registry.register(
            "ownership_cache_misses",
            "Number of checks that needed a chain read",
            metrics.cache_misses.clone(),
        );
        registry.register(
            "ownership_chain_reads",
            "Number of ownerOf reads issued",
            metrics.chain_reads.clone(),
        );
        metrics
    }
}

/// Cache key: `(chain id, token contract, claimant, token id)`.
type Key = (u64, Address, Address, U256);

/// A cached verdict.
#[derive(Clone, Copy, Debug)]
struct QueryResult {
    owns: bool,
    timestamp: Instant,
}

/// Answers "does `claimant` hold this token?" with caching.
#[derive(Clone)]
pub struct Verifier<O: OwnerReader> {
    reader: O,
    cache_timeout: Duration,
    cache: Arc<Mutex<HashMap<Key, QueryResult>>>,
    metrics: Metrics,
}

impl<O: OwnerReader> Verifier<O> {
    pub fn new(cfg: Config, reader: O, metrics: Metrics) -> Self {
        Self {
            reader,
            cache_timeout: cfg.cache_timeout,
            cache: Arc::new(Mutex::new(HashMap::new())),
            metrics,
        }
    }

    /// Returns whether `claimant` holds `token_id` of `contract` on `chain_id`.
    ///
    /// Chain read failures are returned as errors, never as a negative verdict.
    pub async fn owns_token(
        &self,
        chain_id: u64,
        contract: Address,
        claimant: Address,
        token_id: U256,
    ) -> Result<bool, Error> {
        let key = (chain_id, contract, claimant, token_id);
        if let Some(owns) = self.cached(&key) {
            self.metrics.cache_hits.inc();
            return Ok(owns);
        }
        self.metrics.cache_misses.inc();

        self.metrics.chain_reads.inc();
        let owner = self.reader.owner_of(chain_id, contract, token_id).await?;
        let owns = owner == claimant;
        debug!(chain_id, ?contract, ?claimant, %token_id, ?owner, owns, "checked ownership");
        self.cache.lock().unwrap().insert(
            key,
            QueryResult {
                owns,
                timestamp: Instant::now(),
            },
        );
        Ok(owns)
    }

    fn cached(&self, key: &Key) -> Option<bool> {
        let mut cache = self.cache.lock().unwrap();
        let result = *cache.get(key)?;
        if result.timestamp.elapsed() >= self.cache_timeout {
            cache.remove(key);
            return None;
        }
        Some(result.owns)
    }

    /// Drop every verdict older than the cache timeout. Returns the number dropped.
    pub fn sweep(&self) -> usize {
        let mut cache = self.cache.lock().unwrap();
        let before = cache.len();
        cache.retain(|_, result| result.timestamp.elapsed() < self.cache_timeout);
        before - cache.len()
    }

    /// Number of cached verdicts, stale or not.
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Returns true if no verdicts are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweep the cache every `cache_timeout` on the current tokio runtime.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        let verifier = self.clone();
        tokio::spawn(async move {
            let period = verifier.cache_timeout;
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let removed = verifier.sweep();
                if removed > 0 {
                    debug!(removed, "swept ownership cache");
                }
            }
        })
    }
}
