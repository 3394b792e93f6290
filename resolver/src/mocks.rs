//! In-memory [crate::Lookup] for tests.

use crate::{Error, Record};
use alloy_primitives::{Address, Bytes};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[derive(Default)]
struct State {
    addrs: HashMap<(String, u64), Address>,
    texts: HashMap<(String, String), String>,
    contenthashes: HashMap<String, Bytes>,
    failing: bool,
    addr_requests: Vec<(String, u64)>,
}

/// A lookup backed by maps, recording every address request.
#[derive(Clone)]
pub struct Lookup {
    ttl: u64,
    state: Arc<Mutex<State>>,
}

impl Lookup {
    /// Create a lookup whose records are valid for `ttl` seconds.
    pub fn new(ttl: u64) -> Self {
        Self {
            ttl,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn set_addr(&self, name: &str, coin_type: u64, addr: Address) {
        self.state
            .lock()
            .unwrap()
            .addrs
            .insert((name.to_string(), coin_type), addr);
    }

    pub fn set_text(&self, name: &str, key: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .texts
            .insert((name.to_string(), key.to_string()), value.to_string());
    }

    pub fn set_contenthash(&self, name: &str, hash: Bytes) {
        self.state
            .lock()
            .unwrap()
            .contenthashes
            .insert(name.to_string(), hash);
    }

    /// Make every subsequent lookup fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Address requests seen so far, in order.
    pub fn addr_requests(&self) -> Vec<(String, u64)> {
        self.state.lock().unwrap().addr_requests.clone()
    }

    fn record<T>(&self, value: T) -> Record<T> {
        Record {
            value,
            ttl: self.ttl,
        }
    }
}

impl crate::Lookup for Lookup {
    async fn addr(
        &self,
        name: &str,
        coin_type: u64,
        _resolver: Address,
    ) -> Result<Record<Address>, Error> {
        let mut state = self.state.lock().unwrap();
        state.addr_requests.push((name.to_string(), coin_type));
        if state.failing {
            return Err(Error::Lookup("unavailable".to_string()));
        }
        let addr = state
            .addrs
            .get(&(name.to_string(), coin_type))
            .copied()
            .unwrap_or(Address::ZERO);
        Ok(self.record(addr))
    }

    async fn text(
        &self,
        name: &str,
        key: &str,
        _resolver: Address,
    ) -> Result<Record<String>, Error> {
        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(Error::Lookup("unavailable".to_string()));
        }
        let value = state
            .texts
            .get(&(name.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(self.record(value))
    }

    async fn contenthash(&self, name: &str, _resolver: Address) -> Result<Record<Bytes>, Error> {
        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(Error::Lookup("unavailable".to_string()));
        }
        let value = state.contenthashes.get(name).cloned().unwrap_or_default();
        Ok(self.record(value))
    }
}
