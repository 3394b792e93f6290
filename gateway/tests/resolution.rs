//! Register through the registrar endpoints, then resolve through the CCIP-Read gateway.

use alloy_primitives::{address, hex, Address, Bytes, U256};
use alloy_sol_types::SolCall;
use ensgate_cryptography::{ccip, message::sign_message, Secp256k1};
use ensgate_gateway::{ccip as gateway, data, lookup};
use ensgate_registrar::{
    account, mocks, ownership,
    probe::{self, Actor},
    service::{self, Service},
    store::Memory,
};
use ensgate_resolver::{
    abi,
    name::{dns_encode, namehash},
    service as resolver,
};
use futures::future::BoxFuture;
use prometheus_client::registry::Registry;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::net::TcpListener;

const CHAIN: u64 = 137;
const CONTRACT_RAW: &str = "0xabcdabcdabcdabcdabcdabcdabcdabcdabcdabcd";
const CONTRACT: Address = address!("abcdabcdabcdabcdabcdabcdabcdabcdabcdabcd");
const RESOLVER: Address = address!("00000000000000000000000000000000000000aa");
const POLYGON_COIN_TYPE: u64 = 0x80000089;

/// Serve `router` on an ephemeral port and return its base URL.
async fn serve(router: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

/// Start a registrar whose probes come back through its own `/addr` endpoint.
async fn registrar() -> (String, mocks::Chain) {
    let mut registry = Registry::default();
    let chain = mocks::Chain::default();
    let resolver = mocks::Resolver::pointing_here(CHAIN, Duration::ZERO);
    let (actor, probes) = Actor::new(probe::Config {
        resolver: resolver.clone(),
        mailbox_size: 1024,
        metrics: probe::Metrics::init(&mut registry),
    });
    actor.start();
    let ownership = ownership::Verifier::new(
        ownership::Config::default(),
        chain.clone(),
        ownership::Metrics::init(&mut registry),
    );
    let service = Service::new(
        service::Config::default(),
        Memory::default(),
        chain.clone(),
        ownership,
        probes,
    );
    let url = serve(data::router(service)).await;

    let http = reqwest::Client::new();
    let base = url.clone();
    resolver.connect_hook(Arc::new(
        move |name: String, chain_id: u64| -> BoxFuture<'static, Address> {
            let request = http.get(format!("{base}/addr/{name}/60/{chain_id}"));
            Box::pin(async move {
                let body: Value = request.send().await.unwrap().json().await.unwrap();
                body["addr"].as_str().unwrap().parse().unwrap()
            })
        },
    ));
    (url, chain)
}

async fn gateway(signer: Secp256k1, data_url: &str) -> String {
    let lookup = lookup::HttpLookup::new(lookup::Config {
        base_url: data_url.to_string(),
        ttl: 300,
        resolvers: HashMap::from([(RESOLVER, CHAIN)]),
        default_chain_id: 1,
        request_timeout: Duration::from_secs(5),
    })
    .unwrap();
    let mut registry = Registry::default();
    let service = resolver::Service::new(
        resolver::Config { signer, ttl: 300 },
        lookup,
        resolver::Metrics::init(&mut registry),
    );
    serve(gateway::router(service)).await
}

fn sign(signer: &Secp256k1, message: &str) -> String {
    let signature = sign_message(signer, message.as_bytes()).unwrap();
    hex::encode_prefixed(signature.to_bytes())
}

/// POST to a registration endpoint and return the status and body.
async fn register(url: String) -> (u16, Value) {
    let response = reqwest::Client::new().post(url).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

/// Ask the gateway for `addr(name, coin_type)` and check the answer is signed by `signer`.
async fn resolve_addr(gateway: &str, signer: Address, name: &str, coin_type: u64) -> Bytes {
    let inner = abi::multicoin::addrCall {
        node: namehash(name),
        coinType: U256::from(coin_type),
    }
    .abi_encode();
    let request = abi::resolveCall {
        name: dns_encode(name).unwrap().into(),
        data: inner.into(),
    }
    .abi_encode();

    let response = reqwest::Client::new()
        .post(format!("{gateway}/"))
        .json(&json!({
            "sender": RESOLVER.to_string(),
            "data": hex::encode_prefixed(&request),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    let answer = hex::decode(body["data"].as_str().unwrap()).unwrap();

    let decoded = abi::resolveCall::abi_decode_returns(&answer, true).unwrap();
    let recovered = ccip::recover(
        &decoded.sig,
        &RESOLVER,
        decoded.expires,
        &request,
        &decoded.result,
    )
    .unwrap();
    assert_eq!(recovered, signer);
    abi::multicoin::addrCall::abi_decode_returns(&decoded.result, true)
        .unwrap()
        ._0
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subdomain_resolves_to_token_bound_account() {
    let (data_url, chain) = registrar().await;
    let gateway_signer = Secp256k1::from_seed(99);
    let gateway_address = gateway_signer.address();
    let gateway_url = gateway(gateway_signer, &data_url).await;

    // Bind the base domain to the token contract
    let owner = Secp256k1::from_seed(1);
    chain.set_domain_owner(1, "alpha.eth", owner.address());
    let signature = sign(
        &owner,
        &format!("Attempting to register domain alpha.eth name to {CONTRACT_RAW} on chain {CHAIN}"),
    );
    let (status, body) = register(format!(
        "{data_url}/registertoken/{CHAIN}/{CONTRACT_RAW}/alpha.eth/{signature}"
    ))
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body, json!({ "result": "pass" }));

    // Register the subdomain of token 7
    let holder = Secp256k1::from_seed(2);
    chain.set_token_owner(CHAIN, CONTRACT, U256::from(7), holder.address());
    let signature = sign(
        &holder,
        &format!("Registering your tokenId 7 name to one.alpha.eth on chain {CHAIN}"),
    );
    let (status, body) = register(format!(
        "{data_url}/register/{CHAIN}/one.alpha.eth/7/{signature}"
    ))
    .await;
    assert_eq!(status, 200, "{body}");

    // The token chain's coin type answers the token-bound account
    let account = account::Config::default().token_bound_account(CHAIN, CONTRACT, U256::from(7));
    let answer = resolve_addr(&gateway_url, gateway_address, "one.alpha.eth", POLYGON_COIN_TYPE).await;
    assert_eq!(answer.as_ref(), account.as_slice());

    // Any other chain answers the zero address
    let answer = resolve_addr(&gateway_url, gateway_address, "one.alpha.eth", 60).await;
    assert_eq!(answer.as_ref(), Address::ZERO.as_slice());

    // The name is no longer available and maps back to its token
    let body: Value = reqwest::get(format!("{data_url}/checkname/{CHAIN}/one.alpha.eth"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "result": "unavailable" }));
    let body: Value = reqwest::get(format!("{data_url}/tokenId/{CHAIN}/one.alpha.eth"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "result": "7" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_registration() {
    let (data_url, chain) = registrar().await;
    let owner = Secp256k1::from_seed(1);
    let stranger = Secp256k1::from_seed(3);
    chain.set_domain_owner(1, "alpha.eth", owner.address());

    // Signed by someone who does not own the domain
    let signature = sign(
        &stranger,
        &format!("Attempting to register domain alpha.eth name to {CONTRACT_RAW} on chain {CHAIN}"),
    );
    let (status, body) = register(format!(
        "{data_url}/registertoken/{CHAIN}/{CONTRACT_RAW}/alpha.eth/{signature}"
    ))
    .await;
    assert_eq!(status, 403);
    assert!(body["fail"].is_string());

    // Malformed signature
    let (status, _) = register(format!(
        "{data_url}/registertoken/{CHAIN}/{CONTRACT_RAW}/alpha.eth/0x1234"
    ))
    .await;
    assert_eq!(status, 400);

    // Unknown subdomain reads fall back to defaults
    let body: Value = reqwest::get(format!("{data_url}/addr/two.alpha.eth/60/{CHAIN}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body["addr"].as_str().unwrap().parse::<Address>().unwrap(),
        Address::ZERO
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gateway_rejects_unknown_entry_point() {
    let (data_url, _) = registrar().await;
    let gateway_url = gateway(Secp256k1::from_seed(99), &data_url).await;
    let response = reqwest::get(format!("{gateway_url}/{RESOLVER}/0xdeadbeef.json"))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());

    let response = reqwest::get(format!("{gateway_url}/not-an-address/0xdeadbeef"))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}
