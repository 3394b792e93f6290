//! Registrar endpoints: record reads for the gateway and signed registrations.

use alloy_primitives::{hex, Address, U256};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ensgate_registrar::{
    service::{
        AddressRequest, BaseDomainRequest, ContentRequest, Service, SubdomainRequest, TextRequest,
    },
    store::Store,
    ChainReader, Error, Kind, OwnerReader,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// Router serving the data and registration endpoints of `service`.
pub fn router<S: Store, C: OwnerReader + ChainReader>(service: Service<S, C>) -> Router {
    Router::new()
        .route("/addr/{name}/{coin_type}/{chain_id}", get(addr::<S, C>))
        .route("/text/{name}/{key}/{chain_id}", get(text::<S, C>))
        .route("/contenthash/{name}/{chain_id}", get(contenthash::<S, C>))
        .route("/checkname/{chain_id}/{name}", get(check_name::<S, C>))
        .route("/checkname/{name}", get(check_name::<S, C>))
        .route("/tokenId/{chain_id}/{name}", get(token_id::<S, C>))
        .route("/name/{chain_id}/{address}/{token_id}", get(name::<S, C>))
        .route("/count", get(count::<S, C>))
        .route(
            "/registertoken/{chain_id}/{token_contract}/{name}/{signature}",
            post(register_token::<S, C>),
        )
        .route(
            "/registertoken/{chain_id}/{token_contract}/{name}/{signature}/{ens_chain_id}",
            post(register_token::<S, C>),
        )
        .route(
            "/register/{chain_id}/{name}/{token_id}/{signature}",
            post(register::<S, C>),
        )
        .route(
            "/register/{chain_id}/{name}/{token_id}/{signature}/{ens_address}",
            post(register::<S, C>),
        )
        .route(
            "/registerForChain/{chain_id}/{name}/{token_id}/{signature}/{ens_address}/{ens_chain_id}",
            post(register::<S, C>),
        )
        .route(
            "/registertext/{chain_id}/{name}/{key}/{value}/{signature}",
            post(register_text::<S, C>),
        )
        .route(
            "/registercontent/{chain_id}/{name}/{signature}/{ipfs_hash}",
            post(register_content::<S, C>),
        )
        .route(
            "/registeraddr/{chain_id}/{name}/{coin_type}/{address}/{signature}",
            post(register_address::<S, C>),
        )
        .with_state(service)
}

#[derive(Deserialize)]
struct AddrPath {
    name: String,
    coin_type: u64,
    chain_id: u64,
}

async fn addr<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<AddrPath>,
) -> Json<serde_json::Value> {
    let addr = service
        .addr(&path.name, path.coin_type, path.chain_id)
        .await;
    Json(json!({ "addr": addr }))
}

#[derive(Deserialize)]
struct TextPath {
    name: String,
    key: String,
}

async fn text<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<TextPath>,
) -> String {
    service.text(&path.name, &path.key)
}

#[derive(Deserialize)]
struct ContenthashPath {
    name: String,
}

async fn contenthash<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<ContenthashPath>,
) -> String {
    hex::encode_prefixed(service.contenthash(&path.name))
}

#[derive(Deserialize)]
struct CheckNamePath {
    name: String,
}

async fn check_name<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<CheckNamePath>,
) -> Json<serde_json::Value> {
    let result = if service.is_available(&path.name) {
        "available"
    } else {
        "unavailable"
    };
    Json(json!({ "result": result }))
}

#[derive(Deserialize)]
struct TokenIdPath {
    chain_id: u64,
    name: String,
}

async fn token_id<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<TokenIdPath>,
) -> Json<serde_json::Value> {
    match service.token_id(path.chain_id, &path.name) {
        Some(token_id) => Json(json!({ "result": token_id.to_string() })),
        None => Json(json!({ "result": -1 })),
    }
}

#[derive(Deserialize)]
struct NamePath {
    chain_id: u64,
    address: String,
    token_id: String,
}

async fn name<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<NamePath>,
) -> Response {
    let (Ok(address), Ok(token_id)) = (
        path.address.parse::<Address>(),
        path.token_id.parse::<U256>(),
    ) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "result": "" }))).into_response();
    };
    match service.name_for_token(path.chain_id, address, token_id) {
        Some(name) => Json(json!({ "result": name })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "result": "" }))).into_response(),
    }
}

async fn count<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
) -> Json<serde_json::Value> {
    Json(json!({ "count": service.count() }))
}

#[derive(Deserialize)]
struct RegisterTokenPath {
    chain_id: u64,
    token_contract: String,
    name: String,
    signature: String,
    ens_chain_id: Option<u64>,
}

async fn register_token<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<RegisterTokenPath>,
) -> Response {
    let request = BaseDomainRequest {
        chain_id: path.chain_id,
        token_contract: path.token_contract,
        name: path.name,
        signature: path.signature,
        ens_chain_id: path.ens_chain_id,
    };
    outcome(service.register_base_domain(request).await)
}

#[derive(Deserialize)]
struct RegisterPath {
    chain_id: u64,
    name: String,
    token_id: String,
    signature: String,
    ens_address: Option<String>,
    ens_chain_id: Option<u64>,
}

async fn register<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<RegisterPath>,
) -> Response {
    let request = SubdomainRequest {
        chain_id: path.chain_id,
        name: path.name,
        token_id: path.token_id,
        signature: path.signature,
        ens_address: path.ens_address,
        ens_chain_id: path.ens_chain_id,
    };
    outcome(service.register_subdomain(request).await)
}

#[derive(Deserialize)]
struct RegisterTextPath {
    chain_id: u64,
    name: String,
    key: String,
    value: String,
    signature: String,
}

async fn register_text<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<RegisterTextPath>,
) -> Response {
    let request = TextRequest {
        chain_id: path.chain_id,
        name: path.name,
        key: path.key,
        value: path.value,
        signature: path.signature,
    };
    outcome(service.register_text(request).await)
}

#[derive(Deserialize)]
struct RegisterContentPath {
    chain_id: u64,
    name: String,
    signature: String,
    ipfs_hash: String,
}

async fn register_content<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<RegisterContentPath>,
) -> Response {
    let request = ContentRequest {
        chain_id: path.chain_id,
        name: path.name,
        ipfs_hash: path.ipfs_hash,
        signature: path.signature,
    };
    outcome(service.register_content(request).await)
}

#[derive(Deserialize)]
struct RegisterAddressPath {
    chain_id: u64,
    name: String,
    coin_type: u64,
    address: String,
    signature: String,
}

async fn register_address<S: Store, C: OwnerReader + ChainReader>(
    State(service): State<Service<S, C>>,
    Path(path): Path<RegisterAddressPath>,
) -> Response {
    let request = AddressRequest {
        chain_id: path.chain_id,
        name: path.name,
        coin_type: path.coin_type,
        address: path.address,
        signature: path.signature,
    };
    outcome(service.register_address(request).await)
}

/// Render the result of a registration flow.
fn outcome(result: Result<(), Error>) -> Response {
    let err = match result {
        Ok(()) => return Json(json!({ "result": "pass" })).into_response(),
        Err(err) => err,
    };
    let status = status(err.kind());
    if status.is_server_error() {
        warn!(?err, "registration failed");
    } else {
        debug!(?err, "registration rejected");
    }
    (status, Json(json!({ "fail": err.to_string() }))).into_response()
}

fn status(kind: Kind) -> StatusCode {
    match kind {
        Kind::Rejected => StatusCode::FORBIDDEN,
        Kind::Malformed => StatusCode::BAD_REQUEST,
        Kind::ChainRead => StatusCode::BAD_GATEWAY,
        Kind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
