//! Answer EIP-3668 `OffchainLookup` requests with signed ENS records.
//!
//! # Usage
//!
//! ```sh
//! cargo run --release --bin gateway -- --port 8080 --private-key <hex> \
//!     --data-url http://localhost:8081 --resolver 0x…@137 --metrics-port 9090
//! ```
//!
//! Each `--resolver <address>@<chain id>` maps a resolver contract to the chain its names are
//! registered on. Resolvers that are not mapped serve `--default-chain-id`.

use alloy_primitives::Address;
use clap::{value_parser, Arg, Command};
use ensgate_cryptography::Secp256k1;
use ensgate_gateway::{ccip, lookup, telemetry};
use ensgate_resolver::service::{self, Service};
use prometheus_client::registry::Registry;
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};
use tokio::net::TcpListener;
use tracing::{info, Level};
use zeroize::Zeroizing;

#[tokio::main]
async fn main() {
    // Parse arguments
    let matches = Command::new("ensgate-gateway")
        .about("sign CCIP-Read answers for token-bound ENS names")
        .arg(
            Arg::new("port")
                .long("port")
                .required(false)
                .default_value("8080")
                .value_parser(value_parser!(u16)),
        )
        .arg(Arg::new("private-key").long("private-key").required(true))
        .arg(Arg::new("data-url").long("data-url").required(true))
        .arg(
            Arg::new("ttl")
                .long("ttl")
                .required(false)
                .default_value("300")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("resolver")
                .long("resolver")
                .required(false)
                .value_delimiter(',')
                .value_parser(value_parser!(String))
                .help("Resolver contract and the chain its names live on (<address>@<chain id>)"),
        )
        .arg(
            Arg::new("default-chain-id")
                .long("default-chain-id")
                .required(false)
                .default_value("1")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("metrics-port")
                .long("metrics-port")
                .required(false)
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .required(false)
                .default_value("info"),
        )
        .get_matches();

    // Create metrics
    let mut registry = Registry::default();
    let metrics = service::Metrics::init(&mut registry);

    // Create logger
    let level = matches
        .get_one::<String>("log-level")
        .expect("Please provide log level");
    let level = Level::from_str(level).expect("Log level not well-formed");
    let metrics_addr = matches
        .get_one::<u16>("metrics-port")
        .map(|port| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), *port));
    telemetry::init(level, metrics_addr, registry);

    // Configure signer
    let private_key = Zeroizing::new(
        matches
            .get_one::<String>("private-key")
            .expect("Please provide private key")
            .clone(),
    );
    let signer = Secp256k1::from_hex(&private_key).expect("Private key not well-formed");
    info!(address = %signer.address(), "loaded signer");

    // Configure resolver contracts
    let mut resolvers = HashMap::new();
    if let Some(entries) = matches.get_many::<String>("resolver") {
        for entry in entries {
            let parts = entry.split('@').collect::<Vec<&str>>();
            if parts.len() != 2 {
                panic!("Resolver not well-formed");
            }
            let resolver = parts[0]
                .parse::<Address>()
                .expect("Resolver address not well-formed");
            let chain_id = parts[1]
                .parse::<u64>()
                .expect("Resolver chain id not well-formed");
            info!(%resolver, chain_id, "registered resolver");
            resolvers.insert(resolver, chain_id);
        }
    }

    // Create lookup
    let data_url = matches
        .get_one::<String>("data-url")
        .expect("Please provide data url")
        .clone();
    let ttl = *matches.get_one::<u64>("ttl").expect("Please provide ttl");
    let lookup = lookup::HttpLookup::new(lookup::Config {
        base_url: data_url,
        ttl,
        resolvers,
        default_chain_id: *matches
            .get_one::<u64>("default-chain-id")
            .expect("Please provide default chain id"),
        request_timeout: Duration::from_secs(10),
    })
    .expect("Data url not well-formed");

    // Serve
    let service = Service::new(service::Config { signer, ttl }, lookup, metrics);
    let port = *matches.get_one::<u16>("port").expect("Please provide port");
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    let listener = TcpListener::bind(addr)
        .await
        .expect("Could not bind to address");
    info!(%addr, "serving");
    axum::serve(listener, ccip::router(service).into_make_service())
        .await
        .expect("Could not serve");
}
