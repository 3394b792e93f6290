//! Register token-bound ENS subdomains and serve their records to the gateway.
//!
//! # Usage
//!
//! ```sh
//! cargo run --release --bin registrar -- --port 8081 \
//!     --rpc 1@https://eth.example --rpc 137@https://polygon.example --metrics-port 9091
//! ```

use alloy_primitives::Address;
use clap::{value_parser, Arg, Command};
use ensgate_gateway::{data, telemetry};
use ensgate_registrar::{
    chain, ownership,
    probe::{self, Actor},
    service::{self, Service},
    store,
};
use prometheus_client::registry::Registry;
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};
use tokio::net::TcpListener;
use tracing::{info, Level};

#[tokio::main]
async fn main() {
    // Parse arguments
    let matches = Command::new("ensgate-registrar")
        .about("register token-bound ENS subdomains")
        .arg(
            Arg::new("port")
                .long("port")
                .required(false)
                .default_value("8081")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("rpc")
                .long("rpc")
                .required(true)
                .value_delimiter(',')
                .value_parser(value_parser!(String))
                .help("JSON-RPC endpoint of a chain (<chain id>@<url>)"),
        )
        .arg(Arg::new("ens-registry").long("ens-registry").required(false))
        .arg(
            Arg::new("resolver-timeout")
                .long("resolver-timeout")
                .required(false)
                .default_value("20")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("cache-timeout")
                .long("cache-timeout")
                .required(false)
                .default_value("30")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("name-limit")
                .long("name-limit")
                .required(false)
                .default_value("80")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("mailbox-size")
                .long("mailbox-size")
                .required(false)
                .default_value("1024")
                .value_parser(value_parser!(usize)),
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
    let probe_metrics = probe::Metrics::init(&mut registry);
    let ownership_metrics = ownership::Metrics::init(&mut registry);

    // Create logger
    let level = matches
        .get_one::<String>("log-level")
        .expect("Please provide log level");
    let level = Level::from_str(level).expect("Log level not well-formed");
    let metrics_addr = matches
        .get_one::<u16>("metrics-port")
        .map(|port| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), *port));
    telemetry::init(level, metrics_addr, registry);

    // Configure chains
    let mut endpoints = HashMap::new();
    for entry in matches
        .get_many::<String>("rpc")
        .expect("Please provide rpc endpoints")
    {
        let Some((chain_id, url)) = entry.split_once('@') else {
            panic!("Rpc endpoint not well-formed");
        };
        let chain_id = chain_id
            .parse::<u64>()
            .expect("Rpc chain id not well-formed");
        info!(chain_id, url, "registered rpc endpoint");
        endpoints.insert(chain_id, url.to_string());
    }
    let mut chain_cfg = chain::Config::new(endpoints);
    if let Some(registry) = matches.get_one::<String>("ens-registry") {
        chain_cfg.ens_registry = registry
            .parse::<Address>()
            .expect("ENS registry not well-formed");
    }
    let chain = chain::Client::new(chain_cfg).expect("Could not create chain client");

    // Start probe actor
    let (actor, probes) = Actor::new(probe::Config {
        resolver: chain.clone(),
        mailbox_size: *matches
            .get_one::<usize>("mailbox-size")
            .expect("Please provide mailbox size"),
        metrics: probe_metrics,
    });
    actor.start();

    // Start ownership cache
    let cache_timeout = *matches
        .get_one::<u64>("cache-timeout")
        .expect("Please provide cache timeout");
    let ownership = ownership::Verifier::new(
        ownership::Config {
            cache_timeout: Duration::from_secs(cache_timeout),
        },
        chain.clone(),
        ownership_metrics,
    );
    ownership.start_sweeper();

    // Create service
    let resolver_timeout = *matches
        .get_one::<u64>("resolver-timeout")
        .expect("Please provide resolver timeout");
    let cfg = service::Config {
        name_limit: *matches
            .get_one::<usize>("name-limit")
            .expect("Please provide name limit"),
        resolver_timeout: Duration::from_secs(resolver_timeout),
        ..Default::default()
    };
    let service = Service::new(cfg, store::Memory::default(), chain, ownership, probes);

    // Serve
    let port = *matches.get_one::<u16>("port").expect("Please provide port");
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    let listener = TcpListener::bind(addr)
        .await
        .expect("Could not bind to address");
    info!(%addr, "serving");
    axum::serve(listener, data::router(service).into_make_service())
        .await
        .expect("Could not serve");
}
