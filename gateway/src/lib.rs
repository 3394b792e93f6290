//! Serve CCIP-Read answers and token-bound ENS registrations over HTTP.
//!
//! Two services make up a deployment:
//!
//! * the CCIP-Read gateway ([ccip]) answers `OffchainLookup` requests with signed records, reading
//!   values from the data layer through an [lookup::HttpLookup];
//! * the registrar ([data]) is that data layer: it serves the records and accepts registrations,
//!   and it intercepts the probes it issues to check that a base domain delegates to the gateway.

pub mod ccip;
pub mod data;
pub mod lookup;
pub mod telemetry;
