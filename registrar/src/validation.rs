//! Request pre-checks and the messages users sign.

use crate::Error;
use alloy_primitives::Address;
use ensgate_resolver::name;

/// Default upper bound on name length, in characters.
pub const NAME_LIMIT: usize = 80;

/// Accepted signature lengths, in hex characters, with or without `0x`.
const SIGNATURE_HEX_LENGTH: std::ops::RangeInclusive<usize> = 130..=132;

/// Length of a base58 CIDv0.
const CID_V0_LENGTH: usize = 46;

/// Canonical form of a user-supplied name.
///
/// Lower-cases, turns whitespace runs into `-`, drops runs of two or more `-`, drops quoting
/// characters and strips leading and trailing `-`.
pub fn sanitize(name: &str) -> String {
    let lower = name.to_lowercase();

    let mut dashed = String::with_capacity(lower.len());
    let mut in_space = false;
    for c in lower.chars() {
        if c.is_whitespace() {
            if !in_space {
                dashed.push('-');
            }
            in_space = true;
        } else {
            dashed.push(c);
            in_space = false;
        }
    }

    let mut collapsed = String::with_capacity(dashed.len());
    let mut run = 0;
    for c in dashed.chars() {
        if c == '-' {
            run += 1;
            continue;
        }
        if run == 1 {
            collapsed.push('-');
        }
        run = 0;
        collapsed.push(c);
    }
    if run == 1 {
        collapsed.push('-');
    }

    let stripped: String = collapsed
        .trim_start_matches('-')
        .chars()
        .filter(|c| !matches!(c, ';' | '\'' | '"' | '`' | '\\'))
        .collect();
    stripped.trim_matches('-').to_string()
}

/// Reject names that change under [sanitize] or exceed `limit` characters.
pub fn check_name(name: &str, limit: usize) -> Result<(), Error> {
    let sanitized = sanitize(name);
    if sanitized != name {
        return Err(Error::IllegalCharacters {
            name: name.to_string(),
            sanitized,
        });
    }
    if name.chars().count() > limit {
        return Err(Error::NameTooLong(limit));
    }
    Ok(())
}

/// Reject signatures whose hex length is outside `130..=132`.
pub fn check_signature(signature: &str) -> Result<(), Error> {
    let len = signature.len();
    if !SIGNATURE_HEX_LENGTH.contains(&len) {
        return Err(Error::MalformedSignature(len));
    }
    Ok(())
}

/// Parse a `0x`-prefixed address.
pub fn parse_address(raw: &str) -> Result<Address, Error> {
    raw.parse()
        .map_err(|_| Error::MalformedAddress(raw.to_string()))
}

/// Base name of a subdomain: the name minus its first label.
pub fn base_name(name: &str) -> Result<&str, Error> {
    match name::split_first(name) {
        Some((_, parent)) if !parent.is_empty() => Ok(parent),
        _ => Err(Error::InvalidName(name.to_string())),
    }
}

/// Decode an IPFS CIDv0 (`Qm…`) into its sha2-256 multihash.
pub fn decode_cid_v0(cid: &str) -> Result<Vec<u8>, Error> {
    let invalid = || Error::InvalidContentHash(cid.to_string());
    if cid.len() != CID_V0_LENGTH || !cid.starts_with("Qm") {
        return Err(invalid());
    }
    let multihash = bs58::decode(cid).into_vec().map_err(|_| invalid())?;
    match multihash.as_slice() {
        [0x12, 0x20, digest @ ..] if digest.len() == 32 => Ok(multihash),
        _ => Err(invalid()),
    }
}

/// Message signed to register a base domain for a token contract.
pub fn base_domain_message(name: &str, token_contract: &str, chain_id: u64) -> String {
    format!("Attempting to register domain {name} name to {token_contract} on chain {chain_id}")
}

/// Message signed to register a token's subdomain.
pub fn subdomain_message(name: &str, token_id: &str, chain_id: u64) -> String {
    format!("Registering your tokenId {token_id} name to {name} on chain {chain_id}")
}

/// Message signed to set a text record.
pub fn text_message(name: &str, key: &str, value: &str, chain_id: u64) -> String {
    format!("Attempting to update {name} {key} to value {value} on {chain_id}")
}

/// Message signed to set the content hash.
pub fn storage_message(name: &str, chain_id: u64, ipfs_hash: &str) -> String {
    format!("Attempting to update storage to domain {name} on {chain_id} with hash {ipfs_hash}")
}

/// Message signed to override the address for one coin type.
pub fn address_message(name: &str, coin_type: u64, address: &str, chain_id: u64) -> String {
    format!("Attempting to set {name} address for coin type {coin_type} to {address} on {chain_id}")
}
