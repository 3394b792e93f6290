//! Sign CCIP-Read responses and recover Ethereum signers.
//!
//! The gateway answers `OffchainLookup` reverts with a payload signed by a secp256k1 key. The
//! on-chain verifier recomputes the digest described in [ccip] and recovers the signer from
//! the compact signature, so every byte of the digest layout matters.
//!
//! Registration requests, in turn, are authorized with EIP-191 personal messages that
//! [message] recovers.

use thiserror::Error;

pub mod ccip;
pub mod message;
pub mod secp256k1;
pub use secp256k1::{RecoverableSignature, Secp256k1};

/// Errors that can occur when signing or recovering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("invalid signature length: {0}")]
    InvalidSignatureLength(usize),
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signing failed")]
    SigningFailed,
    #[error("recovery failed")]
    RecoveryFailed,
}
