//! Recover signers of [EIP-191](https://eips.ethereum.org/EIPS/eip-191) personal messages.

use crate::{Error, RecoverableSignature, Secp256k1};
use alloy_primitives::{hex, keccak256, Address, B256};

const PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Hash `message` the way `personal_sign` does.
pub fn hash_message(message: &[u8]) -> B256 {
    let mut buf = Vec::with_capacity(PREFIX.len() + 20 + message.len());
    buf.extend_from_slice(PREFIX.as_bytes());
    buf.extend_from_slice(message.len().to_string().as_bytes());
    buf.extend_from_slice(message);
    keccak256(&buf)
}

/// Sign `message` as a personal message.
pub fn sign_message(signer: &Secp256k1, message: &[u8]) -> Result<RecoverableSignature, Error> {
    signer.sign_prehash(&hash_message(message))
}

/// Recover the address that signed `message`.
pub fn recover_message(message: &[u8], signature: &RecoverableSignature) -> Result<Address, Error> {
    signature.recover(&hash_message(message))
}

/// Recover the address that signed `message` from a hex signature, as wallets return it.
pub fn recover_message_hex(message: &[u8], signature: &str) -> Result<Address, Error> {
    let signature = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(signature).map_err(|_| Error::InvalidHex)?;
    recover_message(message, &RecoverableSignature::from_bytes(&bytes)?)
}
