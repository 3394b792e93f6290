//! Secp256k1 signing with Ethereum conventions.
//!
//! Signatures are produced over 32-byte prehashed digests (the caller decides how a message is
//! hashed), are deterministic as specified in [RFC 6979](https://datatracker.ietf.org/doc/html/rfc6979),
//! and are always normalized to the lower half of the curve order so that the recovery parity
//! can be folded into `s` ([EIP-2098](https://eips.ethereum.org/EIPS/eip-2098)).
//!
//! # Example
//! ```rust
//! use alloy_primitives::keccak256;
//! use ensgate_cryptography::Secp256k1;
//! use rand::rngs::OsRng;
//!
//! // Generate a new private key
//! let signer = Secp256k1::new(&mut OsRng);
//!
//! // Sign a digest
//! let digest = keccak256(b"hello, world!");
//! let signature = signer.sign_prehash(&digest).unwrap();
//!
//! // Recover the signer
//! assert_eq!(signature.recover(&digest).unwrap(), signer.address());
//! ```

use crate::Error;
use alloy_primitives::{hex, keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::{rngs::StdRng, CryptoRng, RngCore, SeedableRng};
use std::fmt;
use zeroize::Zeroizing;

const PRIVATE_KEY_LENGTH: usize = 32;
const COMPACT_SIGNATURE_LENGTH: usize = 64; // R || VS
const SIGNATURE_LENGTH: usize = 65; // R || S || V

/// Secp256k1 signer whose public identity is an Ethereum address.
#[derive(Clone)]
pub struct Secp256k1 {
    signer: SigningKey,
    address: Address,
}

impl Secp256k1 {
    /// Create a fresh signer using the supplied RNG.
    pub fn new<R: CryptoRng + RngCore>(r: &mut R) -> Self {
        Self::from_signing_key(SigningKey::random(r))
    }

    /// Create a signer from a seed.
    ///
    /// # Warning
    ///
    /// This function is insecure and should only be used for examples
    /// and testing.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(&mut rng)
    }

    /// Create a signer from a 32-byte private key.
    pub fn from_bytes(private_key: &[u8]) -> Result<Self, Error> {
        if private_key.len() != PRIVATE_KEY_LENGTH {
            return Err(Error::InvalidPrivateKey);
        }
        let signer = SigningKey::from_slice(private_key).map_err(|_| Error::InvalidPrivateKey)?;
        Ok(Self::from_signing_key(signer))
    }

    /// Create a signer from a hex-encoded private key (with or without a `0x` prefix).
    pub fn from_hex(private_key: &str) -> Result<Self, Error> {
        let trimmed = private_key.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(hex::decode(trimmed).map_err(|_| Error::InvalidHex)?);
        Self::from_bytes(&bytes)
    }

    fn from_signing_key(signer: SigningKey) -> Self {
        let address = public_key_to_address(signer.verifying_key());
        Self { signer, address }
    }

    /// Returns the address derived from this signer's public key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest.
    ///
    /// The digest is signed as-is: it must already be the output of the hash the verifier
    /// expects.
    pub fn sign_prehash(&self, digest: &B256) -> Result<RecoverableSignature, Error> {
        let (signature, recovery_id) = self
            .signer
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|_| Error::SigningFailed)?;
        let (signature, y_parity) = match signature.normalize_s() {
            Some(normalized) => (normalized, !recovery_id.is_y_odd()),
            None => (signature, recovery_id.is_y_odd()),
        };
        Ok(RecoverableSignature::from_parts(&signature, y_parity))
    }
}

impl fmt::Debug for Secp256k1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Derive the Ethereum address of a public key.
pub(crate) fn public_key_to_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// A low-s ECDSA signature with its recovery parity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    r: [u8; 32],
    s: [u8; 32],
    y_parity: bool,
}

impl RecoverableSignature {
    fn from_parts(signature: &Signature, y_parity: bool) -> Self {
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self { r, s, y_parity }
    }

    /// Parse either the 65-byte `r || s || v` form (`v` in `{0, 1, 27, 28}`) or the 64-byte
    /// compact `r || vs` form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        match bytes.len() {
            SIGNATURE_LENGTH => {
                r.copy_from_slice(&bytes[..32]);
                s.copy_from_slice(&bytes[32..64]);
                let y_parity = match bytes[64] {
                    0 | 27 => false,
                    1 | 28 => true,
                    v => return Err(Error::InvalidRecoveryId(v)),
                };
                Ok(Self { r, s, y_parity })
            }
            COMPACT_SIGNATURE_LENGTH => {
                r.copy_from_slice(&bytes[..32]);
                s.copy_from_slice(&bytes[32..]);
                let y_parity = s[0] & 0x80 != 0;
                s[0] &= 0x7f;
                Ok(Self { r, s, y_parity })
            }
            len => Err(Error::InvalidSignatureLength(len)),
        }
    }

    /// Returns whether the y-coordinate of the nonce point is odd.
    pub fn y_parity(&self) -> bool {
        self.y_parity
    }

    /// Encode as `r || s || v` with `v` in `{27, 28}`.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = 27 + self.y_parity as u8;
        out
    }

    /// Encode as `r || vs`, where the top bit of `vs` carries the recovery parity.
    pub fn to_compact(&self) -> [u8; COMPACT_SIGNATURE_LENGTH] {
        let mut out = [0u8; COMPACT_SIGNATURE_LENGTH];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        if self.y_parity {
            out[32] |= 0x80;
        }
        out
    }

    /// Recover the address that produced this signature over `digest`.
    pub fn recover(&self, digest: &B256) -> Result<Address, Error> {
        let mut bytes = [0u8; COMPACT_SIGNATURE_LENGTH];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        let signature = Signature::from_slice(&bytes).map_err(|_| Error::InvalidSignature)?;

        // Some wallets still emit high-s signatures; flip them into the lower half.
        let (signature, y_parity) = match signature.normalize_s() {
            Some(normalized) => (normalized, !self.y_parity),
            None => (signature, self.y_parity),
        };
        let recovery_id = RecoveryId::new(y_parity, false);
        let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
            .map_err(|_| Error::RecoveryFailed)?;
        Ok(public_key_to_address(&key))
    }
}
