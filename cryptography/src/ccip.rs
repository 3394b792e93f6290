//! Sign CCIP-Read gateway responses.
//!
//! The verifier contract recomputes
//! `keccak256(0x1900 || target || validUntil || keccak256(request) || keccak256(result))`
//! and recovers the signer from a compact `r || vs` signature.

use crate::{Error, RecoverableSignature, Secp256k1};
use alloy_primitives::{keccak256, Address, B256};

const PREFIX: [u8; 2] = [0x19, 0x00];

/// Compute the digest a gateway signs for a single response.
pub fn digest(target: &Address, valid_until: u64, request: &[u8], result: &[u8]) -> B256 {
    let mut buf = Vec::with_capacity(PREFIX.len() + 20 + 8 + 32 + 32);
    buf.extend_from_slice(&PREFIX);
    buf.extend_from_slice(target.as_slice());
    buf.extend_from_slice(&valid_until.to_be_bytes());
    buf.extend_from_slice(keccak256(request).as_slice());
    buf.extend_from_slice(keccak256(result).as_slice());
    keccak256(&buf)
}

/// Sign `result` as the answer to `request`, sent to `target`, valid until `valid_until`
/// (seconds since the epoch).
///
/// Returns the compact `r || vs` encoding.
pub fn sign(
    signer: &Secp256k1,
    target: &Address,
    valid_until: u64,
    request: &[u8],
    result: &[u8],
) -> Result<[u8; 64], Error> {
    let digest = digest(target, valid_until, request, result);
    Ok(signer.sign_prehash(&digest)?.to_compact())
}

/// Recover the signer of a response produced by [sign].
pub fn recover(
    signature: &[u8],
    target: &Address,
    valid_until: u64,
    request: &[u8],
    result: &[u8],
) -> Result<Address, Error> {
    let digest = digest(target, valid_until, request, result);
    RecoverableSignature::from_bytes(signature)?.recover(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const TARGET: Address = address!("1111111111111111111111111111111111111111");

    #[test]
    fn test_digest_layout() {
        let request = [0xaa; 4];
        let result = [0xbb; 32];
        let mut expected = vec![0x19, 0x00];
        expected.extend_from_slice(TARGET.as_slice());
        expected.extend_from_slice(&[0, 0, 0, 0, 0x65, 0x00, 0x00, 0x00]);
        expected.extend_from_slice(keccak256(request).as_slice());
        expected.extend_from_slice(keccak256(result).as_slice());
        assert_eq!(expected.len(), 94);
        assert_eq!(
            digest(&TARGET, 0x6500_0000, &request, &result),
            keccak256(&expected)
        );
    }

    #[test]
    fn test_sign_recover() {
        let signer = Secp256k1::from_seed(42);
        let request = b"resolve(bytes,bytes)".to_vec();
        let result = [7u8; 32];
        let signature = sign(&signer, &TARGET, 1_700_000_300, &request, &result).unwrap();
        assert_eq!(signature.len(), 64);
        let recovered = recover(&signature, &TARGET, 1_700_000_300, &request, &result).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_every_field_is_bound() {
        let signer = Secp256k1::from_seed(1);
        let request = [1u8; 36];
        let result = [2u8; 32];
        let signature = sign(&signer, &TARGET, 100, &request, &result).unwrap();
        let other = address!("2222222222222222222222222222222222222222");

        assert_ne!(
            recover(&signature, &other, 100, &request, &result).unwrap(),
            signer.address()
        );
        assert_ne!(
            recover(&signature, &TARGET, 101, &request, &result).unwrap(),
            signer.address()
        );
        assert_ne!(
            recover(&signature, &TARGET, 100, &[9u8; 36], &result).unwrap(),
            signer.address()
        );
        assert_ne!(
            recover(&signature, &TARGET, 100, &request, &[3u8; 32]).unwrap(),
            signer.address()
        );
    }
}
