//! ENS names: DNS wire format, namehash, and normalization.

use crate::Error;
use alloy_primitives::{keccak256, B256};

/// Longest label the DNS wire format can carry.
const MAX_LABEL_LENGTH: usize = 255;

/// Decode a DNS wire-format name (length-prefixed labels terminated by a zero byte) into its
/// dotted form.
pub fn dns_decode(encoded: &[u8]) -> Result<String, Error> {
    let mut labels = Vec::new();
    let mut idx = 0;
    loop {
        let len = *encoded
            .get(idx)
            .ok_or(Error::InvalidName("missing terminator"))? as usize;
        if len == 0 {
            break;
        }
        let label = encoded
            .get(idx + 1..idx + 1 + len)
            .ok_or(Error::InvalidName("truncated label"))?;
        let label = std::str::from_utf8(label).map_err(|_| Error::InvalidName("invalid utf-8"))?;
        if label.contains('.') {
            return Err(Error::InvalidName("label contains a dot"));
        }
        labels.push(label);
        idx += len + 1;
    }
    if idx + 1 != encoded.len() {
        return Err(Error::InvalidName("trailing bytes"));
    }
    Ok(labels.join("."))
}

/// Encode a dotted name in DNS wire format.
pub fn dns_encode(name: &str) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(name.len() + 2);
    if !name.is_empty() {
        for label in name.split('.') {
            if label.is_empty() {
                return Err(Error::InvalidName("empty label"));
            }
            if label.len() > MAX_LABEL_LENGTH {
                return Err(Error::InvalidName("label too long"));
            }
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
    }
    out.push(0);
    Ok(out)
}

/// Compute the ENS namehash of `name`.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(keccak256(label.as_bytes()).as_slice());
        node = keccak256(buf);
    }
    node
}

/// Map `name` through [UTS-46](https://unicode.org/reports/tr46/) (case folding, width and
/// compatibility mappings, punycode decoding).
///
/// Labels that fail validation are still mapped; use [is_normalized] to reject them.
pub fn normalize(name: &str) -> String {
    idna::domain_to_unicode(name).0
}

/// Returns true if `name` maps to itself without errors and has no empty labels.
pub fn is_normalized(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    if name.split('.').any(str::is_empty) {
        return false;
    }
    let (mapped, result) = idna::domain_to_unicode(name);
    result.is_ok() && mapped == name
}

/// Split a name into its first label and the remainder.
pub fn split_first(name: &str) -> Option<(&str, &str)> {
    name.split_once('.')
}

/// Returns the name with its first label removed, if it has more than one label.
pub fn parent(name: &str) -> Option<&str> {
    split_first(name).map(|(_, rest)| rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;
    use test_case::test_case;

    #[test]
    fn test_namehash_vectors() {
        assert_eq!(namehash(""), B256::ZERO);
        assert_eq!(
            namehash("eth"),
            b256!("93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae")
        );
        assert_eq!(
            namehash("foo.eth"),
            b256!("de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f")
        );
    }

    #[test_case("alpha.eth", b"\x05alpha\x03eth\x00"; "two labels")]
    #[test_case("0011223344556677.alpha.eth", b"\x100011223344556677\x05alpha\x03eth\x00"; "hex label")]
    #[test_case("", b"\x00"; "root")]
    fn test_dns_wire(name: &str, encoded: &[u8]) {
        assert_eq!(dns_encode(name).unwrap(), encoded);
        assert_eq!(dns_decode(encoded).unwrap(), name);
    }

    #[test_case(b"" ; "empty")]
    #[test_case(b"\x05alpha\x03eth" ; "no terminator")]
    #[test_case(b"\x09alpha\x00" ; "truncated")]
    #[test_case(b"\x05alpha\x00\x00" ; "trailing")]
    #[test_case(b"\x03a.b\x00" ; "dotted label")]
    fn test_dns_decode_rejects(encoded: &[u8]) {
        assert!(matches!(dns_decode(encoded), Err(Error::InvalidName(_))));
    }

    #[test]
    fn test_dns_encode_rejects_empty_label() {
        assert!(dns_encode("alpha..eth").is_err());
        assert!(dns_encode(".eth").is_err());
    }

    #[test_case("alpha.eth" ; "ascii")]
    #[test_case("0011223344556677.alpha.eth" ; "hex label")]
    #[test_case("caf\u{e9}.eth" ; "accented")]
    #[test_case("" ; "root")]
    fn test_normalized(name: &str) {
        assert!(is_normalized(name));
        assert_eq!(normalize(name), name);
    }

    #[test_case("Alpha.eth", "alpha.eth" ; "upper case")]
    #[test_case("\u{ff41}lpha.eth", "alpha.eth" ; "fullwidth")]
    #[test_case("xn--caf-dma.eth", "caf\u{e9}.eth" ; "punycode")]
    #[test_case("CAF\u{c9}.ETH", "caf\u{e9}.eth" ; "accented upper case")]
    fn test_not_normalized(name: &str, normal: &str) {
        assert!(!is_normalized(name));
        assert_eq!(normalize(name), normal);
        assert!(is_normalized(normal));
    }

    #[test]
    fn test_empty_label_not_normalized() {
        assert!(!is_normalized("alpha..eth"));
        assert!(!is_normalized(".eth"));
    }

    #[test]
    fn test_split() {
        assert_eq!(split_first("a.b.eth"), Some(("a", "b.eth")));
        assert_eq!(parent("a.b.eth"), Some("b.eth"));
        assert_eq!(parent("eth"), None);
    }
}
