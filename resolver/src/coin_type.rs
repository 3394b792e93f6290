//! Translate between ENSIP-11 coin types and EVM chain ids.

/// SLIP-44 coin type of ether.
pub const ETH_COIN_TYPE: u64 = 60;

/// ENSIP-11 marks EVM chains by setting this bit.
const EVM_BIT: u64 = 0x8000_0000;

/// SLIP-44 coin types that predate ENSIP-11, paired with their chain ids.
const LEGACY: &[(u64, u64)] = &[
    (60, 1),         // Ethereum
    (61, 61),        // Ethereum Classic
    (137, 30),       // Rootstock
    (614, 10),       // Optimism
    (700, 100),      // Gnosis
    (966, 137),      // Polygon
    (1007, 250),     // Fantom
    (9000, 43114),   // Avalanche C-Chain
    (9001, 42161),   // Arbitrum One
    (9006, 56),      // BNB Smart Chain
    (52752, 42220),  // Celo
];

/// Convert a coin type to the EVM chain id it addresses, if any.
pub fn to_chain_id(coin_type: u64) -> Option<u64> {
    if coin_type & EVM_BIT != 0 {
        if coin_type >> 32 != 0 {
            return None;
        }
        return Some(coin_type & (EVM_BIT - 1));
    }
    LEGACY
        .iter()
        .find(|(legacy, _)| *legacy == coin_type)
        .map(|(_, chain_id)| *chain_id)
}

/// Convert an EVM chain id to its ENSIP-11 coin type.
///
/// Mainnet keeps its SLIP-44 coin type. Returns `None` for chain ids that do not fit in 31 bits.
pub fn from_chain_id(chain_id: u64) -> Option<u64> {
    if chain_id == 1 {
        return Some(ETH_COIN_TYPE);
    }
    if chain_id >= EVM_BIT {
        return None;
    }
    Some(EVM_BIT | chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(60, Some(1); "ether")]
    #[test_case(966, Some(137); "legacy polygon")]
    #[test_case(0x8000_0089, Some(137); "ensip11 polygon")]
    #[test_case(0x8000_2105, Some(8453); "ensip11 base")]
    #[test_case(0, None; "bitcoin")]
    #[test_case(0x1_8000_0001, None; "overflowing")]
    fn test_to_chain_id(coin_type: u64, expected: Option<u64>) {
        assert_eq!(to_chain_id(coin_type), expected);
    }

    #[test]
    fn test_inverse() {
        let samples = [0u64, 1, 5, 10, 56, 137, 8453, 42161, 11155111, 0x7fff_ffff];
        for chain_id in samples {
            let coin_type = from_chain_id(chain_id).unwrap();
            assert_eq!(to_chain_id(coin_type), Some(chain_id));
        }
        for chain_id in (0..0x8000_0000u64).step_by(0x0100_0001) {
            assert_eq!(to_chain_id(from_chain_id(chain_id).unwrap()), Some(chain_id));
        }
    }

    #[test]
    fn test_out_of_range_chain() {
        assert_eq!(from_chain_id(0x8000_0000), None);
    }
}
