//! Derive [ERC-6551](https://eips.ethereum.org/EIPS/eip-6551) token-bound account addresses.

use alloy_primitives::{address, hex, Address, B256, U256};

/// Bytecode preceding the implementation address in an account proxy.
const HEADER: [u8; 20] = hex!("3d60ad80600a3d3981f3363d3d373d3d3d363d73");

/// Bytecode following the implementation address in an account proxy.
const FOOTER: [u8; 15] = hex!("5af43d82803e903d91602b57fd5bf3");

/// Registry and account implementation the accounts are derived against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub registry: Address,
    pub implementation: Address,
    pub salt: B256,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: address!("000000006551c19487814612e58FE06813775758"),
            implementation: address!("41C8f39463A868d3A88af00cd0fe7102F30E44eC"),
            salt: B256::ZERO,
        }
    }
}

impl Config {
    /// Address of the account owned by `token_id` of `token_contract` on `chain_id`.
    ///
    /// The account need not be deployed; the address is a pure CREATE2 derivation.
    pub fn token_bound_account(
        &self,
        chain_id: u64,
        token_contract: Address,
        token_id: U256,
    ) -> Address {
        let mut code = Vec::with_capacity(HEADER.len() + 20 + FOOTER.len() + 4 * 32);
        code.extend_from_slice(&HEADER);
        code.extend_from_slice(self.implementation.as_slice());
        code.extend_from_slice(&FOOTER);
        code.extend_from_slice(self.salt.as_slice());
        code.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
        code.extend_from_slice(token_contract.into_word().as_slice());
        code.extend_from_slice(&token_id.to_be_bytes::<32>());
        self.registry.create2_from_code(self.salt.0, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;

    const CONTRACT: Address = address!("abcdabcdabcdabcdabcdabcdabcdabcdabcdabcd");

    #[test]
    fn test_matches_create2() {
        let cfg = Config::default();
        let account = cfg.token_bound_account(137, CONTRACT, U256::from(7));

        let code = [
            HEADER.as_slice(),
            cfg.implementation.as_slice(),
            FOOTER.as_slice(),
            &[0u8; 32],
            &U256::from(137).to_be_bytes::<32>(),
            &[0u8; 12],
            CONTRACT.as_slice(),
            &U256::from(7).to_be_bytes::<32>(),
        ]
        .concat();
        assert_eq!(code.len(), 183);

        let mut preimage = vec![0xff];
        preimage.extend_from_slice(cfg.registry.as_slice());
        preimage.extend_from_slice(&[0u8; 32]);
        preimage.extend_from_slice(keccak256(&code).as_slice());
        let expected = Address::from_slice(&keccak256(&preimage)[12..]);
        assert_eq!(account, expected);
    }

    #[test]
    fn test_inputs_are_bound() {
        let cfg = Config::default();
        let base = cfg.token_bound_account(137, CONTRACT, U256::from(7));
        assert_eq!(base, cfg.token_bound_account(137, CONTRACT, U256::from(7)));
        assert_ne!(base, cfg.token_bound_account(1, CONTRACT, U256::from(7)));
        assert_ne!(base, cfg.token_bound_account(137, CONTRACT, U256::from(8)));
        assert_ne!(base, cfg.token_bound_account(137, Address::ZERO, U256::from(7)));

        let salted = Config {
            salt: B256::with_last_byte(1),
            ..cfg
        };
        assert_ne!(base, salted.token_bound_account(137, CONTRACT, U256::from(7)));
    }
}
