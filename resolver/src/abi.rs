//! Resolver call signatures shared by the gateway and its clients.

use alloy_sol_types::sol;

sol! {
    /// `IResolverService`, the call a gateway receives inside an `OffchainLookup`.
    function resolve(bytes name, bytes data) external view returns (bytes result, uint64 expires, bytes sig);

    /// ENSIP-5 text records.
    function text(bytes32 node, string key) external view returns (string);

    /// ENSIP-7 content hashes.
    function contenthash(bytes32 node) external view returns (bytes);
}

/// `addr(bytes32)`, the original single-coin address record.
pub mod addr {
    use alloy_sol_types::sol;

    sol! {
        function addr(bytes32 node) external view returns (address);
    }
}

/// `addr(bytes32,uint256)`, the ENSIP-9 multicoin address record.
pub mod multicoin {
    use alloy_sol_types::sol;

    sol! {
        function addr(bytes32 node, uint256 coinType) external view returns (bytes);
    }
}
