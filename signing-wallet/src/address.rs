// SPDX-License-Identifier: CC0-1.0

//! Network parameters and address encoding.

use core::fmt;

use dashcore_hashes::{Hash, hash160};

/// The network a wallet's addresses are valid on.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Network {
    /// The production network.
    Mainnet,
    /// The test network.
    Testnet,
}

impl Network {
    /// Version byte prepended to a P2PKH payload on this network.
    fn p2pkh_prefix(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}

/// Encodes a key identifier as a base58check P2PKH address.
pub fn p2pkh(identifier: &hash160::Hash, network: Network) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(network.p2pkh_prefix());
    payload.extend_from_slice(&identifier.to_byte_array());
    bs58::encode(payload).with_check().into_string()
}

#[cfg(test)]
mod tests {
    use hex_lit::hex;

    use super::*;

    #[test]
    fn p2pkh_known_vector() {
        // HASH160 of 0250863ad64a87ae8a2fe83c1af1a8403cb53f53e486d8511dad8a04887e5b2352.
        let id = hash160::Hash::from_byte_array(hex!("f54a5851e9372b87810a8e60cdd2e7cfd80b6e31"));
        assert_eq!(p2pkh(&id, Network::Mainnet), "1PMycacnJaSqwwJqjawXBErnLsZ7RkXUAs");
    }

    #[test]
    fn networks_encode_distinct_addresses() {
        let id = hash160::Hash::from_byte_array([0u8; 20]);
        let mainnet = p2pkh(&id, Network::Mainnet);
        let testnet = p2pkh(&id, Network::Testnet);
        assert_ne!(mainnet, testnet);
        assert!(mainnet.starts_with('1'));
        assert!(testnet.starts_with('m') || testnet.starts_with('n'));
    }
}
