// SPDX-License-Identifier: CC0-1.0

//! Signed-message hash formatting.
//!
//! Applies the fixed domain-separation prefix to a message and double-hashes
//! the result, so a signature over a formatted message can never be confused
//! with a signature over a transaction digest or a login challenge.

use dashcore_hashes::{Hash, HashEngine, sha256d};

use crate::transaction::write_varint;

/// The prefix every signed message commits to, length byte included.
pub const MSG_SIGN_PREFIX: &[u8] = b"\x18Bitcoin Signed Message:\n";

/// Hashes a message for signing: double SHA-256 over the domain prefix, the
/// message length as a varint, and the message itself.
pub fn signed_msg_hash(msg: &str) -> sha256d::Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(MSG_SIGN_PREFIX);
    let mut len_prefix = Vec::with_capacity(9);
    write_varint(&mut len_prefix, msg.len() as u64);
    engine.input(&len_prefix);
    engine.input(msg.as_bytes());
    sha256d::Hash::from_engine(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_manual_construction() {
        let msg = "0000000000000000000000000000000000000000000000000000000000000000";
        let mut preimage = Vec::new();
        preimage.extend_from_slice(MSG_SIGN_PREFIX);
        preimage.push(msg.len() as u8);
        preimage.extend_from_slice(msg.as_bytes());
        assert_eq!(signed_msg_hash(msg), sha256d::Hash::hash(&preimage));
    }

    #[test]
    fn distinct_messages_hash_differently() {
        assert_ne!(signed_msg_hash("a"), signed_msg_hash("b"));
        // The prefix separates the domain: a message equal to its own hash
        // preimage still formats differently.
        assert_ne!(
            signed_msg_hash("test").to_byte_array(),
            sha256d::Hash::hash(b"test").to_byte_array()
        );
    }
}
