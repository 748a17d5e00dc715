// SPDX-License-Identifier: CC0-1.0

//! Signature hash computation (used in transaction signing).
//!
//! Two digest algorithms live here behind one [`SighashCache`]: the legacy
//! pre-segwit algorithm, and the segwit v0 algorithm which additionally
//! commits to the value of the spent output. Which one applies to a given
//! input is decided by the spent output's [`crate::script::ScriptType`].

use core::borrow::Borrow;

use dashcore_hashes::{Hash, HashEngine, hash_newtype, sha256d};
use thiserror::Error;

use crate::script::ScriptBuf;
use crate::transaction::{Transaction, TxIn, TxOut};

/// Used for the signature hash of an invalid use of SIGHASH_SINGLE.
#[rustfmt::skip]
pub(crate) const UINT256_ONE: [u8; 32] = [
    1, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0
];

hash_newtype! {
    /// Hash of a transaction according to the legacy signature algorithm.
    #[hash_newtype(forward)]
    pub struct LegacySighash(sha256d::Hash);

    /// Hash of a transaction according to the segwit v0 signature algorithm.
    #[hash_newtype(forward)]
    pub struct SegwitV0Sighash(sha256d::Hash);
}

/// Possible errors in computing the signature message.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Requested index is greater or equal than the number of inputs in the
    /// transaction.
    #[error("requested input index {index} out of bounds ({inputs_size} inputs)")]
    IndexOutOfInputsBounds {
        /// Requested index.
        index: usize,
        /// Number of transaction inputs.
        inputs_size: usize,
    },
}

/// Hashtype of an input's signature, encoded in the last byte of the
/// signature.
///
/// Fixed values so they can be cast as integer types for encoding. This
/// wallet only ever signs with [`EcdsaSighashType::All`]; the rest of the
/// standard set is kept so digests for foreign signatures can be checked.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum EcdsaSighashType {
    /// 0x1: Sign all outputs.
    All = 0x01,
    /// 0x2: Sign no outputs.
    None = 0x02,
    /// 0x3: Sign the output whose index matches this input's index.
    Single = 0x03,
    /// 0x81: Sign all outputs but only this input.
    AllPlusAnyoneCanPay = 0x81,
    /// 0x82: Sign no outputs and only this input.
    NonePlusAnyoneCanPay = 0x82,
    /// 0x83: Sign one output and only this input.
    SinglePlusAnyoneCanPay = 0x83,
}

impl EcdsaSighashType {
    /// Splits the sighash flag into the "real" flag and the ANYONECANPAY
    /// boolean.
    pub(crate) fn split_anyonecanpay_flag(self) -> (EcdsaSighashType, bool) {
        use EcdsaSighashType::*;

        match self {
            All => (All, false),
            None => (None, false),
            Single => (Single, false),
            AllPlusAnyoneCanPay => (All, true),
            NonePlusAnyoneCanPay => (None, true),
            SinglePlusAnyoneCanPay => (Single, true),
        }
    }

    /// Creates an [`EcdsaSighashType`] from a raw `u32`, replicating the
    /// consensus masking behaviour.
    pub fn from_consensus(n: u32) -> EcdsaSighashType {
        use EcdsaSighashType::*;

        // Consensus masks with 0x1f; re-activate the ANYONECANPAY bit after
        // masking so ACP-combined values are recognized.
        let mask = 0x1f | 0x80;
        match n & mask {
            0x01 => All,
            0x02 => None,
            0x03 => Single,
            0x81 => AllPlusAnyoneCanPay,
            0x82 => NonePlusAnyoneCanPay,
            0x83 => SinglePlusAnyoneCanPay,
            x if x & 0x80 == 0x80 => AllPlusAnyoneCanPay,
            _ => All,
        }
    }

    /// Converts to the `u32` sighash flag.
    pub fn to_u32(self) -> u32 {
        self as u32
    }
}

/// Computes signature hash messages for the inputs of one transaction.
#[derive(Debug)]
pub struct SighashCache<T: Borrow<Transaction>> {
    /// Access to transaction required for transaction introspection.
    tx: T,
}

impl<T: Borrow<Transaction>> SighashCache<T> {
    /// Constructs a new `SighashCache` from an unsigned transaction.
    ///
    /// For the generated digests to stay valid, no field of the transaction
    /// may change except `script_sig`.
    pub fn new(tx: T) -> Self {
        SighashCache { tx }
    }

    /// Returns the reference to the cached transaction.
    pub fn transaction(&self) -> &Transaction {
        self.tx.borrow()
    }

    /// Computes the legacy signature hash for the input at `input_index`,
    /// placing `script_pubkey` as the script code.
    ///
    /// Handles the SIGHASH_SINGLE "one array" consensus quirk: signing an
    /// input with SIGHASH_SINGLE and no corresponding output digests the
    /// constant one-value instead.
    pub fn legacy_signature_hash(
        &self,
        input_index: usize,
        script_pubkey: &ScriptBuf,
        sighash_type: u32,
    ) -> Result<LegacySighash, Error> {
        let tx = self.tx.borrow();
        if input_index >= tx.input.len() {
            return Err(Error::IndexOutOfInputsBounds {
                index: input_index,
                inputs_size: tx.input.len(),
            });
        }

        let (sighash, anyone_can_pay) =
            EcdsaSighashType::from_consensus(sighash_type).split_anyonecanpay_flag();

        if sighash == EcdsaSighashType::Single && input_index >= tx.output.len() {
            return Ok(LegacySighash::from_byte_array(UINT256_ONE));
        }

        // Build the transaction image that gets hashed: the signed input
        // carries the script code, everything else is blanked according to
        // the flags.
        let mut signing_tx = Transaction {
            version: tx.version,
            lock_time: tx.lock_time,
            input: vec![],
            output: vec![],
        };
        if anyone_can_pay {
            signing_tx.input = vec![TxIn {
                previous_output: tx.input[input_index].previous_output,
                script_sig: script_pubkey.clone(),
                sequence: tx.input[input_index].sequence,
            }];
        } else {
            signing_tx.input = Vec::with_capacity(tx.input.len());
            for (n, input) in tx.input.iter().enumerate() {
                signing_tx.input.push(TxIn {
                    previous_output: input.previous_output,
                    script_sig: if n == input_index {
                        script_pubkey.clone()
                    } else {
                        ScriptBuf::new()
                    },
                    sequence: if n != input_index
                        && (sighash == EcdsaSighashType::Single
                            || sighash == EcdsaSighashType::None)
                    {
                        0
                    } else {
                        input.sequence
                    },
                });
            }
        }
        signing_tx.output = match sighash {
            EcdsaSighashType::All => tx.output.clone(),
            EcdsaSighashType::Single => tx
                .output
                .iter()
                .take(input_index + 1)
                .enumerate()
                .map(|(n, out)| {
                    if n == input_index {
                        out.clone()
                    } else {
                        TxOut { value: u64::MAX, script_pubkey: ScriptBuf::new() }
                    }
                })
                .collect(),
            EcdsaSighashType::None => vec![],
            _ => unreachable!("split_anyonecanpay_flag returns only real flags"),
        };

        let mut buf = Vec::new();
        signing_tx.consensus_encode(&mut buf);
        buf.extend_from_slice(&sighash_type.to_le_bytes());

        let mut engine = LegacySighash::engine();
        engine.input(&buf);
        Ok(LegacySighash::from_engine(engine))
    }

    /// Computes the segwit v0 (BIP143) signature hash for the input at
    /// `input_index`.
    ///
    /// `script_code` is the script program without its length prefix;
    /// `value` is the value of the output being spent, which this digest
    /// commits to.
    pub fn segwit_v0_signature_hash(
        &self,
        input_index: usize,
        script_code: &ScriptBuf,
        value: u64,
        sighash_type: EcdsaSighashType,
    ) -> Result<SegwitV0Sighash, Error> {
        let tx = self.tx.borrow();
        if input_index >= tx.input.len() {
            return Err(Error::IndexOutOfInputsBounds {
                index: input_index,
                inputs_size: tx.input.len(),
            });
        }

        let (sighash, anyone_can_pay) = sighash_type.split_anyonecanpay_flag();
        let zero = [0u8; 32];

        let hash_prevouts = if !anyone_can_pay {
            let mut buf = Vec::with_capacity(36 * tx.input.len());
            for input in &tx.input {
                buf.extend_from_slice(&input.previous_output.txid.to_byte_array());
                buf.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            }
            sha256d::Hash::hash(&buf).to_byte_array()
        } else {
            zero
        };

        let hash_sequence = if !anyone_can_pay
            && sighash != EcdsaSighashType::Single
            && sighash != EcdsaSighashType::None
        {
            let mut buf = Vec::with_capacity(4 * tx.input.len());
            for input in &tx.input {
                buf.extend_from_slice(&input.sequence.to_le_bytes());
            }
            sha256d::Hash::hash(&buf).to_byte_array()
        } else {
            zero
        };

        let hash_outputs = if sighash != EcdsaSighashType::Single
            && sighash != EcdsaSighashType::None
        {
            let mut buf = Vec::new();
            for output in &tx.output {
                output.consensus_encode(&mut buf);
            }
            sha256d::Hash::hash(&buf).to_byte_array()
        } else if sighash == EcdsaSighashType::Single && input_index < tx.output.len() {
            let mut buf = Vec::new();
            tx.output[input_index].consensus_encode(&mut buf);
            sha256d::Hash::hash(&buf).to_byte_array()
        } else {
            zero
        };

        let input = &tx.input[input_index];
        let mut buf = Vec::new();
        buf.extend_from_slice(&tx.version.to_le_bytes());
        buf.extend_from_slice(&hash_prevouts);
        buf.extend_from_slice(&hash_sequence);
        buf.extend_from_slice(&input.previous_output.txid.to_byte_array());
        buf.extend_from_slice(&input.previous_output.vout.to_le_bytes());
        crate::transaction::write_varint(&mut buf, script_code.len() as u64);
        buf.extend_from_slice(script_code.as_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
        buf.extend_from_slice(&input.sequence.to_le_bytes());
        buf.extend_from_slice(&hash_outputs);
        buf.extend_from_slice(&tx.lock_time.to_le_bytes());
        buf.extend_from_slice(&sighash_type.to_u32().to_le_bytes());

        let mut engine = SegwitV0Sighash::engine();
        engine.input(&buf);
        Ok(SegwitV0Sighash::from_engine(engine))
    }
}

#[cfg(test)]
mod tests {
    use hex_lit::hex;

    use super::*;
    use crate::transaction::{OutPoint, Txid};

    fn dummy_txin() -> TxIn {
        TxIn {
            previous_output: OutPoint { txid: Txid::all_zeros(), vout: 0 },
            script_sig: ScriptBuf::new(),
            sequence: 0xffffffff,
        }
    }

    #[test]
    fn sighash_single_bug() {
        const SIGHASH_SINGLE: u32 = 3;

        // We need a tx with more inputs than outputs.
        let tx = Transaction {
            version: 1,
            lock_time: 0,
            input: vec![dummy_txin(), dummy_txin()],
            output: vec![TxOut { value: 0, script_pubkey: ScriptBuf::new() }],
        };
        let cache = SighashCache::new(&tx);

        let got = cache.legacy_signature_hash(1, &ScriptBuf::new(), SIGHASH_SINGLE).unwrap();
        let want = LegacySighash::from_byte_array(UINT256_ONE);
        assert_eq!(got, want);
    }

    #[test]
    fn out_of_bounds_input_errors() {
        let tx = Transaction { version: 0, lock_time: 0, input: vec![dummy_txin()], output: vec![] };
        let cache = SighashCache::new(&tx);

        assert_eq!(
            cache.legacy_signature_hash(10, &ScriptBuf::new(), 1),
            Err(Error::IndexOutOfInputsBounds { index: 10, inputs_size: 1 })
        );
        assert_eq!(
            cache.segwit_v0_signature_hash(10, &ScriptBuf::new(), 0, EcdsaSighashType::All),
            Err(Error::IndexOutOfInputsBounds { index: 10, inputs_size: 1 })
        );
    }

    #[test]
    fn legacy_sighash_all_matches_manual_encoding() {
        let script = ScriptBuf::from_bytes(hex!("76a914f54a5851e9372b87810a8e60cdd2e7cfd80b6e3188ac").to_vec());
        let tx = Transaction {
            version: 1,
            lock_time: 0,
            input: vec![dummy_txin()],
            output: vec![TxOut { value: 50_000, script_pubkey: script.clone() }],
        };

        // Build the expected preimage by hand: the input's script_sig is
        // replaced by the script code and the sighash flag is appended as a
        // 32-bit little-endian integer.
        let mut expected = Vec::new();
        let mut image = tx.clone();
        image.input[0].script_sig = script.clone();
        image.consensus_encode(&mut expected);
        expected.extend_from_slice(&1u32.to_le_bytes());
        let want = sha256d::Hash::hash(&expected).to_byte_array();

        let got = SighashCache::new(&tx).legacy_signature_hash(0, &script, 1).unwrap();
        assert_eq!(got.to_byte_array(), want);
    }

    // Official BIP143 P2WPKH example, second input, SIGHASH_ALL.
    #[test]
    fn bip143_p2wpkh_vector() {
        let bytes = hex!(
            "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000"
        );
        let tx = Transaction::consensus_decode(&bytes).unwrap();
        let script_code =
            ScriptBuf::from_bytes(hex!("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac").to_vec());

        let got = SighashCache::new(&tx)
            .segwit_v0_signature_hash(1, &script_code, 600_000_000, EcdsaSighashType::All)
            .unwrap();
        assert_eq!(
            got.to_byte_array(),
            hex!("c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670")
        );
    }
}
