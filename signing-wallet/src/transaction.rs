// SPDX-License-Identifier: CC0-1.0

//! Transaction model and consensus (de)serialization.
//!
//! A deliberately small transaction representation: enough to decode what the
//! service hands us, to re-encode it for signature-hash computation, and to
//! carry the per-input metadata that tells the wallet which key signs which
//! input. Witness data is never serialized here; the witness itself is
//! assembled by the caller once it has the signatures.

use core::fmt;

use dashcore_hashes::{Hash, HashEngine, hash_newtype, sha256d};
use thiserror::Error;

use crate::script::{ScriptBuf, ScriptType};

hash_newtype! {
    /// A transaction identifier, the double SHA-256 of the serialized
    /// transaction.
    pub struct Txid(sha256d::Hash);
}

/// Errors from transaction deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Ran out of bytes mid-field.
    #[error("unexpected end of data")]
    UnexpectedEof,
    /// A length prefix that cannot fit in memory.
    #[error("oversized vector length {0}")]
    OversizedLength(u64),
    /// Bytes were left over after a complete transaction.
    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),
}

pub(crate) fn write_varint(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xFC => buf.push(n as u8),
        0xFD..=0xFFFF => {
            buf.push(0xFD);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x10000..=0xFFFF_FFFF => {
            buf.push(0xFE);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xFF);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn read_bytes<'a>(cur: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if cur.len() < n {
        return Err(DecodeError::UnexpectedEof);
    }
    let (head, tail) = cur.split_at(n);
    *cur = tail;
    Ok(head)
}

fn read_u32(cur: &mut &[u8]) -> Result<u32, DecodeError> {
    let bytes = read_bytes(cur, 4)?;
    Ok(u32::from_le_bytes(bytes.try_into().expect("4 bytes")))
}

fn read_u64(cur: &mut &[u8]) -> Result<u64, DecodeError> {
    let bytes = read_bytes(cur, 8)?;
    Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
}

fn read_varint(cur: &mut &[u8]) -> Result<u64, DecodeError> {
    let first = read_bytes(cur, 1)?[0];
    Ok(match first {
        0xFD => u16::from_le_bytes(read_bytes(cur, 2)?.try_into().expect("2 bytes")) as u64,
        0xFE => read_u32(cur)? as u64,
        0xFF => read_u64(cur)?,
        n => n as u64,
    })
}

fn read_script(cur: &mut &[u8]) -> Result<ScriptBuf, DecodeError> {
    let len = read_varint(cur)?;
    if len > 10_000_000 {
        return Err(DecodeError::OversizedLength(len));
    }
    Ok(ScriptBuf::from_bytes(read_bytes(cur, len as usize)?.to_vec()))
}

fn write_script(buf: &mut Vec<u8>, script: &ScriptBuf) {
    write_varint(buf, script.len() as u64);
    buf.extend_from_slice(script.as_bytes());
}

/// A reference to an output of a previous transaction.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct OutPoint {
    /// The identifier of the transaction holding the output.
    pub txid: Txid,
    /// The index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    fn consensus_encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.txid.to_byte_array());
        buf.extend_from_slice(&self.vout.to_le_bytes());
    }

    fn consensus_decode(cur: &mut &[u8]) -> Result<Self, DecodeError> {
        let txid_bytes: [u8; 32] = read_bytes(cur, 32)?.try_into().expect("32 bytes");
        Ok(OutPoint {
            txid: Txid::from_byte_array(txid_bytes),
            vout: read_u32(cur)?,
        })
    }
}

/// A transaction input.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TxIn {
    /// The output being spent.
    pub previous_output: OutPoint,
    /// The unlocking script. Empty in an unsigned transaction.
    pub script_sig: ScriptBuf,
    /// The sequence number.
    pub sequence: u32,
}

impl TxIn {
    fn consensus_encode(&self, buf: &mut Vec<u8>) {
        self.previous_output.consensus_encode(buf);
        write_script(buf, &self.script_sig);
        buf.extend_from_slice(&self.sequence.to_le_bytes());
    }

    fn consensus_decode(cur: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(TxIn {
            previous_output: OutPoint::consensus_decode(cur)?,
            script_sig: read_script(cur)?,
            sequence: read_u32(cur)?,
        })
    }
}

/// A transaction output.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TxOut {
    /// The amount in the smallest unit.
    pub value: u64,
    /// The locking script.
    pub script_pubkey: ScriptBuf,
}

impl TxOut {
    pub(crate) fn consensus_encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_script(buf, &self.script_pubkey);
    }

    fn consensus_decode(cur: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(TxOut {
            value: read_u64(cur)?,
            script_pubkey: read_script(cur)?,
        })
    }
}

/// A decoded transaction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Transaction {
    /// Protocol version.
    pub version: i32,
    /// Block height or timestamp before which the transaction is invalid.
    pub lock_time: u32,
    /// The inputs.
    pub input: Vec<TxIn>,
    /// The outputs.
    pub output: Vec<TxOut>,
}

impl Transaction {
    /// Serializes the transaction in consensus format (no witness data).
    pub fn consensus_encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        write_varint(buf, self.input.len() as u64);
        for input in &self.input {
            input.consensus_encode(buf);
        }
        write_varint(buf, self.output.len() as u64);
        for output in &self.output {
            output.consensus_encode(buf);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    /// Deserializes a transaction, requiring the input to be fully consumed.
    pub fn consensus_decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = bytes;
        let version = read_u32(&mut cur)? as i32;
        let input_count = read_varint(&mut cur)?;
        if input_count > u32::MAX as u64 {
            return Err(DecodeError::OversizedLength(input_count));
        }
        let mut input = Vec::with_capacity(input_count.min(1024) as usize);
        for _ in 0..input_count {
            input.push(TxIn::consensus_decode(&mut cur)?);
        }
        let output_count = read_varint(&mut cur)?;
        if output_count > u32::MAX as u64 {
            return Err(DecodeError::OversizedLength(output_count));
        }
        let mut output = Vec::with_capacity(output_count.min(1024) as usize);
        for _ in 0..output_count {
            output.push(TxOut::consensus_decode(&mut cur)?);
        }
        let lock_time = read_u32(&mut cur)?;
        if !cur.is_empty() {
            return Err(DecodeError::TrailingBytes(cur.len()));
        }
        Ok(Transaction { version, lock_time, input, output })
    }

    /// Computes the transaction identifier.
    pub fn txid(&self) -> Txid {
        let mut buf = Vec::new();
        self.consensus_encode(&mut buf);
        let mut engine = sha256d::Hash::engine();
        engine.input(&buf);
        Txid::from_engine(engine)
    }
}

/// One spendable output, as described by the service for each transaction
/// input: the script and value needed for the digest, the tag that selects
/// the digest algorithm, and the derivation triple that owns the key.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SpendableOutput {
    /// The previous output's script program.
    pub script: ScriptBuf,
    /// The previous output's value in the smallest unit.
    pub value: u64,
    /// Which digest algorithm spends of this output sign.
    pub script_type: ScriptType,
    /// The subaccount whose subtree owns the signing key.
    pub sub_account: u32,
    /// Plain branch index under the subaccount.
    pub branch: u32,
    /// Plain key index under the branch.
    pub pointer: u32,
}

/// A transaction prepared for signing: the decoded transaction plus one
/// [`SpendableOutput`] per input, in input order.
///
/// Prepared by the calling layer and consumed read-only by
/// [`crate::wallet::SigningWallet::sign_transaction`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PreparedTransaction {
    /// The transaction to sign.
    pub tx: Transaction,
    /// The previous output spent by each input.
    pub prev_outputs: Vec<SpendableOutput>,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.consensus_encode(&mut buf);
        f.write_str(&hex::encode(buf))
    }
}
