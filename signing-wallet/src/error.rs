// SPDX-License-Identifier: CC0-1.0

//! Error types for the signing wallet.
//!
//! Refusals are not errors: [`crate::wallet::SigningWallet::sign_message_hash`]
//! returns `None` when a request violates the message-path capability
//! boundary, never a variant of [`Error`]. Everything here is either a
//! construction failure or a malformed-input failure that aborts the whole
//! call.

use thiserror::Error;

/// Result type alias for signing-wallet operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur while constructing or using a wallet.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The seed handed to [`crate::bip32::ExtendedPrivKey::new_master`] has an
    /// invalid length. Fatal at construction, the wallet cannot proceed.
    #[error("seed length {0} is out of range (expected 16 to 64 bytes)")]
    InvalidSeedLength(usize),

    /// A secp256k1 operation failed on the given key material.
    #[error("secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),

    /// A child number outside `[0, 2^31)` was used where a validated index
    /// was required.
    #[error("child number {0} is not within [0, 2^31)")]
    InvalidChildNumber(u32),

    /// Signature-hash computation failed.
    #[error("sighash error: {0}")]
    Sighash(#[from] crate::sighash::Error),

    /// The previous output carried a script-type tag this wallet does not
    /// know how to sign for.
    #[error("unsupported script type tag {0}")]
    UnsupportedScriptType(u32),

    /// A prepared transaction did not carry exactly one previous output per
    /// input.
    #[error("transaction has {inputs} inputs but {prev_outputs} previous outputs")]
    PreviousOutputMismatch {
        /// Number of inputs in the decoded transaction.
        inputs: usize,
        /// Number of previous outputs supplied alongside it.
        prev_outputs: usize,
    },

    /// The login challenge string is not a decimal integer.
    #[error("challenge is not a decimal integer")]
    ChallengeNotDecimal,

    /// The login challenge does not encode to a 32 byte value.
    #[error("challenge encodes to {0} bytes (expected 32)")]
    ChallengeLength(usize),

    /// Transaction deserialization failed.
    #[error("transaction decode error: {0}")]
    Decode(#[from] crate::transaction::DecodeError),

    /// Hexadecimal decoding failed.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}
