// SPDX-License-Identifier: CC0-1.0

//! Deterministic signing wallet.
//!
//! Given a root secret, this library derives an unbounded tree of child
//! secrets via BIP32 and uses specific derived secrets to authorize spending
//! transactions, answer server login challenges without revealing the root,
//! sign application messages restricted to one reserved subtree, and derive
//! a stable local-storage password. The value of the crate is the protocol
//! discipline: which path derives which key, under what domain-separation
//! rules, and what gets signed with which digest.
//!
//! The entry point is [`wallet::SigningWallet`]; the fixed paths and their
//! purposes are listed in [`paths`].

pub mod address;
pub mod bip32;
pub mod error;
pub mod paths;
pub mod script;
pub mod sighash;
pub mod sign_message;
pub mod transaction;
pub mod wallet;

pub use address::Network;
pub use bip32::{ChainCode, ChildNumber, DerivationPath, ExtendedPrivKey, ExtendedPubKey};
pub use error::{Error, Result};
pub use script::{ScriptBuf, ScriptType};
pub use sighash::{EcdsaSighashType, SighashCache};
pub use transaction::{
    OutPoint, PreparedTransaction, SpendableOutput, Transaction, TxIn, TxOut, Txid,
};
pub use wallet::{ChallengeSignature, SigningWallet};
