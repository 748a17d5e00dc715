// SPDX-License-Identifier: CC0-1.0

//! The deterministic signing wallet.
//!
//! One wallet wraps one root node and exposes four responsibilities on top of
//! it: signing prepared transactions, answering server login challenges,
//! signing pre-hashed messages on the reserved message subtree, and deriving
//! the stable local-storage password. Every derived key is ephemeral: it is
//! produced for a single operation and wiped when dropped. Which path derives
//! which key is fixed by the table in [`crate::paths`]; the subtrees are
//! disjoint, so no key ever serves two purposes.

use num_bigint::BigUint;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use secp256k1::{Message, Secp256k1};
use sha2::Sha512;

use dashcore_hashes::{Hash, HashEngine, Hmac, HmacEngine, sha512};

use crate::address::{self, Network};
use crate::bip32::{ChildNumber, DerivationPath, ExtendedPrivKey, ExtendedPubKey};
use crate::error::{Error, Result};
use crate::paths::{
    CHALLENGE_METHOD, MESSAGE_PATH_PREFIX, PASSWORD_PATH, PASSWORD_ROUNDS, PASSWORD_SALT,
    SERVICE_PATH, SERVICE_PATH_MAC_KEY, SUBACCOUNT_PURPOSE,
};
use crate::script::ScriptType;
use crate::sighash::{EcdsaSighashType, SighashCache};
use crate::sign_message::signed_msg_hash;
use crate::transaction::{PreparedTransaction, SpendableOutput};

/// A signature over a login challenge, in the verifier's wire shape.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChallengeSignature {
    /// Hex encoding of the 8 random bytes the signing key was derived from.
    ///
    /// Must be transmitted verbatim: the verifier re-derives the same child
    /// from these bytes to check the signature.
    pub path: String,
    /// The signature's `r` component as a decimal string.
    pub r: String,
    /// The signature's `s` component as a decimal string.
    pub s: String,
}

/// A deterministic signing wallet holding a single root node.
pub struct SigningWallet {
    secp: Secp256k1<secp256k1::All>,
    master: ExtendedPrivKey,
    network: Network,
}

impl core::fmt::Debug for SigningWallet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SigningWallet")
            .field("master", &"<hidden>")
            .field("network", &self.network)
            .finish()
    }
}

impl SigningWallet {
    /// Creates a wallet from a seed.
    pub fn from_seed(seed: &[u8], network: Network) -> Result<Self> {
        Ok(SigningWallet {
            secp: Secp256k1::new(),
            master: ExtendedPrivKey::new_master(seed)?,
            network,
        })
    }

    /// Creates a wallet around an existing root node.
    pub fn from_master(master: ExtendedPrivKey, network: Network) -> Self {
        SigningWallet { secp: Secp256k1::new(), master, network }
    }

    /// Exports the root's public material.
    pub fn master_public_key(&self) -> ExtendedPubKey {
        ExtendedPubKey::from_priv(&self.secp, &self.master)
    }

    /// Exports the public material of one subaccount.
    pub fn sub_account_public_key(&self, sub_account: u32) -> Result<ExtendedPubKey> {
        Ok(ExtendedPubKey::from_priv(&self.secp, &self.sub_account_key(sub_account)?))
    }

    /// The private node of a subaccount. Subaccount 0 is the root itself;
    /// any other subaccount sits behind two hardened steps.
    fn sub_account_key(&self, sub_account: u32) -> Result<ExtendedPrivKey> {
        if sub_account == 0 {
            return Ok(self.master.clone());
        }
        let path = [
            ChildNumber::from_hardened_idx(SUBACCOUNT_PURPOSE)?,
            ChildNumber::from_hardened_idx(sub_account)?,
        ];
        Ok(self.master.derive_priv(&self.secp, &path))
    }

    /// The key owning one spendable output: subaccount, then the plain
    /// branch and pointer steps.
    fn input_key(&self, prev: &SpendableOutput) -> Result<ExtendedPrivKey> {
        let account = self.sub_account_key(prev.sub_account)?;
        let path = [
            ChildNumber::from_normal_idx(prev.branch)?,
            ChildNumber::from_normal_idx(prev.pointer)?,
        ];
        Ok(account.derive_priv(&self.secp, &path))
    }

    /// Signs every input of a prepared transaction.
    ///
    /// Returns one DER-encoded signature per input, in input order, each
    /// with the sighash-all byte appended ready for script placement. The
    /// digest algorithm for each input follows the spent output's script
    /// type, and each input is signed with exactly the key its
    /// `(sub_account, branch, pointer)` triple names. Any malformed previous
    /// output fails the whole call; no partial list is ever returned.
    pub fn sign_transaction(&self, ptx: &PreparedTransaction) -> Result<Vec<Vec<u8>>> {
        let tx = &ptx.tx;
        if ptx.prev_outputs.len() != tx.input.len() {
            return Err(Error::PreviousOutputMismatch {
                inputs: tx.input.len(),
                prev_outputs: ptx.prev_outputs.len(),
            });
        }

        let cache = SighashCache::new(tx);
        let mut sigs = Vec::with_capacity(tx.input.len());
        for (i, prev) in ptx.prev_outputs.iter().enumerate() {
            let digest = match prev.script_type {
                ScriptType::P2shP2wsh => cache
                    .segwit_v0_signature_hash(i, &prev.script, prev.value, EcdsaSighashType::All)?
                    .to_byte_array(),
                ScriptType::P2sh => cache
                    .legacy_signature_hash(i, &prev.script, EcdsaSighashType::All.to_u32())?
                    .to_byte_array(),
            };
            let key = self.input_key(prev)?;
            let sig = self.secp.sign_ecdsa(&Message::from_digest(digest), &key.private_key);
            let mut bytes = sig.serialize_der().to_vec();
            bytes.push(EcdsaSighashType::All as u8);
            sigs.push(bytes);
        }
        Ok(sigs)
    }

    /// Returns the RPC method and the address to request a login challenge
    /// for. The address identifies the root publicly; it reveals no secret.
    pub fn challenge_arguments(&self) -> (&'static str, String) {
        let addr = address::p2pkh(&self.master_public_key().identifier(), self.network);
        (CHALLENGE_METHOD, addr)
    }

    /// Signs a server login challenge.
    ///
    /// The signing key is derived along a freshly random path so a
    /// compromised server can never replay an old challenge against a
    /// predictable key. The nonce is returned hex-encoded in
    /// [`ChallengeSignature::path`] for the verifier to re-derive the child.
    pub fn sign_challenge(&self, challenge: &str) -> Result<ChallengeSignature> {
        let mut nonce = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut nonce);

        let key = self.master.derive_priv(&self.secp, &challenge_path(&nonce));
        let digest = challenge_digest(challenge)?;
        let sig = self.secp.sign_ecdsa(&Message::from_digest(digest), &key.private_key);
        let compact = sig.serialize_compact();

        Ok(ChallengeSignature {
            path: hex::encode(nonce),
            r: BigUint::from_bytes_be(&compact[..32]).to_string(),
            s: BigUint::from_bytes_be(&compact[32..]).to_string(),
        })
    }

    /// Signs a pre-hashed 32-byte message, but only on the reserved message
    /// subtree.
    ///
    /// Returns `None` (a refusal, not an error) unless `hash` is exactly 32
    /// bytes and `path` starts with the two-step message prefix. The refusal
    /// is the capability boundary: no caller can reach the transaction or
    /// login subtrees through this entry point.
    pub fn sign_message_hash(&self, hash: &[u8], path: &[u32]) -> Option<Vec<u8>> {
        if hash.len() != 32 {
            return None;
        }
        if path.len() < 2 || path[..2] != MESSAGE_PATH_PREFIX {
            return None;
        }

        let steps: DerivationPath = path.iter().map(|&i| ChildNumber::from(i)).collect();
        let key = self.master.derive_priv(&self.secp, &steps);

        let formatted = signed_msg_hash(&hex::encode(hash));
        let sig = self
            .secp
            .sign_ecdsa(&Message::from_digest(formatted.to_byte_array()), &key.private_key);
        Some(sig.serialize_der().to_vec())
    }

    /// Derives the stable local-storage encryption password.
    ///
    /// Deterministic per root on purpose: the wallet can always reconstruct
    /// its storage password without persisting it.
    pub fn local_encryption_password(&self) -> [u8; 64] {
        let key = self.master.derive_priv(&self.secp, &[ChildNumber::from(PASSWORD_PATH)]);
        let pubkey = secp256k1::PublicKey::from_secret_key(&self.secp, &key.private_key);
        let mut out = [0u8; 64];
        pbkdf2_hmac::<Sha512>(&pubkey.serialize(), PASSWORD_SALT, PASSWORD_ROUNDS, &mut out);
        out
    }

    /// Returns the fixed service identification path encoding: an
    /// HMAC-SHA512 over the service child's chain code and public key.
    pub fn service_path(&self) -> [u8; 64] {
        let key = self.master.derive_priv(&self.secp, &[ChildNumber::from(SERVICE_PATH)]);
        let xpub = ExtendedPubKey::from_priv(&self.secp, &key);

        let mut engine: HmacEngine<sha512::Hash> = HmacEngine::new(SERVICE_PATH_MAC_KEY);
        engine.input(xpub.chain_code.as_bytes());
        engine.input(&xpub.public_key.serialize());
        Hmac::<sha512::Hash>::from_engine(engine).to_byte_array()
    }
}

/// Splits an 8-byte nonce into four big-endian 16-bit plain derivation
/// steps. The verifier performs the identical split on the hex path it
/// receives.
pub(crate) fn challenge_path(nonce: &[u8; 8]) -> DerivationPath {
    nonce
        .chunks(2)
        .map(|pair| ChildNumber::from(u16::from_be_bytes([pair[0], pair[1]]) as u32))
        .collect()
}

/// Converts a decimal challenge string into the 32-byte value to sign.
///
/// The verifier encodes the challenge as a *signed* big-endian integer, so
/// values with the top bit set carry a leading zero byte; that byte is
/// stripped again only in the exactly-33-byte case. This normalization is a
/// server-compatibility rule and must be preserved bit-for-bit, whatever its
/// aesthetics.
pub(crate) fn challenge_digest(challenge: &str) -> Result<[u8; 32]> {
    let n = BigUint::parse_bytes(challenge.as_bytes(), 10).ok_or(Error::ChallengeNotDecimal)?;
    let mut bytes = n.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }
    if bytes.len() == 33 && bytes[0] == 0 {
        bytes.remove(0);
    }
    let len = bytes.len();
    bytes.try_into().map_err(|_| Error::ChallengeLength(len))
}
