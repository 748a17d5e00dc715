// SPDX-License-Identifier: CC0-1.0

//! BIP32 hierarchical key derivation.
//!
//! Implements the private-key half of BIP32: a root node built from a seed
//! and deterministic child derivation, both normal and hardened. Derivation
//! is a pure function of `(parent, child number)`; every path is a fold of
//! single steps over the root and no derived node is ever cached. Public-only
//! derivation is deliberately not provided: the only way into the tree is
//! through the private root, so a hardened child can never be requested from
//! public material.

use core::fmt;
use core::slice;

use dashcore_hashes::{Hash, HashEngine, Hmac, HmacEngine, hash160, sha512};
use secp256k1::{Scalar, Secp256k1};
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// A chain code, the public half of the derivation state of a node.
#[derive(Clone, PartialEq, Eq)]
pub struct ChainCode([u8; 32]);

impl ChainCode {
    /// Returns the chain code bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn from_hmac(hmac: &Hmac<sha512::Hash>) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hmac[32..]);
        ChainCode(bytes)
    }
}

impl From<[u8; 32]> for ChainCode {
    fn from(bytes: [u8; 32]) -> Self {
        ChainCode(bytes)
    }
}

impl AsRef<[u8]> for ChainCode {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Zeroize for ChainCode {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for ChainCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainCode({})", hex::encode(self.0))
    }
}

/// A single derivation step.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum ChildNumber {
    /// Non-hardened derivation, computable from public parent material.
    Normal {
        /// Key index, within `[0, 2^31)`.
        index: u32,
    },
    /// Hardened derivation, requires the parent's private scalar.
    Hardened {
        /// Key index, within `[0, 2^31)`.
        index: u32,
    },
}

impl ChildNumber {
    /// Creates a normal child number, rejecting indices with the hardened bit
    /// set.
    pub fn from_normal_idx(index: u32) -> Result<Self> {
        if index & (1 << 31) == 0 {
            Ok(ChildNumber::Normal { index })
        } else {
            Err(Error::InvalidChildNumber(index))
        }
    }

    /// Creates a hardened child number, rejecting indices with the hardened
    /// bit set.
    pub fn from_hardened_idx(index: u32) -> Result<Self> {
        if index & (1 << 31) == 0 {
            Ok(ChildNumber::Hardened { index })
        } else {
            Err(Error::InvalidChildNumber(index))
        }
    }

    /// Returns `true` for a hardened step.
    pub fn is_hardened(&self) -> bool {
        match self {
            ChildNumber::Hardened { .. } => true,
            ChildNumber::Normal { .. } => false,
        }
    }
}

impl From<u32> for ChildNumber {
    fn from(number: u32) -> Self {
        if number & (1 << 31) != 0 {
            ChildNumber::Hardened { index: number ^ (1 << 31) }
        } else {
            ChildNumber::Normal { index: number }
        }
    }
}

impl From<ChildNumber> for u32 {
    fn from(cnum: ChildNumber) -> Self {
        match cnum {
            ChildNumber::Normal { index } => index,
            ChildNumber::Hardened { index } => index | (1 << 31),
        }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ChildNumber::Hardened { index } => write!(f, "{}'", index),
            ChildNumber::Normal { index } => fmt::Display::fmt(&index, f),
        }
    }
}

impl AsRef<[ChildNumber]> for ChildNumber {
    fn as_ref(&self) -> &[ChildNumber] {
        slice::from_ref(self)
    }
}

/// An ordered sequence of derivation steps.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    /// Returns the number of steps in the path.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the master path `m`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(numbers: Vec<ChildNumber>) -> Self {
        DerivationPath(numbers)
    }
}

impl<'a> From<&'a [ChildNumber]> for DerivationPath {
    fn from(numbers: &'a [ChildNumber]) -> Self {
        DerivationPath(numbers.to_vec())
    }
}

impl FromIterator<ChildNumber> for DerivationPath {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = ChildNumber>,
    {
        DerivationPath(Vec::from_iter(iter))
    }
}

impl AsRef<[ChildNumber]> for DerivationPath {
    fn as_ref(&self) -> &[ChildNumber] {
        &self.0
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for cn in self.0.iter() {
            write!(f, "/{}", cn)?;
        }
        Ok(())
    }
}

/// A node in the private key tree: a secret scalar plus its chain code.
///
/// Lineage (depth and parent indices) is implied by the path used to reach
/// the node and is not stored. The node wipes its secret material when
/// dropped, so ephemeral per-operation keys leave nothing behind.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtendedPrivKey {
    /// The private scalar of this node.
    pub private_key: secp256k1::SecretKey,
    /// The chain code used to derandomize child derivation.
    pub chain_code: ChainCode,
}

impl fmt::Debug for ExtendedPrivKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPrivKey")
            .field("private_key", &"[redacted]")
            .field("chain_code", &self.chain_code)
            .finish()
    }
}

impl Drop for ExtendedPrivKey {
    fn drop(&mut self) {
        self.private_key.non_secure_erase();
        self.chain_code.zeroize();
    }
}

impl ExtendedPrivKey {
    /// Constructs the root node from a seed.
    ///
    /// The seed must be between 128 and 512 bits. Anything else is a
    /// construction error.
    pub fn new_master(seed: &[u8]) -> Result<ExtendedPrivKey> {
        if seed.len() < 16 || seed.len() > 64 {
            return Err(Error::InvalidSeedLength(seed.len()));
        }

        let mut hmac_engine: HmacEngine<sha512::Hash> = HmacEngine::new(b"Bitcoin seed");
        hmac_engine.input(seed);
        let hmac_result: Hmac<sha512::Hash> = Hmac::from_engine(hmac_engine);

        let mut private_key_bytes = [0u8; 32];
        private_key_bytes.copy_from_slice(&hmac_result[..32]);
        let private_key = secp256k1::SecretKey::from_byte_array(&private_key_bytes)?;
        private_key_bytes.zeroize();

        Ok(ExtendedPrivKey {
            private_key,
            chain_code: ChainCode::from_hmac(&hmac_result),
        })
    }

    /// Derives the node at `path`, one pure step at a time.
    pub fn derive_priv<C: secp256k1::Signing, P: AsRef<[ChildNumber]>>(
        &self,
        secp: &Secp256k1<C>,
        path: &P,
    ) -> ExtendedPrivKey {
        let mut sk = self.clone();
        for cnum in path.as_ref() {
            sk = sk.ckd_priv(secp, *cnum);
        }
        sk
    }

    /// Private->private child key derivation.
    fn ckd_priv<C: secp256k1::Signing>(
        &self,
        secp: &Secp256k1<C>,
        i: ChildNumber,
    ) -> ExtendedPrivKey {
        let mut hmac_engine: HmacEngine<sha512::Hash> = HmacEngine::new(&self.chain_code.0);
        match i {
            ChildNumber::Normal { .. } => {
                // Non-hardened: commit to the public key only.
                hmac_engine
                    .input(&secp256k1::PublicKey::from_secret_key(secp, &self.private_key).serialize());
            }
            ChildNumber::Hardened { .. } => {
                // Hardened: feed the secret scalar so the child cannot be
                // computed from public material.
                hmac_engine.input(&[0u8]);
                hmac_engine.input(&self.private_key.secret_bytes());
            }
        }
        hmac_engine.input(&u32::from(i).to_be_bytes());
        let hmac_result: Hmac<sha512::Hash> = Hmac::from_engine(hmac_engine);

        let mut tweak_bytes = [0u8; 32];
        tweak_bytes.copy_from_slice(&hmac_result[..32]);
        let tweak = secp256k1::SecretKey::from_byte_array(&tweak_bytes)
            .expect("statistically impossible to hit");
        tweak_bytes.zeroize();
        let private_key = tweak
            .add_tweak(&Scalar::from(self.private_key))
            .expect("statistically impossible to hit");

        ExtendedPrivKey {
            private_key,
            chain_code: ChainCode::from_hmac(&hmac_result),
        }
    }
}

/// The public material of a node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExtendedPubKey {
    /// The public key of this node.
    pub public_key: secp256k1::PublicKey,
    /// The chain code of this node.
    pub chain_code: ChainCode,
}

impl ExtendedPubKey {
    /// Extracts the public material of a private node.
    pub fn from_priv<C: secp256k1::Signing>(
        secp: &Secp256k1<C>,
        sk: &ExtendedPrivKey,
    ) -> ExtendedPubKey {
        ExtendedPubKey {
            public_key: secp256k1::PublicKey::from_secret_key(secp, &sk.private_key),
            chain_code: sk.chain_code.clone(),
        }
    }

    /// Returns the key identifier, the HASH160 of the serialized public key.
    pub fn identifier(&self) -> hash160::Hash {
        hash160::Hash::hash(&self.public_key.serialize())
    }
}
