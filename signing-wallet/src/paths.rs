// SPDX-License-Identifier: CC0-1.0

//! Reserved derivation paths and protocol constants.
//!
//! Every fixed path the wallet uses lives here, in one table, so the
//! domain-separation rules can be audited in a single place. Each constant
//! maps to a disjoint subtree of the key hierarchy: subaccount keys sit under
//! a hardened purpose index, message-signing keys under a two-step plain
//! prefix, and the password and service keys under their own single plain
//! indices. No two of these subtrees overlap, so no key is ever shared
//! between responsibilities.

/// Hardened purpose index under which subaccount subtrees live.
///
/// Subaccount `n` (for `n != 0`) is `hardened(3) / hardened(n)` from the
/// root; subaccount 0 is the root itself.
pub const SUBACCOUNT_PURPOSE: u32 = 3;

/// First step of the reserved message-signing prefix.
pub const MESSAGE_SIGNING_MAGIC: u32 = 0x4741_b11e;

/// Branch index reserved for message-signing keys.
pub const MESSAGE_BRANCH: u32 = 6;

/// The full two-step prefix a message-signing path must start with.
///
/// [`crate::wallet::SigningWallet::sign_message_hash`] refuses any path that
/// does not begin with exactly these two plain steps.
pub const MESSAGE_PATH_PREFIX: [u32; 2] = [MESSAGE_SIGNING_MAGIC, MESSAGE_BRANCH];

/// Plain index of the key used only for local-password derivation ("pass").
pub const PASSWORD_PATH: u32 = 0x7061_7373;

/// Salt for the local-password PBKDF2 run.
pub const PASSWORD_SALT: &[u8] = b"local-encryption-password";

/// PBKDF2-HMAC-SHA512 iteration count for the local password.
pub const PASSWORD_ROUNDS: u32 = 2048;

/// Plain index of the key used for the service identification path ("GAIT").
pub const SERVICE_PATH: u32 = 0x4741_4954;

/// HMAC-SHA512 key for encoding the service identification path.
pub const SERVICE_PATH_MAC_KEY: &[u8] = b"signing wallet service path";

/// RPC method name the verifier expects in a login request.
pub const CHALLENGE_METHOD: &str = "login.get_challenge";
