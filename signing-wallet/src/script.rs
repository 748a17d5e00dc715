// SPDX-License-Identifier: CC0-1.0

//! Script buffers and the closed set of spendable script types.

use core::fmt;

use crate::error::{Error, Result};

/// An owned script program.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ScriptBuf(Vec<u8>);

impl ScriptBuf {
    /// Creates an empty script.
    pub fn new() -> Self {
        ScriptBuf(Vec::new())
    }

    /// Creates a script from raw program bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        ScriptBuf(bytes)
    }

    /// Parses a script from its hex encoding.
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(ScriptBuf(hex::decode(s)?))
    }

    /// Returns the raw program bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the program length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for an empty program.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ScriptBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", hex::encode(&self.0))
    }
}

impl fmt::Display for ScriptBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// The kind of output a previous output is, which decides the signature-hash
/// algorithm used to spend it.
///
/// This is a closed set: adding a new output kind means adding a variant and
/// the compiler will point at every match that needs extending.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ScriptType {
    /// A plain pay-to-script-hash output; spends sign the legacy digest.
    P2sh,
    /// A pay-to-script-hash wrapped witness script; spends sign the
    /// segwit v0 digest, which commits to the spent value.
    P2shP2wsh,
}

impl ScriptType {
    /// Parses the numeric tag the service attaches to each spendable output.
    ///
    /// Unknown tags are fatal to the signing call; this wallet never guesses
    /// a digest algorithm.
    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            10 => Ok(ScriptType::P2sh),
            14 => Ok(ScriptType::P2shP2wsh),
            other => Err(Error::UnsupportedScriptType(other)),
        }
    }

    /// Returns the service's numeric tag for this script type.
    pub fn tag(self) -> u32 {
        match self {
            ScriptType::P2sh => 10,
            ScriptType::P2shP2wsh => 14,
        }
    }
}
