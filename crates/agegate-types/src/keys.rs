use crate::error::{AgegateError, AgegateResult};
use crate::{SIGNING_PRIVATE_KEY_SIZE, SIGNING_PUBLIC_KEY_SIZE};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::fmt;
use zeroize::Zeroize;

/// The attestor's ECDSA signing key. Loaded once at startup, never exposed to
/// callers; zeroized on drop.
#[derive(Clone, Serialize, Deserialize)]
pub struct SigningPrivateKey(pub [u8; SIGNING_PRIVATE_KEY_SIZE]);

impl SigningPrivateKey {
    pub fn from_bytes(bytes: [u8; SIGNING_PRIVATE_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNING_PRIVATE_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> AgegateResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| AgegateError::InvalidKey(e.to_string()))?;
        if bytes.len() != SIGNING_PRIVATE_KEY_SIZE {
            return Err(AgegateError::InvalidKey("Invalid private key length".into()));
        }
        let mut arr = [0u8; SIGNING_PRIVATE_KEY_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for SigningPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningPrivateKey(***)")
    }
}

impl Drop for SigningPrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Compressed secp256k1 public key published by the attestation service.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPublicKey(#[serde_as(as = "serde_with::Bytes")] pub [u8; SIGNING_PUBLIC_KEY_SIZE]);

impl SigningPublicKey {
    pub fn from_bytes(bytes: [u8; SIGNING_PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNING_PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> AgegateResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| AgegateError::InvalidKey(e.to_string()))?;
        if bytes.len() != SIGNING_PUBLIC_KEY_SIZE {
            return Err(AgegateError::InvalidKey("Invalid public key length".into()));
        }
        let mut arr = [0u8; SIGNING_PUBLIC_KEY_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for SigningPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningPublicKey({})", self.to_hex())
    }
}

impl fmt::Display for SigningPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
