#![forbid(unsafe_code)]
#![warn(clippy::all)]

//! Shared types for the AgeGate protocol: the attestation request/response
//! wire format, the locally persisted credential, registrar calldata, and the
//! error taxonomy used across all AgeGate crates.

mod error;
mod keys;
mod protocol;

pub use error::{AgegateError, AgegateResult};
pub use keys::{SigningPrivateKey, SigningPublicKey};
pub use protocol::{
    AttestationRequest, AttestationResponse, Credential, ProofCalldata, SignatureParts,
};

/// Size of the random blinding salt in bytes. 31 bytes (248 bits) keeps the
/// salt strictly below the BN254 scalar-field modulus, so the commitment
/// input is always canonical.
pub const SALT_SIZE: usize = 31;

pub const SIGNING_PRIVATE_KEY_SIZE: usize = 32;

pub const SIGNING_PUBLIC_KEY_SIZE: usize = 33;

/// Storage key prefix for persisted credentials.
pub const CREDENTIAL_KEY_PREFIX: &str = "zkproof_";
