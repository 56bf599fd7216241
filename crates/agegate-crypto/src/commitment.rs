//! Hiding commitments over (age, salt).
//!
//! `commitment = Poseidon2(age, salt)` binds a private age to a random
//! blinding salt. The salt prevents brute-forcing the small age range from a
//! public commitment; the hash makes the binding one-way and
//! collision-resistant. The same function runs in the on-chain verifier, so
//! `commit` must stay a pure function of its inputs.

use crate::felt::{fr_from_hex, fr_to_hex};
use crate::poseidon::poseidon_hash2_fields;
use crate::random_bytes;
use agegate_types::{AgegateResult, SALT_SIZE};
use ark_bn254::Fr;

/// Draw a fresh 248-bit blinding salt from the OS CSPRNG, rendered as
/// `0x` + per-byte zero-padded lowercase hex.
///
/// 31 bytes keeps the value strictly below the BN254 scalar modulus
/// (2^248 < r), so the salt is always a canonical field element and no
/// modular reduction ever occurs on parse.
pub fn generate_salt() -> String {
    let bytes = random_bytes::<SALT_SIZE>();
    format!("0x{}", hex::encode(bytes))
}

/// Field-level commitment core, shared with the attestor's recomputation
/// path.
pub fn commitment_fr(age: u64, salt: Fr) -> Fr {
    poseidon_hash2_fields(Fr::from(age), salt)
}

/// Compute the hiding commitment for an age and a hex-encoded salt.
/// Malformed salt is rejected before any hashing.
pub fn commit(age: u64, salt: &str) -> AgegateResult<String> {
    let salt_fr = fr_from_hex(salt)?;
    Ok(fr_to_hex(&commitment_fr(age, salt_fr)))
}
