#![deny(unsafe_code)]
#![warn(clippy::all)]

//! Cryptographic core of AgeGate: the canonical Poseidon hash the whole
//! protocol is built on, felt (field-element) encoding rules, hiding
//! commitments over (age, salt), and the ECDSA operations used by the
//! attestation service.

pub mod commitment;
pub mod ecdsa;
pub mod felt;
pub mod poseidon;

pub use commitment::{commit, commitment_fr, generate_salt};
pub use ecdsa::{
    derive_verifying_key, generate_signing_key, sign_digest, verify_digest,
};
pub use felt::{fr_from_dec, fr_from_hex, fr_from_str, fr_to_be_bytes, fr_to_hex};
pub use poseidon::{canonical_config, poseidon_hash2_fields, poseidon_hash_fields};

pub fn random_bytes<const N: usize>() -> [u8; N] {
    use rand::RngCore;
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
