//! Canonical Poseidon hash for AgeGate.
//!
//! A single, unified Poseidon instance is used for every hash in the
//! protocol: commitments, proof identifiers, and signing messages. The
//! on-chain verifier evaluates the same function, so any divergence here is a
//! protocol break, not a bug that can be papered over.
//!
//! ## Parameters (BN254 Scalar Field)
//! - Field: BN254 Fr (scalar field)
//! - Width: 3 (rate=2, capacity=1)
//! - Full rounds: 8
//! - Partial rounds: 57
//! - S-box: x^5
//! - Round constants: Grain LFSR (arkworks standard)
//!
//! ## Output Convention
//! All hash functions output the FIRST element of the sponge state after
//! squeezing, the standard arkworks PoseidonSponge convention.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use std::sync::OnceLock;

static CANONICAL_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Get the canonical Poseidon configuration.
/// Thread-safe singleton initialization.
pub fn canonical_config() -> &'static PoseidonConfig<Fr> {
    CANONICAL_CONFIG.get_or_init(|| {
        let rate = 2;
        let alpha = 5u64;
        let full_rounds = 8;
        let partial_rounds = 57;
        let field_bits = 254;

        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            field_bits,
            rate,
            full_rounds,
            partial_rounds,
            0, // skip_matrices
        );

        PoseidonConfig {
            full_rounds: full_rounds as usize,
            partial_rounds: partial_rounds as usize,
            alpha,
            ark,
            mds,
            rate,
            capacity: 1,
        }
    })
}

/// Hash an arbitrary number of field elements using canonical Poseidon.
/// Returns the first squeezed element.
pub fn poseidon_hash_fields(inputs: &[Fr]) -> Fr {
    let config = canonical_config();
    let mut sponge = PoseidonSponge::new(config);
    for input in inputs {
        sponge.absorb(input);
    }
    let output: Vec<Fr> = sponge.squeeze_field_elements(1);
    output[0]
}

/// Hash two field elements. The primary binding operation of the protocol.
pub fn poseidon_hash2_fields(left: Fr, right: Fr) -> Fr {
    poseidon_hash_fields(&[left, right])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let a = Fr::from(12345u64);
        let b = Fr::from(67890u64);

        let hash1 = poseidon_hash2_fields(a, b);
        let hash2 = poseidon_hash2_fields(a, b);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_order_sensitive() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);

        assert_ne!(poseidon_hash2_fields(a, b), poseidon_hash2_fields(b, a));
    }

    #[test]
    fn test_hash_input_sensitive() {
        let a = Fr::from(100u64);
        let b = Fr::from(200u64);

        let hash = poseidon_hash2_fields(a, b);
        assert_ne!(hash, poseidon_hash2_fields(a, Fr::from(201u64)));
        assert_ne!(hash, poseidon_hash2_fields(Fr::from(101u64), b));
    }

    #[test]
    fn test_variadic_matches_pairwise() {
        let a = Fr::from(7u64);
        let b = Fr::from(8u64);

        assert_eq!(poseidon_hash_fields(&[a, b]), poseidon_hash2_fields(a, b));
    }
}
