//! Proof formatter.
//!
//! Serializes an attestation response into the exact positional argument
//! order the registrar's `registerProof` entry point expects. Pure
//! formatting; validation already happened in the attestation service.

use agegate_types::{AttestationResponse, ProofCalldata};

pub fn format_proof(
    user_id: &str,
    minimum_age: u64,
    age_commitment: &str,
    response: &AttestationResponse,
) -> ProofCalldata {
    ProofCalldata {
        user_id: user_id.to_string(),
        minimum_age,
        age_commitment: age_commitment.to_string(),
        proof_hash: response.proof_hash.clone(),
        is_valid: response.is_valid,
        sig_r: response.signature.r.clone(),
        sig_s: response.signature.s.clone(),
    }
}
