//! Core attestation engine.
//!
//! One attestation is a strictly ordered pipeline: input validation →
//! commitment recomputation → age predicate → proof hash → signing message →
//! signature. The signature cannot be produced before validation completes,
//! so a partially evaluated request can never leak a signed result.

use agegate_crypto::{
    commitment_fr, derive_verifying_key, fr_from_str, fr_to_be_bytes, fr_to_hex,
    poseidon_hash2_fields, sign_digest, verify_digest,
};
use agegate_types::{
    AgegateError, AgegateResult, AttestationRequest, AttestationResponse, SigningPrivateKey,
    SigningPublicKey,
};
use ark_bn254::Fr;
use tracing::{debug, warn};

/// The attestation service core. Holds the one process-wide secret (the
/// signing key), loaded once at startup and never mutated or exposed.
pub struct Attestor {
    signing_key: Option<SigningPrivateKey>,
    public_key: Option<SigningPublicKey>,
}

impl Attestor {
    /// Build an attestor around an optional signing key. A keyless attestor
    /// still validates requests but fails every signing step with
    /// `ServiceUnavailable`; the operator error is loud, never silent.
    pub fn new(signing_key: Option<SigningPrivateKey>) -> AgegateResult<Self> {
        let public_key = match &signing_key {
            Some(key) => Some(derive_verifying_key(key)?),
            None => {
                warn!("Attestor starting WITHOUT a signing key - attestation requests will fail");
                None
            }
        };

        Ok(Self {
            signing_key,
            public_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.signing_key.is_some()
    }

    /// The published verification key, when configured.
    pub fn public_key(&self) -> Option<&SigningPublicKey> {
        self.public_key.as_ref()
    }

    /// Attest to a request, converting every internal fault into a structured
    /// failure response. This function never panics and never pairs
    /// `success: true` with an unsigned or invalid result.
    pub fn attest(&self, request: &AttestationRequest) -> AttestationResponse {
        match self.try_attest(request) {
            Ok(response) => response,
            Err(e) => AttestationResponse::failure(e.to_string()),
        }
    }

    /// Attestation pipeline with typed errors, used by the HTTP layer to map
    /// failures onto status codes.
    pub fn try_attest(
        &self,
        request: &AttestationRequest,
    ) -> AgegateResult<AttestationResponse> {
        request.validate()?;

        let user_id = fr_from_str(&request.user_id)?;
        let expected_commitment = fr_from_str(&request.age_commitment)?;
        let salt = fr_from_str(&request.salt)?;
        let minimum_age = Fr::from(request.minimum_age);

        // Commitment comparison happens on field elements: hex and decimal
        // renderings of the same value must never diverge.
        let recomputed = commitment_fr(request.age, salt);
        let commitment_matches = recomputed == expected_commitment;

        let age_valid = request.age >= request.minimum_age;
        let is_valid = u64::from(commitment_matches && age_valid);

        if !commitment_matches {
            debug!(
                user_id = %request.user_id,
                "commitment recomputation mismatch - issuing is_valid=0"
            );
        }

        let proof = proof_hash_fr(user_id, expected_commitment, minimum_age);
        let message = signing_message_fr(user_id, minimum_age, expected_commitment, proof, is_valid);

        let key = self.signing_key.as_ref().ok_or_else(|| {
            AgegateError::ServiceUnavailable("attestor signing key not configured".into())
        })?;
        let signature = sign_digest(key, &fr_to_be_bytes(&message))?;

        Ok(AttestationResponse::granted(
            is_valid,
            fr_to_hex(&proof),
            signature,
        ))
    }
}

/// Deterministic proof identifier over the public inputs only:
/// `Poseidon2(user_id, Poseidon2(age_commitment, minimum_age))`.
///
/// Independent of wall-clock time and of the verification outcome, so
/// repeated attestations for the same public tuple are referentially
/// identical and registrations stay idempotent.
pub fn proof_hash_fr(user_id: Fr, age_commitment: Fr, minimum_age: Fr) -> Fr {
    poseidon_hash2_fields(user_id, poseidon_hash2_fields(age_commitment, minimum_age))
}

/// String-boundary form of [`proof_hash_fr`].
pub fn proof_hash(user_id: &str, age_commitment: &str, minimum_age: u64) -> AgegateResult<String> {
    let hash = proof_hash_fr(
        fr_from_str(user_id)?,
        fr_from_str(age_commitment)?,
        Fr::from(minimum_age),
    );
    Ok(fr_to_hex(&hash))
}

/// The signed message binds every public parameter, the proof hash, and the
/// predicate outcome:
/// `Poseidon2(Poseidon2(user_id, minimum_age), Poseidon2(age_commitment, Poseidon2(proof_hash, is_valid)))`.
///
/// Binding `is_valid` means an attestation issued over a failed check can
/// never be replayed as a valid one, and no signed tuple can be repurposed
/// for a different (user, threshold, commitment) triple.
pub fn signing_message_fr(
    user_id: Fr,
    minimum_age: Fr,
    age_commitment: Fr,
    proof_hash: Fr,
    is_valid: u64,
) -> Fr {
    poseidon_hash2_fields(
        poseidon_hash2_fields(user_id, minimum_age),
        poseidon_hash2_fields(
            age_commitment,
            poseidon_hash2_fields(proof_hash, Fr::from(is_valid)),
        ),
    )
}

/// String-boundary form of [`signing_message_fr`].
pub fn signing_message(
    user_id: &str,
    minimum_age: u64,
    age_commitment: &str,
    proof_hash: &str,
    is_valid: u64,
) -> AgegateResult<Fr> {
    Ok(signing_message_fr(
        fr_from_str(user_id)?,
        Fr::from(minimum_age),
        fr_from_str(age_commitment)?,
        fr_from_str(proof_hash)?,
        is_valid,
    ))
}

/// Verify an attestation response against the service's published key:
/// recompute the proof hash from the public inputs, require it to match the
/// response, then check the signature over the reconstructed message.
pub fn verify_attestation(
    public_key: &SigningPublicKey,
    user_id: &str,
    minimum_age: u64,
    age_commitment: &str,
    response: &AttestationResponse,
) -> AgegateResult<bool> {
    let user = fr_from_str(user_id)?;
    let commitment = fr_from_str(age_commitment)?;
    let min_age = Fr::from(minimum_age);

    let expected_proof = proof_hash_fr(user, commitment, min_age);
    if fr_from_str(&response.proof_hash)? != expected_proof {
        return Ok(false);
    }

    let message = signing_message_fr(user, min_age, commitment, expected_proof, response.is_valid);
    verify_digest(public_key, &fr_to_be_bytes(&message), &response.signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agegate_crypto::{commit, generate_salt, generate_signing_key};

    fn configured_attestor() -> Attestor {
        Attestor::new(Some(generate_signing_key())).unwrap()
    }

    fn request_for(age: u64, minimum_age: u64) -> AttestationRequest {
        let salt = generate_salt();
        let commitment = commit(age, &salt).unwrap();
        AttestationRequest {
            age,
            salt,
            minimum_age,
            age_commitment: commitment,
            user_id: "123456".into(),
        }
    }

    #[test]
    fn test_predicate_above_threshold() {
        let attestor = configured_attestor();
        let response = attestor.attest(&request_for(18, 18));

        assert!(response.success);
        assert_eq!(response.is_valid, 1);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_predicate_below_threshold() {
        let attestor = configured_attestor();
        let response = attestor.attest(&request_for(17, 18));

        // A failed predicate is a business outcome, not an error.
        assert!(response.success);
        assert_eq!(response.is_valid, 0);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_tamper_detection_foreign_commitment() {
        let attestor = configured_attestor();

        // Internally consistent (age, salt) for age 25, but the supplied
        // commitment belongs to a different age.
        let mut request = request_for(25, 18);
        let other_salt = generate_salt();
        request.age_commitment = commit(30, &other_salt).unwrap();

        let response = attestor.attest(&request);
        assert!(response.success);
        assert_eq!(response.is_valid, 0);
    }

    #[test]
    fn test_missing_fields_rejected_before_hashing() {
        let attestor = configured_attestor();
        let mut request = request_for(25, 18);
        request.salt = String::new();

        let err = attestor.try_attest(&request).unwrap_err();
        assert!(matches!(err, AgegateError::InvalidInput(_)));

        let response = attestor.attest(&request);
        assert!(!response.success);
        assert_eq!(response.is_valid, 0);
        assert_eq!(response.proof_hash, "0x0");
    }

    #[test]
    fn test_unconfigured_attestor_fails_loudly() {
        let attestor = Attestor::new(None).unwrap();
        let request = request_for(25, 18);

        let err = attestor.try_attest(&request).unwrap_err();
        assert!(matches!(err, AgegateError::ServiceUnavailable(_)));

        let response = attestor.attest(&request);
        assert!(!response.success);
        assert!(response.error.is_some());
    }

    #[test]
    fn test_proof_hash_idempotent() {
        let request = request_for(25, 18);

        let h1 = proof_hash(&request.user_id, &request.age_commitment, 18).unwrap();
        let h2 = proof_hash(&request.user_id, &request.age_commitment, 18).unwrap();
        assert_eq!(h1, h2);

        // Two attestation calls with the same public inputs return the same
        // identifier even though the signature path runs twice.
        let attestor = configured_attestor();
        let r1 = attestor.attest(&request);
        let r2 = attestor.attest(&request);
        assert_eq!(r1.proof_hash, r2.proof_hash);
        assert_eq!(r1.proof_hash, h1);
    }

    #[test]
    fn test_proof_hash_distinct_per_public_inputs() {
        let request = request_for(25, 18);
        let base = proof_hash(&request.user_id, &request.age_commitment, 18).unwrap();

        assert_ne!(
            base,
            proof_hash(&request.user_id, &request.age_commitment, 21).unwrap()
        );
        assert_ne!(
            base,
            proof_hash("999", &request.age_commitment, 18).unwrap()
        );
    }

    #[test]
    fn test_signature_verifies_against_public_key() {
        let attestor = configured_attestor();
        let request = request_for(25, 18);
        let response = attestor.attest(&request);
        assert_eq!(response.is_valid, 1);

        let public = attestor.public_key().unwrap();
        assert!(verify_attestation(
            public,
            &request.user_id,
            request.minimum_age,
            &request.age_commitment,
            &response
        )
        .unwrap());
    }

    #[test]
    fn test_altered_public_input_breaks_signature() {
        let attestor = configured_attestor();
        let request = request_for(25, 18);
        let response = attestor.attest(&request);
        let public = attestor.public_key().unwrap();

        // User id.
        assert!(!verify_attestation(
            public,
            "654321",
            request.minimum_age,
            &request.age_commitment,
            &response
        )
        .unwrap());

        // Minimum age.
        assert!(!verify_attestation(
            public,
            &request.user_id,
            21,
            &request.age_commitment,
            &response
        )
        .unwrap());

        // Commitment.
        let foreign = commit(30, &generate_salt()).unwrap();
        assert!(!verify_attestation(
            public,
            &request.user_id,
            request.minimum_age,
            &foreign,
            &response
        )
        .unwrap());

        // Proof hash.
        let mut tampered = response.clone();
        tampered.proof_hash = "0x1234".into();
        assert!(!verify_attestation(
            public,
            &request.user_id,
            request.minimum_age,
            &request.age_commitment,
            &tampered
        )
        .unwrap());
    }

    #[test]
    fn test_invalid_outcome_cannot_replay_as_valid() {
        let attestor = configured_attestor();
        let request = request_for(17, 18);
        let response = attestor.attest(&request);
        assert_eq!(response.is_valid, 0);

        let public = attestor.public_key().unwrap();

        // The signature covers is_valid=0; flipping the flag breaks it.
        let mut forged = response.clone();
        forged.is_valid = 1;
        assert!(!verify_attestation(
            public,
            &request.user_id,
            request.minimum_age,
            &request.age_commitment,
            &forged
        )
        .unwrap());

        // Unmodified, the is_valid=0 attestation still verifies.
        assert!(verify_attestation(
            public,
            &request.user_id,
            request.minimum_age,
            &request.age_commitment,
            &response
        )
        .unwrap());
    }

    #[test]
    fn test_hex_and_decimal_commitment_forms_match() {
        let attestor = configured_attestor();
        let mut request = request_for(25, 18);

        // Re-render the commitment in decimal; the comparison is on field
        // elements, so the attestation outcome must not change.
        let fr = fr_from_str(&request.age_commitment).unwrap();
        use ark_ff::{BigInteger, PrimeField};
        let mut decimal = num_to_dec(&fr.into_bigint().to_bytes_be());
        if decimal.is_empty() {
            decimal = "0".into();
        }
        request.age_commitment = decimal;

        let response = attestor.attest(&request);
        assert_eq!(response.is_valid, 1);
    }

    // Schoolbook base-256 to base-10 conversion for the test above.
    fn num_to_dec(bytes: &[u8]) -> String {
        let mut digits: Vec<u8> = vec![0];
        for &byte in bytes {
            let mut carry = byte as u32;
            for d in digits.iter_mut() {
                let v = (*d as u32) * 256 + carry;
                *d = (v % 10) as u8;
                carry = v / 10;
            }
            while carry > 0 {
                digits.push((carry % 10) as u8);
                carry /= 10;
            }
        }
        digits
            .iter()
            .rev()
            .skip_while(|&&d| d == 0)
            .map(|&d| char::from(b'0' + d))
            .collect()
    }
}
