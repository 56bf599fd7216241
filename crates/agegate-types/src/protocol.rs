use crate::error::{AgegateError, AgegateResult};
use serde::{Deserialize, Serialize};

/// Locally persisted age credential: the private age and the blinding salt
/// behind the on-chain commitment. Created once per user identifier and never
/// mutated; only deleted or superseded by recreating the identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub age: u64,
    pub salt: String,
    pub timestamp: i64,
}

/// One attestation call. The age and salt are private inputs and exist only
/// for the duration of the request; the remaining fields are public.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttestationRequest {
    pub age: u64,
    pub salt: String,
    pub minimum_age: u64,
    pub age_commitment: String,
    pub user_id: String,
}

impl AttestationRequest {
    /// All five fields must be present and non-empty/non-zero before any
    /// hashing is attempted.
    pub fn validate(&self) -> AgegateResult<()> {
        if self.age == 0
            || self.minimum_age == 0
            || self.salt.is_empty()
            || self.age_commitment.is_empty()
            || self.user_id.is_empty()
        {
            return Err(AgegateError::InvalidInput("missing fields".into()));
        }
        Ok(())
    }
}

/// ECDSA signature halves, hex-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParts {
    pub r: String,
    pub s: String,
}

impl SignatureParts {
    pub fn zero() -> Self {
        Self {
            r: "0x0".into(),
            s: "0x0".into(),
        }
    }
}

/// Attestation service response. `is_valid` is 1 only when both the
/// commitment recomputation and the age predicate hold; a failure response
/// never carries a usable proof hash or signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttestationResponse {
    pub success: bool,
    pub is_valid: u64,
    pub proof_hash: String,
    pub signature: SignatureParts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AttestationResponse {
    pub fn granted(is_valid: u64, proof_hash: String, signature: SignatureParts) -> Self {
        Self {
            success: true,
            is_valid,
            proof_hash,
            signature,
            error: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            is_valid: 0,
            proof_hash: "0x0".into(),
            signature: SignatureParts::zero(),
            error: Some(reason.into()),
        }
    }
}

/// Positional calldata for the registrar's `registerProof` entry point.
/// Order is fixed by the contract ABI:
/// `[user_id, minimum_age, age_commitment, proof_hash, is_valid, sig_r, sig_s]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofCalldata {
    pub user_id: String,
    pub minimum_age: u64,
    pub age_commitment: String,
    pub proof_hash: String,
    pub is_valid: u64,
    pub sig_r: String,
    pub sig_s: String,
}

impl ProofCalldata {
    /// The flat argument list in contract order.
    pub fn to_args(&self) -> [String; 7] {
        [
            self.user_id.clone(),
            self.minimum_age.to_string(),
            self.age_commitment.clone(),
            self.proof_hash.clone(),
            self.is_valid.to_string(),
            self.sig_r.clone(),
            self.sig_s.clone(),
        ]
    }
}
