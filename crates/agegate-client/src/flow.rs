//! Verification flow orchestration.
//!
//! Drives one join/create-game gate end to end:
//! check the registrar for an already-registered proof → read the local
//! credential → request an attestation → format → submit.
//!
//! The flow is an async fn over trait seams, so dropping the future cancels
//! cleanly at any suspension point before submission. Once `register_proof`
//! is dispatched the transaction belongs to the chain and cannot be recalled
//! from here.

use crate::contracts::RegistrarClient;
use crate::formatter::format_proof;
use crate::prover::ProverClient;
use crate::store::CredentialStore;
use agegate_types::{AgegateResult, AttestationRequest, AttestationResponse, ProofCalldata};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Attestation provider seam; implemented by [`crate::ProverClient`] and by
/// test fixtures.
#[async_trait]
pub trait Prover: Send + Sync {
    async fn generate_proof(
        &self,
        request: &AttestationRequest,
    ) -> AgegateResult<AttestationResponse>;
}

#[async_trait]
impl Prover for crate::ProverClient {
    async fn generate_proof(
        &self,
        request: &AttestationRequest,
    ) -> AgegateResult<AttestationResponse> {
        ProverClient::generate_proof(self, request).await
    }
}

/// Registrar seam over the on-chain contracts.
#[async_trait]
pub trait Registrar: Send + Sync {
    async fn has_valid_proof(&self, user_id: &str, minimum_age: u64) -> AgegateResult<bool>;
    async fn register_proof(&self, calldata: &ProofCalldata) -> AgegateResult<String>;
    async fn get_identity(&self, user_id: &str) -> AgegateResult<String>;
    async fn create_identity(
        &self,
        user_id: &str,
        age_commitment: &str,
        country: &str,
    ) -> AgegateResult<String>;
}

#[async_trait]
impl Registrar for crate::RegistrarClient {
    async fn has_valid_proof(&self, user_id: &str, minimum_age: u64) -> AgegateResult<bool> {
        RegistrarClient::has_valid_proof(self, user_id, minimum_age).await
    }

    async fn register_proof(&self, calldata: &ProofCalldata) -> AgegateResult<String> {
        RegistrarClient::register_proof(self, calldata)
            .await
            .map(|h| format!("{:?}", h))
    }

    async fn get_identity(&self, user_id: &str) -> AgegateResult<String> {
        RegistrarClient::get_identity(self, user_id)
            .await
            .map(|identity| identity.age_commitment)
    }

    async fn create_identity(
        &self,
        user_id: &str,
        age_commitment: &str,
        country: &str,
    ) -> AgegateResult<String> {
        RegistrarClient::create_identity(self, user_id, age_commitment, country)
            .await
            .map(|h| format!("{:?}", h))
    }
}

/// Observable flow state, updated after every transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    CheckingCache,
    GeneratingAttestation,
    Signing,
    Formatting,
    Submitting,
    Confirmed,
    Failed(String),
}

/// Terminal outcome of one gate attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The registrar already holds a valid proof for (user, threshold).
    CacheHit,
    /// A fresh proof was registered; carries the transaction hash.
    Registered(String),
    /// The flow stopped; carries the human-readable reason.
    Failed(String),
}

pub struct VerificationFlow<P: Prover, R: Registrar> {
    store: CredentialStore,
    prover: P,
    registrar: R,
    state: FlowState,
}

impl<P: Prover, R: Registrar> VerificationFlow<P, R> {
    pub fn new(store: CredentialStore, prover: P, registrar: R) -> Self {
        Self {
            store,
            prover,
            registrar,
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Create a fresh identity: mint a salt, commit to the age, persist the
    /// credential, then register the commitment on chain.
    ///
    /// The credential is stored before the transaction is sent so that a
    /// dropped or failed transaction can be retried with the same commitment.
    pub async fn create_identity(
        &mut self,
        user_id: &str,
        age: u64,
        country: &str,
    ) -> AgegateResult<String> {
        let salt = agegate_crypto::generate_salt();
        let commitment = agegate_crypto::commit(age, &salt)?;

        self.store.store(user_id, age, &salt)?;
        info!(user_id, "identity credential stored");

        let tx = self
            .registrar
            .create_identity(user_id, &commitment, country)
            .await?;

        info!(user_id, %tx, "identity registered on chain");
        Ok(tx)
    }

    /// Ensure a valid proof exists for (user, threshold), registering one if
    /// needed. Chain errors propagate verbatim; expected protocol failures
    /// (no identity, predicate not met) resolve to `FlowOutcome::Failed`.
    pub async fn ensure_proof(
        &mut self,
        user_id: &str,
        minimum_age: u64,
    ) -> AgegateResult<FlowOutcome> {
        self.state = FlowState::CheckingCache;
        if self.registrar.has_valid_proof(user_id, minimum_age).await? {
            debug!(user_id, minimum_age, "registrar already holds a valid proof");
            self.state = FlowState::Confirmed;
            return Ok(FlowOutcome::CacheHit);
        }

        self.state = FlowState::GeneratingAttestation;
        let credential = match self.store.retrieve(user_id) {
            Some(credential) => credential,
            None => {
                warn!(user_id, "no local credential - identity must be created first");
                return Ok(self.fail("no identity"));
            }
        };

        let age_commitment = self.registrar.get_identity(user_id).await?;

        let request = AttestationRequest {
            age: credential.age,
            salt: credential.salt,
            minimum_age,
            age_commitment: age_commitment.clone(),
            user_id: user_id.to_string(),
        };

        self.state = FlowState::Signing;
        let response = self.prover.generate_proof(&request).await?;

        if !response.success {
            let reason = response
                .error
                .unwrap_or_else(|| "attestation failed".into());
            return Ok(self.fail(reason));
        }

        if response.is_valid != 1 {
            // Commitment mismatch or age below threshold; nothing is
            // submitted on chain either way.
            return Ok(self.fail("proof invalid"));
        }

        self.state = FlowState::Formatting;
        let calldata = format_proof(user_id, minimum_age, &age_commitment, &response);

        self.state = FlowState::Submitting;
        let tx = self.registrar.register_proof(&calldata).await?;

        info!(user_id, minimum_age, %tx, "proof registered");
        self.state = FlowState::Confirmed;
        Ok(FlowOutcome::Registered(tx))
    }

    fn fail(&mut self, reason: impl Into<String>) -> FlowOutcome {
        let reason = reason.into();
        self.state = FlowState::Failed(reason.clone());
        FlowOutcome::Failed(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agegate_types::{AgegateError, SignatureParts};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Prover fixture that counts calls and replays a canned response.
    struct MockProver {
        calls: AtomicUsize,
        response: Mutex<Option<AttestationResponse>>,
    }

    impl MockProver {
        fn returning(response: AttestationResponse) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Some(response)),
            }
        }

        fn never_called() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(None),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Prover for &MockProver {
        async fn generate_proof(
            &self,
            _request: &AttestationRequest,
        ) -> AgegateResult<AttestationResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AgegateError::Internal("unexpected prover call".into()))
        }
    }

    /// Registrar fixture backed by in-memory state.
    struct MockRegistrar {
        cached_proof: bool,
        identity_commitment: Option<String>,
        registered: AtomicUsize,
    }

    impl MockRegistrar {
        fn new(cached_proof: bool, identity_commitment: Option<String>) -> Self {
            Self {
                cached_proof,
                identity_commitment,
                registered: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Registrar for &MockRegistrar {
        async fn has_valid_proof(&self, _user_id: &str, _minimum_age: u64) -> AgegateResult<bool> {
            Ok(self.cached_proof)
        }

        async fn register_proof(&self, calldata: &ProofCalldata) -> AgegateResult<String> {
            assert_eq!(calldata.is_valid, 1, "only valid proofs may be submitted");
            self.registered.fetch_add(1, Ordering::SeqCst);
            Ok("0xtx".into())
        }

        async fn get_identity(&self, _user_id: &str) -> AgegateResult<String> {
            self.identity_commitment
                .clone()
                .ok_or_else(|| AgegateError::Contract("identity not found".into()))
        }

        async fn create_identity(
            &self,
            _user_id: &str,
            _age_commitment: &str,
            _country: &str,
        ) -> AgegateResult<String> {
            Ok("0xtx".into())
        }
    }

    fn valid_response() -> AttestationResponse {
        AttestationResponse::granted(
            1,
            "0xhash".into(),
            SignatureParts {
                r: "0xr".into(),
                s: "0xs".into(),
            },
        )
    }

    #[tokio::test]
    async fn test_cache_hit_skips_everything() {
        let prover = MockProver::never_called();
        let registrar = MockRegistrar::new(true, None);
        let store = CredentialStore::in_memory().unwrap();

        let mut flow = VerificationFlow::new(store, &prover, &registrar);
        let outcome = flow.ensure_proof("42", 18).await.unwrap();

        assert_eq!(outcome, FlowOutcome::CacheHit);
        assert_eq!(prover.call_count(), 0);
        assert_eq!(*flow.state(), FlowState::Confirmed);
    }

    #[tokio::test]
    async fn test_no_credential_fails_without_prover_call() {
        let prover = MockProver::never_called();
        let registrar = MockRegistrar::new(false, Some("0xc".into()));
        let store = CredentialStore::in_memory().unwrap();

        let mut flow = VerificationFlow::new(store, &prover, &registrar);
        let outcome = flow.ensure_proof("42", 18).await.unwrap();

        assert_eq!(outcome, FlowOutcome::Failed("no identity".into()));
        assert_eq!(prover.call_count(), 0);
        assert_eq!(*flow.state(), FlowState::Failed("no identity".into()));
    }

    #[tokio::test]
    async fn test_invalid_attestation_is_not_submitted() {
        let response = AttestationResponse::granted(0, "0xhash".into(), SignatureParts::zero());
        let prover = MockProver::returning(response);
        let registrar = MockRegistrar::new(false, Some("0xc".into()));
        let store = CredentialStore::in_memory().unwrap();
        store.store("42", 17, "0xsalt").unwrap();

        let mut flow = VerificationFlow::new(store, &prover, &registrar);
        let outcome = flow.ensure_proof("42", 18).await.unwrap();

        assert_eq!(outcome, FlowOutcome::Failed("proof invalid".into()));
        assert_eq!(prover.call_count(), 1);
        assert_eq!(registrar.registered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_attestation_registers() {
        let prover = MockProver::returning(valid_response());
        let registrar = MockRegistrar::new(false, Some("0xc".into()));
        let store = CredentialStore::in_memory().unwrap();
        store.store("42", 25, "0xsalt").unwrap();

        let mut flow = VerificationFlow::new(store, &prover, &registrar);
        let outcome = flow.ensure_proof("42", 18).await.unwrap();

        assert_eq!(outcome, FlowOutcome::Registered("0xtx".into()));
        assert_eq!(prover.call_count(), 1);
        assert_eq!(registrar.registered.load(Ordering::SeqCst), 1);
        assert_eq!(*flow.state(), FlowState::Confirmed);
    }

    #[tokio::test]
    async fn test_prover_failure_response_fails_flow() {
        let prover = MockProver::returning(AttestationResponse::failure("prover exploded"));
        let registrar = MockRegistrar::new(false, Some("0xc".into()));
        let store = CredentialStore::in_memory().unwrap();
        store.store("42", 25, "0xsalt").unwrap();

        let mut flow = VerificationFlow::new(store, &prover, &registrar);
        let outcome = flow.ensure_proof("42", 18).await.unwrap();

        assert_eq!(outcome, FlowOutcome::Failed("prover exploded".into()));
        assert_eq!(registrar.registered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chain_errors_propagate_verbatim() {
        let prover = MockProver::never_called();
        let registrar = MockRegistrar::new(false, None);
        let store = CredentialStore::in_memory().unwrap();
        store.store("42", 25, "0xsalt").unwrap();

        let mut flow = VerificationFlow::new(store, &prover, &registrar);
        let err = flow.ensure_proof("42", 18).await.unwrap_err();

        assert!(matches!(err, AgegateError::Contract(_)));
    }

    #[tokio::test]
    async fn test_create_identity_stores_before_chain_call() {
        let prover = MockProver::never_called();
        let registrar = MockRegistrar::new(false, None);
        let store = CredentialStore::in_memory().unwrap();

        let mut flow = VerificationFlow::new(store, &prover, &registrar);
        flow.create_identity("42", 25, "1").await.unwrap();

        let credential = flow.store().retrieve("42").unwrap();
        assert_eq!(credential.age, 25);
        // The stored salt recomputes to the registered commitment.
        let commitment = agegate_crypto::commit(25, &credential.salt).unwrap();
        assert!(commitment.starts_with("0x"));
    }
}
