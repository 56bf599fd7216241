#![forbid(unsafe_code)]
#![warn(clippy::all)]

//! Verifier-facing client for AgeGate.
//!
//! Owns everything between identity creation and a registered on-chain
//! proof: the local credential store, the prover HTTP client, the registrar
//! and identity contract clients, calldata formatting, and the orchestration
//! state machine that ties them together.

pub mod contracts;
pub mod flow;
pub mod formatter;
pub mod prover;
pub mod store;

pub use contracts::{RegistrarClient, RegistrarConfig};
pub use flow::{FlowOutcome, FlowState, Prover, Registrar, VerificationFlow};
pub use formatter::format_proof;
pub use prover::ProverClient;
pub use store::CredentialStore;
