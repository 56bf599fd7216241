#![forbid(unsafe_code)]
#![warn(clippy::all)]

//! The AgeGate attestation service.
//!
//! A stateless trusted prover: given the private inputs behind an on-chain
//! age commitment, it recomputes the commitment, checks the age threshold,
//! and signs the outcome so the registrar contract can verify it against the
//! service's published public key.
//!
//! The result is a signed attestation, not a zero-knowledge proof of a
//! circuit: verification security reduces to trusting this service's
//! signing key.

pub mod api;
pub mod attestor;
pub mod cli;
pub mod config;

pub use api::AttestorServer;
pub use attestor::{proof_hash, signing_message, verify_attestation, Attestor};
pub use config::AttestorConfig;
