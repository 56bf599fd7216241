//! On-chain collaborators: the proof registrar and the identity vault.
//!
//! AgeGate only emits correctly-shaped calldata and consumes the call/invoke
//! interface; registrar logic itself lives on chain. Chain errors are
//! surfaced verbatim; retry policy belongs to the caller.

use agegate_types::{AgegateError, AgegateResult};
use ethers::{
    contract::abigen,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, H256, U256},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

abigen!(
    AgeVerifier,
    r#"[
        function hasValidProof(uint256 userId, uint256 minimumAge) external view returns (bool)
        function registerProof(uint256 userId, uint256 minimumAge, uint256 ageCommitment, uint256 proofHash, uint256 isValid, uint256 sigR, uint256 sigS) external returns (bool)
        event ProofRegistered(uint256 indexed userId, uint256 minimumAge, uint256 proofHash)
    ]"#
);

abigen!(
    IdentityVault,
    r#"[
        function getIdentity(uint256 userId) external view returns (uint256 ageCommitment, uint256 country, uint256 createdAt)
        function createIdentity(uint256 userId, uint256 ageCommitment, uint256 country) external returns (bool)
        function hasIdentity(uint256 userId) external view returns (bool)
        event IdentityCreated(uint256 indexed userId, uint256 ageCommitment)
    ]"#
);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrarConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub verifier_address: String,
    pub identity_address: String,
}

/// Identity record as stored on chain.
#[derive(Clone, Debug)]
pub struct OnChainIdentity {
    pub age_commitment: String,
    pub country: String,
    pub created_at: u64,
}

pub struct RegistrarClient {
    provider_url: String,
    provider: Option<Arc<Provider<Http>>>,
    signer: Option<Arc<SignerMiddleware<Provider<Http>, LocalWallet>>>,
    verifier_address: Address,
    identity_address: Address,
    chain_id: u64,
}

impl RegistrarClient {
    pub fn new(config: RegistrarConfig) -> AgegateResult<Self> {
        let verifier_address = config
            .verifier_address
            .parse()
            .map_err(|e| AgegateError::Config(format!("Invalid verifier address: {}", e)))?;
        let identity_address = config
            .identity_address
            .parse()
            .map_err(|e| AgegateError::Config(format!("Invalid identity address: {}", e)))?;

        Ok(Self {
            provider_url: config.rpc_url,
            provider: None,
            signer: None,
            verifier_address,
            identity_address,
            chain_id: config.chain_id,
        })
    }

    pub async fn connect(&mut self) -> AgegateResult<()> {
        info!("Connecting to RPC: {}", self.provider_url);

        let provider = Provider::<Http>::try_from(&self.provider_url)
            .map_err(|e| AgegateError::Network(format!("Failed to create provider: {}", e)))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| AgegateError::Network(format!("Failed to get chain ID: {}", e)))?;

        if chain_id.as_u64() != self.chain_id {
            return Err(AgegateError::Network(format!(
                "Chain ID mismatch: expected {}, got {}",
                self.chain_id,
                chain_id.as_u64()
            )));
        }

        self.provider = Some(Arc::new(provider));

        info!("Connected to chain {}", self.chain_id);
        Ok(())
    }

    pub async fn set_wallet(&mut self, private_key: &str) -> AgegateResult<Address> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| AgegateError::Network("Not connected".into()))?
            .clone();

        let wallet: LocalWallet = private_key
            .parse()
            .map_err(|e| AgegateError::InvalidKey(format!("Invalid private key: {}", e)))?;

        let wallet = wallet.with_chain_id(self.chain_id);
        let address = wallet.address();

        let client = SignerMiddleware::new((*provider).clone(), wallet);
        self.signer = Some(Arc::new(client));

        info!("Wallet set: {}", address);
        Ok(address)
    }

    pub async fn has_valid_proof(&self, user_id: &str, minimum_age: u64) -> AgegateResult<bool> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| AgegateError::Network("Not connected".into()))?;

        let verifier = AgeVerifier::new(self.verifier_address, provider.clone());

        verifier
            .has_valid_proof(felt_to_u256(user_id)?, U256::from(minimum_age))
            .call()
            .await
            .map_err(|e| AgegateError::Contract(format!("hasValidProof call failed: {}", e)))
    }

    /// Submit a formatted proof and await the transaction receipt. The
    /// confirmation wait is a bounded pending-transaction future, not a
    /// polling loop; dropping it abandons the wait, not the transaction.
    pub async fn register_proof(
        &self,
        calldata: &agegate_types::ProofCalldata,
    ) -> AgegateResult<H256> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| AgegateError::Contract("No wallet configured".into()))?;

        let verifier = AgeVerifier::new(self.verifier_address, signer.clone());
        let call = verifier.register_proof(
            felt_to_u256(&calldata.user_id)?,
            U256::from(calldata.minimum_age),
            felt_to_u256(&calldata.age_commitment)?,
            felt_to_u256(&calldata.proof_hash)?,
            U256::from(calldata.is_valid),
            felt_to_u256(&calldata.sig_r)?,
            felt_to_u256(&calldata.sig_s)?,
        );

        let pending = call
            .send()
            .await
            .map_err(|e| AgegateError::Contract(format!("Failed to register proof: {}", e)))?;

        let receipt = pending
            .await
            .map_err(|e| AgegateError::Contract(format!("Proof transaction failed: {}", e)))?
            .ok_or_else(|| AgegateError::Contract("No receipt for proof registration".into()))?;

        info!("Proof registered: {:?}", receipt.transaction_hash);
        Ok(receipt.transaction_hash)
    }

    pub async fn get_identity(&self, user_id: &str) -> AgegateResult<OnChainIdentity> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| AgegateError::Network("Not connected".into()))?;

        let vault = IdentityVault::new(self.identity_address, provider.clone());

        let (age_commitment, country, created_at) = vault
            .get_identity(felt_to_u256(user_id)?)
            .call()
            .await
            .map_err(|e| AgegateError::Contract(format!("getIdentity call failed: {}", e)))?;

        Ok(OnChainIdentity {
            age_commitment: format!("0x{:x}", age_commitment),
            country: country.to_string(),
            created_at: created_at.as_u64(),
        })
    }

    pub async fn create_identity(
        &self,
        user_id: &str,
        age_commitment: &str,
        country: &str,
    ) -> AgegateResult<H256> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| AgegateError::Contract("No wallet configured".into()))?;

        let vault = IdentityVault::new(self.identity_address, signer.clone());
        let call = vault.create_identity(
            felt_to_u256(user_id)?,
            felt_to_u256(age_commitment)?,
            felt_to_u256(country)?,
        );

        let pending = call
            .send()
            .await
            .map_err(|e| AgegateError::Contract(format!("Failed to create identity: {}", e)))?;

        let receipt = pending
            .await
            .map_err(|e| AgegateError::Contract(format!("Identity transaction failed: {}", e)))?
            .ok_or_else(|| AgegateError::Contract("No receipt for identity creation".into()))?;

        info!("Identity created: {:?}", receipt.transaction_hash);
        Ok(receipt.transaction_hash)
    }
}

/// Parse a protocol felt string (0x-hex or decimal) into a `U256` for
/// calldata. BN254 field elements always fit.
pub fn felt_to_u256(s: &str) -> AgegateResult<U256> {
    let result = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        U256::from_str_radix(hex, 16)
    } else {
        U256::from_str_radix(s, 10)
    };
    result.map_err(|e| AgegateError::InvalidInput(format!("invalid felt '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_felt_to_u256_hex_and_decimal() {
        assert_eq!(felt_to_u256("0xff").unwrap(), U256::from(255u64));
        assert_eq!(felt_to_u256("255").unwrap(), U256::from(255u64));
        assert_eq!(felt_to_u256("0x0").unwrap(), U256::zero());
    }

    #[test]
    fn test_felt_to_u256_rejects_garbage() {
        assert!(felt_to_u256("0xzz").is_err());
        assert!(felt_to_u256("12a").is_err());
    }

    #[test]
    fn test_client_requires_connect() {
        let config = RegistrarConfig {
            rpc_url: "http://localhost:8545".into(),
            chain_id: 31337,
            verifier_address: "0x0000000000000000000000000000000000000001".into(),
            identity_address: "0x0000000000000000000000000000000000000002".into(),
        };
        let client = RegistrarClient::new(config).unwrap();

        let err = tokio_test::block_on(client.has_valid_proof("42", 18)).unwrap_err();
        assert!(matches!(err, AgegateError::Network(_)));
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        let config = RegistrarConfig {
            rpc_url: "http://localhost:8545".into(),
            chain_id: 31337,
            verifier_address: "not-an-address".into(),
            identity_address: "0x0000000000000000000000000000000000000002".into(),
        };
        assert!(RegistrarClient::new(config).is_err());
    }
}
