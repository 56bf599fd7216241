//! HTTP client for the attestation service.

use agegate_types::{AgegateError, AgegateResult, AttestationRequest, AttestationResponse};
use tracing::debug;

pub struct ProverClient {
    endpoint: String,
    http: reqwest::Client,
}

impl ProverClient {
    /// `endpoint` is the service base URL, e.g. `http://127.0.0.1:8788`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    fn proof_url(&self) -> String {
        format!("{}/api/generate-proof", self.endpoint.trim_end_matches('/'))
    }

    pub fn with_auth_token(endpoint: impl Into<String>, token: &str) -> AgegateResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| AgegateError::Config(format!("Invalid auth token: {}", e)))?;
        headers.insert(reqwest::header::AUTHORIZATION, value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AgegateError::Network(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    /// Request a signed attestation. Transport failures and non-JSON bodies
    /// are network errors; a decoded failure response is returned as-is so
    /// the caller can read the structured reason.
    pub async fn generate_proof(
        &self,
        request: &AttestationRequest,
    ) -> AgegateResult<AttestationResponse> {
        let url = self.proof_url();
        debug!(%url, user_id = %request.user_id, "requesting attestation");

        let response = self
            .http
            .post(&url)
            .timeout(std::time::Duration::from_secs(30))
            .json(request)
            .send()
            .await
            .map_err(|e| AgegateError::Network(format!("Prover request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgegateError::Network(format!("Prover response unreadable: {}", e)))?;

        match serde_json::from_str::<AttestationResponse>(&body) {
            Ok(decoded) => Ok(decoded),
            Err(_) => Err(AgegateError::Network(format!(
                "Prover returned {} with undecodable body",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_prover_is_network_error() {
        // Discard port on localhost; the connection is refused immediately.
        let client = ProverClient::new("http://127.0.0.1:9");
        let request = AttestationRequest {
            age: 25,
            salt: "0x1".into(),
            minimum_age: 18,
            age_commitment: "0x2".into(),
            user_id: "42".into(),
        };

        let err = client.generate_proof(&request).await.unwrap_err();
        assert!(matches!(err, AgegateError::Network(_)));
    }

    #[test]
    fn test_endpoint_trailing_slash_normalized() {
        let client = ProverClient::new("http://localhost:8788/");
        assert_eq!(client.proof_url(), "http://localhost:8788/api/generate-proof");
    }
}
