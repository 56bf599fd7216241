//! Attestor configuration.
//!
//! The signing key is the one secret the service owns. It can arrive inline
//! (config file or `AGEGATE_SIGNING_KEY`) or via a key file; it is never
//! written back out when the config is saved, and its absence is reported
//! loudly rather than silently degrading.

use agegate_types::{AgegateError, AgegateResult, SigningPrivateKey};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_API_PORT: u16 = 8788;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestorConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_body_size: usize,
    #[serde(skip_serializing)]
    pub signing_key: Option<String>,
    pub signing_key_file: Option<PathBuf>,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Default for AttestorConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_API_PORT,
            request_timeout_secs: 30,
            max_body_size: 1024 * 1024,
            signing_key: None,
            signing_key_file: None,
            auth_token: None,
            requests_per_second: 100,
            burst_size: 200,
        }
    }
}

impl AttestorConfig {
    pub fn load(path: impl AsRef<std::path::Path>) -> AgegateResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| AgegateError::Config(format!("Failed to read config: {}", e)))?;

            toml::from_str(&contents)
                .map_err(|e| AgegateError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> AgegateResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AgegateError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AgegateError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| AgegateError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("AGEGATE_SIGNING_KEY") {
            self.signing_key = Some(key);
        }

        if let Ok(file) = std::env::var("AGEGATE_SIGNING_KEY_FILE") {
            self.signing_key_file = Some(PathBuf::from(file));
        }

        if let Ok(port) = std::env::var("AGEGATE_API_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(bind) = std::env::var("AGEGATE_API_BIND") {
            if let Ok(addr) = bind.parse() {
                self.bind_address = addr;
                if bind != "127.0.0.1" && bind != "::1" {
                    warn!(
                        "Attestor binding to non-localhost address: {}. Ensure proper firewall rules.",
                        bind
                    );
                }
            }
        }

        if let Ok(token) = std::env::var("AGEGATE_API_TOKEN") {
            self.auth_token = Some(token);
        }
    }

    pub fn validate(&self) -> AgegateResult<()> {
        if self.port == 0 {
            return Err(AgegateError::Config("API port must be non-zero".into()));
        }
        if self.max_body_size == 0 {
            return Err(AgegateError::Config("max_body_size must be non-zero".into()));
        }
        if self.requests_per_second == 0 || self.burst_size == 0 {
            return Err(AgegateError::Config(
                "rate limit parameters must be non-zero".into(),
            ));
        }
        if let Some(ref key) = self.signing_key {
            SigningPrivateKey::from_hex(key)
                .map_err(|e| AgegateError::Config(format!("Invalid signing key: {}", e)))?;
        }
        Ok(())
    }

    /// Resolve the signing key: inline hex first, then the key file. Returns
    /// `None` when neither is provisioned - the attestor starts but every
    /// attestation request fails with a configuration error.
    pub fn resolve_signing_key(&self) -> AgegateResult<Option<SigningPrivateKey>> {
        if let Some(ref key) = self.signing_key {
            return SigningPrivateKey::from_hex(key).map(Some);
        }

        if let Some(ref path) = self.signing_key_file {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                AgegateError::Config(format!("Failed to read signing key file: {}", e))
            })?;
            return SigningPrivateKey::from_hex(contents.trim()).map(Some);
        }

        Ok(None)
    }

    pub fn listen_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.bind_address, self.port)
    }
}
