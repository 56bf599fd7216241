use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub configured: bool,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
}
