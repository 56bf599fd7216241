mod handlers;
mod middleware;
mod responses;
mod server;

pub use middleware::{
    ApiAuthenticator, ApiContext, ApiRateLimiter, AuthResult, RateLimitResult, RequestHeaders,
    TrustedProxies,
};
pub use responses::{HealthResponse, PublicKeyResponse};
pub use server::AttestorServer;
