use super::handlers::handle_request;
use super::middleware::ApiContext;
use crate::attestor::Attestor;
use crate::config::AttestorConfig;
use agegate_types::{AgegateError, AgegateResult};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

pub struct AttestorServer {
    addr: SocketAddr,
    running: Arc<RwLock<bool>>,
    attestor: Arc<Attestor>,
    api_context: Arc<ApiContext>,
    max_body_size: usize,
    request_timeout_secs: u64,
    started_at: Instant,
}

impl AttestorServer {
    pub fn new(config: &AttestorConfig, attestor: Arc<Attestor>) -> Self {
        let api_context = Arc::new(ApiContext::new(
            config.auth_token.clone(),
            config.requests_per_second,
            config.burst_size,
        ));

        Self {
            addr: config.listen_addr(),
            running: Arc::new(RwLock::new(false)),
            attestor,
            api_context,
            max_body_size: config.max_body_size,
            request_timeout_secs: config.request_timeout_secs,
            started_at: Instant::now(),
        }
    }

    pub async fn start(&self) -> AgegateResult<()> {
        if *self.running.read().await {
            return Err(AgegateError::Internal("API server already running".into()));
        }

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| AgegateError::Network(format!("Failed to bind API server: {}", e)))?;

        info!("Attestor API listening on http://{}", self.addr);
        if !self.attestor.is_configured() {
            warn!("No signing key loaded - /api/generate-proof will return configuration errors");
        }

        *self.running.write().await = true;

        let rate_limiter = self.api_context.rate_limiter.clone();
        let cleanup_running = self.running.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                if !*cleanup_running.read().await {
                    break;
                }
                rate_limiter.cleanup();
            }
        });

        let running = self.running.clone();
        let attestor = self.attestor.clone();
        let api_context = self.api_context.clone();
        let max_body_size = self.max_body_size;
        let request_timeout_secs = self.request_timeout_secs;
        let started_at = self.started_at;

        tokio::spawn(async move {
            loop {
                if !*running.read().await {
                    break;
                }

                match listener.accept().await {
                    Ok((stream, addr)) => {
                        debug!("API request from {}", addr);
                        let attestor = attestor.clone();
                        let api_context = api_context.clone();

                        tokio::spawn(async move {
                            if let Err(e) = handle_request(
                                stream,
                                addr,
                                attestor,
                                started_at,
                                max_body_size,
                                request_timeout_secs,
                                api_context,
                            )
                            .await
                            {
                                if !e.to_string().contains("connection reset")
                                    && !e.to_string().contains("broken pipe")
                                {
                                    warn!("API request error from {}: {}", addr, e);
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!("API accept error: {}", e);
                    }
                }
            }
        });

        Ok(())
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
        info!("Attestor API stopped");
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
