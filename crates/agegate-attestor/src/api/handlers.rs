use super::middleware::{ApiContext, AuthResult, RateLimitResult, RequestHeaders};
use super::responses::{HealthResponse, PublicKeyResponse};
use crate::attestor::Attestor;
use agegate_types::{AgegateError, AgegateResult, AttestationRequest, AttestationResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[allow(clippy::too_many_arguments)]
pub async fn handle_request(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    attestor: Arc<Attestor>,
    started_at: Instant,
    max_body_size: usize,
    request_timeout_secs: u64,
    api_context: Arc<ApiContext>,
) -> AgegateResult<()> {
    let timeout = std::time::Duration::from_secs(request_timeout_secs);

    let mut reader = BufReader::new(&mut stream);
    let mut request_line = String::new();

    match tokio::time::timeout(timeout, reader.read_line(&mut request_line)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            return send_error_response(
                &mut stream,
                400,
                "BAD_REQUEST",
                &format!("Failed to read request: {}", e),
            )
            .await;
        }
        Err(_) => {
            return send_error_response(&mut stream, 408, "TIMEOUT", "Request timeout").await;
        }
    }

    let parts: Vec<&str> = request_line.trim().split_whitespace().collect();
    if parts.len() < 2 {
        return send_error_response(&mut stream, 400, "BAD_REQUEST", "Invalid request line").await;
    }

    let method = parts[0].to_string();
    let path = parts[1].to_string();

    let mut header_lines = Vec::new();
    loop {
        let mut line = String::new();
        match tokio::time::timeout(timeout, reader.read_line(&mut line)).await {
            Ok(Ok(_)) => {
                if line.trim().is_empty() {
                    break;
                }
                header_lines.push(line);
            }
            Ok(Err(e)) => {
                return send_error_response(
                    &mut stream,
                    400,
                    "BAD_REQUEST",
                    &format!("Failed to read headers: {}", e),
                )
                .await;
            }
            Err(_) => {
                return send_error_response(&mut stream, 408, "TIMEOUT", "Header read timeout")
                    .await;
            }
        }
    }

    let headers = RequestHeaders::parse(&header_lines);
    let client_ip = headers.real_ip(peer_addr.ip(), &api_context.trusted_proxies);

    match api_context.rate_limiter.check_request(client_ip) {
        RateLimitResult::Allowed => {}
        RateLimitResult::IpLimitExceeded => {
            return send_error_response(
                &mut stream,
                429,
                "RATE_LIMITED",
                "Too many requests from your IP",
            )
            .await;
        }
        RateLimitResult::GlobalLimitExceeded => {
            return send_error_response(
                &mut stream,
                503,
                "SERVICE_OVERLOADED",
                "Server is overloaded, please try again later",
            )
            .await;
        }
    }

    match api_context
        .authenticator
        .authenticate(&path, headers.authorization.as_deref())
    {
        AuthResult::Authenticated | AuthResult::NotRequired => {}
        AuthResult::MissingToken => {
            return send_error_response(
                &mut stream,
                401,
                "UNAUTHORIZED",
                "Missing Authorization header",
            )
            .await;
        }
        AuthResult::InvalidFormat => {
            return send_error_response(
                &mut stream,
                401,
                "UNAUTHORIZED",
                "Invalid Authorization format. Use: Bearer <token>",
            )
            .await;
        }
        AuthResult::InvalidToken => {
            return send_error_response(&mut stream, 403, "FORBIDDEN", "Invalid API token").await;
        }
    }

    if method == "OPTIONS" {
        return send_cors_preflight(&mut stream).await;
    }

    let body = if method == "POST" {
        let content_length = headers.content_length.unwrap_or(0);
        if content_length > max_body_size {
            return send_error_response(
                &mut stream,
                413,
                "PAYLOAD_TOO_LARGE",
                "Request body too large",
            )
            .await;
        }

        let mut buf = vec![0u8; content_length];
        match tokio::time::timeout(timeout, reader.read_exact(&mut buf)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return send_error_response(
                    &mut stream,
                    400,
                    "BAD_REQUEST",
                    &format!("Failed to read body: {}", e),
                )
                .await;
            }
            Err(_) => {
                return send_error_response(&mut stream, 408, "TIMEOUT", "Body read timeout").await;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    } else {
        String::new()
    };

    match (method.as_str(), path.as_str()) {
        ("POST", "/api/generate-proof") => generate_proof(&mut stream, &attestor, &body).await,
        ("GET", "/api/health") => serve_health(&mut stream, &attestor, started_at).await,
        ("GET", "/api/public-key") => serve_public_key(&mut stream, &attestor).await,
        _ => {
            send_error_response(
                &mut stream,
                404,
                "NOT_FOUND",
                &format!("Endpoint not found: {} {}", method, path),
            )
            .await
        }
    }
}

/// POST /api/generate-proof.
///
/// Status mapping: malformed JSON or missing fields → 400, unconfigured
/// signing key or internal fault → 500. Every failure carries the standard
/// failure body so callers always see the same response shape.
async fn generate_proof(
    stream: &mut TcpStream,
    attestor: &Arc<Attestor>,
    body: &str,
) -> AgegateResult<()> {
    let request: AttestationRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            let response = AttestationResponse::failure(format!("Invalid JSON body: {}", e));
            return send_attestation_response(stream, 400, &response).await;
        }
    };

    match attestor.try_attest(&request) {
        Ok(response) => send_attestation_response(stream, 200, &response).await,
        Err(AgegateError::InvalidInput(reason)) => {
            let response = AttestationResponse::failure(reason);
            send_attestation_response(stream, 400, &response).await
        }
        Err(e) => {
            let response = AttestationResponse::failure(e.to_string());
            send_attestation_response(stream, 500, &response).await
        }
    }
}

async fn send_attestation_response(
    stream: &mut TcpStream,
    status: u16,
    response: &AttestationResponse,
) -> AgegateResult<()> {
    let json = serde_json::to_string(response).unwrap_or_else(|_| "{}".to_string());
    send_response(stream, status, "application/json", &json).await
}

async fn serve_health(
    stream: &mut TcpStream,
    attestor: &Arc<Attestor>,
    started_at: Instant,
) -> AgegateResult<()> {
    let response = HealthResponse {
        healthy: true,
        configured: attestor.is_configured(),
        uptime_secs: started_at.elapsed().as_secs(),
    };

    let json = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
    send_response(stream, 200, "application/json", &json).await
}

async fn serve_public_key(stream: &mut TcpStream, attestor: &Arc<Attestor>) -> AgegateResult<()> {
    match attestor.public_key() {
        Some(key) => {
            let response = PublicKeyResponse {
                public_key: key.to_hex(),
            };
            let json = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
            send_response(stream, 200, "application/json", &json).await
        }
        None => {
            send_error_response(
                stream,
                503,
                "NOT_CONFIGURED",
                "Attestor signing key not configured",
            )
            .await
        }
    }
}

pub async fn send_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &str,
) -> AgegateResult<()> {
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Authorization, Content-Type\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        content_type,
        body.len(),
        body
    );

    stream
        .write_all(response.as_bytes())
        .await
        .map_err(|e| AgegateError::Network(format!("Failed to send response: {}", e)))?;

    Ok(())
}

pub async fn send_error_response(
    stream: &mut TcpStream,
    status: u16,
    code: &str,
    message: &str,
) -> AgegateResult<()> {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message,
            "status": status
        }
    });
    send_response(stream, status, "application/json", &body.to_string()).await
}

async fn send_cors_preflight(stream: &mut TcpStream) -> AgegateResult<()> {
    let response = "HTTP/1.1 204 No Content\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Authorization, Content-Type\r\n\
         Access-Control-Max-Age: 86400\r\n\
         Connection: close\r\n\
         \r\n";

    stream
        .write_all(response.as_bytes())
        .await
        .map_err(|e| AgegateError::Network(format!("Failed to send CORS response: {}", e)))?;

    Ok(())
}
