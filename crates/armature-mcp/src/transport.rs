//! HTTP transport with retries.
//!
//! | Condition                    | Strategy                              |
//! |------------------------------|---------------------------------------|
//! | 429, 503                     | Exponential backoff with jitter, capped |
//! | 408, 500, 502, 504           | Linear backoff, capped                |
//! | Connect error / send timeout | Retry after the base delay            |
//! | Anything else                | Returned to the caller as-is          |
//!
//! Non-success responses that are not retried, or that exhaust the retry
//! budget, are still returned as `Ok` so the caller can read the body.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{McpError, McpResult};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Transport settings.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Bound on connecting and receiving response headers, and on reading a
    /// plain JSON body. Event streams use their own limit.
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Accept any server certificate. Test servers only.
    pub insecure_skip_verify: bool,
    /// Extra PEM root certificate to trust.
    pub ca_certificate: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            retry_max_delay: DEFAULT_RETRY_MAX_DELAY,
            insecure_skip_verify: false,
            ca_certificate: None,
            user_agent: format!("armature-mcp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// How a failed attempt is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backoff {
    Exponential,
    Linear,
}

fn backoff_for(status: StatusCode) -> Option<Backoff> {
    match status.as_u16() {
        429 | 503 => Some(Backoff::Exponential),
        408 | 500 | 502 | 504 => Some(Backoff::Linear),
        _ => None,
    }
}

/// Thin wrapper over a reqwest client that applies the retry policy.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> McpResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(&config.user_agent);

        if config.insecure_skip_verify {
            warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(path) = &config.ca_certificate {
            let pem = std::fs::read(path).map_err(|e| {
                McpError::Config(format!(
                    "failed to read CA certificate {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| McpError::Config(format!("invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder
            .build()
            .map_err(|e| McpError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// POST `body` as JSON, retrying per the module policy.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: HeaderMap,
        cancel: &CancellationToken,
    ) -> McpResult<Response> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0u32;

        loop {
            let request = self
                .client
                .post(url)
                .headers(headers.clone())
                .json(body)
                .send();

            let sent = tokio::select! {
                _ = cancel.cancelled() => return Err(McpError::Cancelled),
                sent = tokio::time::timeout(self.config.timeout, request) => sent,
            };

            let delay = match sent {
                Ok(Ok(response)) => {
                    let status = response.status();
                    match backoff_for(status) {
                        Some(backoff) if attempt < max_retries => {
                            let delay = self.delay_for(backoff, attempt, response.headers());
                            warn!(
                                %status,
                                attempt = attempt + 1,
                                max_retries,
                                delay_ms = delay.as_millis() as u64,
                                "Retrying MCP request"
                            );
                            delay
                        }
                        _ => return Ok(response),
                    }
                }
                Ok(Err(e)) if e.is_connect() && attempt < max_retries => {
                    warn!(error = %e, attempt = attempt + 1, max_retries, "Connection failed, retrying");
                    self.config.retry_base_delay
                }
                Ok(Err(e)) => return Err(McpError::transport(e.to_string())),
                Err(_) if attempt < max_retries => {
                    warn!(attempt = attempt + 1, max_retries, "Request timed out, retrying");
                    self.config.retry_base_delay
                }
                Err(_) => {
                    return Err(McpError::transport(format!(
                        "request timed out after {}",
                        humantime::format_duration(self.config.timeout)
                    )));
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => return Err(McpError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
            debug!(attempt, url, "Retrying request");
        }
    }

    fn delay_for(&self, backoff: Backoff, attempt: u32, headers: &HeaderMap) -> Duration {
        let base = self.config.retry_base_delay;
        let cap = self.config.retry_max_delay;

        let delay = match backoff {
            Backoff::Exponential => {
                if let Some(after) = retry_after(headers) {
                    return after.min(cap);
                }
                let exp = base.saturating_mul(2u32.saturating_pow(attempt));
                let jitter = base.mul_f64(rand::random::<f64>() * 0.5);
                exp.saturating_add(jitter)
            }
            Backoff::Linear => base.saturating_mul(attempt + 1),
        };
        delay.min(cap)
    }
}

/// `Retry-After` in its delta-seconds form.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
