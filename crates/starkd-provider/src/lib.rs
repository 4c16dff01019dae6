//! # Starkd Provider
//!
//! HTTP and JSON-RPC plumbing shared by the Starkd crates. It owns the
//! connection-pooled HTTP client, the JSON-RPC envelope types and the endpoint
//! configuration presets for StarkNet networks.
//!
//! ## Features
//!
//! - HTTP client with connection reuse and gzip
//! - JSON-RPC 2.0 request/response envelopes
//! - Optional client-side request throttling
//! - Endpoint presets for StarkNet mainnet and Sepolia
//!
//! ## Example
//!
//! ```ignore
//! use starkd_provider::{presets, RpcClient};
//!
//! let config = presets::starknet_sepolia();
//! let client = RpcClient::new()?;
//! let block: u64 = client.rpc_call(&config.url, "starknet_blockNumber", ()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Provider-related errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Client could not be constructed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status with the body the server returned
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RPC error response
    #[error("RPC error: code={code}, message={message}")]
    RpcError {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Configuration for a provider endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// RPC URL
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Client-side throttling, off when `None`
    pub rate_limit: Option<RateLimitConfig>,
}

impl ProviderConfig {
    /// Creates a new provider configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 30,
            rate_limit: None,
        }
    }

    /// Sets the request timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Throttles requests made under this configuration
    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimitConfig>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.url).map_err(|e| ProviderError::InvalidUrl(e.to_string()))?;
        if let Some(rate_limit) = &self.rate_limit {
            rate_limit.quota()?;
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new("http://localhost:5050/rpc")
    }
}

// ============================================================================
// HTTP Client with Connection Pooling
// ============================================================================

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
    /// Idle connection timeout
    pub pool_idle_timeout_secs: u64,
    /// Connection timeout
    pub connect_timeout_secs: u64,
    /// Request timeout
    pub request_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Enable gzip compression
    pub gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 10,
            pool_idle_timeout_secs: 90,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: format!("Starkd/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
        }
    }
}

impl From<&ProviderConfig> for HttpClientConfig {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            request_timeout_secs: config.timeout_secs,
            ..Default::default()
        }
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Burst size (max requests in a burst)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 20,
        }
    }
}

impl RateLimitConfig {
    /// Steady rate with an equal burst allowance
    pub fn per_second(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            burst_size: requests_per_second,
        }
    }

    fn quota(&self) -> Result<Quota> {
        let rate = NonZeroU32::new(self.requests_per_second).ok_or_else(|| {
            ProviderError::InvalidConfig("requests_per_second must be non-zero".to_string())
        })?;
        let burst = NonZeroU32::new(self.burst_size).ok_or_else(|| {
            ProviderError::InvalidConfig("burst_size must be non-zero".to_string())
        })?;
        Ok(Quota::per_second(rate).allow_burst(burst))
    }
}

/// RPC request payload
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<T: Serialize> {
    /// JSON-RPC version
    pub jsonrpc: &'static str,
    /// Method name
    pub method: String,
    /// Parameters
    pub params: T,
    /// Request ID
    pub id: u64,
}

impl<T: Serialize> JsonRpcRequest<T> {
    /// Creates a new JSON-RPC request
    pub fn new(method: impl Into<String>, params: T, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
            id,
        }
    }
}

/// RPC response payload
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<T> {
    /// JSON-RPC version
    #[serde(default)]
    pub jsonrpc: String,
    /// Response ID
    #[serde(default)]
    pub id: u64,
    /// Result (if successful)
    pub result: Option<T>,
    /// Error (if failed)
    pub error: Option<JsonRpcError>,
}

impl<T> JsonRpcResponse<T> {
    /// Splits the envelope into its result or the error it carries
    pub fn into_result(self) -> Result<T> {
        if let Some(error) = self.error {
            return Err(ProviderError::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        self.result.ok_or_else(|| ProviderError::RpcError {
            code: -1,
            message: "No result in response".to_string(),
        })
    }
}

/// RPC error
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
    /// Additional data
    pub data: Option<serde_json::Value>,
}

/// HTTP client with connection pooling and optional rate limiting
pub struct RpcClient {
    client: Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Creates a new RPC client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default(), None)
    }

    /// Creates a client for an endpoint configuration, honoring its timeout and
    /// rate limit
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Self::with_config(HttpClientConfig::from(config), config.rate_limit.clone())
    }

    /// Creates a new RPC client with custom configuration
    pub fn with_config(
        http_config: HttpClientConfig,
        rate_limit: Option<RateLimitConfig>,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(http_config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(http_config.pool_idle_timeout_secs))
            .connect_timeout(Duration::from_secs(http_config.connect_timeout_secs))
            .timeout(Duration::from_secs(http_config.request_timeout_secs))
            .user_agent(&http_config.user_agent)
            .gzip(http_config.gzip)
            .build()
            .map_err(|e: reqwest::Error| ProviderError::ConnectionFailed(e.to_string()))?;

        let rate_limiter = rate_limit
            .map(|config| config.quota().map(RateLimiter::direct))
            .transpose()?;

        Ok(Self {
            client,
            rate_limiter,
            request_id: AtomicU64::new(1),
        })
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    /// Makes a JSON-RPC request
    pub async fn rpc_call<P, R>(&self, url: &str, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.throttle().await;

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(method, params, id);
        tracing::debug!(method, id, url, "Sending JSON-RPC request");

        let response = self.client.post(url).json(&request).send().await?;

        let rpc_response: JsonRpcResponse<R> = response.json().await?;
        rpc_response.into_result()
    }

    /// Makes a raw POST request with JSON body
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: impl Serialize,
    ) -> Result<T> {
        self.throttle().await;
        self.request_id.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(url, "Sending POST request");

        let response = self.client.post(url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let result: T = response.json().await?;
        Ok(result)
    }

    /// Returns the number of requests made
    pub fn request_count(&self) -> u64 {
        self.request_id.load(Ordering::SeqCst) - 1
    }

    /// Whether requests are throttled
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limiter.is_some()
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("request_count", &self.request_count())
            .field("has_rate_limiter", &self.is_rate_limited())
            .finish()
    }
}

/// Common provider presets for StarkNet networks
pub mod presets {
    use super::ProviderConfig;

    /// StarkNet mainnet JSON-RPC endpoint
    pub fn starknet_mainnet() -> ProviderConfig {
        ProviderConfig::new("https://starknet-mainnet.public.blastapi.io/rpc/v0_7")
            .with_timeout(30)
    }

    /// StarkNet Sepolia testnet JSON-RPC endpoint
    pub fn starknet_sepolia() -> ProviderConfig {
        ProviderConfig::new("https://starknet-sepolia.public.blastapi.io/rpc/v0_7")
            .with_timeout(30)
    }
}
