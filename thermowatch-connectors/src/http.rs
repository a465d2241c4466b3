//! Shared HTTP client for the delivery gateways
//!
//! All three collaborators (metrics, pub/sub, SMS) speak JSON-over-HTTP to
//! their gateways, so they share one client: a `ureq` agent plus a retry
//! loop. Transport failures and retryable statuses (5xx, 429) back off
//! exponentially; client errors fail immediately.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use serde::Serialize;
use thiserror::Error;

use crate::DeliveryStats;

/// HTTP-specific errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Server returned error status
    #[error("Server error {status}: {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Authentication methods
#[derive(Clone)]
pub enum AuthMethod {
    /// No authentication
    None,
    /// Bearer token
    Bearer(String),
    /// Basic authentication
    Basic {
        /// Account name
        username: String,
        /// Account secret
        password: String,
    },
    /// API key in header
    ApiKey {
        /// Header name
        header: String,
        /// Header value
        value: String,
    },
}

/// HTTP configuration
#[derive(Clone)]
pub struct HttpConfig {
    /// Base URL for the gateway
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Authentication method
    pub auth: AuthMethod,
    /// Custom headers
    pub headers: HashMap<String, String>,
    /// Retry attempts after the first failure
    pub max_retries: u32,
    /// User agent string
    pub user_agent: String,
}

impl HttpConfig {
    /// Create new configuration with base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            auth: AuthMethod::None,
            headers: HashMap::new(),
            max_retries: 3,
            user_agent: format!("Thermowatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set bearer token authentication
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer(token.into());
        self
    }

    /// Set basic authentication
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Set API key authentication
    pub fn api_key(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = AuthMethod::ApiKey {
            header: header.into(),
            value: value.into(),
        };
        self
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Add custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Blocking JSON-over-HTTP client with retry
pub struct HttpClient {
    config: HttpConfig,
    agent: ureq::Agent,
    stats: Arc<Mutex<DeliveryStats>>,
}

impl HttpClient {
    /// Create a client from `config`
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(HttpError::Config(
                "Base URL must start with http:// or https://".into(),
            ));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: Arc::new(Mutex::new(DeliveryStats::default())),
        })
    }

    /// POST `data` as JSON to `path` under the base URL
    pub fn post_json<T: Serialize>(&self, path: &str, data: &T) -> Result<(), HttpError> {
        let url = format!("{}{}", self.config.base_url, path);
        let json =
            serde_json::to_string(data).map_err(|e| HttpError::Serialization(e.to_string()))?;

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff
                thread::sleep(Duration::from_millis(100 * (1 << attempt)));
            }

            let request = self.build_request(self.agent.post(&url));
            match request.send_string(&json) {
                Ok(_) => {
                    let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
                    stats.messages_sent += 1;
                    stats.bytes_sent += json.len() as u64;
                    return Ok(());
                }
                Err(ureq::Error::Status(code, resp)) => {
                    let message = resp.into_string().unwrap_or_default();
                    if code >= 500 || code == 429 {
                        // Server trouble or rate limit: worth retrying.
                        last_error = Some(HttpError::ServerError { status: code, message });
                        continue;
                    }
                    self.stats.lock().unwrap_or_else(|e| e.into_inner()).messages_failed += 1;
                    return Err(HttpError::ServerError { status: code, message });
                }
                Err(ureq::Error::Transport(e)) => {
                    last_error = Some(HttpError::Request(e.to_string()));
                    continue;
                }
            }
        }

        self.stats.lock().unwrap_or_else(|e| e.into_inner()).messages_failed += 1;
        Err(last_error.unwrap_or_else(|| HttpError::Request("Unknown error".into())))
    }

    /// Delivery statistics so far
    pub fn stats(&self) -> DeliveryStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn build_request(&self, mut request: ureq::Request) -> ureq::Request {
        match &self.config.auth {
            AuthMethod::None => {}
            AuthMethod::Bearer(token) => {
                request = request.set("Authorization", &format!("Bearer {token}"));
            }
            AuthMethod::Basic { username, password } => {
                let credentials = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                request = request.set("Authorization", &format!("Basic {credentials}"));
            }
            AuthMethod::ApiKey { header, value } => {
                request = request.set(header, value);
            }
        }

        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }

        request
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
    }
}
