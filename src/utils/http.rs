//! HTTP client utilities.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::error::HarvestError;

/// Per-request timeout; NCBI can be slow assembling large full-text records.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default client identity sent on every request.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the outbound User-Agent, folding in the NCBI contact address when
/// one is configured. An explicit `custom` identity wins outright.
pub fn build_user_agent(custom: Option<&str>, email: Option<&str>) -> String {
    if let Some(ua) = custom {
        return ua.to_string();
    }
    match email {
        Some(email) => format!("{DEFAULT_USER_AGENT} (mailto:{email})"),
        None => DEFAULT_USER_AGENT.to_string(),
    }
}

/// Shared HTTP client with sensible defaults.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with the default identity.
    pub fn new() -> Result<Self, HarvestError> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with a custom user agent.
    pub fn with_user_agent(user_agent: &str) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| HarvestError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}
