//! Configuration management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::{INTERVAL_NO_API_KEY, INTERVAL_WITH_API_KEY};

/// Environment variable holding the NCBI API key.
pub const NCBI_API_KEY_ENV: &str = "NCBI_API_KEY";

/// Environment variable holding the NCBI contact address.
pub const NCBI_EMAIL_ENV: &str = "NCBI_EMAIL";

/// Default worker pool size for concurrent downloads.
pub const DEFAULT_WORKERS: usize = 5;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// NCBI credentials.
    #[serde(default)]
    pub credentials: Credentials,

    /// Download settings.
    #[serde(default)]
    pub downloads: DownloadConfig,

    /// Rate limiting settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Outbound HTTP identity.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Minimum interval between outbound requests: the explicit override
    /// when set, otherwise the published NCBI limit for the credential.
    pub fn request_interval(&self) -> Duration {
        if let Some(secs) = self.rate_limit.interval_secs {
            return Duration::from_secs_f64(secs.max(0.0));
        }
        if self.credentials.api_key.is_some() {
            INTERVAL_WITH_API_KEY
        } else {
            INTERVAL_NO_API_KEY
        }
    }
}

/// NCBI credentials. Both identify the caller per the E-utilities usage
/// policy; the API key also raises the permitted request rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// API key forwarded on every request (raises the limit to 10 req/s).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Contact address folded into the User-Agent.
    #[serde(default)]
    pub email: Option<String>,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            api_key: std::env::var(NCBI_API_KEY_ENV)
                .ok()
                .filter(|v| !v.is_empty()),
            email: std::env::var(NCBI_EMAIL_ENV).ok().filter(|v| !v.is_empty()),
        }
    }
}

impl Credentials {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

/// Download configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Base directory artifacts are grouped under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Default cap on records per run.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Default worker pool size.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_results: default_max_results(),
            workers: default_workers(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("publications")
}

fn default_max_results() -> usize {
    100
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Override in seconds for the minimum interval between requests.
    /// Zero disables pacing.
    #[serde(default)]
    pub interval_secs: Option<f64>,
}

/// Outbound HTTP identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Replaces the default client identity entirely when set.
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Load configuration from a TOML file, with `PMC_HARVEST_*` environment
/// variables layered on top.
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("PMC_HARVEST").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Look for a config file in the conventional spot.
pub fn find_config_file() -> Option<PathBuf> {
    let candidate = PathBuf::from("pmc-harvest.toml");
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_override_wins() {
        let config = Config {
            rate_limit: RateLimitConfig {
                interval_secs: Some(1.5),
            },
            ..Default::default()
        };
        assert_eq!(config.request_interval(), Duration::from_secs_f64(1.5));
    }

    #[test]
    fn interval_follows_credential() {
        let keyed = Config {
            credentials: Credentials {
                api_key: Some("k".to_string()),
                email: None,
            },
            rate_limit: RateLimitConfig::default(),
            ..Default::default()
        };
        assert_eq!(keyed.request_interval(), INTERVAL_WITH_API_KEY);

        let anonymous = Config {
            credentials: Credentials {
                api_key: None,
                email: None,
            },
            rate_limit: RateLimitConfig::default(),
            ..Default::default()
        };
        assert_eq!(anonymous.request_interval(), INTERVAL_NO_API_KEY);
    }

    #[test]
    fn download_defaults() {
        let downloads = DownloadConfig::default();
        assert_eq!(downloads.output_dir, PathBuf::from("publications"));
        assert_eq!(downloads.max_results, 100);
        assert_eq!(downloads.workers, DEFAULT_WORKERS);
    }
}
