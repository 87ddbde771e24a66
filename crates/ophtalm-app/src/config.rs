//! Runtime configuration: endpoint base URL and request deadline.
//!
//! Values come from defaults, then the environment, then CLI overrides.

use std::time::Duration;

use ophtalm_upload::{DEFAULT_ENDPOINT_BASE, DEFAULT_TIMEOUT, UploadError, predict_endpoint};
use thiserror::Error;
use url::{Host, Url};

/// Environment variable holding the endpoint base URL.
pub const ENDPOINT_ENV: &str = "OPHTALM_ENDPOINT";

/// Environment variable holding the request deadline in whole seconds.
pub const TIMEOUT_ENV: &str = "OPHTALM_TIMEOUT_SECS";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Endpoint base URL; `/predict` is joined onto it.
    pub endpoint_base: String,
    /// Deadline for one upload round trip.
    pub timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint_base: DEFAULT_ENDPOINT_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Loads configuration from process environment.
    ///
    /// # Errors
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through a key lookup, falling back to defaults.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidTimeout`] for non-numeric or zero
    /// timeouts and [`ConfigError::InvalidEndpoint`] for unusable URLs.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let endpoint = non_blank(ENDPOINT_ENV);
        let timeout_secs = non_blank(TIMEOUT_ENV)
            .map(|raw| parse_timeout_secs(&raw))
            .transpose()?;

        Self::default().with_overrides(endpoint, timeout_secs)
    }

    /// Applies explicit overrides, e.g. from command-line flags.
    ///
    /// # Errors
    /// Same as [`AppConfig::from_lookup`].
    pub fn with_overrides(
        mut self,
        endpoint_base: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if let Some(endpoint_base) = endpoint_base {
            self.endpoint_base = endpoint_base.trim().to_string();
        }
        if let Some(timeout_secs) = timeout_secs {
            if timeout_secs == 0 {
                return Err(ConfigError::InvalidTimeout(
                    "timeout must be at least one second".to_string(),
                ));
            }
            self.timeout = Duration::from_secs(timeout_secs);
        }

        self.predict_url()?;
        Ok(self)
    }

    /// Resolved `/predict` URL.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEndpoint`] for unusable URLs.
    pub fn predict_url(&self) -> Result<Url, ConfigError> {
        Ok(predict_endpoint(&self.endpoint_base)?)
    }

    /// Returns `true` when images would cross the network unencrypted, i.e.
    /// plain `http` to a host other than loopback.
    pub fn is_insecure_remote(&self) -> bool {
        let Ok(url) = self.predict_url() else {
            return false;
        };
        if url.scheme() == "https" {
            return false;
        }

        match url.host() {
            Some(Host::Domain(domain)) => !domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(address)) => !address.is_loopback(),
            Some(Host::Ipv6(address)) => !address.is_loopback(),
            None => false,
        }
    }
}

fn parse_timeout_secs(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| ConfigError::InvalidTimeout(format!("'{raw}': {error}")))
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Timeout is not a positive whole number of seconds.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Endpoint URL is unusable.
    #[error(transparent)]
    InvalidEndpoint(#[from] UploadError),
}
