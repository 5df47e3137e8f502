//! Configuration module
//!
//! Per-deployment settings are read from the environment once at process start
//! and treated as immutable for the lifetime of the process. Endpoint URLs and
//! the client identifier default to the constants in [`crate::constants`].

use std::env;
use std::fmt;
use std::time::Duration;

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_CLIENT_ID, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_MAX_CONCURRENT_UPLOADS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TOKEN_SAFETY_MARGIN_SECS, DEFAULT_TOKEN_URL,
};

/// Dealer-management API configuration
#[derive(Clone)]
pub struct DealerConfig {
    pub api_base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub company_id: String,
    pub dealer_id: Option<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub token_safety_margin: Duration,
    pub max_concurrent_uploads: usize,
}

impl DealerConfig {
    /// Config with default endpoints and timeouts for the given account.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        company_id: impl Into<String>,
    ) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            username: username.into(),
            password: password.into(),
            company_id: company_id.into(),
            dealer_id: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            token_safety_margin: Duration::from_secs(DEFAULT_TOKEN_SAFETY_MARGIN_SECS),
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let username = required("DEALER_USERNAME")?;
        let password = required("DEALER_PASSWORD")?;
        let company_id = required("DEALER_COMPANY_ID")?;

        let mut config = Self::new(username, password, company_id);

        if let Ok(url) = env::var("DEALER_API_URL") {
            config.api_base_url = url;
        }
        if let Ok(url) = env::var("DEALER_TOKEN_URL") {
            config.token_url = url;
        }
        if let Ok(client_id) = env::var("DEALER_CLIENT_ID") {
            config.client_id = client_id;
        }
        config.dealer_id = env::var("DEALER_DEALER_ID")
            .ok()
            .filter(|s| !s.trim().is_empty());

        config.request_timeout = Duration::from_secs(parse_or(
            "DEALER_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        config.connect_timeout = Duration::from_secs(parse_or(
            "DEALER_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?);
        config.token_safety_margin = Duration::from_secs(parse_or(
            "DEALER_TOKEN_SAFETY_MARGIN_SECS",
            DEFAULT_TOKEN_SAFETY_MARGIN_SECS,
        )?);
        config.max_concurrent_uploads = parse_or(
            "DEALER_MAX_CONCURRENT_UPLOADS",
            DEFAULT_MAX_CONCURRENT_UPLOADS,
        )?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(anyhow::anyhow!(
                "DEALER_USERNAME and DEALER_PASSWORD must not be empty"
            ));
        }

        if self.company_id.trim().is_empty() {
            return Err(anyhow::anyhow!("DEALER_COMPANY_ID must not be empty"));
        }

        for (name, url) in [
            ("DEALER_API_URL", &self.api_base_url),
            ("DEALER_TOKEN_URL", &self.token_url),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(anyhow::anyhow!("{} must be an http(s) URL, got {}", name, url));
            }
        }

        if self.max_concurrent_uploads == 0 {
            return Err(anyhow::anyhow!(
                "DEALER_MAX_CONCURRENT_UPLOADS must be at least 1"
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for DealerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DealerConfig")
            .field("api_base_url", &self.api_base_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("company_id", &self.company_id)
            .field("dealer_id", &self.dealer_id)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("token_safety_margin", &self.token_safety_margin)
            .field("max_concurrent_uploads", &self.max_concurrent_uploads)
            .finish()
    }
}

fn required(name: &str) -> Result<String, anyhow::Error> {
    env::var(name).map_err(|_| anyhow::anyhow!("{} must be set", name))
}

fn parse_or<T>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_endpoints() {
        let config = DealerConfig::new("user", "pass", "company-1");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(config.max_concurrent_uploads, DEFAULT_MAX_CONCURRENT_UPLOADS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_credentials() {
        let config = DealerConfig::new("", "pass", "company-1");
        assert!(config.validate().is_err());

        let config = DealerConfig::new("user", "", "company-1");
        assert!(config.validate().is_err());

        let config = DealerConfig::new("user", "pass", " ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_urls() {
        let mut config = DealerConfig::new("user", "pass", "company-1");
        config.token_url = "ftp://auth.example.com/token".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DEALER_TOKEN_URL"));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = DealerConfig::new("user", "pass", "company-1");
        config.max_concurrent_uploads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let config = DealerConfig::new("user", "hunter2", "company-1");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
