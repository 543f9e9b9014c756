use std::time::Duration;

use url::Url;

use crate::error::DashboardError;

pub const DEFAULT_USDA_API_URL: &str = "https://api.nal.usda.gov/fdc/v1";
pub const API_KEY_SIGNUP_URL: &str = "https://fdc.nal.usda.gov/api-key-signup.html";

#[derive(Debug, Clone)]
pub struct FoodConfig {
    pub usda_api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            usda_api_key: None,
            base_url: DEFAULT_USDA_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl FoodConfig {
    pub fn from_env() -> Result<Self, DashboardError> {
        let usda_api_key = std::env::var("USDA_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let base_url = std::env::var("USDA_API_URL")
            .unwrap_or_else(|_| DEFAULT_USDA_API_URL.to_string());
        let base_url = validate_base_url(&base_url)?;

        let timeout = std::env::var("USDA_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        Ok(Self {
            usda_api_key,
            base_url,
            timeout,
        })
    }

    /// The API key, or a configuration error pointing at the signup page.
    pub fn require_api_key(&self) -> Result<&str, DashboardError> {
        self.usda_api_key.as_deref().ok_or_else(|| {
            DashboardError::Config(format!(
                "USDA API key required. Get one at: {}. Pass it via --api-key or set USDA_API_KEY",
                API_KEY_SIGNUP_URL
            ))
        })
    }
}

/// Parses the base URL and strips any trailing slash so paths can be appended.
pub fn validate_base_url(raw: &str) -> Result<String, DashboardError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| DashboardError::Config(format!("Invalid USDA_API_URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url.as_str().trim_end_matches('/').to_string()),
        other => Err(DashboardError::Config(format!(
            "Unsupported URL scheme '{}' in USDA_API_URL",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_validate_base_url_strips_trailing_slash() {
        let url = validate_base_url("https://api.nal.usda.gov/fdc/v1/").unwrap();
        assert_eq!(url, "https://api.nal.usda.gov/fdc/v1");
    }

    #[test]
    fn test_validate_base_url_rejects_garbage() {
        assert!(validate_base_url("not a url").is_err());
        assert!(validate_base_url("ftp://example.com").is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_key_and_timeout() {
        std::env::set_var("USDA_API_KEY", " DEMO_KEY ");
        std::env::set_var("USDA_TIMEOUT_SECS", "5");
        std::env::remove_var("USDA_API_URL");

        let config = FoodConfig::from_env().unwrap();
        assert_eq!(config.usda_api_key.as_deref(), Some("DEMO_KEY"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.base_url, DEFAULT_USDA_API_URL);

        std::env::remove_var("USDA_API_KEY");
        std::env::remove_var("USDA_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_missing_key_is_config_error() {
        std::env::remove_var("USDA_API_KEY");
        let config = FoodConfig::from_env().unwrap();
        let err = config.require_api_key().unwrap_err();
        assert!(err.to_string().contains("USDA API key required"));
    }
}
