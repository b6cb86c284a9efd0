//! Environment configuration.

use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::api::Session;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend base URL, without trailing slash.
    pub api_url: String,
    /// Bearer token for authenticated calls.
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load from the environment.
    ///
    /// - `INSTALLMENT_API_URL`: backend base URL (default: `http://localhost:5000/api`)
    /// - `INSTALLMENT_AUTH_TOKEN`: optional bearer token
    /// - `INSTALLMENT_HTTP_TIMEOUT`: request timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let api_url = try_load("INSTALLMENT_API_URL", DEFAULT_API_URL.to_string());
        let timeout_secs = try_load("INSTALLMENT_HTTP_TIMEOUT", DEFAULT_TIMEOUT_SECS);
        let auth_token = var("INSTALLMENT_AUTH_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Self::default()
            .with_api_url(api_url)
            .with_timeout(Duration::from_secs(timeout_secs))
            .with_auth_token(auth_token)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Absolute URL of an API endpoint.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// Absolute URL of a server-relative asset such as an uploaded image.
    pub fn asset_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let origin = self.api_url.strip_suffix("/api").unwrap_or(&self.api_url);
        format!("{}/{}", origin, path.trim_start_matches('/'))
    }

    pub fn session(&self) -> Session {
        Session::new(self.auth_token.clone())
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("{key} not set");
    })
}

fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
            default
        }),
        Err(()) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = Config::default().with_api_url("https://shop.example/api/");
        assert_eq!(config.api_url, "https://shop.example/api");
        assert_eq!(
            config.endpoint("/installment/calculate"),
            "https://shop.example/api/installment/calculate"
        );
    }

    #[test]
    fn asset_url_uses_server_origin() {
        let config = Config::default().with_api_url("https://shop.example/api");
        assert_eq!(
            config.asset_url("/uploads/id.jpg"),
            "https://shop.example/uploads/id.jpg"
        );
        assert_eq!(
            config.asset_url("https://cdn.example/x.png"),
            "https://cdn.example/x.png"
        );
    }

    #[test]
    fn session_carries_token() {
        let config = Config::default().with_auth_token(Some("abc".into()));
        assert_eq!(config.session().token(), Some("abc"));
        assert_eq!(Config::default().session().token(), None);
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
