use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// OAuth client secret JSON downloaded from the Google Cloud console
    pub google_credentials_file: PathBuf,

    /// Where the access/refresh token pair is cached between runs
    #[serde(default = "default_token_cache_file")]
    pub token_cache_file: PathBuf,

    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    #[serde(default = "default_calendar_api_base_url")]
    pub calendar_api_base_url: String,

    #[serde(default = "default_api_title")]
    pub api_title: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Loopback port for the OAuth redirect; 0 picks a free one
    #[serde(default)]
    pub oauth_redirect_port: u16,

    #[serde(default = "default_oauth_timeout_secs")]
    pub oauth_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub oauth_open_browser: bool,

    /// Comma-separated list; unset means permissive CORS
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

fn default_token_cache_file() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_calendar_api_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_api_title() -> String {
    "Google Meet Management API".to_string()
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8000
}

fn default_oauth_timeout_secs() -> u64 {
    300 // 5 minutes to finish the consent screen
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Keys are the lower-cased variable names, so `GOOGLE_CREDENTIALS_FILE`
    /// fills `google_credentials_file`.
    pub fn from_env() -> Result<Self> {
        Self::from_builder(
            Config::builder().add_source(Environment::default().try_parsing(true)),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("GOOGLE_CREDENTIALS_FILE must be set and all settings must be valid")
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn cors_origins(&self) -> Option<Vec<String>> {
        self.cors_allowed_origins.as_ref().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let builder = Config::builder()
            .set_override("google_credentials_file", "client_secret.json")
            .unwrap();
        let config = AppConfig::from_builder(builder).unwrap();

        assert_eq!(config.google_credentials_file, PathBuf::from("client_secret.json"));
        assert_eq!(config.token_cache_file, PathBuf::from("token.json"));
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.api_title, "Google Meet Management API");
        assert_eq!(config.api_version, "v1");
        assert_eq!(config.listen_addr(), "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.oauth_redirect_port, 0);
        assert!(config.oauth_open_browser);
        assert!(config.cors_origins().is_none());
    }

    #[test]
    fn test_missing_credentials_file_is_error() {
        let result = AppConfig::from_builder(Config::builder());
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_and_cors_list() {
        let builder = Config::builder()
            .set_override("google_credentials_file", "secret.json")
            .unwrap()
            .set_override("port", 9090)
            .unwrap()
            .set_override("cors_allowed_origins", "http://a.test, ,http://b.test")
            .unwrap();
        let config = AppConfig::from_builder(builder).unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(
            config.cors_origins().unwrap(),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
