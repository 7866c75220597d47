use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign bearer tokens. Required; the process refuses to
    /// start without one. The `JWT_SECRET` environment variable overrides
    /// the file value.
    #[serde(default)]
    pub jwt_secret: String,
    /// Token validity window in days
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
    /// Optional bootstrap admin account, created (or promoted) at startup
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_days: default_token_ttl_days(),
            admin_email: None,
            admin_password: None,
            admin_name: None,
        }
    }
}

fn default_token_ttl_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse configuration file")?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }

        config.validate()?;
        Ok(config)
    }

    /// Fail fast on configuration the service cannot run without.
    fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            bail!("No signing secret configured: set [auth] jwt_secret or the JWT_SECRET environment variable");
        }
        if self.auth.token_ttl_days <= 0 {
            bail!("[auth] token_ttl_days must be positive");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret() -> Config {
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = with_secret();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_days, 7);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_secret_rejected() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_whitespace_secret_rejected() {
        let mut config = Config::default();
        config.auth.jwt_secret = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nonpositive_ttl_rejected() {
        let mut config = with_secret();
        config.auth.token_ttl_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9090

            [auth]
            jwt_secret = "s3cret"
            token_ttl_days = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.token_ttl_days, 1);
        assert!(config.validate().is_ok());
    }
}
