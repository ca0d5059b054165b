use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::client::http::ServiceTimeouts;

/// CLI configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Connection settings for the configuration service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token, either literal or "$VAR" to read an environment
    /// variable at startup
    pub token: Option<String>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeouts: TimeoutConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8999".to_string()
}

/// Timeout configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_api_timeout")]
    pub api_timeout_ms: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            api_timeout_ms: default_api_timeout(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

fn default_api_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_connect_timeout() -> u64 {
    10_000 // 10 seconds
}

impl TimeoutConfig {
    pub fn as_service_timeouts(&self) -> ServiceTimeouts {
        ServiceTimeouts {
            api: std::time::Duration::from_millis(self.api_timeout_ms),
            connect: std::time::Duration::from_millis(self.connect_timeout_ms),
        }
    }
}

impl CliConfig {
    /// Get default config file path
    /// Returns ~/.modelconf/config.toml (cross-platform)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        let config_dir = home.join(".modelconf");
        std::fs::create_dir_all(&config_dir).with_context(|| {
            format!("Failed to create config directory: {}", config_dir.display())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        // Check if file exists, if not create a default one
        if !path.exists() {
            Self::create_default_config(path)?;
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Resolve environment variables
        config.resolve_env_vars()?;

        Ok(config)
    }

    /// Create a default configuration file
    fn create_default_config(path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

        eprintln!("Created default config file at: {}", path.display());
        eprintln!("Edit it to point base_url at your configuration service.");

        Ok(())
    }

    /// Generate default configuration content as TOML string
    fn default_config_content() -> String {
        r#"# modelconf configuration
#
# The CLI talks to a configuration service over HTTP. Point base_url at it,
# and optionally set a bearer token. A token starting with "$" is read from
# that environment variable at startup.

[service]
base_url = "http://127.0.0.1:8999"

# Optional: bearer token for the service
# token = "$MODELCONF_TOKEN"

[service.timeouts]
api_timeout_ms = 30000       # 30 seconds
connect_timeout_ms = 10000   # 10 seconds
"#
        .to_string()
    }

    /// Resolve environment variables in configuration
    fn resolve_env_vars(&mut self) -> Result<()> {
        if let Some(ref token) = self.service.token {
            if let Some(env_var) = token.strip_prefix('$') {
                let value = std::env::var(env_var).with_context(|| {
                    format!("Environment variable {env_var} not found for service token")
                })?;
                self.service.token = Some(value);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_toml_config() {
        let config_content = r#"
[service]
base_url = "http://config.internal:9000"
token = "literal-token"

[service.timeouts]
api_timeout_ms = 5000
connect_timeout_ms = 1000
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = CliConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.service.base_url, "http://config.internal:9000");
        assert_eq!(config.service.token.as_deref(), Some("literal-token"));
        assert_eq!(config.service.timeouts.api_timeout_ms, 5000);
        assert_eq!(
            config.service.timeouts.as_service_timeouts().connect,
            std::time::Duration::from_millis(1000)
        );
    }

    #[test]
    fn empty_config_falls_back_to_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"").unwrap();

        let config = CliConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.service.base_url, "http://127.0.0.1:8999");
        assert_eq!(config.service.token, None);
        assert_eq!(config.service.timeouts.api_timeout_ms, 30_000);
    }

    #[test]
    fn missing_file_creates_a_parseable_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = CliConfig::from_file(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.service.base_url, "http://127.0.0.1:8999");
    }

    #[test]
    fn token_env_var_is_resolved() {
        std::env::set_var("MODELCONF_TEST_TOKEN_RESOLVE", "from-env");
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[service]\ntoken = \"$MODELCONF_TEST_TOKEN_RESOLVE\"\n")
            .unwrap();

        let config = CliConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.service.token.as_deref(), Some("from-env"));
    }

    #[test]
    fn missing_token_env_var_is_an_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[service]\ntoken = \"$MODELCONF_TEST_TOKEN_UNSET\"\n")
            .unwrap();

        let err = CliConfig::from_file(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("MODELCONF_TEST_TOKEN_UNSET"));
    }
}
