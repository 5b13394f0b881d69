//! Configuration loading for the adhound CLI.
//!
//! Values layer in order: hardcoded defaults, then an optional YAML file,
//! then `ADHOUND_` environment variables with `__` as the nested key
//! separator. `ADHOUND_NEO4J__PASSWORD=...` overrides `neo4j.password`,
//! `ADHOUND_BACKEND__EDITION=ce` overrides `backend.edition`.

use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use adhound_store::{CeConfig, Neo4jConfig};

/// CLI configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CliConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub ce: CeSettings,
}

/// Which backend edition to talk to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendSettings {
    /// `legacy` (Neo4j) or `ce` (BloodHound CE API).
    #[serde(default = "default_edition")]
    pub edition: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            edition: default_edition(),
        }
    }
}

fn default_edition() -> String {
    "legacy".to_string()
}

/// Legacy Neo4j connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Neo4jSettings {
    #[serde(default = "default_neo4j_uri")]
    pub uri: String,

    #[serde(default = "default_neo4j_database")]
    pub database: String,

    #[serde(default = "default_neo4j_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_neo4j_uri(),
            database: default_neo4j_database(),
            username: default_neo4j_username(),
            password: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_neo4j_uri() -> String {
    "http://localhost:7474".to_string()
}

fn default_neo4j_database() -> String {
    "neo4j".to_string()
}

fn default_neo4j_username() -> String {
    "neo4j".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// BloodHound CE API connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CeSettings {
    #[serde(default = "default_ce_url")]
    pub url: String,

    #[serde(default = "default_ce_username")]
    pub username: String,

    #[serde(default)]
    pub secret: String,

    /// Pre-provisioned API token; when set, no login call is made.
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for CeSettings {
    fn default() -> Self {
        Self {
            url: default_ce_url(),
            username: default_ce_username(),
            secret: String::new(),
            api_token: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_ce_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_ce_username() -> String {
    "admin".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl CliConfig {
    /// Load configuration from a YAML file with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&CliConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(
                Environment::with_prefix("ADHOUND")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let cli_config: CliConfig = config.try_deserialize()?;
        cli_config.validate()?;
        Ok(cli_config)
    }

    /// Load configuration from defaults and environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&CliConfig::default())?)
            .add_source(
                Environment::with_prefix("ADHOUND")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let cli_config: CliConfig = config.try_deserialize()?;
        cli_config.validate()?;
        Ok(cli_config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_editions = ["legacy", "ce"];
        if !valid_editions.contains(&self.backend.edition.as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "backend.edition must be one of: {:?}, got: {}",
                    valid_editions, self.backend.edition
                ),
            });
        }
        if self.neo4j.timeout_secs == 0 || self.ce.timeout_secs == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn neo4j_config(&self) -> Neo4jConfig {
        Neo4jConfig {
            uri: self.neo4j.uri.clone(),
            database: self.neo4j.database.clone(),
            username: self.neo4j.username.clone(),
            password: self.neo4j.password.clone(),
            timeout_secs: self.neo4j.timeout_secs,
        }
    }

    pub fn ce_config(&self) -> CeConfig {
        CeConfig {
            url: self.ce.url.clone(),
            username: self.ce.username.clone(),
            secret: self.ce.secret.clone(),
            api_token: self.ce.api_token.clone(),
            timeout_secs: self.ce.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend:
  edition: ce

ce:
  url: "http://bloodhound.local:8080"
  username: operator
  secret: hunter2

neo4j:
  timeout_secs: 10
"#
        )
        .unwrap();

        let config = CliConfig::load(file.path()).unwrap();

        assert_eq!(config.backend.edition, "ce");
        assert_eq!(config.ce.url, "http://bloodhound.local:8080");
        assert_eq!(config.ce.username, "operator");
        assert_eq!(config.ce.secret, "hunter2");
        assert_eq!(config.neo4j.timeout_secs, 10);
        // Untouched values keep their defaults.
        assert_eq!(config.neo4j.uri, "http://localhost:7474");
    }

    #[test]
    #[serial]
    fn env_vars_override_file_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
neo4j:
  uri: "http://db01:7474"
  password: "from-file"
"#
        )
        .unwrap();

        std::env::set_var("ADHOUND_NEO4J__PASSWORD", "from-env");
        std::env::set_var("ADHOUND_BACKEND__EDITION", "ce");

        let config = CliConfig::load(file.path());

        std::env::remove_var("ADHOUND_NEO4J__PASSWORD");
        std::env::remove_var("ADHOUND_BACKEND__EDITION");

        let config = config.unwrap();
        assert_eq!(config.neo4j.password, "from-env");
        assert_eq!(config.backend.edition, "ce");
        assert_eq!(config.neo4j.uri, "http://db01:7474");
    }

    #[test]
    #[serial]
    fn missing_file_is_reported() {
        let err = CliConfig::load("/nonexistent/adhound.yaml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
    }

    #[test]
    fn validation_rejects_unknown_edition() {
        let mut config = CliConfig::default();
        config.backend.edition = "enterprise".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backend.edition"));
    }

    #[test]
    fn validation_rejects_zero_timeout() {
        let mut config = CliConfig::default();
        config.neo4j.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
