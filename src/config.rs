//! TOML configuration.
//!
//! All commands read a single TOML file (`--config`, default
//! `./config/stuckmon.toml`). See `config/stuckmon.example.toml` for a full
//! example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that replaces `[db].uri` when set.
pub const MONGODB_URI_ENV: &str = "MONGODB_URI";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub uri: String,
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Passed through to the driver; `None` keeps the driver default.
    #[serde(default)]
    pub server_selection_timeout_secs: Option<u64>,
}

fn default_collection() -> String {
    "links".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_sample_limit")]
    pub sample_limit: i64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
        }
    }
}

fn default_sample_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Base URL of a running `stuckmon serve`. Derived from `server.bind` when absent.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            export_dir: default_export_dir(),
        }
    }
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Defaults good enough for commands that only talk to a running server.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "pipeline".to_string(),
                collection: default_collection(),
                server_selection_timeout_secs: None,
            },
            server: ServerConfig {
                bind: "127.0.0.1:7340".to_string(),
            },
            report: ReportConfig::default(),
            client: ClientConfig::default(),
        }
    }

    /// The URL clients use to reach the checks API.
    pub fn base_url(&self) -> String {
        match &self.client.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.server.bind),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if let Ok(uri) = std::env::var(MONGODB_URI_ENV) {
        if !uri.trim().is_empty() {
            config.db.uri = uri;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.uri.trim().is_empty() {
        anyhow::bail!("db.uri must not be empty");
    }
    if config.db.database.trim().is_empty() {
        anyhow::bail!("db.database must not be empty");
    }
    if config.db.collection.trim().is_empty() {
        anyhow::bail!("db.collection must not be empty");
    }
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }
    if !(1..=1000).contains(&config.report.sample_limit) {
        anyhow::bail!("report.sample_limit must be in [1, 1000]");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(
            r#"
[db]
uri = "mongodb://db:27017"
database = "pipeline"

[server]
bind = "0.0.0.0:8080"
"#,
        )
        .unwrap();
        assert_eq!(config.db.collection, "links");
        assert_eq!(config.report.sample_limit, 100);
        assert_eq!(config.client.export_dir, PathBuf::from("."));
        assert_eq!(config.base_url(), "http://0.0.0.0:8080");
    }

    #[test]
    fn test_explicit_base_url_trims_slash() {
        let config = parse(
            r#"
[db]
uri = "mongodb://db:27017"
database = "pipeline"

[server]
bind = "127.0.0.1:7340"

[client]
base_url = "https://checks.internal/"
"#,
        )
        .unwrap();
        assert_eq!(config.base_url(), "https://checks.internal");
    }

    #[test]
    fn test_sample_limit_out_of_range() {
        let err = parse(
            r#"
[db]
uri = "mongodb://db:27017"
database = "pipeline"

[server]
bind = "127.0.0.1:7340"

[report]
sample_limit = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sample_limit"));
    }

    #[test]
    fn test_empty_database_rejected() {
        let err = parse(
            r#"
[db]
uri = "mongodb://db:27017"
database = ""

[server]
bind = "127.0.0.1:7340"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("db.database"));
    }

    #[test]
    fn test_minimal_is_valid() {
        assert!(validate(&Config::minimal()).is_ok());
    }
}
