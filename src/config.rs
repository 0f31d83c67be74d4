use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "capstone.toml";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub panels: PanelDefaults,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://capstone.db".into(),
            max_connections: 5,
        }
    }
}

/// Values used when a request or department configuration leaves them unset.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct PanelDefaults {
    pub default_size: usize,
    pub default_max_projects: u32,
}

impl Default for PanelDefaults {
    fn default() -> Self {
        Self {
            default_size: 3,
            default_max_projects: 10,
        }
    }
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).wrap_err("cannot parse configuration file")
    }

    /// Load the configuration. A missing file is only an error when it was
    /// named explicitly.
    pub fn load(file_name: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match file_name {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        let mut config = if path.exists() || explicit {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("cannot load configuration file {}", path.display()))?;
            Self::parse(&text)?
        } else {
            tracing::info!(file = %path.display(), "no configuration file, using defaults");
            Self::default()
        };
        if let Ok(url) = std::env::var("CAPSTONE_DATABASE_URL") {
            config.database.url = url;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.panels.default_size, 3);
        assert_eq!(config.panels.default_max_projects, 10);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [server]
            port = 9000

            [panels]
            default_max_projects = 6
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.panels.default_size, 3);
        assert_eq!(config.panels.default_max_projects, 6);
    }

    #[test]
    fn test_explicit_missing_file() {
        assert!(Config::load(Some(Path::new("/nonexistent/capstone.toml"))).is_err());
    }
}
