use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub framework: FrameworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `driver:key=value;key=value,user,password`
    pub connection_string: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Directory holding one sub-directory per served host.
    pub webapps_dir: String,
    /// Application used when the request host has no directory of its own.
    pub default_app: String,
    /// First URL segment(s) routed to the API root instead of controllers.
    pub api_prefix: String,
    pub handler_extension: String,
    pub view_extension: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            max_connections: Some(20),
        }
    }
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            webapps_dir: "webapps".to_string(),
            default_app: "taosmi.es".to_string(),
            api_prefix: "api".to_string(),
            handler_extension: "rs".to_string(),
            view_extension: "html".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `config` file and
    /// `RUNRS_`-prefixed environment variables (nested keys split on `__`).
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        config = config.add_source(
            config::Environment::with_prefix("RUNRS")
                .prefix_separator("_")
                .separator("__"),
        );

        let app_config: AppConfig = config.build()?.try_deserialize()?;

        Ok(app_config)
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn connection_string(&self) -> Option<&str> {
        self.database
            .connection_string
            .as_deref()
            .filter(|spec| !spec.trim().is_empty())
    }

    pub fn webapps_dir(&self) -> PathBuf {
        PathBuf::from(&self.framework.webapps_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server_address(), "127.0.0.1:3001");
        assert_eq!(config.framework.api_prefix, "api");
        assert!(config.connection_string().is_none());
    }

    #[test]
    fn test_blank_connection_string_is_ignored() {
        let mut config = AppConfig::default();
        config.database.connection_string = Some("  ".to_string());
        assert!(config.connection_string().is_none());

        config.database.connection_string = Some("sqlite::memory:".to_string());
        assert_eq!(config.connection_string(), Some("sqlite::memory:"));
    }
}
