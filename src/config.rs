//! Configuration file support.
//!
//! An optional TOML file supplies connection settings and the table
//! defaults used when a CREATE TABLE omits its engine or charset:
//!
//! ```toml
//! [connection]
//! user = "app"
//! host = "db.internal"
//! port = 3306
//!
//! [defaults]
//! engine = "InnoDB"
//! charset = "utf8mb4"
//! ```
//!
//! Command-line flags override whatever the file says.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{DefError, DefResult};
use crate::schema::TableDefaults;

/// Everything the configuration file can hold.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub defaults: TableDefaults,
}

/// How to reach the server. The database name always comes from the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    /// Unix socket; takes precedence over host and port.
    pub socket: Option<PathBuf>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            password: None,
            host: "127.0.0.1".to_string(),
            port: 3306,
            socket: None,
        }
    }
}

impl Config {
    /// `~/.config/mysqldef/config.toml` (or the platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mysqldef").join("config.toml"))
    }

    /// Load `path` if given (it must exist), else the default file if it
    /// exists, else built-in defaults.
    pub fn load(path: Option<&Path>) -> DefResult<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::load_from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn load_from_file(path: &Path) -> DefResult<Self> {
        debug!(path = %path.display(), "loading config");
        let content = fs::read_to_string(path)
            .map_err(|e| DefError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content).map_err(|e| match e {
            DefError::Config(message) => DefError::Config(format!("{}: {}", path.display(), message)),
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> DefResult<Self> {
        toml::from_str(content).map_err(|e| DefError::Config(e.message().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
[connection]
host = "db.internal"
port = 3307

[defaults]
charset = "utf8mb4"
"#,
        )
        .unwrap();
        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.port, 3307);
        assert_eq!(config.connection.user, "root");
        assert_eq!(config.defaults.engine, "InnoDB");
        assert_eq!(config.defaults.charset, "utf8mb4");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Config::from_toml("[connection]\nhots = \"x\"\n").unwrap_err();
        assert!(matches!(err, DefError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/mysqldef.toml"))).unwrap_err();
        assert!(err.to_string().starts_with("Configuration error: /nonexistent/mysqldef.toml"));
    }
}
