use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            log_level: Some("warn".to_string()),
        }
    }
}

/// Where the archive database is looked up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Explicit database file. Environment overrides take precedence.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Directory scanned for the newest `*.db` file when no override applies.
    #[serde(default)]
    pub fallback_dir: Option<PathBuf>,
}

impl DatabaseConfig {
    /// `db/` next to the running executable, or `./db` when the executable
    /// path is unavailable. Resolved at run time so an installed binary
    /// never points into the tree it was built from.
    pub fn default_fallback_dir() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("db")))
            .unwrap_or_else(|| PathBuf::from("db"))
    }

    pub fn fallback_dir(&self) -> PathBuf {
        self.fallback_dir
            .clone()
            .unwrap_or_else(Self::default_fallback_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fallback_dir_sits_next_to_executable() {
        let exe = std::env::current_exe().unwrap();
        let dir = DatabaseConfig::default_fallback_dir();

        assert_eq!(dir.file_name().unwrap(), "db");
        assert_eq!(dir.parent(), exe.parent());
        assert!(!dir.starts_with(env!("CARGO_MANIFEST_DIR")));
    }

    #[test]
    fn configured_fallback_dir_wins() {
        let config = DatabaseConfig {
            path: None,
            fallback_dir: Some(PathBuf::from("/srv/exports")),
        };
        assert_eq!(config.fallback_dir(), PathBuf::from("/srv/exports"));
    }
}
