use std::path::{Path, PathBuf};

use convsearch_common::{Error, Result};
use tracing::info;

use crate::model::AppConfig;

pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_dir: Self::default_config_dir(),
        }
    }

    pub fn default_config_dir() -> PathBuf {
        let xdg_config = dirs::config_dir().map(|c| c.join("convsearch"));
        let home_config = dirs::home_dir().map(|h| h.join(".convsearch"));

        match (xdg_config, home_config) {
            (Some(xdg), Some(home)) => {
                if !xdg.exists() && home.exists() {
                    home
                } else {
                    xdg
                }
            }
            (Some(xdg), None) => xdg,
            (None, Some(home)) => home,
            (None, None) => PathBuf::from(".convsearch"),
        }
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Loads `config.yml`, else `config.toml`, else defaults. The directory is
    /// never created; a missing config dir is not an error.
    pub fn load(&self) -> Result<AppConfig> {
        let yaml_path = self.config_dir.join("config.yml");
        let toml_path = self.config_dir.join("config.toml");

        if yaml_path.exists() {
            info!("loading config from {}", yaml_path.display());
            let contents = std::fs::read_to_string(&yaml_path)?;
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse YAML config: {e}")))
        } else if toml_path.exists() {
            info!("loading config from {}", toml_path.display());
            let contents = std::fs::read_to_string(&toml_path)?;
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse TOML config: {e}")))
        } else {
            info!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigLoader;
    use crate::model::DatabaseConfig;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn load_returns_default_when_no_config_exists() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        let config = ConfigLoader::with_dir(dir.path())
            .load()
            .expect("load should succeed");

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert!(config.database.path.is_none());
        assert_eq!(
            config.database.fallback_dir(),
            DatabaseConfig::default_fallback_dir()
        );
    }

    #[test]
    fn load_does_not_require_existing_dir() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let missing = dir.path().join("nope");

        let config = ConfigLoader::with_dir(&missing)
            .load()
            .expect("load should succeed");

        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert!(!missing.exists());
    }

    #[test]
    fn load_prefers_yaml_over_toml_when_both_exist() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        fs::write(
            dir.path().join("config.yml"),
            "database:\n  path: /archive/export.db\nserver:\n  port: 9100\n",
        )
        .expect("failed to write yaml config");
        fs::write(
            dir.path().join("config.toml"),
            "[server]\nport = 9999\n",
        )
        .expect("failed to write toml config");

        let config = ConfigLoader::with_dir(dir.path())
            .load()
            .expect("load should succeed");

        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/archive/export.db"))
        );
    }

    #[test]
    fn load_reads_toml_when_yaml_missing() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        fs::write(
            dir.path().join("config.toml"),
            "[database]\nfallback_dir = \"/srv/exports\"\n\n[server]\nhost = \"0.0.0.0\"\n",
        )
        .expect("failed to write toml config");

        let config = ConfigLoader::with_dir(dir.path())
            .load()
            .expect("load should succeed");

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(
            config.database.fallback_dir(),
            PathBuf::from("/srv/exports")
        );
    }

    #[test]
    fn load_reports_malformed_yaml() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        fs::write(dir.path().join("config.yml"), "server: [unclosed\n")
            .expect("failed to write yaml config");

        let err = ConfigLoader::with_dir(dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("failed to parse YAML config"));
    }
}
