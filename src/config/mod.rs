#[cfg(feature = "cli")]
pub mod cli;

use crate::utils::error::{Result, SapperError};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_required_field, validate_unique, Validate,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";
pub const HOME_ENV: &str = "SAPPER_HOME";
pub const DEFAULT_REMOTE: &str = "default";

/// A brick catalog on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SapperConfig {
    #[serde(skip)]
    pub config_dir: PathBuf,
    #[serde(default)]
    pub remotes: Vec<Remote>,
}

impl SapperConfig {
    /// `$SAPPER_HOME` if set, otherwise `~/.sapper`.
    pub fn default_config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let home = dirs::home_dir();
        let home = validate_required_field("home directory", &home)?;
        Ok(home.join(".sapper"))
    }

    /// A config with the single default remote below `config_dir`.
    pub fn with_default_remote(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            remotes: vec![Remote {
                name: DEFAULT_REMOTE.to_string(),
                path: config_dir.join("remotes").join(DEFAULT_REMOTE),
            }],
        }
    }

    pub fn from_toml_str(content: &str, config_dir: &Path) -> Result<Self> {
        let mut config: SapperConfig = toml::from_str(content)?;
        config.config_dir = config_dir.to_path_buf();
        Ok(config)
    }

    /// Reads `<config_dir>/config.toml`. A missing file is replaced by the default config,
    /// which is written to disk together with the default remote's directory.
    pub fn load_or_init(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config = Self::from_toml_str(&content, config_dir)?;
            tracing::debug!("Loaded configuration from {}", path.display());
            return Ok(config);
        }

        let config = Self::with_default_remote(config_dir);
        for remote in &config.remotes {
            fs::create_dir_all(&remote.path)?;
        }
        config.save()?;
        tracing::info!("Created default configuration at {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        let content = toml::to_string_pretty(self)?;
        fs::write(self.config_dir.join(CONFIG_FILE), content)?;
        Ok(())
    }

    pub fn remote(&self, name: &str) -> Option<&Remote> {
        self.remotes.iter().find(|r| r.name == name)
    }
}

impl Validate for SapperConfig {
    fn validate(&self) -> Result<()> {
        if self.remotes.is_empty() {
            return Err(SapperError::ConfigError {
                message: "no remotes configured".to_string(),
            });
        }
        for remote in &self.remotes {
            validate_non_empty_string("remotes.name", &remote.name)?;
            validate_path("remotes.path", &remote.path.to_string_lossy())?;
        }
        validate_unique("remotes.name", self.remotes.iter().map(|r| r.name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_or_init_writes_default() {
        let dir = TempDir::new().unwrap();
        let config = SapperConfig::load_or_init(dir.path()).unwrap();

        assert_eq!(config.remotes.len(), 1);
        assert_eq!(config.remotes[0].name, DEFAULT_REMOTE);
        assert!(config.remotes[0].path.is_dir());
        assert!(dir.path().join(CONFIG_FILE).exists());
        assert!(config.validate().is_ok());

        let reloaded = SapperConfig::load_or_init(dir.path()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_parse_remotes() {
        let content = r#"
[[remotes]]
name = "company"
path = "/opt/bricks"

[[remotes]]
name = "local"
path = "/home/me/bricks"
"#;
        let config = SapperConfig::from_toml_str(content, Path::new("/cfg")).unwrap();
        assert_eq!(config.remotes.len(), 2);
        assert_eq!(config.remote("local").unwrap().path, PathBuf::from("/home/me/bricks"));
        assert_eq!(config.config_dir, PathBuf::from("/cfg"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(SapperConfig::from_toml_str("remotes = 3", Path::new("/cfg")).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_and_empty_remotes() {
        let mut config = SapperConfig::with_default_remote(Path::new("/cfg"));
        config.remotes.push(config.remotes[0].clone());
        assert!(config.validate().is_err());

        config.remotes.clear();
        assert!(config.validate().is_err());

        config.remotes.push(Remote {
            name: " ".to_string(),
            path: PathBuf::from("/x"),
        });
        assert!(config.validate().is_err());
    }
}
