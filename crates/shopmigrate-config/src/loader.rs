use std::path::{Path, PathBuf};

use shopmigrate_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

const CONFIG_FILENAMES: &[&str] = &["config.yml", "config.yaml", "config.toml"];
const DEFAULT_DB_FILENAME: &str = "shopmigrate.db";

pub const ENV_DATABASE: &str = "SHOPMIGRATE_DATABASE";
pub const ENV_LOG: &str = "SHOPMIGRATE_LOG";

/// Locates and parses the configuration, then layers environment overrides on top.
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader rooted at the platform config dir (`~/.config/shopmigrate` on Linux).
    pub fn new() -> Self {
        Self {
            config_dir: default_config_dir(),
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

    /// Load the first config file found in the config dir, or defaults if there is none.
    pub fn load(&self) -> Result<AppConfig> {
        let found = CONFIG_FILENAMES
            .iter()
            .map(|name| self.config_dir.join(name))
            .find(|p| p.is_file());

        let mut config = match found {
            Some(path) => self.load_file(&path)?,
            None => {
                debug!(
                    "no config file in {}, using defaults",
                    self.config_dir.display()
                );
                AppConfig::default()
            }
        };

        apply_overrides(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse an explicit config file. Unlike [`load`](Self::load), a missing file is an error.
    pub fn load_file(&self, path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let mut config = parse_config(path, &contents)?;
        let base = path.parent().unwrap_or(Path::new("."));
        resolve_relative_paths(&mut config, base);

        info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// Database file the config points at, defaulting to `shopmigrate.db` in the config dir.
    pub fn database_path(&self, config: &AppConfig) -> PathBuf {
        match &config.database.path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => self.config_dir.join(p),
            None => self.config_dir.join(DEFAULT_DB_FILENAME),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shopmigrate")
}

fn parse_config(path: &Path, contents: &str) -> Result<AppConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yml" | "yaml" => serde_yaml::from_str(contents)
            .map_err(|e| Error::Config(format!("YAML parse error in {}: {e}", path.display()))),
        "toml" => toml::from_str(contents)
            .map_err(|e| Error::Config(format!("TOML parse error in {}: {e}", path.display()))),
        other => Err(Error::Config(format!(
            "unsupported config extension: {other}"
        ))),
    }
}

fn resolve_relative_paths(config: &mut AppConfig, base: &Path) {
    if let Some(p) = config.database.path.as_mut() {
        if p.is_relative() {
            *p = base.join(&*p);
        }
    }
    for manifest in &mut config.catalog.manifests {
        if manifest.is_relative() {
            *manifest = base.join(&*manifest);
        }
    }
}

/// Environment variables take precedence over anything read from disk.
pub fn apply_overrides(config: &mut AppConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(db) = get(ENV_DATABASE).filter(|v| !v.is_empty()) {
        debug!("database path overridden by {ENV_DATABASE}");
        config.database.path = Some(PathBuf::from(db));
    }
    if let Some(level) = get(ENV_LOG).filter(|v| !v.is_empty()) {
        config.log.level = level;
    }
}
