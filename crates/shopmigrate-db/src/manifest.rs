use std::path::Path;

use serde::{Deserialize, Serialize};
use shopmigrate_common::{Error, Result};
use tracing::info;

use crate::migrations::MigrationUnit;

/// A file of declaratively described units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub units: Vec<MigrationUnit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Toml,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
            "yml" | "yaml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            other => Err(Error::Manifest(format!(
                "unsupported manifest extension '{other}' for {}",
                path.display()
            ))),
        }
    }
}

impl Manifest {
    pub fn parse(contents: &str, format: ManifestFormat) -> Result<Self> {
        match format {
            ManifestFormat::Yaml => serde_yaml::from_str(contents)
                .map_err(|e| Error::Manifest(format!("YAML parse error: {e}"))),
            ManifestFormat::Toml => toml::from_str(contents)
                .map_err(|e| Error::Manifest(format!("TOML parse error: {e}"))),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let format = ManifestFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Manifest(format!("failed to read {}: {e}", path.display()))
        })?;
        let manifest = Self::parse(&contents, format)
            .map_err(|e| Error::Manifest(format!("{}: {e}", path.display())))?;

        info!(
            "loaded {} unit(s) from {}",
            manifest.units.len(),
            path.display()
        );
        Ok(manifest)
    }
}
