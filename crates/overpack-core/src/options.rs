use crate::CoreError;
use overpack_store::ArchiveFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What `Package::load_with` does when entries fail to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Any failure aborts the load, listing every failure.
    #[default]
    Strict,
    /// Failures are returned next to a partially loaded package.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    #[serde(default)]
    pub mode: LoadMode,
    /// Decode components on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            mode: LoadMode::Strict,
            parallel: true,
        }
    }
}

impl LoadOptions {
    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.mode = LoadMode::Lenient;
        self
    }

    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOptions {
    /// Container to write; `None` keeps the format the package was loaded from.
    #[serde(default)]
    pub format: Option<ArchiveFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Treat sibling blocks as an unordered set.
    #[serde(default)]
    pub ignore_block_order: bool,
}

/// All tunables, as stored in a TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverpackConfig {
    #[serde(default)]
    pub load: LoadOptions,
    #[serde(default)]
    pub save: SaveOptions,
    #[serde(default)]
    pub diff: DiffOptions,
}

impl OverpackConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CoreError::Config(format!("invalid config: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
