//! Resolver configuration, read from `modweave.toml` at the workspace root.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    analysis::EmulationRule,
    catalogue::{CatalogueEntry, PlatformCatalogue},
    descriptor::{LibraryDescriptor, fs::FsSource, memory::MemorySource},
    error::SourceError,
    module::ModuleKind,
    registry::ModuleRegistry,
};

pub const CONFIG_FILE: &str = "modweave.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    pub logging: LoggingConfig,
    pub resolution: ResolutionConfig,
    pub roots: Vec<RootConfig>,
    pub libraries: Vec<LibraryDescriptor>,
    pub emulation: Vec<EmulationRule>,
    /// Replaces the built-in catalogue when non-empty.
    pub catalogue: Vec<CatalogueEntry>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            logging: LoggingConfig::default(),
            resolution: ResolutionConfig::default(),
            roots: Vec::new(),
            libraries: Vec::new(),
            emulation: EmulationRule::defaults(),
            catalogue: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolutionConfig {
    pub fail_on_cycles: bool,
}

/// An extra module tree, registered after the workspace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RootConfig {
    /// Relative paths are taken from the workspace root.
    pub path: PathBuf,
    #[serde(default)]
    pub kind: RootKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
    /// A directory tree of `module.toml` files.
    #[default]
    Library,
    /// A snapshot file listing modules and their locations.
    Snapshot,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl ResolverConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(&path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Loads `modweave.toml` from `workspace`, falling back to the defaults
    /// if there is none.
    pub fn load_or_default(workspace: &Path) -> Result<Self, ConfigError> {
        let path = workspace.join(CONFIG_FILE);

        match path.is_file() {
            true => Self::load(path),
            false => {
                debug!(
                    workspace = %workspace.display(),
                    "no config file, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn catalogue(&self) -> PlatformCatalogue {
        match self.catalogue.is_empty() {
            true => PlatformCatalogue::builtin(),
            false => PlatformCatalogue::new(self.catalogue.clone()),
        }
    }

    /// Creates a registry over the workspace at `workspace`, followed by the
    /// configured roots in order and the configured libraries.
    pub fn build_registry(
        &self,
        workspace: &Path,
    ) -> Result<ModuleRegistry, SourceError> {
        let mut registry = ModuleRegistry::new(&self.catalogue());
        registry.register_root(workspace, ModuleKind::Workspace, FsSource);

        for root in &self.roots {
            let path = workspace.join(&root.path);

            match root.kind {
                RootKind::Library => {
                    registry.register_root(path, ModuleKind::Library, FsSource)
                }
                RootKind::Snapshot => {
                    let contents = std::fs::read_to_string(&path).map_err(
                        |source| SourceError::Io {
                            path: path.clone().into_boxed_path(),
                            source,
                        },
                    )?;

                    let snapshot = MemorySource::from_snapshot(&contents)?;

                    for location in snapshot.roots() {
                        registry.register_root(
                            location,
                            ModuleKind::Snapshot,
                            snapshot.clone(),
                        );
                    }
                }
            }
        }

        for library in &self.libraries {
            registry.register_library(library);
        }

        Ok(registry)
    }
}
