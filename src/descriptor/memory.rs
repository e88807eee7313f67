//! In-memory descriptor access, used for imported snapshots and fixtures.

use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;

use crate::error::SourceError;

use super::{DescriptorSource, ModuleDescriptor};

/// A set of descriptors keyed by location.
///
/// The children of a location are the stored locations whose parent is that
/// location, in path order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    modules: BTreeMap<Box<Path>, ModuleDescriptor>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    modules: Vec<SnapshotEntry>,
}

#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    location: Box<Path>,
    #[serde(flatten)]
    descriptor: ModuleDescriptor,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads an exported snapshot: a TOML document with one `[[modules]]`
    /// table per module, each carrying a `location` key next to the usual
    /// descriptor sections.
    pub fn from_snapshot(source: &str) -> Result<Self, SourceError> {
        let snapshot: Snapshot = toml::from_str(source)?;

        Ok(MemorySource {
            modules: snapshot
                .modules
                .into_iter()
                .map(|entry| (entry.location, entry.descriptor))
                .collect(),
        })
    }

    pub fn insert(
        &mut self,
        location: impl AsRef<Path>,
        descriptor: ModuleDescriptor,
    ) -> Option<ModuleDescriptor> {
        self.modules.insert(location.as_ref().into(), descriptor)
    }

    /// Parses `descriptor` and stores it at `location`.
    pub fn with_toml(
        mut self,
        location: impl AsRef<Path>,
        descriptor: &str,
    ) -> Result<Self, SourceError> {
        self.insert(location, ModuleDescriptor::from_toml(descriptor)?);
        Ok(self)
    }

    /// The stored locations whose parent isn't stored, in path order.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.modules
            .keys()
            .map(|location| &**location)
            .filter(|location| {
                location
                    .parent()
                    .is_none_or(|parent| !self.modules.contains_key(parent))
            })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl DescriptorSource for MemorySource {
    fn descriptor(
        &self,
        location: &Path,
    ) -> Result<ModuleDescriptor, SourceError> {
        self.modules
            .get(location)
            .cloned()
            .ok_or_else(|| SourceError::MissingDescriptor(location.into()))
    }

    fn children(&self, location: &Path) -> Result<Vec<Box<Path>>, SourceError> {
        if !self.modules.contains_key(location) {
            return Err(SourceError::UnknownLocation(location.into()));
        }

        Ok(self
            .modules
            .keys()
            .filter(|path| path.parent() == Some(location))
            .cloned()
            .collect())
    }
}
