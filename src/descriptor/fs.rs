//! Descriptor access backed by the filesystem.

use std::{fs, path::Path};

use crate::error::SourceError;

use super::{DescriptorSource, MODULE_DESCRIPTOR_FILE, ModuleDescriptor};

/// Reads `module.toml` files from module directories.
///
/// A child module is any immediate subdirectory that contains its own
/// `module.toml`; directories without one are skipped, not descended into.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl DescriptorSource for FsSource {
    fn descriptor(
        &self,
        location: &Path,
    ) -> Result<ModuleDescriptor, SourceError> {
        let path = location.join(MODULE_DESCRIPTOR_FILE);

        if !path.is_file() {
            return Err(SourceError::MissingDescriptor(location.into()));
        }

        let contents =
            fs::read_to_string(&path).map_err(|source| SourceError::Io {
                path: path.clone().into_boxed_path(),
                source,
            })?;

        ModuleDescriptor::from_toml(&contents)
    }

    fn children(&self, location: &Path) -> Result<Vec<Box<Path>>, SourceError> {
        let io_error = |source| SourceError::Io {
            path: location.into(),
            source,
        };

        let mut children = Vec::new();

        for entry in fs::read_dir(location).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;

            if entry.file_type().map_err(io_error)?.is_dir()
                && entry.path().join(MODULE_DESCRIPTOR_FILE).is_file()
            {
                children.push(entry.path().into_boxed_path());
            }
        }

        // discovery order must not depend on directory iteration order
        children.sort();
        Ok(children)
    }
}
