//! Module descriptors and the read-only contract for accessing them.
//!
//! Descriptors are parsed from `module.toml` files, one per module directory.
//! The engine never touches the filesystem itself; it goes through a
//! [`DescriptorSource`], of which [`fs::FsSource`] and [`memory::MemorySource`]
//! are the two implementations.

use std::{collections::BTreeMap, fmt, path::Path};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::{error::SourceError, target::Target};

pub mod fs;
pub mod memory;

pub const MODULE_DESCRIPTOR_FILE: &str = "module.toml";

/// The data-access contract between the resolution engine and whatever
/// stores module descriptors.
pub trait DescriptorSource: fmt::Debug {
    /// Loads the descriptor of the module at `location`.
    fn descriptor(
        &self,
        location: &Path,
    ) -> Result<ModuleDescriptor, SourceError>;

    /// Returns the locations of the first-level child modules of `location`,
    /// sorted by name.
    fn children(&self, location: &Path) -> Result<Vec<Box<Path>>, SourceError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleDescriptor {
    pub module: ModuleSection,
    pub packages: PackagesSection,
    pub dependencies: DependenciesSection,
    pub services: ServicesSection,
    pub libraries: Vec<LibraryDescriptor>,
}

impl ModuleDescriptor {
    pub fn from_toml(source: &str) -> Result<Self, SourceError> {
        Ok(toml::from_str(source)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ModuleSection {
    /// Overrides the name derived from the module's location.
    pub name: Option<Box<str>>,
    /// The build parent, when it differs from the filesystem parent.
    pub parent: Option<Box<str>>,
    pub group: Option<Box<str>>,
    pub artifact: Option<Box<str>>,
    pub version: Option<Version>,
    #[serde(rename = "type")]
    pub kind: Option<Box<str>>,
    pub executable: bool,
    pub interface: bool,
    /// Lets an interface module stand in as its own implementation.
    pub default_implementation: bool,
    pub implements: Vec<Box<str>>,
    pub emulation: bool,
    pub deprecated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesSection {
    pub declared: Vec<Box<str>>,
    pub exported: Vec<Box<str>>,
    pub used: Vec<Box<str>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependenciesSection {
    pub source: Vec<DependencyDecl>,
    pub resource: Vec<DependencyDecl>,
    pub plugin: Vec<DependencyDecl>,
}

/// A dependency as written in a descriptor: either a bare module name, or a
/// table with extra flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyDecl {
    Name(Box<str>),
    Detailed(DetailedDependency),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DetailedDependency {
    pub name: Box<str>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default = "default_true")]
    pub transitive: bool,
    #[serde(default)]
    pub scope: Option<Box<str>>,
    #[serde(default)]
    pub classifier: Option<Box<str>>,
    /// Restricts the dependency to executables built for these targets.
    #[serde(default)]
    pub executable_targets: Vec<Target>,
}

fn default_true() -> bool {
    true
}

impl DependencyDecl {
    pub fn into_detailed(self) -> DetailedDependency {
        match self {
            DependencyDecl::Name(name) => DetailedDependency {
                name,
                optional: false,
                transitive: true,
                scope: None,
                classifier: None,
                executable_targets: Vec::new(),
            },
            DependencyDecl::Detailed(detailed) => detailed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesSection {
    /// Services this module cannot work without.
    pub required: Vec<Box<str>>,
    /// Services this module uses if any provider is available.
    pub optional: Vec<Box<str>>,
    /// Provided services, mapped to their implementing classes.
    pub provides: BTreeMap<Box<str>, Vec<Box<str>>>,
}

/// A third-party library, either declared by a module or configured
/// globally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryDescriptor {
    pub name: Box<str>,
    pub group: Option<Box<str>>,
    pub artifact: Option<Box<str>>,
    pub version: Option<Version>,
    pub packages: Vec<Box<str>>,
    /// The names of the libraries this library depends on.
    pub requires: Vec<Box<str>>,
}
