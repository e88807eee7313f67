//! Modules and their provenance.

use std::{fmt, path::Path};

use semver::Version;

use crate::{
    descriptor::{LibraryDescriptor, ModuleDescriptor},
    target::Target,
};

pub use dependency::{DependencyKind, ModuleDependency};

pub mod dependency;

/// An index into the module arena of a [`ModuleRegistry`].
///
/// [`ModuleRegistry`]: crate::registry::ModuleRegistry
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a module comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// A module of the developer's own workspace.
    Workspace,
    /// A module of a downloaded library source tree.
    Library,
    /// A module read from an imported snapshot.
    Snapshot,
    /// A third-party library known only by coordinates and packages.
    ThirdParty,
    /// A module provided by the platform itself.
    Platform,
}

/// Provenance-specific behaviour, looked up through [`ModuleKind`].
#[derive(Debug)]
pub struct Capabilities {
    pub label: &'static str,
    /// Authored in the developer's workspace, as opposed to resolved from
    /// elsewhere.
    pub workspace_authored: bool,
    /// Has a module tree whose children discovery should walk.
    pub reads_children: bool,
}

static WORKSPACE: Capabilities = Capabilities {
    label: "workspace",
    workspace_authored: true,
    reads_children: true,
};

static LIBRARY: Capabilities = Capabilities {
    label: "library",
    workspace_authored: false,
    reads_children: true,
};

static SNAPSHOT: Capabilities = Capabilities {
    label: "snapshot",
    workspace_authored: false,
    reads_children: true,
};

static THIRD_PARTY: Capabilities = Capabilities {
    label: "third-party",
    workspace_authored: false,
    reads_children: false,
};

static PLATFORM: Capabilities = Capabilities {
    label: "platform",
    workspace_authored: false,
    reads_children: false,
};

impl ModuleKind {
    pub fn capabilities(self) -> &'static Capabilities {
        match self {
            ModuleKind::Workspace => &WORKSPACE,
            ModuleKind::Library => &LIBRARY,
            ModuleKind::Snapshot => &SNAPSHOT,
            ModuleKind::ThirdParty => &THIRD_PARTY,
            ModuleKind::Platform => &PLATFORM,
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.capabilities().label)
    }
}

/// Maven-style coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coordinates {
    pub group: Option<Box<str>>,
    pub artifact: Option<Box<str>>,
    pub version: Option<Version>,
    pub kind: Option<Box<str>>,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = self.group.as_deref().unwrap_or("?");
        let artifact = self.artifact.as_deref().unwrap_or("?");
        write!(f, "{group}:{artifact}")?;

        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }

        Ok(())
    }
}

/// An entry in the module arena.
///
/// Modules are identified by name: two modules are equal if and only if their
/// names are.
#[derive(Debug, Clone)]
pub struct Module {
    pub(crate) id: ModuleId,
    pub(crate) name: Box<str>,
    pub(crate) kind: ModuleKind,
    pub(crate) target: Target,
    pub(crate) coordinates: Coordinates,
    pub(crate) body: ModuleBody,
}

#[derive(Debug, Clone)]
pub enum ModuleBody {
    Project(ProjectModule),
    Library(LibraryModule),
}

/// A module with a location in some module tree.
#[derive(Debug, Clone)]
pub struct ProjectModule {
    pub(crate) location: Box<Path>,
    /// The root module of the tree; equal to the module itself for roots.
    pub(crate) root: ModuleId,
    pub(crate) filesystem_parent: Option<ModuleId>,
    pub(crate) children: Vec<ModuleId>,
    pub(crate) descriptor: ModuleDescriptor,
}

/// A module known only through the packages it exports.
#[derive(Debug, Clone, Default)]
pub struct LibraryModule {
    pub(crate) packages: Box<[Box<str>]>,
    pub(crate) requires: Box<[Box<str>]>,
    /// The library whose import pulled this one in transitively.
    pub(crate) root_library: Option<ModuleId>,
}

impl Module {
    pub(crate) fn project(
        id: ModuleId,
        name: Box<str>,
        kind: ModuleKind,
        project: ProjectModule,
    ) -> Self {
        let section = &project.descriptor.module;
        let coordinates = Coordinates {
            group: section.group.clone(),
            artifact: section.artifact.clone().or_else(|| Some(name.clone())),
            version: section.version.clone(),
            kind: section.kind.clone(),
        };

        Module {
            id,
            target: Target::from_module_name(&name),
            name,
            kind,
            coordinates,
            body: ModuleBody::Project(project),
        }
    }

    pub(crate) fn library(
        id: ModuleId,
        kind: ModuleKind,
        descriptor: &LibraryDescriptor,
        root_library: Option<ModuleId>,
    ) -> Self {
        Module {
            id,
            name: descriptor.name.clone(),
            kind,
            target: Target::from_module_name(&descriptor.name),
            coordinates: Coordinates {
                group: descriptor.group.clone(),
                artifact: descriptor.artifact.clone(),
                version: descriptor.version.clone(),
                kind: None,
            },
            body: ModuleBody::Library(LibraryModule {
                packages: descriptor.packages.clone().into_boxed_slice(),
                requires: descriptor.requires.clone().into_boxed_slice(),
                root_library,
            }),
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    pub fn as_project(&self) -> Option<&ProjectModule> {
        match &self.body {
            ModuleBody::Project(project) => Some(project),
            ModuleBody::Library(_) => None,
        }
    }

    pub(crate) fn project_mut(&mut self) -> Option<&mut ProjectModule> {
        match &mut self.body {
            ModuleBody::Project(project) => Some(project),
            ModuleBody::Library(_) => None,
        }
    }

    pub fn as_library(&self) -> Option<&LibraryModule> {
        match &self.body {
            ModuleBody::Library(library) => Some(library),
            ModuleBody::Project(_) => None,
        }
    }

    pub fn descriptor(&self) -> Option<&ModuleDescriptor> {
        self.as_project().map(|project| &project.descriptor)
    }

    pub fn is_workspace_authored(&self) -> bool {
        self.kind.capabilities().workspace_authored
    }

    pub fn is_executable(&self) -> bool {
        self.descriptor().is_some_and(|d| d.module.executable)
    }

    pub fn is_interface(&self) -> bool {
        self.descriptor().is_some_and(|d| d.module.interface)
    }

    pub fn provides_default_implementation(&self) -> bool {
        self.descriptor().is_some_and(|d| {
            d.module.interface && d.module.default_implementation
        })
    }

    /// Whether this module emulates part of the base language runtime.
    pub fn is_emulation(&self) -> bool {
        self.descriptor().is_some_and(|d| d.module.emulation)
    }

    pub fn is_deprecated(&self) -> bool {
        self.descriptor().is_some_and(|d| d.module.deprecated)
    }

    /// The packages this module claims: declared and exported packages for
    /// project modules, exported packages for libraries.
    pub fn declared_packages(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match &self.body {
            ModuleBody::Project(project) => Box::new(
                project
                    .descriptor
                    .packages
                    .declared
                    .iter()
                    .chain(&project.descriptor.packages.exported)
                    .map(AsRef::as_ref),
            ),
            ModuleBody::Library(library) => {
                Box::new(library.packages.iter().map(AsRef::as_ref))
            }
        }
    }

    pub fn declares_package(&self, package: &str) -> bool {
        self.declared_packages().any(|p| p == package)
    }

    pub fn used_packages(&self) -> &[Box<str>] {
        self.descriptor()
            .map(|d| d.packages.used.as_slice())
            .unwrap_or_default()
    }

    pub fn uses_package(&self, package: &str) -> bool {
        self.used_packages().iter().any(|p| p.as_ref() == package)
    }

    pub fn required_services(&self) -> &[Box<str>] {
        self.descriptor()
            .map(|d| d.services.required.as_slice())
            .unwrap_or_default()
    }

    pub fn optional_services(&self) -> &[Box<str>] {
        self.descriptor()
            .map(|d| d.services.optional.as_slice())
            .unwrap_or_default()
    }

    /// The interface modules this module explicitly claims to implement.
    pub fn explicit_implementations(&self) -> &[Box<str>] {
        self.descriptor()
            .map(|d| d.module.implements.as_slice())
            .unwrap_or_default()
    }

    /// The name of the build parent declared in the descriptor, if any.
    pub fn declared_build_parent(&self) -> Option<&str> {
        self.descriptor().and_then(|d| d.module.parent.as_deref())
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Module {}

impl std::hash::Hash for Module {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl ProjectModule {
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn root(&self) -> ModuleId {
        self.root
    }

    pub fn filesystem_parent(&self) -> Option<ModuleId> {
        self.filesystem_parent
    }

    /// The first-level child modules, in discovery order.
    pub fn children(&self) -> &[ModuleId] {
        &self.children
    }
}

impl LibraryModule {
    pub fn packages(&self) -> &[Box<str>] {
        &self.packages
    }

    pub fn requires(&self) -> &[Box<str>] {
        &self.requires
    }

    pub fn root_library(&self) -> Option<ModuleId> {
        self.root_library
    }
}
