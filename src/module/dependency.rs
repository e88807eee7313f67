//! Typed dependency edges between modules.

use std::{fmt, hash::Hash};

use crate::target::Target;

use super::ModuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyKind {
    /// Compile-time dependency on another module's sources.
    Source,
    /// A source dependency whose destination could not be resolved when it
    /// was declared.
    NotFoundSource,
    Resource,
    /// A platform-specific substitute for part of the base runtime.
    Emulation,
    /// The application module an executable is built from.
    Application,
    Plugin,
    /// A service provider pulled in for an executable.
    ImplicitProvider,
}

impl DependencyKind {
    pub fn label(self) -> &'static str {
        match self {
            DependencyKind::Source => "source",
            DependencyKind::NotFoundSource => "not-found-source",
            DependencyKind::Resource => "resource",
            DependencyKind::Emulation => "emulation",
            DependencyKind::Application => "application",
            DependencyKind::Plugin => "plugin",
            DependencyKind::ImplicitProvider => "implicit-provider",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A directed, typed edge `source -> destination`.
///
/// Equality and hashing only consider the source, destination, kind, scope
/// and classifier; the remaining fields are flags.
#[derive(Debug, Clone)]
pub struct ModuleDependency {
    pub source: ModuleId,
    pub destination: ModuleId,
    pub kind: DependencyKind,
    pub optional: bool,
    pub transitive: bool,
    pub scope: Option<Box<str>>,
    pub classifier: Option<Box<str>>,
    /// When present, the edge only applies to executables compatible with
    /// one of these targets.
    pub executable_targets: Option<Box<[Target]>>,
}

impl ModuleDependency {
    pub fn new(
        source: ModuleId,
        destination: ModuleId,
        kind: DependencyKind,
    ) -> Self {
        ModuleDependency {
            source,
            destination,
            kind,
            optional: false,
            transitive: true,
            scope: None,
            classifier: None,
            executable_targets: None,
        }
    }

    pub fn is_executable_scoped(&self) -> bool {
        self.executable_targets.is_some()
    }

    /// Returns a copy of this edge with a different destination, as used when
    /// an interface is replaced by its implementation.
    pub fn redirect(&self, destination: ModuleId) -> Self {
        ModuleDependency {
            destination,
            ..self.clone()
        }
    }

    fn key(
        &self,
    ) -> (ModuleId, ModuleId, DependencyKind, Option<&str>, Option<&str>) {
        (
            self.source,
            self.destination,
            self.kind,
            self.scope.as_deref(),
            self.classifier.as_deref(),
        )
    }
}

impl PartialEq for ModuleDependency {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ModuleDependency {}

impl Hash for ModuleDependency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
