//! Errors raised while reading descriptors and resolving modules.

use std::{fmt, io, path::Path};

use thiserror::Error;

use crate::target::Target;

/// The result type of the resolution engine.
pub type Result<T = (), E = ResolveError> = std::result::Result<T, E>;

/// A failure of the descriptor access layer.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: Box<Path>,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse module descriptor: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("could not find `module.toml` in {}", .0.display())]
    MissingDescriptor(Box<Path>),
    #[error("no module is known at {}", .0.display())]
    UnknownLocation(Box<Path>),
    #[error("cannot derive a module name from {}", .0.display())]
    Unnamed(Box<Path>),
}

/// The kind of name that failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Package,
    Module,
    Service,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceKind::Package => "package",
            ReferenceKind::Module => "module",
            ReferenceKind::Service => "service",
        })
    }
}

/// Why a module that claims a package cannot serve a particular requester.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsuitableReason {
    #[error(
        "its target `{module_target}` is incompatible with `{requester_target}`"
    )]
    IncompatibleTarget {
        module_target: Target,
        requester_target: Target,
    },
    #[error("it is an executable module")]
    ExecutableModule,
    #[error(
        "it implements the interface module `{interface}`, use that instead"
    )]
    InterfaceImplementer { interface: Box<str> },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Nothing in the module universe matches a name, even after discovery
    /// has been exhausted.
    #[error("unresolved {reference} `{name}` requested by `{requester}`")]
    Unresolved {
        reference: ReferenceKind,
        name: Box<str>,
        requester: Box<str>,
    },
    /// Every claimant of a package was disqualified for the requester.
    #[error(
        "package `{package}` is owned by `{module}`, which `{requester}` cannot use: {reason}"
    )]
    Unsuitable {
        package: Box<str>,
        module: Box<str>,
        requester: Box<str>,
        reason: UnsuitableReason,
    },
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ResolveError {
    pub fn unresolved(
        reference: ReferenceKind,
        name: impl Into<Box<str>>,
        requester: impl Into<Box<str>>,
    ) -> Self {
        ResolveError::Unresolved {
            reference,
            name: name.into(),
            requester: requester.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_messages_name_both_sides() {
        let err =
            ResolveError::unresolved(ReferenceKind::Package, "dev.kit", "app");
        assert_eq!(
            err.to_string(),
            "unresolved package `dev.kit` requested by `app`"
        );
    }

    #[test]
    fn unsuitable_messages_carry_the_reason() {
        let err = ResolveError::Unsuitable {
            package: "dev.css".into(),
            module: "css-web".into(),
            requester: "kit".into(),
            reason: UnsuitableReason::InterfaceImplementer {
                interface: "css".into(),
            },
        };

        assert!(err.to_string().ends_with(
            "it implements the interface module `css`, use that instead"
        ));
    }
}
