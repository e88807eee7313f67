//! The platform catalogue: modules provided by the runtime itself.

use serde::Deserialize;

use crate::{descriptor::LibraryDescriptor, target::Target};

/// A platform module and the packages it exports.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogueEntry {
    pub name: Box<str>,
    pub packages: Vec<Box<str>>,
    /// Restricts the platforms on which the module is available.
    #[serde(default)]
    pub target: Option<Target>,
}

/// The set of platform modules known to a registry.
///
/// A catalogue is built once and handed to the registry, which registers its
/// entries before anything else so that platform packages are always claimed
/// by the platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformCatalogue {
    entries: Vec<CatalogueEntry>,
}

const JAVA_BASE: &[&str] = &[
    "java.lang",
    "java.lang.annotation",
    "java.lang.reflect",
    "java.io",
    "java.math",
    "java.net",
    "java.nio",
    "java.nio.charset",
    "java.text",
    "java.time",
    "java.time.format",
    "java.util",
    "java.util.function",
    "java.util.stream",
    "java.util.concurrent",
    "java.util.regex",
];

const BUILTIN: &[(&str, &[&str], Option<&str>)] = &[
    ("java.base", JAVA_BASE, None),
    ("java.logging", &["java.util.logging"], None),
    ("java.sql", &["java.sql"], None),
    (
        "java.desktop",
        &["java.awt", "java.beans", "javax.swing"],
        Some("jre"),
    ),
    ("java.net.http", &["java.net.http"], Some("jre")),
    ("jdk.jsobject", &["netscape.javascript"], Some("jre")),
    ("java.xml", &["javax.xml", "org.w3c.dom", "org.xml.sax"], None),
];

impl PlatformCatalogue {
    pub fn new(entries: Vec<CatalogueEntry>) -> Self {
        PlatformCatalogue { entries }
    }

    /// The JDK modules a multi-platform codebase typically references.
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|&(name, packages, target)| CatalogueEntry {
                name: name.into(),
                packages: packages.iter().map(|&p| p.into()).collect(),
                target: target.and_then(Target::parse),
            })
            .collect();

        PlatformCatalogue { entries }
    }

    pub fn entries(&self) -> &[CatalogueEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&CatalogueEntry> {
        self.entries.iter().find(|entry| &*entry.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogueEntry {
    pub(crate) fn to_library(&self) -> LibraryDescriptor {
        LibraryDescriptor {
            name: self.name.clone(),
            packages: self.packages.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Platform, TargetTag};

    #[test]
    fn builtin_catalogue_covers_java_base() {
        let catalogue = PlatformCatalogue::builtin();
        let base = catalogue.get("java.base").unwrap();

        assert!(base.packages.iter().any(|p| p.as_ref() == "java.time"));
        assert!(base.target.is_none());
    }

    #[test]
    fn desktop_modules_are_jre_only() {
        let catalogue = PlatformCatalogue::builtin();
        let desktop = catalogue.get("java.desktop").unwrap();
        let target = desktop.target.as_ref().unwrap();

        assert_eq!(target.tags(), &[TargetTag::Jre]);
        assert!(!target.is_platform_supported(Platform::Gwt));
    }

    #[test]
    fn entries_deserialize_from_config() {
        let entry: CatalogueEntry = toml::from_str(
            r#"
            name = "java.base"
            packages = ["java.lang"]
            target = "jre"
            "#,
        )
        .unwrap();

        assert_eq!(entry.target.unwrap().tags(), &[TargetTag::Jre]);
    }
}
