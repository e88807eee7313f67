//! Emulation modules: platform-specific substitutes for parts of the base
//! runtime, added to executables that cannot use the real thing.

use serde::Deserialize;
use tracing::{trace, warn};

use crate::{
    error::Result,
    module::{DependencyKind, ModuleDependency, ModuleId},
    target::{Platform, Target},
};

use super::DependencyAnalyzer;

/// Adds `module` to executables built for one of `platforms`.
///
/// With a marker, the rule only applies when the executable or its closure
/// uses the marker package or contains the marker module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EmulationRule {
    pub platforms: Vec<Platform>,
    pub module: Box<str>,
    #[serde(default)]
    pub uses_package: Option<Box<str>>,
    #[serde(default)]
    pub uses_module: Option<Box<str>>,
}

impl EmulationRule {
    pub fn defaults() -> Vec<EmulationRule> {
        vec![
            EmulationRule {
                platforms: vec![Platform::Gwt, Platform::J2cl],
                module: "emul-base-web".into(),
                uses_package: None,
                uses_module: None,
            },
            EmulationRule {
                platforms: vec![Platform::Gwt, Platform::J2cl, Platform::Teavm],
                module: "emul-time-web".into(),
                uses_package: Some("java.time".into()),
                uses_module: None,
            },
        ]
    }

    /// Returns `true` if the rule concerns executables with `target`.
    pub fn applies_to(&self, target: &Target) -> bool {
        is_emulated(target)
            && self
                .platforms
                .iter()
                .any(|&platform| target.is_platform_supported(platform))
    }
}

/// An executable runs in an emulated context when its target cannot run on
/// the JRE.
pub(crate) fn is_emulated(target: &Target) -> bool {
    !target.is_platform_supported(Platform::Jre)
}

impl DependencyAnalyzer {
    /// Computes the emulation dependencies of the executable `id`, given its
    /// dependencies `deps` and their closure.
    pub(super) fn emulation_dependencies_for(
        &mut self,
        id: ModuleId,
        deps: &[ModuleDependency],
        closure: &[ModuleId],
    ) -> Result<Vec<ModuleDependency>> {
        let target = self.registry.module(id).target().clone();
        let rules = self
            .emulation
            .iter()
            .filter(|rule| rule.applies_to(&target))
            .cloned()
            .collect::<Vec<_>>();

        let mut emulation: Vec<ModuleDependency> = Vec::new();

        for rule in rules {
            if !self.marker_present(id, closure, &rule) {
                trace!(module = %rule.module, "emulation marker not used");
                continue;
            }

            let Some(module) = self.registry.find_module(&rule.module)? else {
                warn!(
                    executable = %self.registry.module(id),
                    module = %rule.module,
                    "emulation module not found, skipping"
                );
                continue;
            };

            let present = module == id
                || closure.contains(&module)
                || deps.iter().any(|dep| dep.destination == module)
                || emulation.iter().any(|dep| dep.destination == module);

            if !present {
                emulation.push(ModuleDependency::new(
                    id,
                    module,
                    DependencyKind::Emulation,
                ));
            }
        }

        Ok(emulation)
    }

    fn marker_present(
        &self,
        id: ModuleId,
        closure: &[ModuleId],
        rule: &EmulationRule,
    ) -> bool {
        let mut modules = std::iter::once(id)
            .chain(closure.iter().copied())
            .map(|module| self.registry.module(module));

        match (&rule.uses_package, &rule.uses_module) {
            (Some(package), _) => modules.any(|m| m.uses_package(package)),
            (None, Some(name)) => modules.any(|m| m.name() == name.as_ref()),
            (None, None) => true,
        }
    }
}
