//! Interface resolution: picking the concrete implementation of an abstract
//! module for a requester's target.

use tracing::{trace, warn};

use crate::{error::Result, module::ModuleId};

use super::DependencyAnalyzer;

impl DependencyAnalyzer {
    /// Resolves `interface` to the implementation that best matches the
    /// target of `requester`.
    ///
    /// Implementers are the non-executable project modules that declare
    /// they implement the interface, or whose name extends the interface's
    /// name with target tags. Among the compatible ones, the highest grade
    /// wins, and the first in discovery order wins a tie. An interface that
    /// is its own default implementation is used as a last resort. Finding
    /// nothing is logged and yields `None`.
    ///
    /// Modules that aren't interfaces resolve to themselves.
    pub fn resolve_interface(
        &mut self,
        requester: ModuleId,
        interface: ModuleId,
    ) -> Result<Option<ModuleId>> {
        if !self.registry.module(interface).is_interface() {
            return Ok(Some(interface));
        }

        if let Some(&resolved) = self.interfaces.get(&(requester, interface)) {
            return Ok(resolved);
        }

        let resolved = self.find_implementation(requester, interface)?;
        self.interfaces.insert((requester, interface), resolved);
        Ok(resolved)
    }

    /// Every implementer of `interface`, in discovery order, whatever its
    /// target.
    pub fn interface_implementations(
        &mut self,
        interface: ModuleId,
    ) -> Result<Vec<ModuleId>> {
        let universe = self.registry.modules_in_discovery_order()?.to_vec();

        Ok(universe
            .into_iter()
            .filter(|&candidate| {
                let module = self.registry.module(candidate);

                module.as_project().is_some()
                    && !module.is_executable()
                    && !module.is_interface()
                    && self.registry.implements(candidate, interface)
            })
            .collect())
    }

    fn find_implementation(
        &mut self,
        requester: ModuleId,
        interface: ModuleId,
    ) -> Result<Option<ModuleId>> {
        let target = self.registry.module(requester).target().clone();
        let mut best: Option<(ModuleId, i32)> = None;

        for candidate in self.interface_implementations(interface)? {
            let grade = self
                .registry
                .module(candidate)
                .target()
                .grade_target_match(&target);

            trace!(
                interface = %self.registry.module(interface),
                candidate = %self.registry.module(candidate),
                grade,
                "graded implementation"
            );

            if grade >= 0 && best.is_none_or(|(_, best)| grade > best) {
                best = Some((candidate, grade));
            }
        }

        if let Some((implementation, _)) = best {
            return Ok(Some(implementation));
        }

        let module = self.registry.module(interface);
        if module.provides_default_implementation()
            && module.target().is_compatible_with(&target)
        {
            return Ok(Some(interface));
        }

        warn!(
            interface = %module,
            requester = %self.registry.module(requester),
            %target,
            "no implementation found for interface module"
        );

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::tests::{analyzer, destinations, id};

    fn css_workspace() -> crate::analysis::DependencyAnalyzer {
        analyzer(&[
            (
                "css",
                r#"
                module = { interface = true }
                packages = { declared = ["dev.css"] }
                "#,
            ),
            (
                "css-web",
                r#"
                packages = { declared = ["dev.css", "dev.css.web"] }
                dependencies = { source = ["css"] }
                "#,
            ),
            (
                "css-javafx",
                r#"
                packages = { declared = ["dev.css", "dev.css.fx"] }
                dependencies = { source = ["css"] }
                "#,
            ),
            (
                "app-gwt",
                r#"
                module = { executable = true }
                dependencies = { source = ["css"] }
                "#,
            ),
            (
                "app-openjfx",
                r#"
                module = { executable = true }
                dependencies = { source = ["css"] }
                "#,
            ),
            (
                "app-teavm",
                r#"
                module = { executable = true }
                dependencies = { source = ["css"] }
                "#,
            ),
        ])
    }

    #[test]
    fn executables_get_the_compatible_implementation() {
        let mut analyzer = css_workspace();
        let app = id(&mut analyzer, "app-gwt");

        let direct = analyzer.direct_dependencies(app).unwrap();
        let names = destinations(&analyzer, &direct);

        assert!(names.contains(&"css-web".to_owned()));
        assert!(!names.contains(&"css".to_owned()));
        assert!(!names.contains(&"css-javafx".to_owned()));

        let app = id(&mut analyzer, "app-openjfx");
        let direct = analyzer.direct_dependencies(app).unwrap();
        assert_eq!(destinations(&analyzer, &direct), ["css-javafx"]);
    }

    #[test]
    fn libraries_keep_the_interface() {
        let mut analyzer = analyzer(&[
            ("css", r#"module = { interface = true }"#),
            ("css-web", ""),
            ("theme", r#"dependencies = { source = ["css"] }"#),
        ]);
        let theme = id(&mut analyzer, "theme");

        let direct = analyzer.direct_dependencies(theme).unwrap();
        assert_eq!(destinations(&analyzer, &direct), ["css"]);
    }

    #[test]
    fn the_highest_grade_wins() {
        let mut analyzer = analyzer(&[
            ("storage", r#"module = { interface = true }"#),
            ("storage-web", ""),
            ("storage-gwt", ""),
            ("app-gwt", r#"module = { executable = true }"#),
        ]);
        let storage = id(&mut analyzer, "storage");
        let app = id(&mut analyzer, "app-gwt");
        let storage_gwt = id(&mut analyzer, "storage-gwt");

        let resolved = analyzer.resolve_interface(app, storage).unwrap();
        assert_eq!(resolved, Some(storage_gwt));
    }

    #[test]
    fn default_implementations_are_a_fallback() {
        let mut analyzer = analyzer(&[
            (
                "storage",
                r#"
                [module]
                interface = true
                default-implementation = true
                "#,
            ),
            ("storage-javafx", ""),
            ("log", r#"module = { interface = true }"#),
            ("app-gwt", r#"module = { executable = true }"#),
        ]);
        let storage = id(&mut analyzer, "storage");
        let log = id(&mut analyzer, "log");
        let app = id(&mut analyzer, "app-gwt");

        assert_eq!(
            analyzer.resolve_interface(app, storage).unwrap(),
            Some(storage)
        );
        assert_eq!(analyzer.resolve_interface(app, log).unwrap(), None);
    }

    #[test]
    fn unresolved_interfaces_are_kept() {
        let mut analyzer = css_workspace();
        let app = id(&mut analyzer, "app-teavm");

        // css-web is compatible with teavm, css-javafx is not
        let direct = analyzer.direct_dependencies(app).unwrap();
        assert_eq!(destinations(&analyzer, &direct), ["css-web"]);

        let mut analyzer = analyzer_without_implementers();
        let app = id(&mut analyzer, "app-gwt");
        let direct = analyzer.direct_dependencies(app).unwrap();
        assert_eq!(destinations(&analyzer, &direct), ["css"]);
    }

    fn analyzer_without_implementers() -> crate::analysis::DependencyAnalyzer {
        analyzer(&[
            ("css", r#"module = { interface = true }"#),
            (
                "app-gwt",
                r#"
                module = { executable = true }
                dependencies = { source = ["css"] }
                "#,
            ),
        ])
    }
}
