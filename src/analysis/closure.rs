//! Transitive closures over direct dependencies.

use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::{
    error::Result,
    module::{ModuleDependency, ModuleId},
};

use super::DependencyAnalyzer;

/// The context a closure is computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClosureContext {
    /// The executable on whose behalf interfaces are resolved.
    pub executable: Option<ModuleId>,
    /// Whether emulation modules are expanded.
    pub emulated: bool,
}

impl ClosureContext {
    pub const PLAIN: ClosureContext = ClosureContext {
        executable: None,
        emulated: false,
    };

    pub fn executable(executable: ModuleId, emulated: bool) -> Self {
        ClosureContext {
            executable: Some(executable),
            emulated,
        }
    }
}

impl DependencyAnalyzer {
    /// Returns every module reachable from `start`, in breadth-first order
    /// and without duplicates. `owner` itself is never part of the result.
    ///
    /// Destinations of non-transitive edges are included but not expanded,
    /// and so are emulation modules outside an emulated context. In an
    /// executable context every interface module reached also brings in its
    /// implementation.
    pub(crate) fn closure(
        &mut self,
        owner: ModuleId,
        start: &[ModuleDependency],
        context: ClosureContext,
    ) -> Result<Vec<ModuleId>> {
        let mut reached = IndexSet::new();
        let mut queue = start
            .iter()
            .map(|dep| (dep.destination, dep.transitive))
            .collect::<VecDeque<_>>();

        while let Some((module, transitive)) = queue.pop_front() {
            if module == owner || !reached.insert(module) {
                continue;
            }

            let entry = self.registry.module(module);

            if let Some(executable) = context.executable {
                if entry.is_interface() {
                    if let Some(implementation) =
                        self.resolve_interface(executable, module)?
                    {
                        queue.push_back((implementation, true));
                    }
                }
            }

            let entry = self.registry.module(module);
            if !transitive || (entry.is_emulation() && !context.emulated) {
                continue;
            }

            for dep in self.direct_dependencies(module)?.iter() {
                queue.push_back((dep.destination, dep.transitive));
            }
        }

        Ok(reached.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::{analyzer, id, names};

    #[test]
    fn emulation_modules_are_not_expanded_outside_emulated_contexts() {
        let mut analyzer = analyzer(&[
            ("kit", r#"dependencies = { source = ["emul-time-web"] }"#),
            (
                "emul-time-web",
                r#"
                module = { emulation = true }
                dependencies = { source = ["emul-internals"] }
                "#,
            ),
            ("emul-internals", ""),
        ]);
        let kit = id(&mut analyzer, "kit");
        let start = analyzer.direct_dependencies(kit).unwrap();

        let plain =
            analyzer.closure(kit, &start, ClosureContext::PLAIN).unwrap();
        assert_eq!(names(&analyzer, &plain), ["emul-time-web"]);

        let emulated = ClosureContext {
            executable: None,
            emulated: true,
        };
        let full = analyzer.closure(kit, &start, emulated).unwrap();
        assert_eq!(
            names(&analyzer, &full),
            ["emul-time-web", "emul-internals"]
        );
    }

    #[test]
    fn non_transitive_edges_stop_expansion() {
        let mut analyzer = analyzer(&[
            (
                "kit",
                r#"
                [[dependencies.source]]
                name = "text"
                transitive = false
                "#,
            ),
            ("text", r#"dependencies = { source = ["fonts"] }"#),
            ("fonts", ""),
        ]);
        let kit = id(&mut analyzer, "kit");

        let transitive = analyzer.transitive_dependencies(kit).unwrap();
        assert_eq!(names(&analyzer, &transitive), ["text"]);
    }
}
