//! The per-module dependency pipeline.
//!
//! Dependencies of a module are computed in stages, each memoized:
//!
//! 1. *declared*: what the descriptor states outright, plus the implied
//!    application module of an executable;
//! 2. *source*: the owners of every package the module uses, found through
//!    the registry;
//! 3. for executables only, dependencies restricted to executable targets
//!    are promoted, emulation modules are added, implicit service providers
//!    are added, and interface modules are replaced by implementations.
//!
//! Non-executable modules stop after the second stage.

use std::{
    collections::{HashMap, HashSet},
    iter,
    rc::Rc,
};

use tracing::{debug, trace};

use crate::{
    error::{ReferenceKind, ResolveError, Result},
    graph::DependencyGraph,
    module::{DependencyKind, ModuleDependency, ModuleId},
    registry::ModuleRegistry,
    target::{TOKEN_SEPARATOR, TargetTag},
};

use closure::ClosureContext;

pub use emulation::EmulationRule;
pub use provider::Providers;

mod closure;
mod emulation;
mod interface;
mod provider;
mod tiebreak;

/// Memoized results for one module; a stage is `None` until computed.
#[derive(Debug, Default)]
struct Analysis {
    declared: Option<Rc<[ModuleDependency]>>,
    executable_scoped: Option<Rc<[ModuleDependency]>>,
    source: Option<Rc<[ModuleDependency]>>,
    transitive: Option<Rc<[ModuleId]>>,
    executable: Option<Rc<ExecutableResolution>>,
}

/// The late stages of the pipeline, computed for executable modules.
#[derive(Debug, Default)]
pub struct ExecutableResolution {
    /// Executable-scoped dependencies whose targets admit the executable.
    pub promoted: Rc<[ModuleDependency]>,
    pub emulation: Rc<[ModuleDependency]>,
    pub implicit_providers: Rc<[ModuleDependency]>,
    pub providers: Rc<[Providers]>,
    /// The final direct dependencies, with interfaces resolved.
    pub direct: Rc<[ModuleDependency]>,
    pub transitive: Rc<[ModuleId]>,
    pub transitive_without_providers: Rc<[ModuleId]>,
}

#[derive(Debug)]
pub struct DependencyAnalyzer {
    registry: ModuleRegistry,
    emulation: Box<[EmulationRule]>,
    analyses: HashMap<ModuleId, Analysis>,
    /// Executables whose late stages are being computed.
    in_progress: HashSet<ModuleId>,
    /// Resolved implementations, keyed by (requester, interface).
    interfaces: HashMap<(ModuleId, ModuleId), Option<ModuleId>>,
    providers: provider::ProviderIndex,
}

impl DependencyAnalyzer {
    pub fn new(
        registry: ModuleRegistry,
        emulation: Vec<EmulationRule>,
    ) -> Self {
        DependencyAnalyzer {
            registry,
            emulation: emulation.into_boxed_slice(),
            analyses: HashMap::new(),
            in_progress: HashSet::new(),
            interfaces: HashMap::new(),
            providers: provider::ProviderIndex::default(),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    fn memo<T: Clone>(
        &self,
        id: ModuleId,
        stage: impl FnOnce(&Analysis) -> &Option<T>,
    ) -> Option<T> {
        self.analyses.get(&id).and_then(|a| stage(a).clone())
    }

    /// The dependencies a module's descriptor states outright, excluding those
    /// restricted to executable targets.
    pub fn declared_dependencies(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[ModuleDependency]>> {
        if let Some(deps) = self.memo(id, |a| &a.declared) {
            return Ok(deps);
        }

        let (declared, scoped) = self.compute_declared(id)?;
        let analysis = self.analyses.entry(id).or_default();
        analysis.declared = Some(declared.clone());
        analysis.executable_scoped = Some(scoped);
        Ok(declared)
    }

    /// The declared dependencies that only apply to executables built for
    /// particular targets.
    pub fn executable_scoped_dependencies(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[ModuleDependency]>> {
        self.declared_dependencies(id)?;
        Ok(self.memo(id, |a| &a.executable_scoped).unwrap_or_default())
    }

    /// The declared dependencies, plus the owners of every package the
    /// module uses.
    pub fn source_dependencies(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[ModuleDependency]>> {
        if let Some(deps) = self.memo(id, |a| &a.source) {
            return Ok(deps);
        }

        let deps = self.compute_source(id)?;
        self.analyses.entry(id).or_default().source = Some(deps.clone());
        Ok(deps)
    }

    /// The emulation modules added to an executable. Empty for every other
    /// module.
    pub fn emulation_dependencies(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[ModuleDependency]>> {
        Ok(self
            .executable_resolution(id)?
            .map(|r| r.emulation.clone())
            .unwrap_or_default())
    }

    /// The service providers added to an executable that nothing else
    /// depends on. Empty for every other module.
    pub fn implicit_provider_dependencies(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[ModuleDependency]>> {
        Ok(self
            .executable_resolution(id)?
            .map(|r| r.implicit_providers.clone())
            .unwrap_or_default())
    }

    /// The resolved service providers of an executable, one entry per
    /// service used anywhere in its closure.
    pub fn executable_providers(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[Providers]>> {
        Ok(self
            .executable_resolution(id)?
            .map(|r| r.providers.clone())
            .unwrap_or_default())
    }

    /// The final direct dependencies of a module.
    pub fn direct_dependencies(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[ModuleDependency]>> {
        match self.executable_resolution(id)? {
            Some(resolution) => Ok(resolution.direct.clone()),
            None => self.source_dependencies(id),
        }
    }

    /// Every module reachable from `id` through direct dependencies.
    pub fn transitive_dependencies(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[ModuleId]>> {
        if let Some(resolution) = self.executable_resolution(id)? {
            return Ok(resolution.transitive.clone());
        }

        if let Some(transitive) = self.memo(id, |a| &a.transitive) {
            return Ok(transitive);
        }

        let direct = self.source_dependencies(id)?;
        let transitive: Rc<[ModuleId]> =
            self.closure(id, &direct, ClosureContext::PLAIN)?.into();

        self.analyses.entry(id).or_default().transitive =
            Some(transitive.clone());
        Ok(transitive)
    }

    /// Like [`transitive_dependencies`](Self::transitive_dependencies), but
    /// without the implicit providers of an executable.
    pub fn transitive_dependencies_without_providers(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[ModuleId]>> {
        match self.executable_resolution(id)? {
            Some(r) => Ok(r.transitive_without_providers.clone()),
            None => self.transitive_dependencies(id),
        }
    }

    /// The late pipeline stages of an executable module.
    ///
    /// Returns `None` for modules that aren't executable, and for an
    /// executable whose resolution is already underway further up the stack;
    /// callers then fall back to its source dependencies.
    pub fn executable_resolution(
        &mut self,
        id: ModuleId,
    ) -> Result<Option<Rc<ExecutableResolution>>> {
        if !self.registry.module(id).is_executable() {
            return Ok(None);
        }

        if let Some(resolution) = self.memo(id, |a| &a.executable) {
            return Ok(Some(resolution));
        }

        if !self.in_progress.insert(id) {
            trace!(
                module = %self.registry.module(id),
                "re-entrant executable resolution"
            );
            return Ok(None);
        }

        let result = self.resolve_executable(id);
        self.in_progress.remove(&id);

        let resolution = Rc::new(result?);
        self.analyses.entry(id).or_default().executable =
            Some(resolution.clone());
        Ok(Some(resolution))
    }

    /// The module an executable is built from: its name with the trailing
    /// target tokens removed, if such a module exists.
    pub fn application_module(
        &mut self,
        id: ModuleId,
    ) -> Result<Option<ModuleId>> {
        let Some(base) = application_name(self.registry.module(id).name())
        else {
            return Ok(None);
        };

        let base: Box<str> = base.into();
        let application = self.registry.find_module(&base)?;

        Ok(application.filter(|&app| {
            app != id && !self.registry.module(app).is_executable()
        }))
    }

    /// Reports every cyclic dependency loop among the modules reachable from
    /// `modules` through final direct dependencies.
    pub fn analyze_cyclic_dependencies_loops(
        &mut self,
        modules: &[ModuleId],
    ) -> Result<Vec<Box<[ModuleId]>>> {
        let graph = self.dependency_graph(modules)?;
        Ok(graph.cyclic_loops())
    }

    /// Builds the graph of final direct dependencies reachable from
    /// `modules`.
    pub fn dependency_graph(
        &mut self,
        modules: &[ModuleId],
    ) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        let mut queue = modules.to_vec();

        for &module in modules {
            graph.add_module(module);
        }

        while let Some(module) = queue.pop() {
            for dep in self.direct_dependencies(module)?.iter() {
                if !graph.contains(dep.destination) {
                    queue.push(dep.destination);
                }

                graph.add_dependency(module, dep.destination);
            }
        }

        Ok(graph)
    }

    fn compute_declared(
        &mut self,
        id: ModuleId,
    ) -> Result<(Rc<[ModuleDependency]>, Rc<[ModuleDependency]>)> {
        let module = self.registry.module(id);
        let name = module.name.clone();

        if let Some(library) = module.as_library() {
            let requires = library.requires().to_vec();
            let mut deps = Vec::with_capacity(requires.len());

            for required in requires {
                match self.registry.find_module(&required)? {
                    Some(destination) => deps.push(ModuleDependency::new(
                        id,
                        destination,
                        DependencyKind::Source,
                    )),
                    None => debug!(
                        library = %name,
                        required = %required,
                        "required library is unknown"
                    ),
                }
            }

            return Ok((deps.into(), Rc::default()));
        }

        let is_executable = module.is_executable();
        let sections = module
            .descriptor()
            .map(|d| d.dependencies.clone())
            .unwrap_or_default();

        let groups = [
            (sections.source, DependencyKind::Source),
            (sections.resource, DependencyKind::Resource),
            (sections.plugin, DependencyKind::Plugin),
        ];

        let mut declared = Vec::new();
        let mut scoped = Vec::new();

        for (decls, kind) in groups {
            for decl in decls {
                let decl = decl.into_detailed();

                let destination = match self.registry.find_module(&decl.name)? {
                    Some(destination) => destination,
                    None if decl.optional => {
                        debug!(
                            module = %name,
                            dependency = %decl.name,
                            "optional dependency not found"
                        );
                        continue;
                    }
                    None => {
                        return Err(ResolveError::unresolved(
                            ReferenceKind::Module,
                            decl.name,
                            name,
                        ));
                    }
                };

                let dep = ModuleDependency {
                    source: id,
                    destination,
                    kind,
                    optional: decl.optional,
                    transitive: decl.transitive,
                    scope: decl.scope,
                    classifier: decl.classifier,
                    executable_targets: match decl.executable_targets.is_empty()
                    {
                        true => None,
                        false => {
                            Some(decl.executable_targets.into_boxed_slice())
                        }
                    },
                };

                match dep.is_executable_scoped() {
                    true => scoped.push(dep),
                    false => declared.push(dep),
                }
            }
        }

        if is_executable {
            if let Some(app) = self.application_module(id)? {
                if !declared.iter().any(|dep| dep.destination == app) {
                    declared.push(ModuleDependency::new(
                        id,
                        app,
                        DependencyKind::Application,
                    ));
                }
            }
        }

        Ok((declared.into(), scoped.into()))
    }

    fn compute_source(
        &mut self,
        id: ModuleId,
    ) -> Result<Rc<[ModuleDependency]>> {
        let declared = self.declared_dependencies(id)?;
        let scoped = self.executable_scoped_dependencies(id)?;
        let used = self.registry.module(id).used_packages().to_vec();

        let mut known = declared
            .iter()
            .chain(scoped.iter())
            .map(|dep| dep.destination)
            .collect::<HashSet<_>>();

        let mut deps = Vec::with_capacity(declared.len() + used.len());

        for dep in declared.iter() {
            let mut dep = dep.clone();

            // an explicit source dependency none of whose packages are used
            if dep.kind == DependencyKind::Source
                && !used.is_empty()
                && !self.supplies_any(dep.destination, &used)
            {
                dep.kind = DependencyKind::NotFoundSource;
            }

            deps.push(dep);
        }

        for package in &used {
            let owner = self.registry.suitable_package_owner(package, id)?;

            if owner == id || !known.insert(owner) {
                continue;
            }

            trace!(
                module = %self.registry.module(id),
                package = %package,
                owner = %self.registry.module(owner),
                "discovered source dependency"
            );

            deps.push(ModuleDependency::new(id, owner, DependencyKind::Source));
        }

        Ok(deps.into())
    }

    /// Returns `true` if `module` declares no packages at all, or declares one
    /// of `packages`.
    fn supplies_any(&self, module: ModuleId, packages: &[Box<str>]) -> bool {
        let module = self.registry.module(module);
        let mut declared = module.declared_packages().peekable();

        declared.peek().is_none()
            || module.declared_packages().any(|declared| {
                packages.iter().any(|package| package.as_ref() == declared)
            })
    }

    fn resolve_executable(
        &mut self,
        id: ModuleId,
    ) -> Result<ExecutableResolution> {
        let context = ClosureContext::executable(
            id,
            emulation::is_emulated(self.registry.module(id).target()),
        );

        let base = self.source_dependencies(id)?;
        let promoted = self.promote_scoped_dependencies(id, &base, context)?;

        let mut deps =
            base.iter().chain(&promoted).cloned().collect::<Vec<_>>();
        let pre_emulation = self.closure(id, &deps, context)?;

        let emulation =
            self.emulation_dependencies_for(id, &deps, &pre_emulation)?;
        deps.extend(emulation.iter().cloned());

        let without_providers = self.closure(id, &deps, context)?;
        let (providers, provider_modules) =
            self.resolve_providers(id, &without_providers, context)?;

        let present = without_providers
            .iter()
            .copied()
            .chain(iter::once(id))
            .collect::<HashSet<_>>();

        let implicit_providers = provider_modules
            .into_iter()
            .filter(|module| !present.contains(module))
            .map(|module| {
                ModuleDependency::new(
                    id,
                    module,
                    DependencyKind::ImplicitProvider,
                )
            })
            .collect::<Vec<_>>();

        deps.extend(implicit_providers.iter().cloned());

        let direct = self.resolve_interface_dependencies(id, deps)?;
        let transitive = self.closure(id, &direct, context)?;

        Ok(ExecutableResolution {
            promoted: promoted.into(),
            emulation: emulation.into(),
            implicit_providers: implicit_providers.into(),
            providers: providers.into(),
            direct: direct.into(),
            transitive: transitive.into(),
            transitive_without_providers: without_providers.into(),
        })
    }

    /// Collects the executable-scoped dependencies of `id` and of everything
    /// it reaches, keeping those whose targets admit the executable. Promoted
    /// modules can reach further scoped dependencies, so this runs until
    /// nothing new is promoted.
    fn promote_scoped_dependencies(
        &mut self,
        id: ModuleId,
        base: &[ModuleDependency],
        context: ClosureContext,
    ) -> Result<Vec<ModuleDependency>> {
        let target = self.registry.module(id).target().clone();
        let mut promoted: Vec<ModuleDependency> = Vec::new();
        let mut destinations = HashSet::new();
        let mut examined = HashSet::new();

        loop {
            let start =
                base.iter().chain(&promoted).cloned().collect::<Vec<_>>();
            let reached = self.closure(id, &start, context)?;
            let mut changed = false;

            for owner in iter::once(id).chain(reached) {
                if !examined.insert(owner) {
                    continue;
                }

                for dep in self.executable_scoped_dependencies(owner)?.iter() {
                    let targets =
                        dep.executable_targets.as_deref().unwrap_or_default();

                    if !targets.iter().any(|t| t.is_compatible_with(&target)) {
                        trace!(
                            executable = %self.registry.module(id),
                            dependency = %self.registry.module(dep.destination),
                            "dropping executable-scoped dependency"
                        );
                        continue;
                    }

                    if dep.destination != id
                        && destinations.insert(dep.destination)
                    {
                        let mut dep = dep.clone();
                        dep.source = id;
                        promoted.push(dep);
                        changed = true;
                    }
                }
            }

            if !changed {
                return Ok(promoted);
            }
        }
    }

    /// Replaces every interface destination with its implementation for the
    /// executable `id`, and drops duplicate edges. Edges of different kinds
    /// to the same module are all kept.
    fn resolve_interface_dependencies(
        &mut self,
        id: ModuleId,
        deps: Vec<ModuleDependency>,
    ) -> Result<Vec<ModuleDependency>> {
        let mut seen = HashSet::new();
        let mut direct = Vec::with_capacity(deps.len());

        for dep in deps {
            let destination = match self
                .registry
                .module(dep.destination)
                .is_interface()
            {
                true => self
                    .resolve_interface(id, dep.destination)?
                    .unwrap_or(dep.destination),
                false => dep.destination,
            };

            if destination == id {
                continue;
            }

            let dep = match destination == dep.destination {
                true => dep,
                false => dep.redirect(destination),
            };

            if seen.insert(dep.clone()) {
                direct.push(dep);
            }
        }

        Ok(direct)
    }
}

/// Strips the trailing target tokens from an executable's name, so that
/// `app-web-gwt` yields `app`. Returns `None` if nothing was stripped.
fn application_name(name: &str) -> Option<&str> {
    let mut base = name;

    while let Some((head, last)) = base.rsplit_once(TOKEN_SEPARATOR) {
        if TargetTag::from_token(last).is_none() {
            break;
        }

        base = head;
    }

    (base != name).then_some(base)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        catalogue::PlatformCatalogue,
        descriptor::memory::MemorySource,
        module::ModuleKind,
    };

    /// Builds an analyzer over an in-memory workspace rooted at `ws`, where
    /// each entry is a (location relative to `ws`, descriptor) pair.
    pub(crate) fn analyzer(modules: &[(&str, &str)]) -> DependencyAnalyzer {
        analyzer_with_rules(modules, EmulationRule::defaults())
    }

    pub(crate) fn analyzer_with_rules(
        modules: &[(&str, &str)],
        rules: Vec<EmulationRule>,
    ) -> DependencyAnalyzer {
        let mut source = MemorySource::new().with_toml("ws", "").unwrap();
        for (location, descriptor) in modules {
            source = source
                .with_toml(format!("ws/{location}"), descriptor)
                .unwrap();
        }

        let mut registry = ModuleRegistry::new(&PlatformCatalogue::builtin());
        registry.register_root("ws", ModuleKind::Workspace, source);
        DependencyAnalyzer::new(registry, rules)
    }

    pub(crate) fn id(
        analyzer: &mut DependencyAnalyzer,
        name: &str,
    ) -> ModuleId {
        analyzer.registry_mut().find_module(name).unwrap().unwrap()
    }

    pub(crate) fn names(
        analyzer: &DependencyAnalyzer,
        ids: &[ModuleId],
    ) -> Vec<String> {
        ids.iter()
            .map(|&id| analyzer.registry().module(id).name().to_owned())
            .collect()
    }

    pub(crate) fn destinations(
        analyzer: &DependencyAnalyzer,
        deps: &[ModuleDependency],
    ) -> Vec<String> {
        let ids = deps.iter().map(|dep| dep.destination).collect::<Vec<_>>();
        names(analyzer, &ids)
    }

    fn library_workspace() -> DependencyAnalyzer {
        analyzer(&[
            (
                "kit",
                r#"
                dependencies = { resource = ["assets"] }
                [packages]
                declared = ["dev.kit"]
                used = ["java.util", "dev.text"]
                "#,
            ),
            ("assets", ""),
            (
                "text",
                r#"
                [packages]
                declared = ["dev.text"]
                used = ["java.text"]
                "#,
            ),
            (
                "widgets",
                r#"
                packages = { declared = ["dev.widgets"], used = ["dev.kit"] }
                dependencies = { source = ["text"] }
                "#,
            ),
        ])
    }

    #[test]
    fn application_names_strip_target_tokens() {
        assert_eq!(application_name("app-gwt"), Some("app"));
        assert_eq!(application_name("app-web-gwt"), Some("app"));
        assert_eq!(application_name("app-launcher"), None);
        assert_eq!(application_name("app"), None);
    }

    #[test]
    fn declared_dependencies_keep_their_kinds() {
        let mut analyzer = library_workspace();
        let kit = id(&mut analyzer, "kit");

        let declared = analyzer.declared_dependencies(kit).unwrap();
        assert_eq!(destinations(&analyzer, &declared), ["assets"]);
        assert_eq!(declared[0].kind, DependencyKind::Resource);
    }

    #[test]
    fn source_dependencies_follow_used_packages() {
        let mut analyzer = library_workspace();
        let kit = id(&mut analyzer, "kit");

        let source = analyzer.source_dependencies(kit).unwrap();
        assert_eq!(
            destinations(&analyzer, &source),
            ["assets", "java.base", "text"]
        );
    }

    #[test]
    fn explicit_sources_are_not_duplicated() {
        let mut analyzer = library_workspace();
        let widgets = id(&mut analyzer, "widgets");

        let source = analyzer.source_dependencies(widgets).unwrap();
        assert_eq!(destinations(&analyzer, &source), ["text", "kit"]);

        // declared, but none of its packages are used
        assert_eq!(source[0].kind, DependencyKind::NotFoundSource);
    }

    #[test]
    fn transitive_dependencies_are_closed() {
        let mut analyzer = library_workspace();
        let widgets = id(&mut analyzer, "widgets");

        let direct = analyzer.direct_dependencies(widgets).unwrap();
        let transitive = analyzer.transitive_dependencies(widgets).unwrap();

        for dep in direct.iter() {
            assert!(transitive.contains(&dep.destination));
        }

        for &module in transitive.iter() {
            for dep in analyzer.direct_dependencies(module).unwrap().iter() {
                assert!(transitive.contains(&dep.destination));
            }
        }

        assert_eq!(
            names(&analyzer, &transitive),
            ["text", "kit", "java.base", "assets"]
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut analyzer = library_workspace();
        let widgets = id(&mut analyzer, "widgets");

        let first = analyzer.transitive_dependencies(widgets).unwrap();
        let second = analyzer.transitive_dependencies(widgets).unwrap();
        assert_eq!(first, second);

        let mut fresh = library_workspace();
        let widgets = id(&mut fresh, "widgets");
        let recomputed = fresh.transitive_dependencies(widgets).unwrap();
        assert_eq!(names(&fresh, &recomputed), names(&analyzer, &first));
    }

    #[test]
    fn unresolved_packages_abort_the_module() {
        let mut analyzer = analyzer(&[(
            "kit",
            r#"packages = { used = ["dev.missing"] }"#,
        )]);
        let kit = id(&mut analyzer, "kit");

        let err = analyzer.source_dependencies(kit).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unresolved package `dev.missing` requested by `kit`"
        );

        // nothing was cached for the failed module
        assert!(analyzer.memo(kit, |a| &a.source).is_none());
    }

    #[test]
    fn missing_optional_dependencies_are_skipped() {
        let mut analyzer = analyzer(&[(
            "kit",
            r#"
            [[dependencies.source]]
            name = "gone"
            optional = true
            "#,
        )]);
        let kit = id(&mut analyzer, "kit");

        assert!(analyzer.declared_dependencies(kit).unwrap().is_empty());
    }

    #[test]
    fn executables_depend_on_their_application() {
        let mut analyzer = analyzer(&[
            ("app", r#"packages = { declared = ["dev.app"] }"#),
            ("app-gwt", r#"module = { executable = true }"#),
        ]);
        let app_gwt = id(&mut analyzer, "app-gwt");

        let declared = analyzer.declared_dependencies(app_gwt).unwrap();
        assert_eq!(destinations(&analyzer, &declared), ["app"]);
        assert_eq!(declared[0].kind, DependencyKind::Application);
    }

    #[test]
    fn edges_of_different_kinds_to_one_module_are_kept() {
        let mut analyzer = analyzer(&[
            ("tool", ""),
            (
                "app",
                r#"
                module = { executable = true }
                dependencies = { source = ["tool"], plugin = ["tool"] }
                "#,
            ),
        ]);
        let app = id(&mut analyzer, "app");

        let direct = analyzer.direct_dependencies(app).unwrap();
        assert_eq!(destinations(&analyzer, &direct), ["tool", "tool"]);

        let kinds = direct.iter().map(|dep| dep.kind).collect::<Vec<_>>();
        assert_eq!(kinds, [DependencyKind::Source, DependencyKind::Plugin]);

        let transitive = analyzer.transitive_dependencies(app).unwrap();
        assert_eq!(names(&analyzer, &transitive), ["tool"]);
    }

    fn scoped_workspace() -> DependencyAnalyzer {
        analyzer_with_rules(
            &[
                (
                    "kit",
                    r#"
                    [[dependencies.source]]
                    name = "kit-gwt-bridge"
                    executable-targets = ["gwt"]
                    [[dependencies.source]]
                    name = "kit-jre-bridge"
                    executable-targets = ["jre"]
                    "#,
                ),
                (
                    "kit-gwt-bridge",
                    r#"dependencies = { source = ["bridge-core"] }"#,
                ),
                ("kit-jre-bridge", ""),
                ("bridge-core", ""),
                (
                    "app-gwt",
                    r#"
                    module = { executable = true }
                    dependencies = { source = ["kit"] }
                    "#,
                ),
                (
                    "app-jre",
                    r#"
                    module = { executable = true }
                    dependencies = { source = ["kit"] }
                    "#,
                ),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn scoped_dependencies_are_promoted_for_matching_executables() {
        let mut analyzer = scoped_workspace();
        let kit = id(&mut analyzer, "kit");
        let app_gwt = id(&mut analyzer, "app-gwt");
        let app_jre = id(&mut analyzer, "app-jre");

        // a library only ever sees them as scoped
        assert!(analyzer.direct_dependencies(kit).unwrap().is_empty());
        let scoped = analyzer.executable_scoped_dependencies(kit).unwrap();
        assert_eq!(scoped.len(), 2);

        let direct = analyzer.direct_dependencies(app_gwt).unwrap();
        assert_eq!(destinations(&analyzer, &direct), ["kit", "kit-gwt-bridge"]);
        assert!(direct.iter().all(|dep| dep.source == app_gwt));

        let transitive = analyzer.transitive_dependencies(app_gwt).unwrap();
        let transitive = names(&analyzer, &transitive);
        assert!(transitive.contains(&"bridge-core".to_owned()));

        let direct = analyzer.direct_dependencies(app_jre).unwrap();
        assert_eq!(destinations(&analyzer, &direct), ["kit", "kit-jre-bridge"]);
    }

    #[test]
    fn cyclic_loops_are_reported_once() {
        let mut analyzer = analyzer(&[
            ("a", r#"dependencies = { source = ["b"] }"#),
            ("b", r#"dependencies = { source = ["c"] }"#),
            ("c", r#"dependencies = { source = ["a"] }"#),
            ("d", r#"dependencies = { source = ["a"] }"#),
        ]);
        let modules = ["a", "b", "c", "d"].map(|name| id(&mut analyzer, name));

        let loops =
            analyzer.analyze_cyclic_dependencies_loops(&modules).unwrap();
        assert_eq!(loops.len(), 1);

        let mut members = names(&analyzer, &loops[0]);
        members.sort();
        assert_eq!(members, ["a", "b", "c"]);

        // cycles don't prevent closures from terminating
        let transitive = analyzer.transitive_dependencies(modules[3]).unwrap();
        assert_eq!(names(&analyzer, &transitive), ["a", "b", "c"]);
    }
}
