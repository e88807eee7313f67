//! The module registry: the arena of every known module, the discovery
//! process that grows it, and the package-ownership index built over it.
//!
//! Nothing is enumerated eagerly. Registering a root only queues its
//! location; modules are read from their [`DescriptorSource`] when a lookup
//! needs to look further, one discovery step at a time. Discovery order is
//! deterministic: the catalogue first, then each root's tree depth-first with
//! children in sorted order, then libraries in the order they were declared.

use std::path::Path;

use tracing::{debug, trace, warn};

use crate::{
    catalogue::PlatformCatalogue,
    descriptor::{DescriptorSource, LibraryDescriptor},
    error::{ReferenceKind, ResolveError, Result, UnsuitableReason},
    module::{Module, ModuleId, ModuleKind, ProjectModule},
    stream::{Cursor, LazyStream},
    target::TOKEN_SEPARATOR,
};

use discovery::{DiscoveryStep, PendingProject, Queues, Universe};
use packages::{Claim, PackageIndex};

mod discovery;
pub mod packages;

#[derive(Debug)]
pub struct ModuleRegistry {
    universe: Universe,
    queues: Queues,
    stream: LazyStream<ModuleId>,
    /// Parked position of name lookups.
    lookup: Cursor,
    /// Position up to which packages have been indexed.
    declaration: Cursor,
    packages: PackageIndex,
}

/// Builds a [`DiscoveryStep`] from disjoint fields of a registry, so that
/// the stream and the cursors stay borrowable alongside it.
macro_rules! step {
    ($registry:expr) => {
        &mut DiscoveryStep {
            universe: &mut $registry.universe,
            queues: &mut $registry.queues,
        }
    };
}

impl ModuleRegistry {
    /// Creates a registry whose first modules are the entries of
    /// `catalogue`.
    pub fn new(catalogue: &PlatformCatalogue) -> Self {
        let mut universe = Universe::default();
        let mut platform = Vec::with_capacity(catalogue.len());

        for entry in catalogue.entries() {
            let Some(id) = universe.push_library(
                ModuleKind::Platform,
                &entry.to_library(),
                None,
            ) else {
                continue;
            };

            if let Some(target) = &entry.target {
                universe.modules[id.index()].target = target.clone();
            }

            platform.push(id);
        }

        ModuleRegistry {
            universe,
            queues: Queues::default(),
            stream: LazyStream::with_items(platform),
            lookup: Cursor::new(),
            declaration: Cursor::new(),
            packages: PackageIndex::new(),
        }
    }

    /// Queues the module tree rooted at `location` for discovery.
    ///
    /// Roots are discovered in registration order, each after every tree
    /// registered before it.
    pub fn register_root(
        &mut self,
        location: impl AsRef<Path>,
        kind: ModuleKind,
        source: impl DescriptorSource + 'static,
    ) {
        let source_index = self.universe.sources.len();
        self.universe.sources.push(Box::new(source));

        self.queues.projects.push_back(PendingProject {
            location: location.as_ref().into(),
            kind,
            source: source_index,
            parent: None,
        });

        self.stream.reopen();
    }

    /// Makes a third-party library known to the registry, as if some module
    /// had declared it.
    pub fn register_library(&mut self, descriptor: &LibraryDescriptor) {
        self.queues.declare_library(descriptor);
        self.stream.reopen();
    }

    /// Returns the module with the given `id`.
    ///
    /// # Panics
    /// Panics if `id` was not issued by this registry.
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.universe.modules[id.index()]
    }

    /// The modules discovered so far, in id order.
    pub fn modules(&self) -> &[Module] {
        &self.universe.modules
    }

    /// The modules discovered so far, in discovery order.
    pub fn discovered(&self) -> &[ModuleId] {
        self.stream.materialized()
    }

    /// The root modules discovered so far, in registration order.
    pub fn roots(&self) -> &[ModuleId] {
        &self.universe.roots
    }

    /// Discovers the whole module universe and returns it in discovery order.
    pub fn modules_in_discovery_order(&mut self) -> Result<&[ModuleId]> {
        self.stream.drain(step!(self))
    }

    /// Finds a module by name, searching workspace modules, then libraries,
    /// then the platform catalogue. Discovery only runs as far as needed.
    pub fn find_module(&mut self, name: &str) -> Result<Option<ModuleId>> {
        if let Some(id) = self.universe.get(name) {
            return Ok(Some(id));
        }

        self.stream.resume_until(&mut self.lookup, step!(self), |_, step| {
            step.universe.get(name).is_some()
        })?;

        Ok(self.universe.get(name))
    }

    /// Like [`find_module`](Self::find_module), but fails if nothing matches.
    pub fn require_module(
        &mut self,
        name: &str,
        requester: ModuleId,
    ) -> Result<ModuleId> {
        match self.find_module(name)? {
            Some(id) => Ok(id),
            None => Err(ResolveError::unresolved(
                ReferenceKind::Module,
                name,
                self.module(requester).name(),
            )),
        }
    }

    /// Walks filesystem parents up to the root of the tree containing `id`.
    /// Libraries report the library that pulled them in.
    pub fn root_of(&self, id: ModuleId) -> ModuleId {
        let module = self.module(id);

        match (module.as_project(), module.as_library()) {
            (Some(project), _) => project.root(),
            (None, Some(library)) => library.root_library().unwrap_or(id),
            (None, None) => id,
        }
    }

    /// The first-level children of `id`, in discovery order.
    pub fn children(&mut self, id: ModuleId) -> Result<&[ModuleId]> {
        while self.queues.has_pending_child(id) {
            if self.stream.next(&mut self.lookup, step!(self))?.is_none() {
                break;
            }
        }

        Ok(self
            .module(id)
            .as_project()
            .map(ProjectModule::children)
            .unwrap_or_default())
    }

    /// Every descendant of `id`, depth first.
    pub fn all_children(&mut self, id: ModuleId) -> Result<Vec<ModuleId>> {
        let mut descendants = Vec::new();
        let mut stack = self.children(id)?.to_vec();
        stack.reverse();

        while let Some(child) = stack.pop() {
            descendants.push(child);
            stack.extend(self.children(child)?.iter().rev());
        }

        Ok(descendants)
    }

    /// The module `id` is built as part of: its declared build parent if it
    /// names one, and otherwise its filesystem parent.
    pub fn build_parent(&mut self, id: ModuleId) -> Result<Option<ModuleId>> {
        let module = self.module(id);

        match module.declared_build_parent() {
            Some(name) => {
                let name: Box<str> = name.into();
                self.require_module(&name, id).map(Some)
            }
            None => Ok(module.as_project().and_then(|p| p.filesystem_parent())),
        }
    }

    /// Returns the module that owns `package` on behalf of `requester`.
    ///
    /// A requester that declares the package itself owns it. Otherwise the
    /// first claimant in discovery order does, and declaration continues only
    /// until some module claims the package. If none does, the lookup fails
    /// unless `silent` is set.
    pub fn package_owner(
        &mut self,
        package: &str,
        requester: ModuleId,
        silent: bool,
    ) -> Result<Option<ModuleId>> {
        match self.lookup_package(package, requester)? {
            Some(owner) => Ok(Some(owner)),
            None if silent => Ok(None),
            None => Err(ResolveError::unresolved(
                ReferenceKind::Package,
                package,
                self.module(requester).name(),
            )),
        }
    }

    /// Every module claiming `package`, in claim order.
    pub fn package_claimants(&mut self, package: &str) -> Result<&[ModuleId]> {
        self.declare_until(|_| false)?;
        Ok(self.packages.claimants(package))
    }

    /// Like [`package_owner`](Self::package_owner), but also checks that the
    /// owner can serve `requester`. If it cannot, the first later claimant
    /// that can is used instead.
    pub fn suitable_package_owner(
        &mut self,
        package: &str,
        requester: ModuleId,
    ) -> Result<ModuleId> {
        let Some(owner) = self.lookup_package(package, requester)? else {
            return Err(ResolveError::unresolved(
                ReferenceKind::Package,
                package,
                self.module(requester).name(),
            ));
        };

        if owner == requester {
            return Ok(owner);
        }

        let Some(reason) = self.is_suitable_module(requester, owner)? else {
            return Ok(owner);
        };

        let claimants = self.package_claimants(package)?.to_vec();
        for claimant in claimants.into_iter().filter(|&c| c != owner) {
            if self.is_suitable_module(requester, claimant)?.is_none() {
                warn!(
                    package,
                    requester = %self.module(requester),
                    owner = %self.module(owner),
                    used = %self.module(claimant),
                    %reason,
                    "package owner is unsuitable, using a later claimant"
                );
                return Ok(claimant);
            }
        }

        Err(ResolveError::Unsuitable {
            package: package.into(),
            module: self.module(owner).name.clone(),
            requester: self.module(requester).name.clone(),
            reason,
        })
    }

    /// Checks whether `owner` may be used as a dependency of `requester`,
    /// returning the reason if it may not.
    pub fn is_suitable_module(
        &mut self,
        requester: ModuleId,
        owner: ModuleId,
    ) -> Result<Option<UnsuitableReason>> {
        let (req, own) = (self.module(requester), self.module(owner));

        if own.is_executable() {
            return Ok(Some(UnsuitableReason::ExecutableModule));
        }

        if !own.target().is_compatible_with(req.target()) {
            return Ok(Some(UnsuitableReason::IncompatibleTarget {
                module_target: own.target().clone(),
                requester_target: req.target().clone(),
            }));
        }

        if req.is_executable() {
            return Ok(None);
        }

        match self.implemented_interface(owner)? {
            Some(interface) if interface != requester => {
                Ok(Some(UnsuitableReason::InterfaceImplementer {
                    interface: self.module(interface).name.clone(),
                }))
            }
            _ => Ok(None),
        }
    }

    /// Returns the interface module that `id` implements, either because it
    /// says so or because its name extends the interface's name with target
    /// tags.
    pub fn implemented_interface(
        &mut self,
        id: ModuleId,
    ) -> Result<Option<ModuleId>> {
        let module = self.module(id);
        let explicit = module.explicit_implementations().to_vec();
        let name = module.name.clone();

        for interface in explicit {
            if let Some(found) = self.find_module(&interface)? {
                return Ok(Some(found));
            }
        }

        if self.module(id).target().is_empty() {
            return Ok(None);
        }

        let prefixes = name
            .match_indices(TOKEN_SEPARATOR)
            .map(|(index, _)| &name[..index]);

        for prefix in prefixes {
            if let Some(found) = self.find_module(prefix)? {
                if implements(self.module(id), self.module(found)) {
                    return Ok(Some(found));
                }
            }
        }

        Ok(None)
    }

    /// Returns `true` if `module` implements `interface`.
    pub fn implements(&self, module: ModuleId, interface: ModuleId) -> bool {
        implements(self.module(module), self.module(interface))
    }

    fn lookup_package(
        &mut self,
        package: &str,
        requester: ModuleId,
    ) -> Result<Option<ModuleId>> {
        if self.module(requester).declares_package(package) {
            return Ok(Some(requester));
        }

        self.declare_until(|packages| packages.owner(package).is_some())?;
        Ok(self.packages.owner(package))
    }

    /// Indexes the packages of discovered modules until `done` holds or
    /// discovery is exhausted.
    fn declare_until(
        &mut self,
        mut done: impl FnMut(&PackageIndex) -> bool,
    ) -> Result {
        while !done(&self.packages) {
            let Some(id) =
                self.stream.next(&mut self.declaration, step!(self))?
            else {
                break;
            };

            self.declare(id);
        }

        Ok(())
    }

    fn declare(&mut self, id: ModuleId) {
        let module = &self.universe.modules[id.index()];

        for package in module.declared_packages() {
            let Claim::Contested { owner } = self.packages.claim(package, id)
            else {
                continue;
            };

            let owner = &self.universe.modules[owner.index()];

            if implements(module, owner) {
                trace!(
                    package,
                    owner = %owner,
                    module = %module,
                    "implementer re-declares package"
                );
            } else if module.is_workspace_authored() {
                warn!(
                    package,
                    owner = %owner,
                    module = %module,
                    "package is contested, the first claimant owns it"
                );
            } else {
                debug!(
                    package,
                    owner = %owner,
                    module = %module,
                    "package is contested, the first claimant owns it"
                );
            }
        }
    }
}

fn implements(module: &Module, interface: &Module) -> bool {
    if module
        .explicit_implementations()
        .iter()
        .any(|name| name.as_ref() == interface.name())
    {
        return true;
    }

    interface.is_interface()
        && !module.target().is_empty()
        && module
            .name()
            .strip_prefix(interface.name())
            .is_some_and(|rest| rest.starts_with(TOKEN_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{catalogue::CatalogueEntry, descriptor::memory::MemorySource};

    fn registry(source: MemorySource) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new(&PlatformCatalogue::builtin());
        registry.register_root("ws", ModuleKind::Workspace, source);
        registry
    }

    fn names(registry: &ModuleRegistry, ids: &[ModuleId]) -> Vec<String> {
        ids.iter()
            .map(|&id| registry.module(id).name().to_owned())
            .collect()
    }

    fn workspace() -> MemorySource {
        MemorySource::new()
            .with_toml("ws", "")
            .and_then(|s| {
                s.with_toml(
                    "ws/kit",
                    r#"
                    packages = { declared = ["dev.kit"] }
                    [[libraries]]
                    name = "elemental2-core"
                    packages = ["elemental2.core"]
                    requires = ["jsinterop-base"]
                    [[libraries]]
                    name = "jsinterop-base"
                    packages = ["jsinterop.base"]
                    "#,
                )
            })
            .and_then(|s| {
                s.with_toml(
                    "ws/kit/kit-web",
                    r#"packages = { declared = ["dev.kit.web"] }"#,
                )
            })
            .and_then(|s| {
                s.with_toml(
                    "ws/app",
                    r#"packages = { declared = ["dev.kit"] }"#,
                )
            })
            .and_then(|s| {
                s.with_toml("ws/app/app-gwt", "module = { executable = true }")
            })
            .unwrap()
    }

    #[test]
    fn discovery_order_is_depth_first_and_sorted() {
        let mut registry = registry(workspace());
        let catalogue = PlatformCatalogue::builtin().len();

        let order = registry.modules_in_discovery_order().unwrap().to_vec();
        assert_eq!(
            names(&registry, &order[catalogue..]),
            [
                "ws",
                "app",
                "app-gwt",
                "kit",
                "kit-web",
                "elemental2-core",
                "jsinterop-base"
            ]
        );
    }

    #[test]
    fn lookups_discover_only_as_far_as_needed() {
        let mut registry = registry(workspace());

        let kit = registry.find_module("kit").unwrap().unwrap();
        assert_eq!(registry.module(kit).kind(), ModuleKind::Workspace);
        assert!(!registry.stream.is_exhausted());

        // already discovered, so nothing new is read
        let before = registry.discovered().len();
        assert!(registry.find_module("app-gwt").unwrap().is_some());
        assert_eq!(registry.discovered().len(), before);

        // one more step reaches the next module
        assert!(registry.find_module("kit-web").unwrap().is_some());
        assert_eq!(registry.discovered().len(), before + 1);
    }

    #[test]
    fn missing_modules_are_unresolved() {
        let mut registry = registry(workspace());
        let app = registry.find_module("app").unwrap().unwrap();

        assert!(registry.find_module("nowhere").unwrap().is_none());
        let err = registry.require_module("nowhere", app).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unresolved module `nowhere` requested by `app`"
        );
    }

    #[test]
    fn libraries_are_imported_with_their_requirements() {
        let mut registry = registry(workspace());

        let base = registry.find_module("jsinterop-base").unwrap().unwrap();
        let core = registry.find_module("elemental2-core").unwrap().unwrap();

        assert_eq!(registry.module(base).kind(), ModuleKind::ThirdParty);
        assert_eq!(registry.root_of(base), core);
        assert_eq!(registry.root_of(core), core);
    }

    #[test]
    fn tree_views() {
        let mut registry = registry(workspace());
        let root = registry.find_module("ws").unwrap().unwrap();

        let children = registry.children(root).unwrap().to_vec();
        assert_eq!(names(&registry, &children), ["app", "kit"]);

        let all = registry.all_children(root).unwrap();
        assert_eq!(
            names(&registry, &all),
            ["app", "app-gwt", "kit", "kit-web"]
        );

        let kit_web = registry.find_module("kit-web").unwrap().unwrap();
        assert_eq!(registry.root_of(kit_web), root);

        let kit = registry.find_module("kit").unwrap().unwrap();
        assert_eq!(registry.build_parent(kit_web).unwrap(), Some(kit));
    }

    #[test]
    fn first_claimant_owns_packages() {
        let mut registry = registry(workspace());
        let kit = registry.find_module("kit").unwrap().unwrap();
        let app = registry.find_module("app").unwrap().unwrap();
        let app_gwt = registry.find_module("app-gwt").unwrap().unwrap();

        // app is discovered before kit, so it owns the shared package
        let owner = registry.package_owner("dev.kit", app_gwt, false).unwrap();
        assert_eq!(owner, Some(app));
        assert_eq!(registry.package_claimants("dev.kit").unwrap(), &[app, kit]);

        // a module declaring the package itself is its own owner
        let owner = registry.package_owner("dev.kit", kit, false).unwrap();
        assert_eq!(owner, Some(kit));
    }

    #[test]
    fn repeated_catalogue_entries_register_once() {
        let entry = CatalogueEntry {
            name: "java.base".into(),
            packages: vec!["java.lang".into()],
            target: None,
        };
        let shadow = CatalogueEntry {
            packages: vec!["java.util".into()],
            ..entry.clone()
        };

        let mut registry =
            ModuleRegistry::new(&PlatformCatalogue::new(vec![entry, shadow]));
        let bases = registry
            .modules()
            .iter()
            .filter(|module| module.name() == "java.base")
            .count();
        assert_eq!(bases, 1);

        // the first entry wins, packages included
        let base = registry.find_module("java.base").unwrap().unwrap();
        assert_eq!(
            registry.package_owner("java.lang", base, true).unwrap(),
            Some(base)
        );
        assert!(registry.package_claimants("java.util").unwrap().is_empty());
    }

    #[test]
    fn platform_packages_belong_to_the_catalogue() {
        let mut registry = registry(workspace());
        let kit = registry.find_module("kit").unwrap().unwrap();

        let owner = registry.package_owner("java.util", kit, false).unwrap();
        assert_eq!(registry.module(owner.unwrap()).name(), "java.base");
        assert_eq!(
            registry.module(owner.unwrap()).kind(),
            ModuleKind::Platform
        );

        let owner = registry.package_owner("dev.none", kit, true).unwrap();
        assert!(owner.is_none());
        let err = registry.package_owner("dev.none", kit, false).unwrap_err();
        assert!(matches!(err, ResolveError::Unresolved { .. }));
    }

    fn interfaces() -> MemorySource {
        MemorySource::new()
            .with_toml("ws", "")
            .and_then(|s| {
                s.with_toml(
                    "ws/css",
                    r#"
                    module = { interface = true }
                    packages = { declared = ["dev.css"] }
                    "#,
                )
            })
            .and_then(|s| {
                s.with_toml(
                    "ws/css-web",
                    r#"packages = { declared = ["dev.css"] }"#,
                )
            })
            .and_then(|s| {
                s.with_toml(
                    "ws/theme",
                    r#"
                    packages = { declared = ["dev.theme"] }
                    module = { implements = ["css"] }
                    "#,
                )
            })
            .and_then(|s| {
                s.with_toml(
                    "ws/widgets",
                    r#"packages = { declared = ["dev.theme"] }"#,
                )
            })
            .and_then(|s| {
                s.with_toml("ws/web-app", "module = { executable = true }")
            })
            .and_then(|s| {
                s.with_toml(
                    "ws/desktop-jre",
                    r#"packages = { declared = ["dev.desktop"] }"#,
                )
            })
            .and_then(|s| {
                s.with_toml(
                    "ws/tool-gwt",
                    r#"packages = { used = ["dev.desktop"] }"#,
                )
            })
            .unwrap()
    }

    #[test]
    fn implementers_are_recognised() {
        let mut registry = registry(interfaces());
        let css = registry.find_module("css").unwrap().unwrap();
        let css_web = registry.find_module("css-web").unwrap().unwrap();
        let theme = registry.find_module("theme").unwrap().unwrap();

        assert_eq!(registry.implemented_interface(css_web).unwrap(), Some(css));
        assert_eq!(registry.implemented_interface(theme).unwrap(), Some(css));
        assert_eq!(registry.implemented_interface(css).unwrap(), None);
        assert!(registry.implements(css_web, css));
    }

    #[test]
    fn unsuitable_owners_fall_back_to_later_claimants() {
        let mut registry = registry(interfaces());
        let widgets = registry.find_module("widgets").unwrap().unwrap();
        let web_app = registry.find_module("web-app").unwrap().unwrap();
        let theme = registry.find_module("theme").unwrap().unwrap();

        // theme claims dev.theme first, but implements an interface
        let owner = registry.suitable_package_owner("dev.theme", web_app);
        assert_eq!(owner.unwrap(), theme);

        let reason = registry.is_suitable_module(widgets, theme).unwrap();
        assert_eq!(
            reason,
            Some(UnsuitableReason::InterfaceImplementer {
                interface: "css".into()
            })
        );

        let desktop = registry.find_module("desktop-jre").unwrap().unwrap();
        let owner = registry.suitable_package_owner("dev.theme", desktop);
        assert_eq!(owner.unwrap(), widgets);

        let css = registry.find_module("css").unwrap().unwrap();
        let reason = registry.is_suitable_module(css, web_app).unwrap();
        assert_eq!(reason, Some(UnsuitableReason::ExecutableModule));
    }

    #[test]
    fn incompatible_owners_are_rejected() {
        let mut registry = registry(interfaces());
        let tool = registry.find_module("tool-gwt").unwrap().unwrap();

        let err = registry
            .suitable_package_owner("dev.desktop", tool)
            .unwrap_err();

        assert!(matches!(
            err,
            ResolveError::Unsuitable {
                reason: UnsuitableReason::IncompatibleTarget { .. },
                ..
            }
        ));
    }

    /// Collects formatted log output written while a test runs.
    #[derive(Debug, Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn contested_packages_warn_only_for_workspace_modules() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();

        let mut registry = registry(interfaces());
        tracing::subscriber::with_default(subscriber, || {
            registry.package_claimants("dev.theme").unwrap();
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone())
            .unwrap();
        let warnings = output
            .lines()
            .filter(|line| line.contains("WARN"))
            .collect::<Vec<_>>();

        // widgets loses dev.theme to theme
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("module=widgets"));
        assert!(warnings[0].contains("owner=theme"));

        // css-web re-declares the packages of the interface it implements
        let redeclared = output
            .lines()
            .find(|line| line.contains("implementer re-declares package"))
            .unwrap();
        assert!(redeclared.contains("TRACE"));
        assert!(redeclared.contains("module=css-web"));

        let theme = registry.find_module("theme").unwrap().unwrap();
        assert_eq!(
            registry.package_owner("dev.theme", theme, false).unwrap(),
            Some(theme)
        );
    }
}
