//! Central plumbing between CLI commands and the resolution engine.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use modweave::{
    analysis::DependencyAnalyzer,
    config::{ConfigError, ResolverConfig},
    error::{ResolveError, SourceError},
    module::{ModuleId, ModuleKind},
    report::{self, Resolution},
};

/// The public result type of the [`driver`] module.
///
/// [`driver`]: self
pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Source(#[from] SourceError),
    #[error("{0}")]
    Resolve(#[from] ResolveError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no module named `{0}` was found")]
    UnknownModule(Box<str>),
    #[error("found {0} cyclic dependency loop(s)")]
    CyclesFound(usize),
}

#[derive(Debug, Clone)]
pub struct Context {
    pub workspace: Box<Path>,
    pub config: ResolverConfig,
}

impl Context {
    /// Builds a fresh analyzer over the workspace and configured roots.
    pub fn analyzer(&self) -> Result<DependencyAnalyzer> {
        let registry = self.config.build_registry(&self.workspace)?;
        Ok(DependencyAnalyzer::new(
            registry,
            self.config.emulation.clone(),
        ))
    }

    pub fn resolve(
        &self,
        module: &str,
        transitive: bool,
        providers: bool,
    ) -> Result {
        let mut analyzer = self.analyzer()?;
        let id = find_module(&mut analyzer, module)?;

        let resolution =
            Resolution::collect(&mut analyzer, id, transitive, providers)?;
        let doc = report::render_resolution(&resolution);
        println!("{}", report::to_string(&doc));
        Ok(())
    }

    /// Prints the cyclic loops among workspace modules, failing afterwards
    /// if the config asks for it.
    pub fn cycles(&self) -> Result {
        let mut analyzer = self.analyzer()?;

        let workspace = analyzer
            .registry_mut()
            .modules_in_discovery_order()?
            .to_vec()
            .into_iter()
            .filter(|&id| {
                analyzer.registry().module(id).kind() == ModuleKind::Workspace
            })
            .collect::<Vec<_>>();

        let loops = analyzer.analyze_cyclic_dependencies_loops(&workspace)?;
        let doc = report::render_cycles(analyzer.registry(), &loops);
        println!("{}", report::to_string(&doc));

        match !loops.is_empty() && self.config.resolution.fail_on_cycles {
            true => Err(Error::CyclesFound(loops.len())),
            false => Ok(()),
        }
    }

    /// Prints the owner of `package` as seen from the workspace root.
    pub fn owner(&self, package: &str) -> Result {
        let mut analyzer = self.analyzer()?;
        let root = workspace_root(&mut analyzer)?;

        let registry = analyzer.registry_mut();
        let owner = registry.suitable_package_owner(package, root)?;
        let claimants = registry.package_claimants(package)?.len();

        info!(package, claimants, "resolved package owner");
        println!("{}", registry.module(owner).name());
        Ok(())
    }

    pub fn providers(&self, service: &str, module: &str) -> Result {
        let mut analyzer = self.analyzer()?;
        let id = find_module(&mut analyzer, module)?;

        let providers = analyzer.service_providers(service, id)?;
        let doc = report::render_modules(analyzer.registry(), &providers);
        println!("{}", report::to_string(&doc));
        Ok(())
    }

    pub fn modules(&self) -> Result {
        let mut analyzer = self.analyzer()?;
        let registry = analyzer.registry_mut();
        let modules = registry.modules_in_discovery_order()?.to_vec();

        let doc = report::render_modules(registry, &modules);
        println!("{}", report::to_string(&doc));
        Ok(())
    }
}

// UTILITY FUNCTIONS

/// Loads the config at `path`, or `modweave.toml` in the workspace.
pub fn load_config(
    workspace: &Path,
    path: Option<&Path>,
) -> Result<ResolverConfig> {
    match path {
        Some(path) => Ok(ResolverConfig::load(path)?),
        None => Ok(ResolverConfig::load_or_default(workspace)?),
    }
}

pub fn default_workspace() -> Result<Box<Path>> {
    std::env::current_dir()
        .map(PathBuf::into_boxed_path)
        .map_err(|err| err.into())
}

fn find_module(
    analyzer: &mut DependencyAnalyzer,
    name: &str,
) -> Result<ModuleId> {
    analyzer
        .registry_mut()
        .find_module(name)?
        .ok_or_else(|| Error::UnknownModule(name.into()))
}

/// The module at the workspace root, which is always discovered first.
fn workspace_root(analyzer: &mut DependencyAnalyzer) -> Result<ModuleId> {
    let registry = analyzer.registry_mut();

    if registry.roots().is_empty() {
        registry.modules_in_discovery_order()?;
    }

    registry
        .roots()
        .first()
        .copied()
        .ok_or_else(|| Error::UnknownModule("<workspace root>".into()))
}
