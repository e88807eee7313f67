//! Service provider resolution for executables.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::{
    error::{ReferenceKind, ResolveError, Result},
    graph::DependencyGraph,
    module::{DependencyKind, ModuleId},
    registry::ModuleRegistry,
    target::Target,
};

use super::{
    DependencyAnalyzer,
    closure::ClosureContext,
    tiebreak::{TieBreakContext, break_ties},
};

/// The providers chosen for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Providers {
    pub spi: Box<str>,
    /// At most one module for a required service, every compatible one for
    /// an optional service.
    pub modules: Box<[ModuleId]>,
    pub optional: bool,
}

/// The modules providing each service, kept in discovery order and extended
/// as the registry discovers more modules.
#[derive(Debug, Default)]
pub(crate) struct ProviderIndex {
    indexed: usize,
    by_service: HashMap<Box<str>, Vec<ModuleId>>,
}

impl ProviderIndex {
    fn update(&mut self, registry: &ModuleRegistry) {
        let discovered = registry.discovered();

        for &id in discovered.get(self.indexed..).unwrap_or_default() {
            let Some(descriptor) = registry.module(id).descriptor() else {
                continue;
            };

            for service in descriptor.services.provides.keys() {
                self.by_service.entry(service.clone()).or_default().push(id);
            }
        }

        self.indexed = discovered.len();
    }

    fn providers_of(&self, service: &str) -> &[ModuleId] {
        self.by_service.get(service).map(Vec::as_slice).unwrap_or_default()
    }
}

impl DependencyAnalyzer {
    /// Every provider of `spi` that `requester` could use, in discovery
    /// order. Fails if no module in the universe provides `spi` at all.
    pub fn service_providers(
        &mut self,
        spi: &str,
        requester: ModuleId,
    ) -> Result<Vec<ModuleId>> {
        self.registry.modules_in_discovery_order()?;
        self.providers.update(&self.registry);

        if self.providers.providers_of(spi).is_empty() {
            return Err(ResolveError::unresolved(
                ReferenceKind::Service,
                spi,
                self.registry.module(requester).name(),
            ));
        }

        let target = self.registry.module(requester).target().clone();
        Ok(self.provider_candidates(requester, spi, &target))
    }

    /// Resolves every service used by the executable `id` or anything in
    /// `closure`, its dependencies before providers are added.
    ///
    /// Newly chosen providers and their own dependencies are scanned for
    /// further services until no new provider turns up. Returns the
    /// providers per service, in the order services were first seen, and
    /// every provider module chosen.
    pub(super) fn resolve_providers(
        &mut self,
        id: ModuleId,
        closure: &[ModuleId],
        context: ClosureContext,
    ) -> Result<(Vec<Providers>, Vec<ModuleId>)> {
        self.registry.modules_in_discovery_order()?;
        self.providers.update(&self.registry);

        let target = self.registry.module(id).target().clone();
        let overrides = self.provider_overrides(id)?;

        let mut walked: IndexSet<ModuleId> =
            std::iter::once(id).chain(closure.iter().copied()).collect();
        let mut resolved: IndexMap<Box<str>, Providers> = IndexMap::new();
        let mut chosen: IndexSet<ModuleId> = IndexSet::new();
        let mut scanned = 0;

        while scanned < walked.len() {
            let usages = walked
                .iter()
                .skip(scanned)
                .flat_map(|&module| {
                    let module = self.registry.module(module);
                    let required = module.required_services().iter();
                    let optional = module.optional_services().iter();

                    required
                        .map(|spi| (spi.clone(), false))
                        .chain(optional.map(|spi| (spi.clone(), true)))
                })
                .collect::<Vec<_>>();

            scanned = walked.len();
            let mut added = Vec::new();

            for (spi, optional) in usages {
                if resolved.contains_key(&spi) {
                    continue;
                }

                let candidates = self.provider_candidates(id, &spi, &target);

                let modules = match (optional, candidates.len()) {
                    (true, _) | (false, 0 | 1) => candidates,
                    (false, _) => {
                        let proximity =
                            self.proximity_order(id, &walked, &candidates)?;

                        let context = TieBreakContext {
                            registry: &self.registry,
                            target: &target,
                            overrides: &overrides,
                            proximity: &proximity,
                        };

                        break_ties(&candidates, &context).into_iter().collect()
                    }
                };

                if modules.is_empty() && !optional {
                    debug!(
                        executable = %self.registry.module(id),
                        service = %spi,
                        "no provider found for required service"
                    );
                }

                for &module in &modules {
                    if chosen.insert(module) {
                        added.push(module);
                    }
                }

                trace!(
                    service = %spi,
                    providers = modules.len(),
                    "resolved service"
                );

                resolved.insert(
                    spi.clone(),
                    Providers {
                        spi,
                        modules: modules.into_boxed_slice(),
                        optional,
                    },
                );
            }

            for provider in added {
                walked.insert(provider);

                let direct = self.direct_dependencies(provider)?;
                walked.extend(self.closure(provider, &direct, context)?);
            }
        }

        Ok((resolved.into_values().collect(), chosen.into_iter().collect()))
    }

    /// The modules an executable asks for by name as plugins, directly or
    /// through its application module.
    fn provider_overrides(&mut self, id: ModuleId) -> Result<Vec<ModuleId>> {
        let owners = std::iter::once(id)
            .chain(self.application_module(id)?)
            .collect::<Vec<_>>();

        let mut overrides = Vec::new();

        for owner in owners {
            overrides.extend(
                self.declared_dependencies(owner)?
                    .iter()
                    .filter(|dep| dep.kind == DependencyKind::Plugin)
                    .map(|dep| dep.destination),
            );
        }

        Ok(overrides)
    }

    /// Providers of `spi` usable by the executable `id`: compatible with its
    /// target, neither deprecated nor executable themselves.
    fn provider_candidates(
        &self,
        id: ModuleId,
        spi: &str,
        target: &Target,
    ) -> Vec<ModuleId> {
        self.providers
            .providers_of(spi)
            .iter()
            .copied()
            .filter(|&candidate| {
                let module = self.registry.module(candidate);

                candidate != id
                    && !module.is_deprecated()
                    && !module.is_executable()
                    && module.target().is_compatible_with(target)
            })
            .collect()
    }

    /// Sorts the executable, everything walked so far and the candidates
    /// topologically, so that modules the executable reaches first come
    /// first.
    fn proximity_order(
        &mut self,
        id: ModuleId,
        walked: &IndexSet<ModuleId>,
        candidates: &[ModuleId],
    ) -> Result<Vec<ModuleId>> {
        let mut graph = DependencyGraph::new();

        for &module in walked.iter().chain(candidates) {
            graph.add_module(module);
        }

        let modules = graph.modules().collect::<Vec<_>>();

        for &module in &modules {
            // the executable itself is mid-resolution and yields its source
            // dependencies here
            for dep in self.direct_dependencies(module)?.iter() {
                if graph.contains(dep.destination) {
                    graph.add_dependency(module, dep.destination);
                }
            }
        }

        trace!(
            executable = %self.registry.module(id),
            modules = modules.len(),
            "sorting providers by proximity"
        );

        Ok(graph.topological_order())
    }
}
