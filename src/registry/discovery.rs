//! Discovery steps: visiting one more project module, or importing one more
//! library.

use std::{
    collections::{HashMap, VecDeque},
    path::Path,
};

use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::{
    descriptor::{DescriptorSource, LibraryDescriptor},
    error::{ResolveError, SourceError},
    module::{Module, ModuleId, ModuleKind, ProjectModule},
    stream::Discover,
};

/// Every module known to a registry, plus the sources they are read from.
#[derive(Debug, Default)]
pub(crate) struct Universe {
    pub modules: Vec<Module>,
    pub projects: HashMap<Box<str>, ModuleId>,
    pub libraries: HashMap<Box<str>, ModuleId>,
    pub platform: HashMap<Box<str>, ModuleId>,
    pub roots: Vec<ModuleId>,
    pub sources: Vec<Box<dyn DescriptorSource>>,
}

impl Universe {
    pub fn get(&self, name: &str) -> Option<ModuleId> {
        self.projects
            .get(name)
            .or_else(|| self.libraries.get(name))
            .or_else(|| self.platform.get(name))
            .copied()
    }

    fn next_id(&self) -> ModuleId {
        ModuleId(self.modules.len() as u32)
    }

    /// Registers a library module and returns its id, or `None` if a module
    /// with the same name is already registered.
    pub fn push_library(
        &mut self,
        kind: ModuleKind,
        descriptor: &LibraryDescriptor,
        root_library: Option<ModuleId>,
    ) -> Option<ModuleId> {
        if let Some(existing) = self.get(&descriptor.name) {
            warn!(
                module = %descriptor.name,
                kind = %kind,
                existing = %self.modules[existing.index()].kind,
                "skipping library whose name is already registered"
            );
            return None;
        }

        let id = self.next_id();
        let module = Module::library(id, kind, descriptor, root_library);

        let names = match kind {
            ModuleKind::Platform => &mut self.platform,
            _ => &mut self.libraries,
        };

        names.insert(module.name.clone(), id);
        self.modules.push(module);
        Some(id)
    }
}

/// A module location waiting to be visited.
#[derive(Debug)]
pub(crate) struct PendingProject {
    pub location: Box<Path>,
    pub kind: ModuleKind,
    pub source: usize,
    /// `None` for the root of a tree.
    pub parent: Option<ModuleId>,
}

/// A library waiting to be imported.
#[derive(Debug)]
pub(crate) struct PendingLibrary {
    pub name: Box<str>,
    pub root_library: Option<ModuleId>,
}

#[derive(Debug, Default)]
pub(crate) struct Queues {
    pub projects: VecDeque<PendingProject>,
    pub libraries: VecDeque<PendingLibrary>,
    /// Every library declaration seen so far; the first declaration of a name
    /// wins.
    pub library_decls: IndexMap<Box<str>, LibraryDescriptor>,
}

impl Queues {
    pub fn declare_library(&mut self, descriptor: &LibraryDescriptor) {
        if !self.library_decls.contains_key(&descriptor.name) {
            self.library_decls
                .insert(descriptor.name.clone(), descriptor.clone());
        }

        self.libraries.push_back(PendingLibrary {
            name: descriptor.name.clone(),
            root_library: None,
        });
    }

    /// Returns `true` if some child of `parent` has yet to be visited.
    pub fn has_pending_child(&self, parent: ModuleId) -> bool {
        self.projects
            .iter()
            .any(|pending| pending.parent == Some(parent))
    }
}

/// The mutable state one discovery step needs, borrowed from a registry.
#[derive(Debug)]
pub(crate) struct DiscoveryStep<'a> {
    pub universe: &'a mut Universe,
    pub queues: &'a mut Queues,
}

impl Discover<ModuleId> for DiscoveryStep<'_> {
    type Error = ResolveError;

    /// Visits the next pending project if there is one, and otherwise imports
    /// the next pending library.
    fn discover(
        &mut self,
        out: &mut Vec<ModuleId>,
    ) -> Result<bool, ResolveError> {
        if let Some(pending) = self.queues.projects.pop_front() {
            if let Some(id) = self.visit_project(pending)? {
                out.push(id);
            }

            return Ok(true);
        }

        if let Some(pending) = self.queues.libraries.pop_front() {
            if let Some(id) = self.import_library(pending) {
                out.push(id);
            }

            return Ok(true);
        }

        Ok(false)
    }
}

impl DiscoveryStep<'_> {
    fn visit_project(
        &mut self,
        pending: PendingProject,
    ) -> Result<Option<ModuleId>, ResolveError> {
        let source = &self.universe.sources[pending.source];
        let descriptor = source.descriptor(&pending.location)?;

        let name: Box<str> = match &descriptor.module.name {
            Some(name) => name.clone(),
            None => pending
                .location
                .file_name()
                .and_then(|name| name.to_str())
                .map(Into::into)
                .ok_or_else(|| SourceError::Unnamed(pending.location.clone()))?,
        };

        if let Some(existing) = self.universe.get(&name) {
            let existing = &self.universe.modules[existing.index()];
            warn!(
                module = %name,
                location = %pending.location.display(),
                existing = %existing.kind,
                existing_location = ?existing
                    .as_project()
                    .map(ProjectModule::location),
                "skipping module whose name is already registered"
            );
            return Ok(None);
        }

        let children = match pending.kind.capabilities().reads_children {
            true => source.children(&pending.location)?,
            false => Vec::new(),
        };

        let id = self.universe.next_id();
        let root = match pending.parent {
            Some(parent) => self.universe.modules[parent.index()]
                .as_project()
                .map_or(parent, ProjectModule::root),
            None => id,
        };

        // children go to the front in sorted order, so a subtree is flattened
        // before its next sibling
        for location in children.into_iter().rev() {
            self.queues.projects.push_front(PendingProject {
                location,
                kind: pending.kind,
                source: pending.source,
                parent: Some(id),
            });
        }

        for library in &descriptor.libraries {
            self.queues.declare_library(library);
        }

        trace!(module = %name, kind = %pending.kind, "discovered module");

        let module = Module::project(
            id,
            name.clone(),
            pending.kind,
            ProjectModule {
                location: pending.location,
                root,
                filesystem_parent: pending.parent,
                children: Vec::new(),
                descriptor,
            },
        );

        if let Some(parent) = pending.parent {
            if let Some(project) =
                self.universe.modules[parent.index()].project_mut()
            {
                project.children.push(id);
            }
        } else {
            self.universe.roots.push(id);
        }

        self.universe.projects.insert(name, id);
        self.universe.modules.push(module);
        Ok(Some(id))
    }

    fn import_library(&mut self, pending: PendingLibrary) -> Option<ModuleId> {
        if self.universe.get(&pending.name).is_some() {
            return None;
        }

        let Some(descriptor) = self.queues.library_decls.get(&pending.name)
        else {
            trace!(library = %pending.name, "no declaration for library");
            return None;
        };

        let id = self.universe.push_library(
            ModuleKind::ThirdParty,
            descriptor,
            pending.root_library,
        )?;

        trace!(library = %pending.name, "imported library");

        // requirements are imported right after the library needing them
        let root_library = pending.root_library.unwrap_or(id);
        for required in descriptor.requires.iter().rev() {
            self.queues.libraries.push_front(PendingLibrary {
                name: required.clone(),
                root_library: Some(root_library),
            });
        }

        Some(id)
    }
}
