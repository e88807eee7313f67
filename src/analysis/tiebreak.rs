//! The tie-break chain used when several modules provide the same service.

use tracing::trace;

use crate::{module::ModuleId, registry::ModuleRegistry, target::Target};

/// What the tie-break criteria know about the executable being resolved.
#[derive(Debug, Clone, Copy)]
pub(super) struct TieBreakContext<'a> {
    pub registry: &'a ModuleRegistry,
    pub target: &'a Target,
    /// Plugin dependencies of the executable and its application module.
    pub overrides: &'a [ModuleId],
    /// The executable's dependency graph, in topological order.
    pub proximity: &'a [ModuleId],
}

type Criterion = fn(&[ModuleId], &TieBreakContext<'_>) -> Vec<ModuleId>;

/// Applied in order until a single candidate remains.
const TIE_BREAKS: [(&str, Criterion); 4] = [
    ("explicit override", explicit_override),
    ("platform grade", platform_grade),
    ("workspace authored", workspace_authored),
    ("topological proximity", topological_proximity),
];

/// Picks one of `candidates`, or `None` if there are none.
///
/// A criterion that would eliminate every candidate is skipped, and if all
/// four leave a tie the first remaining candidate wins.
pub(super) fn break_ties(
    candidates: &[ModuleId],
    context: &TieBreakContext<'_>,
) -> Option<ModuleId> {
    let mut remaining = candidates.to_vec();

    for (name, criterion) in TIE_BREAKS {
        if remaining.len() <= 1 {
            break;
        }

        let narrowed = criterion(&remaining, context);
        if !narrowed.is_empty() {
            trace!(
                criterion = name,
                before = remaining.len(),
                after = narrowed.len()
            );
            remaining = narrowed;
        }
    }

    remaining.first().copied()
}

fn explicit_override(
    candidates: &[ModuleId],
    context: &TieBreakContext<'_>,
) -> Vec<ModuleId> {
    candidates
        .iter()
        .copied()
        .filter(|candidate| context.overrides.contains(candidate))
        .collect()
}

fn platform_grade(
    candidates: &[ModuleId],
    context: &TieBreakContext<'_>,
) -> Vec<ModuleId> {
    let grade = |&id: &ModuleId| {
        context
            .registry
            .module(id)
            .target()
            .grade_target_match(context.target)
    };

    let Some(best) = candidates.iter().map(grade).max() else {
        return Vec::new();
    };

    candidates
        .iter()
        .copied()
        .filter(|candidate| grade(candidate) == best)
        .collect()
}

/// Decisive only when exactly one candidate is part of the workspace.
fn workspace_authored(
    candidates: &[ModuleId],
    context: &TieBreakContext<'_>,
) -> Vec<ModuleId> {
    let authored = candidates
        .iter()
        .copied()
        .filter(|&id| context.registry.module(id).is_workspace_authored())
        .collect::<Vec<_>>();

    match authored.len() {
        1 => authored,
        _ => candidates.to_vec(),
    }
}

fn topological_proximity(
    candidates: &[ModuleId],
    context: &TieBreakContext<'_>,
) -> Vec<ModuleId> {
    let rank = |id: &ModuleId| {
        context
            .proximity
            .iter()
            .position(|module| module == id)
            .unwrap_or(usize::MAX)
    };

    candidates
        .iter()
        .copied()
        .min_by_key(rank)
        .into_iter()
        .collect()
}
