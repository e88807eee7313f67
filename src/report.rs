//! Pretty-printed views of resolution results.

use pretty::RcDoc;

use crate::{
    analysis::DependencyAnalyzer,
    error::Result,
    module::{DependencyKind, ModuleId},
    registry::ModuleRegistry,
};

/// The width reports are laid out for.
pub const WIDTH: usize = 80;

/// A snapshot of what the analyzer knows about one module, with every id
/// already resolved to a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub module: Box<str>,
    pub target: Box<str>,
    pub executable: bool,
    pub direct: Vec<(Box<str>, DependencyKind)>,
    pub transitive: Option<Vec<Box<str>>>,
    pub providers: Option<Vec<ServiceReport>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    pub spi: Box<str>,
    pub optional: bool,
    pub modules: Vec<Box<str>>,
}

impl Resolution {
    pub fn collect(
        analyzer: &mut DependencyAnalyzer,
        id: ModuleId,
        transitive: bool,
        providers: bool,
    ) -> Result<Self> {
        let direct = analyzer.direct_dependencies(id)?;
        let name = |analyzer: &DependencyAnalyzer, id: ModuleId| -> Box<str> {
            analyzer.registry().module(id).name().into()
        };

        let transitive = match transitive {
            true => Some(
                analyzer
                    .transitive_dependencies(id)?
                    .iter()
                    .map(|&module| name(analyzer, module))
                    .collect(),
            ),
            false => None,
        };

        let providers = match providers {
            true => Some(
                analyzer
                    .executable_providers(id)?
                    .iter()
                    .map(|providers| ServiceReport {
                        spi: providers.spi.clone(),
                        optional: providers.optional,
                        modules: providers
                            .modules
                            .iter()
                            .map(|&module| name(analyzer, module))
                            .collect(),
                    })
                    .collect(),
            ),
            false => None,
        };

        let module = analyzer.registry().module(id);

        Ok(Resolution {
            module: module.name().into(),
            target: module.target().to_string().into(),
            executable: module.is_executable(),
            direct: direct
                .iter()
                .map(|dep| (name(analyzer, dep.destination), dep.kind))
                .collect(),
            transitive,
            providers,
        })
    }
}

/// Lays out a resolution as a header line followed by indented sections.
pub fn render_resolution(resolution: &Resolution) -> RcDoc<'static, ()> {
    let mut header = RcDoc::as_string(&resolution.module)
        .append(RcDoc::space())
        .append(RcDoc::as_string(format!("[{}]", resolution.target)));

    if resolution.executable {
        header = header
            .append(RcDoc::space())
            .append(RcDoc::text("executable"));
    }

    let direct = resolution
        .direct
        .iter()
        .map(|(name, kind)| {
            RcDoc::as_string(name)
                .append(RcDoc::space())
                .append(RcDoc::text(format!("({kind})")))
        })
        .collect::<Vec<_>>();

    let mut sections = vec![section("direct", direct)];

    if let Some(transitive) = &resolution.transitive {
        sections.push(inline_section("transitive", transitive));
    }

    if let Some(providers) = &resolution.providers {
        let services = providers
            .iter()
            .map(|service| {
                let spi = match service.optional {
                    true => format!("{}?", service.spi),
                    false => service.spi.to_string(),
                };

                let modules = match service.modules.is_empty() {
                    true => RcDoc::text("(none)"),
                    false => RcDoc::intersperse(
                        service.modules.iter().map(RcDoc::as_string),
                        RcDoc::text(",").append(RcDoc::space()),
                    ),
                };

                RcDoc::as_string(spi)
                    .append(RcDoc::text(" ->"))
                    .append(RcDoc::space())
                    .append(modules)
            })
            .collect();

        sections.push(section("providers", services));
    }

    header.append(
        RcDoc::concat(
            sections
                .into_iter()
                .map(|section| RcDoc::hardline().append(section)),
        )
        .nest(2),
    )
}

/// Lists cyclic loops one per line, as `a -> b -> c -> a`.
pub fn render_cycles(
    registry: &ModuleRegistry,
    loops: &[Box<[ModuleId]>],
) -> RcDoc<'static, ()> {
    if loops.is_empty() {
        return RcDoc::text("no cyclic dependencies");
    }

    let lines = loops.iter().map(|members| {
        let names = members
            .iter()
            .chain(members.first())
            .map(|&id| RcDoc::as_string(registry.module(id).name()));

        RcDoc::intersperse(names, RcDoc::text(" ->").append(RcDoc::line()))
            .nest(2)
            .group()
    });

    RcDoc::intersperse(lines, RcDoc::hardline())
}

/// Lists modules with their provenance and target.
pub fn render_modules(
    registry: &ModuleRegistry,
    modules: &[ModuleId],
) -> RcDoc<'static, ()> {
    let lines = modules.iter().map(|&id| {
        let module = registry.module(id);

        RcDoc::as_string(module.name())
            .append(RcDoc::space())
            .append(RcDoc::as_string(format!("({})", module.kind())))
            .append(match module.target().is_empty() {
                true => RcDoc::nil(),
                false => RcDoc::space()
                    .append(RcDoc::as_string(format!("[{}]", module.target()))),
            })
    });

    RcDoc::intersperse(lines, RcDoc::hardline())
}

/// Renders `doc` at [`WIDTH`] columns.
pub fn to_string(doc: &RcDoc<'static, ()>) -> String {
    format!("{}", doc.pretty(WIDTH))
}

fn section(
    title: &'static str,
    items: Vec<RcDoc<'static, ()>>,
) -> RcDoc<'static, ()> {
    if items.is_empty() {
        return RcDoc::text(title).append(RcDoc::text(": (none)"));
    }

    let items = items.into_iter().map(|item| RcDoc::hardline().append(item));

    RcDoc::text(title)
        .append(RcDoc::text(":"))
        .append(RcDoc::concat(items).nest(2))
}

/// A section whose items fill lines up to the width.
fn inline_section(
    title: &'static str,
    items: &[Box<str>],
) -> RcDoc<'static, ()> {
    if items.is_empty() {
        return RcDoc::text(title).append(RcDoc::text(": (none)"));
    }

    RcDoc::text(title).append(RcDoc::text(":")).append(
        RcDoc::line()
            .append(RcDoc::intersperse(
                items.iter().map(RcDoc::as_string),
                RcDoc::line(),
            ))
            .nest(2)
            .group(),
    )
}
