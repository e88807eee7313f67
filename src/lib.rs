//! Module, interface and service-provider resolution for builds that compile
//! one codebase to several runtime platforms.
//!
//! A [`ModuleRegistry`](registry::ModuleRegistry) discovers modules lazily
//! from one or more [`DescriptorSource`](descriptor::DescriptorSource)s, and a
//! [`DependencyAnalyzer`](analysis::DependencyAnalyzer) computes the
//! dependencies, interface implementations and service providers of each
//! module on demand.

pub mod analysis;
pub mod catalogue;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod module;
pub mod registry;
pub mod report;
pub mod stream;
pub mod symbol;
pub mod target;
