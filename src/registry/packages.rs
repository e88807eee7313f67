//! The package-ownership index.

use std::collections::HashMap;

use crate::{
    module::ModuleId,
    symbol::{Interner, Symbol},
};

/// The result of recording a claim on a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The module is the first to claim the package, and owns it.
    Owner,
    /// Another module claimed the package first.
    Contested { owner: ModuleId },
    /// The module had already claimed the package.
    Repeated,
}

/// Maps every declared package to the modules claiming it, in claim order.
/// The first claimant owns the package.
#[derive(Debug, Default)]
pub struct PackageIndex {
    names: Interner,
    claims: HashMap<Symbol, Vec<ModuleId>>,
}

impl PackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, package: &str, module: ModuleId) -> Claim {
        let symbol = self.names.intern(package);
        let claimants = self.claims.entry(symbol).or_default();

        match claimants.first().copied() {
            None => {
                claimants.push(module);
                Claim::Owner
            }
            Some(_) if claimants.contains(&module) => Claim::Repeated,
            Some(owner) => {
                claimants.push(module);
                Claim::Contested { owner }
            }
        }
    }

    pub fn owner(&self, package: &str) -> Option<ModuleId> {
        self.claimants(package).first().copied()
    }

    pub fn claimants(&self, package: &str) -> &[ModuleId] {
        self.names
            .get(package)
            .and_then(|symbol| self.claims.get(&symbol))
            .map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claimant_owns_the_package() {
        let mut index = PackageIndex::new();
        let (a, b) = (ModuleId(0), ModuleId(1));

        assert_eq!(index.claim("dev.kit", a), Claim::Owner);
        assert_eq!(index.claim("dev.kit", b), Claim::Contested { owner: a });
        assert_eq!(index.claim("dev.kit", b), Claim::Repeated);

        assert_eq!(index.owner("dev.kit"), Some(a));
        assert_eq!(index.claimants("dev.kit"), &[a, b]);
        assert_eq!(index.owner("dev.css"), None);
        assert!(index.claimants("dev.css").is_empty());
    }
}
