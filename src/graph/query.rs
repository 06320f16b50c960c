//! Read-only projections over a snapshot.

use std::collections::BTreeSet;
use std::path::Path;

use super::types::{Snapshot, TypeDeclaration};

/// Aggregate counts over a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub files: usize,
    pub declarations: usize,
    pub synthetic: usize,
    /// Total outgoing edges across all declarations.
    pub edges: usize,
}

impl Snapshot {
    /// All declarations, synthetic entries included, in name order.
    pub fn declarations(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.declarations.values()
    }

    /// Look up one declaration by name.
    pub fn declaration(&self, name: &str) -> Option<&TypeDeclaration> {
        self.declarations.get(name)
    }

    /// Names of everything that depends on `name` through inheritance,
    /// interface implementation or mixin composition. Empty if `name` is
    /// absent or has no dependents.
    pub fn dependents_of(&self, name: &str) -> BTreeSet<String> {
        self.declarations
            .get(name)
            .map(|d| d.dependents.clone())
            .unwrap_or_default()
    }

    /// Declarations sourced from one file. The path must be the absolute
    /// path the enumerator reported.
    pub fn declarations_in(&self, path: &Path) -> Vec<&TypeDeclaration> {
        self.files
            .get(path)
            .map(|record| {
                record
                    .declared_names
                    .iter()
                    .filter_map(|name| self.declarations.get(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stats(&self) -> SnapshotStats {
        let synthetic = self.declarations.values().filter(|d| d.synthetic).count();
        let edges = self
            .declarations
            .values()
            .map(|d| d.edge_targets().count())
            .sum();
        SnapshotStats {
            files: self.files.len(),
            declarations: self.declarations.len(),
            synthetic,
            edges,
        }
    }
}
