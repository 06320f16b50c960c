//! # declgraph
//!
//! Incremental declaration-graph explorer for `.decl` source trees.
//!
//! declgraph enumerates a project's declaration files, parses them into a
//! graph of classes, interfaces and mixins, and keeps that graph fresh
//! across runs by re-parsing only the files whose results could have
//! changed. The graph is a value: a [`Snapshot`] of per-file and
//! per-declaration records, including a derived reverse-dependency index,
//! that serializes to JSON and compares with `==`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use declgraph::DeclExplorer;
//!
//! let mut explorer = DeclExplorer::for_project(".").unwrap();
//! explorer.refresh().unwrap();
//!
//! for declaration in explorer.snapshot().declarations() {
//!     println!("{}", declaration.name);
//! }
//! ```

pub mod config;
pub mod error;
pub mod glob;
pub mod graph;
pub mod manifest;
pub mod parser;

// Re-exports for convenience
pub use config::ExplorerConfig;
pub use error::{ExplorerError, Result};
pub use glob::{GlobExplorer, NamespaceRoot};
pub use graph::{
    Diagnostic, FileStamp, GraphBuilder, RebuildStats, Snapshot, SnapshotCache, TypeDeclaration,
    TypeKind,
};
pub use manifest::{EnumerationError, PackageEnumerator, SourceEnumerator};
pub use parser::{DeclParser, SymbolParser};

use std::path::{Path, PathBuf};

use tracing::info;

/// The main explorer instance.
///
/// Owns a source enumerator, the project root and the current snapshot.
/// Each [`refresh`](DeclExplorer::refresh) enumerates the live file set,
/// rebuilds the graph incrementally against the held snapshot and retains
/// the diagnostics of the run.
pub struct DeclExplorer {
    enumerator: Box<dyn SourceEnumerator>,
    project_root: PathBuf,
    snapshot: Snapshot,
    diagnostics: Vec<Diagnostic>,
}

impl DeclExplorer {
    /// Set up an explorer for a project directory using its default
    /// manifest and vendor layout.
    pub fn for_project(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = ExplorerConfig::default();
        let enumerator = PackageEnumerator::new(
            config.resolve_manifest(&root),
            config.resolve_vendor_dir(&root),
        );
        Ok(Self::with_enumerator(root, Box::new(enumerator)))
    }

    /// Set up an explorer with an explicit enumerator. The project root
    /// is only used to relativize source paths in the snapshot.
    pub fn with_enumerator(
        project_root: impl Into<PathBuf>,
        enumerator: Box<dyn SourceEnumerator>,
    ) -> Self {
        Self {
            enumerator,
            project_root: project_root.into(),
            snapshot: Snapshot::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Seed the explorer with a previously persisted snapshot so the
    /// next refresh is incremental against it.
    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Enumerate the live file set and rebuild the graph against the
    /// held snapshot. Returns the statistics of the run. Only
    /// enumeration failures are fatal; parse failures, unresolved
    /// references and duplicate declarations land in
    /// [`diagnostics`](DeclExplorer::diagnostics).
    pub fn refresh(&mut self) -> Result<RebuildStats> {
        let stamps = self.enumerator.enumerate_source_files()?;
        let parser = DeclParser::new(stamps.iter().map(|s| s.path.clone()).collect());
        let rebuilt = GraphBuilder::new(&parser)
            .with_project_root(&self.project_root)
            .rebuild(&self.snapshot, &stamps);
        info!(
            files = rebuilt.stats.files_seen,
            parsed = rebuilt.stats.files_parsed,
            declarations = rebuilt.snapshot.declarations.len(),
            diagnostics = rebuilt.diagnostics.len(),
            "refreshed declaration graph"
        );
        self.snapshot = rebuilt.snapshot;
        self.diagnostics = rebuilt.diagnostics;
        Ok(rebuilt.stats)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Diagnostics from the most recent refresh.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The project root source paths are relativized against.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;

    fn write_manifest(root: &Path) {
        let manifest = serde_json::json!({
            "packages": [
                {
                    "name": "app/core",
                    "autoload": { "dirs": ["src"] }
                }
            ],
            "packages-dev": []
        });
        fs::write(
            root.join("packages.lock"),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn refresh_builds_and_tracks_changes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_manifest(root);
        let pkg = root.join("vendor/app/core/src");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("base.decl"), "interface app.Base\n").unwrap();
        fs::write(pkg.join("user.decl"), "class app.User implements app.Base\n").unwrap();

        let mut explorer = DeclExplorer::for_project(root).unwrap();
        let stats = explorer.refresh().unwrap();
        assert_eq!(stats.files_parsed, 2);
        assert_eq!(stats.declarations_added, 2);
        assert!(explorer.diagnostics().is_empty());
        assert_eq!(
            explorer.snapshot().dependents_of("app.Base"),
            BTreeSet::from(["app.User".to_string()])
        );

        // Removing the interface leaves a synthetic anchor behind.
        fs::remove_file(pkg.join("base.decl")).unwrap();
        explorer.refresh().unwrap();
        let base = explorer.snapshot().declaration("app.Base").unwrap();
        assert!(base.synthetic);
        assert_eq!(base.dependents, BTreeSet::from(["app.User".to_string()]));
        assert!(explorer
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::UnresolvedReference { name } if name == "app.Base")));
    }

    #[test]
    fn seeded_snapshot_makes_refresh_incremental() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_manifest(root);
        let pkg = root.join("vendor/app/core/src");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("base.decl"), "class app.Base\n").unwrap();

        let mut first = DeclExplorer::for_project(root).unwrap();
        first.refresh().unwrap();
        let persisted = first.snapshot().clone();

        let mut second = DeclExplorer::for_project(root)
            .unwrap()
            .with_snapshot(persisted.clone());
        let stats = second.refresh().unwrap();
        assert_eq!(stats.files_parsed, 0);
        assert_eq!(second.snapshot(), &persisted);
    }
}
