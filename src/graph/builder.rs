//! Incremental graph builder.
//!
//! [`GraphBuilder::rebuild`] takes the previous snapshot and the live file
//! listing, determines the minimal set of files to re-parse, re-parses only
//! those, and produces a new snapshot with a freshly patched
//! reverse-dependency index. The pipeline:
//!
//! 1. classify files against the previous snapshot (deleted / changed /
//!    unchanged; new files count as changed)
//! 2. collect the declarations losing their identity (owned by deleted or
//!    changed files)
//! 3. cascade invalidation to their dependents, breadth-first to fixpoint:
//!    a dependent's file is pulled into the re-parse set even when the file
//!    itself did not change, and every declaration that file owns is then
//!    invalidated in turn
//! 4. retract stale entries and scrub them from surviving dependents sets
//! 5. re-parse the whole wave (in parallel; the set is fully determined
//!    from the previous snapshot, so one wave suffices)
//! 6. insert fresh declarations, then add edges, synthesizing placeholder
//!    entries for names declared nowhere in the scanned universe
//! 7. finalize file records and prune orphaned synthetics
//!
//! Individual parse failures, unresolved references and duplicate names
//! degrade into [`Diagnostic`]s; only enumeration (which happens before
//! this builder runs) can fail a run outright.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::types::{
    Diagnostic, FileRecord, FileStamp, RebuildStats, Rebuilt, Snapshot, TypeDeclaration,
};
use crate::parser::{ParseError, ParsedFile, SymbolParser};

/// Computes snapshot transitions. Holds no state of its own; each `rebuild`
/// call owns its previous/next snapshot values, so a cancelled run simply
/// discards its output and the caller keeps the previous snapshot.
pub struct GraphBuilder<'a, P: SymbolParser + ?Sized> {
    parser: &'a P,
    project_root: Option<PathBuf>,
}

impl<'a, P: SymbolParser + ?Sized> GraphBuilder<'a, P> {
    pub fn new(parser: &'a P) -> Self {
        Self {
            parser,
            project_root: None,
        }
    }

    /// Declarations inside `root` get source paths relative to it; anything
    /// outside keeps its absolute path.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Produce an updated snapshot from `previous` and the live listing.
    pub fn rebuild(&self, previous: &Snapshot, current_files: &[FileStamp]) -> Rebuilt {
        let mut stats = RebuildStats {
            files_seen: current_files.len(),
            ..Default::default()
        };
        let mut diagnostics: Vec<Diagnostic> = Vec::new();

        // 1. Classify.
        let current: BTreeMap<PathBuf, i64> = current_files
            .iter()
            .map(|s| (s.path.clone(), s.mtime))
            .collect();
        let mut changed: BTreeSet<PathBuf> = BTreeSet::new();
        for (path, mtime) in &current {
            match previous.files.get(path) {
                Some(record) if record.mtime == *mtime => {}
                _ => {
                    changed.insert(path.clone());
                }
            }
        }
        let deleted: BTreeSet<PathBuf> = previous
            .files
            .keys()
            .filter(|p| !current.contains_key(*p))
            .cloned()
            .collect();
        debug!(
            changed = changed.len(),
            deleted = deleted.len(),
            unchanged = current.len() - changed.len(),
            "classified files"
        );

        // Owner of every previously-declared name.
        let owner: BTreeMap<&String, &PathBuf> = previous
            .files
            .values()
            .flat_map(|record| record.declared_names.iter().map(move |n| (n, &record.path)))
            .collect();

        // 2. Names losing their identity this run.
        let mut invalidated: BTreeSet<String> = BTreeSet::new();
        for path in deleted.iter().chain(changed.iter()) {
            if let Some(record) = previous.files.get(path) {
                invalidated.extend(record.declared_names.iter().cloned());
            }
        }

        // 3. Cascade to dependents, breadth-first until no new file joins.
        let mut to_reparse: BTreeSet<PathBuf> = changed.clone();
        let mut queue: VecDeque<String> = invalidated.iter().cloned().collect();
        while let Some(name) = queue.pop_front() {
            let Some(declaration) = previous.declarations.get(&name) else {
                continue;
            };
            for dependent in &declaration.dependents {
                if invalidated.contains(dependent) {
                    continue;
                }
                // Synthetic entries own no file and cannot be dependents.
                let Some(file) = owner.get(dependent) else {
                    continue;
                };
                if deleted.contains(*file) {
                    continue;
                }
                if to_reparse.insert((*file).clone()) {
                    if let Some(record) = previous.files.get(*file) {
                        for owned in &record.declared_names {
                            if invalidated.insert(owned.clone()) {
                                queue.push_back(owned.clone());
                            }
                        }
                    }
                }
            }
        }
        stats.files_cascaded = to_reparse.difference(&changed).count();
        stats.declarations_dropped = invalidated.len();

        // 4. Retract. Invalidated entries leave the table; their surviving
        // dependents (from declarations that are neither dropped nor about
        // to be re-parsed) are carried so a re-added name keeps its reverse
        // edges.
        let mut declarations: BTreeMap<String, TypeDeclaration> = BTreeMap::new();
        let mut carried: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, declaration) in &previous.declarations {
            let surviving: BTreeSet<String> = declaration
                .dependents
                .difference(&invalidated)
                .cloned()
                .collect();
            if invalidated.contains(name) {
                carried.insert(name.clone(), surviving);
            } else {
                let mut kept = declaration.clone();
                kept.dependents = surviving;
                declarations.insert(name.clone(), kept);
            }
        }

        // 5. Re-parse the wave. The set was computed entirely from the
        // previous snapshot, so the parses are independent of each other.
        let wave: Vec<PathBuf> = to_reparse.iter().cloned().collect();
        stats.files_parsed = wave.len();
        let results: Vec<(PathBuf, Result<ParsedFile, ParseError>)> = wave
            .par_iter()
            .map(|path| (path.clone(), self.parser.parse(path)))
            .collect();

        // Current owner of each name, for duplicate detection. Seeded from
        // the files that are not being re-parsed.
        let mut declared_by: BTreeMap<String, PathBuf> = BTreeMap::new();
        for (path, record) in &previous.files {
            if deleted.contains(path) || to_reparse.contains(path) {
                continue;
            }
            for name in &record.declared_names {
                declared_by.insert(name.clone(), path.clone());
            }
        }

        let mut fresh_names_by_file: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();
        for path in &wave {
            fresh_names_by_file.insert(path.clone(), BTreeSet::new());
        }
        let mut displaced_from_kept: Vec<(PathBuf, String)> = Vec::new();
        let mut fresh: BTreeSet<String> = BTreeSet::new();
        let mut unresolved: BTreeSet<String> = BTreeSet::new();

        // 6a. Insert fresh declarations, last-write-wins on duplicates
        // (deterministic: the wave is sorted by path).
        for (path, result) in results {
            let parsed = match result {
                Ok(parsed) => parsed,
                Err(err) => {
                    // The file's previous declarations were already
                    // retracted; leaving its name set empty treats them as
                    // deleted for this run.
                    warn!(file = %path.display(), error = %err, "parse failed, dropping file's declarations");
                    diagnostics.push(Diagnostic::ParseFailure {
                        path,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            unresolved.extend(parsed.unresolved);

            for fragment in parsed.declarations {
                let name = fragment.name.clone();
                let prior_owner = declared_by.get(&name).cloned();

                let dependents = match declarations.remove(&name) {
                    Some(existing) => {
                        if !existing.synthetic {
                            // Another file's declaration is displaced.
                            for target in existing.edge_targets() {
                                if let Some(t) = declarations.get_mut(target) {
                                    t.dependents.remove(&name);
                                }
                            }
                            if let Some(displaced) =
                                prior_owner.filter(|owner| *owner != path)
                            {
                                warn!(
                                    name = %name,
                                    winner = %path.display(),
                                    displaced = %displaced.display(),
                                    "duplicate declaration, last write wins"
                                );
                                if let Some(set) = fresh_names_by_file.get_mut(&displaced) {
                                    set.remove(&name);
                                } else {
                                    displaced_from_kept.push((displaced.clone(), name.clone()));
                                }
                                diagnostics.push(Diagnostic::DuplicateDeclaration {
                                    name: name.clone(),
                                    winner: path.clone(),
                                    displaced,
                                });
                            }
                        }
                        existing.dependents
                    }
                    None => carried.remove(&name).unwrap_or_default(),
                };

                declarations.insert(
                    name.clone(),
                    TypeDeclaration {
                        name: name.clone(),
                        kind: Some(fragment.kind),
                        superclasses: fragment.superclasses,
                        interfaces: fragment.interfaces,
                        mixins: fragment.mixins,
                        source_path: Some(self.display_path(&path)),
                        synthetic: false,
                        dependents,
                    },
                );
                declared_by.insert(name.clone(), path.clone());
                if let Some(set) = fresh_names_by_file.get_mut(&path) {
                    set.insert(name.clone());
                }
                fresh.insert(name);
            }
        }
        stats.declarations_added = fresh.len();

        // 6b. Edges. Every fresh declaration adds itself to its targets'
        // dependents; a target declared nowhere gets a synthetic entry.
        for name in &fresh {
            let Some(declaration) = declarations.get(name) else {
                continue;
            };
            let targets: Vec<String> = declaration.edge_targets().cloned().collect();
            for target in targets {
                let entry = declarations.entry(target.clone()).or_insert_with(|| {
                    stats.synthetics_added += 1;
                    unresolved.insert(target.clone());
                    TypeDeclaration::synthetic(target)
                });
                entry.dependents.insert(name.clone());
            }
        }

        for name in unresolved {
            if declarations.get(&name).map_or(true, |d| d.synthetic) {
                diagnostics.push(Diagnostic::UnresolvedReference { name });
            }
        }

        // 7. Finalize. A synthetic nobody references anymore is garbage.
        declarations.retain(|_, d| !d.synthetic || !d.dependents.is_empty());

        let mut files: BTreeMap<PathBuf, FileRecord> = BTreeMap::new();
        for (path, mtime) in &current {
            let record = match fresh_names_by_file.get(path) {
                Some(names) => FileRecord {
                    path: path.clone(),
                    mtime: *mtime,
                    declared_names: names.clone(),
                },
                None => match previous.files.get(path) {
                    Some(record) => record.clone(),
                    // Unreachable: a path without a previous record is
                    // classified as changed and therefore re-parsed.
                    None => FileRecord {
                        path: path.clone(),
                        mtime: *mtime,
                        declared_names: BTreeSet::new(),
                    },
                },
            };
            files.insert(path.clone(), record);
        }
        for (owner_path, name) in displaced_from_kept {
            if let Some(record) = files.get_mut(&owner_path) {
                record.declared_names.remove(&name);
            }
        }

        info!(
            files = stats.files_seen,
            parsed = stats.files_parsed,
            cascaded = stats.files_cascaded,
            dropped = stats.declarations_dropped,
            added = stats.declarations_added,
            synthetics = stats.synthetics_added,
            "rebuild complete"
        );

        Rebuilt {
            snapshot: Snapshot {
                files,
                declarations,
            },
            diagnostics,
            stats,
        }
    }

    fn display_path(&self, path: &Path) -> PathBuf {
        match &self.project_root {
            Some(root) => path
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf()),
            None => path.to_path_buf(),
        }
    }
}
