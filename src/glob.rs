//! Path-convention discovery of declaration names.
//!
//! The incremental pipeline parses files; this module does the opposite
//! trade. Given a dotted namespace prefix mapped onto one or more source
//! roots, it derives declaration names straight from `.decl` file paths,
//! assuming one declaration per file named after the file. No parsing,
//! no graph, just a fast directory walk.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::manifest::DECL_EXTENSION;

/// Maps a namespace prefix segment onto a directory on disk.
#[derive(Debug, Clone)]
pub struct NamespaceRoot {
    /// Dotted namespace the directory corresponds to, e.g. `app.models`.
    pub prefix: String,
    /// Directory holding that namespace's files.
    pub dir: PathBuf,
}

/// Derives fully-qualified declaration names from file layout.
pub struct GlobExplorer {
    namespace: String,
    roots: Vec<NamespaceRoot>,
    recursive: bool,
}

impl GlobExplorer {
    /// `namespace` is the dotted prefix to enumerate under; trailing dots
    /// are tolerated.
    pub fn new(namespace: impl Into<String>, roots: Vec<NamespaceRoot>) -> Self {
        Self {
            namespace: namespace.into().trim_matches('.').to_string(),
            roots,
            recursive: true,
        }
    }

    /// Restrict the walk to the namespace directory itself, ignoring
    /// nested namespaces.
    pub fn non_recursive(mut self) -> Self {
        self.recursive = false;
        self
    }

    /// All declaration names under the namespace, sorted and deduplicated.
    /// Roots that do not map the namespace, or whose directories are
    /// missing, contribute nothing.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for root in &self.roots {
            let Some(dir) = self.namespace_dir(root) else {
                continue;
            };
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "namespace directory absent, skipping");
                continue;
            }
            self.collect_names(&dir, &mut names);
        }
        names.sort();
        names.dedup();
        names
    }

    /// Resolve the directory `self.namespace` lives in under one root,
    /// or None if the root's prefix does not cover the namespace.
    fn namespace_dir(&self, root: &NamespaceRoot) -> Option<PathBuf> {
        let prefix = root.prefix.trim_matches('.');
        let rest = if prefix.is_empty() {
            self.namespace.as_str()
        } else if self.namespace == prefix {
            ""
        } else {
            self.namespace.strip_prefix(prefix)?.strip_prefix('.')?
        };
        let mut dir = root.dir.clone();
        for segment in rest.split('.').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        Some(dir)
    }

    fn collect_names(&self, dir: &Path, names: &mut Vec<String>) {
        let mut walker = WalkBuilder::new(dir);
        walker.hidden(true).git_ignore(true);
        if !self.recursive {
            walker.max_depth(Some(1));
        }
        for entry in walker.build().flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |e| e != DECL_EXTENSION) {
                continue;
            }
            if let Some(name) = self.name_for(dir, path) {
                names.push(name);
            }
        }
    }

    /// Turn `dir`-relative `path` into a dotted name under the namespace.
    fn name_for(&self, dir: &Path, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(dir).ok()?.with_extension("");
        let mut name = self.namespace.clone();
        for segment in relative.iter() {
            let segment = segment.to_str()?;
            if !name.is_empty() {
                name.push('.');
            }
            name.push_str(segment);
        }
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn derives_names_from_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("src/models/User.decl"));
        touch(&dir.path().join("src/models/auth/Session.decl"));
        touch(&dir.path().join("src/models/notes.txt"));

        let explorer = GlobExplorer::new(
            "app.models",
            vec![NamespaceRoot {
                prefix: "app".to_string(),
                dir: dir.path().join("src"),
            }],
        );
        assert_eq!(
            explorer.names(),
            vec![
                "app.models.User".to_string(),
                "app.models.auth.Session".to_string(),
            ]
        );
    }

    #[test]
    fn non_recursive_skips_nested_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("src/models/User.decl"));
        touch(&dir.path().join("src/models/auth/Session.decl"));

        let explorer = GlobExplorer::new(
            "app.models",
            vec![NamespaceRoot {
                prefix: "app".to_string(),
                dir: dir.path().join("src"),
            }],
        )
        .non_recursive();
        assert_eq!(explorer.names(), vec!["app.models.User".to_string()]);
    }

    #[test]
    fn merges_and_dedupes_across_roots() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        touch(&a.path().join("core/Thing.decl"));
        touch(&b.path().join("core/Thing.decl"));
        touch(&b.path().join("core/Other.decl"));

        let roots = vec![
            NamespaceRoot {
                prefix: String::new(),
                dir: a.path().to_path_buf(),
            },
            NamespaceRoot {
                prefix: String::new(),
                dir: b.path().to_path_buf(),
            },
        ];
        let explorer = GlobExplorer::new("core", roots);
        assert_eq!(
            explorer.names(),
            vec!["core.Other".to_string(), "core.Thing".to_string()]
        );
    }

    #[test]
    fn unrelated_prefix_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Thing.decl"));

        let explorer = GlobExplorer::new(
            "app.models",
            vec![NamespaceRoot {
                prefix: "vendorlib".to_string(),
                dir: dir.path().to_path_buf(),
            }],
        );
        assert!(explorer.names().is_empty());
    }

    #[test]
    fn missing_directory_is_empty_not_an_error() {
        let explorer = GlobExplorer::new(
            "app",
            vec![NamespaceRoot {
                prefix: "app".to_string(),
                dir: PathBuf::from("/nonexistent/src"),
            }],
        );
        assert!(explorer.names().is_empty());
    }
}
