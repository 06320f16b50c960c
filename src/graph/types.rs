//! Data model for the declaration graph.
//!
//! A [`Snapshot`] is the complete state after one build cycle: per-file
//! records and per-declaration records, including the derived
//! reverse-dependency index. Snapshots are values: produced by one
//! [`rebuild`](super::builder::GraphBuilder::rebuild) run, consumed unchanged
//! by the next, never mutated in place.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What a declaration is: a nominal type, an interface, or a mixin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    NominalType,
    Interface,
    Mixin,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::NominalType => write!(f, "class"),
            TypeKind::Interface => write!(f, "interface"),
            TypeKind::Mixin => write!(f, "mixin"),
        }
    }
}

/// One type-like declaration, real or synthetic.
///
/// `superclasses` is the full ancestor chain, nearest parent first and
/// root-most last. `interfaces` and `mixins` are direct only.
///
/// A synthetic entry is a placeholder for a name referenced by some other
/// declaration but declared by no scanned file (a platform built-in, or a
/// file outside the enumerated universe). It has no kind, no source path and
/// no outgoing edges; it exists to anchor reverse edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    /// Fully-qualified name, globally unique within a snapshot.
    pub name: String,
    /// `None` only for synthetic entries.
    pub kind: Option<TypeKind>,
    pub superclasses: Vec<String>,
    pub interfaces: BTreeSet<String>,
    pub mixins: BTreeSet<String>,
    /// Declaring file, relative to the project root when inside it,
    /// absolute otherwise. `None` for synthetic entries.
    pub source_path: Option<PathBuf>,
    pub synthetic: bool,
    /// Derived: names of declarations that name this one in their own
    /// `superclasses`, `interfaces` or `mixins`. Never authored directly.
    pub dependents: BTreeSet<String>,
}

impl TypeDeclaration {
    /// Build a synthetic placeholder for a referenced-but-undeclared name.
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            superclasses: Vec::new(),
            interfaces: BTreeSet::new(),
            mixins: BTreeSet::new(),
            source_path: None,
            synthetic: true,
            dependents: BTreeSet::new(),
        }
    }

    /// All names this declaration points at, across every edge kind.
    pub fn edge_targets(&self) -> impl Iterator<Item = &String> {
        self.superclasses
            .iter()
            .chain(self.interfaces.iter())
            .chain(self.mixins.iter())
    }
}

/// Per-file metadata tracked between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path.
    pub path: PathBuf,
    /// Last-observed modification timestamp (unix seconds).
    pub mtime: i64,
    /// Names declared by this file. A file may declare zero, one, or many.
    pub declared_names: BTreeSet<String>,
}

/// A path with its current modification timestamp, as reported by the
/// source enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub path: PathBuf,
    pub mtime: i64,
}

/// The complete, immutable state of files and declarations after one build
/// cycle. The very first run starts from `Snapshot::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub files: BTreeMap<PathBuf, FileRecord>,
    pub declarations: BTreeMap<String, TypeDeclaration>,
}

/// Non-fatal conditions surfaced alongside a rebuilt snapshot.
///
/// A run that encounters only these still returns a usable, internally
/// consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "condition")]
pub enum Diagnostic {
    /// A file could not be parsed; its declarations were treated as removed
    /// for this run.
    ParseFailure { path: PathBuf, message: String },
    /// A declaration references a name with no declaring file in the
    /// scanned universe; a synthetic entry was installed.
    UnresolvedReference { name: String },
    /// The same name was declared by two files; the later parse won.
    DuplicateDeclaration {
        name: String,
        winner: PathBuf,
        displaced: PathBuf,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ParseFailure { path, message } => {
                write!(f, "parse failure in {}: {}", path.display(), message)
            }
            Diagnostic::UnresolvedReference { name } => {
                write!(f, "unresolved reference: {name}")
            }
            Diagnostic::DuplicateDeclaration {
                name,
                winner,
                displaced,
            } => write!(
                f,
                "duplicate declaration of {name}: kept {}, displaced {}",
                winner.display(),
                displaced.display()
            ),
        }
    }
}

/// Counters from one rebuild run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Files in the current listing.
    pub files_seen: usize,
    /// Files actually handed to the parser (changed + cascaded).
    pub files_parsed: usize,
    /// Files re-parsed purely through cascade (mtime unchanged).
    pub files_cascaded: usize,
    /// Declarations removed or replaced this run.
    pub declarations_dropped: usize,
    /// Declarations inserted from fresh parses this run.
    pub declarations_added: usize,
    /// Synthetic placeholders installed this run.
    pub synthetics_added: usize,
}

/// The result of one [`rebuild`](super::builder::GraphBuilder::rebuild) run.
#[derive(Debug, Clone)]
pub struct Rebuilt {
    pub snapshot: Snapshot,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: RebuildStats,
}
