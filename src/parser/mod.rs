//! Symbol parsing boundary.
//!
//! The graph builder never reads source bytes itself; it hands paths to a
//! [`SymbolParser`] and gets back declaration fragments. The built-in
//! implementation for the `.decl` language lives in [`decl`].

pub mod decl;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::graph::TypeKind;

pub use decl::DeclParser;

/// Error type for per-file parsing. A parse failure degrades only the
/// failing file; the builder records it as a diagnostic and moves on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("cannot read {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },

    #[error("{}:{line}: {message}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// One declaration as extracted from a file, before the builder fills in
/// `source_path` and the derived `dependents` index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationFragment {
    pub name: String,
    pub kind: TypeKind,
    /// Full ancestor chain, nearest parent first.
    pub superclasses: Vec<String>,
    pub interfaces: BTreeSet<String>,
    pub mixins: BTreeSet<String>,
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub declarations: Vec<DeclarationFragment>,
    /// Referenced names whose declaring file could not be located while
    /// walking ancestor chains. Reported per name rather than failing the
    /// file, so the builder can install synthetic entries.
    pub unresolved: Vec<String>,
}

/// Turns a source file into zero or more declaration fragments.
///
/// `Sync` so the builder may fan parses out across a rayon pool; parsing of
/// independent files has no data dependency between files.
pub trait SymbolParser: Sync {
    fn parse(&self, path: &Path) -> Result<ParsedFile, ParseError>;
}
