//! Parser for the `.decl` declaration language.
//!
//! One declaration per line:
//!
//! ```text
//! class acme.http.Client extends acme.core.Base implements acme.core.Sendable uses acme.util.LogMixin
//! interface acme.core.Sendable extends acme.core.Marker
//! mixin acme.util.LogMixin
//! ```
//!
//! Names are fully-qualified, dot-separated identifiers. Blank lines and
//! `//` comments are skipped; a trailing `{` on a declaration line is
//! tolerated.
//!
//! The `superclasses` chain in a fragment is the *full* ancestor chain,
//! computed by walking `extends` links through an index over the whole
//! enumerated universe. The index is built lazily on the first parse, so a
//! run that parses nothing reads nothing.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

use super::{DeclarationFragment, ParseError, ParsedFile, SymbolParser};
use crate::graph::TypeKind;

/// A declaration as written, before ancestor chains are expanded.
#[derive(Debug, Clone)]
struct RawDecl {
    name: String,
    kind: TypeKind,
    parent: Option<String>,
    interfaces: Vec<String>,
    mixins: Vec<String>,
}

/// Name → raw declaration, over every file in the universe. Plays the role
/// of a source locator: it answers "where is this ancestor declared" without
/// expanding anything.
struct UniverseIndex {
    by_name: HashMap<String, RawDecl>,
}

/// Built-in `.decl` parser over a fixed universe of files.
pub struct DeclParser {
    files: Vec<PathBuf>,
    index: OnceLock<UniverseIndex>,
}

impl DeclParser {
    /// Create a parser over the given universe. Files are only read when a
    /// parse actually happens.
    pub fn new(mut files: Vec<PathBuf>) -> Self {
        files.sort();
        files.dedup();
        Self {
            files,
            index: OnceLock::new(),
        }
    }

    fn index(&self) -> &UniverseIndex {
        self.index.get_or_init(|| {
            let mut by_name = HashMap::new();
            for path in &self.files {
                // Unreadable or malformed files contribute nothing to the
                // index; parsing them directly surfaces the error.
                let Ok(raws) = scan_file(path) else { continue };
                for raw in raws {
                    // First declaration in path order wins for resolution;
                    // the builder handles duplicates at the graph level.
                    by_name.entry(raw.name.clone()).or_insert(raw);
                }
            }
            debug!(names = by_name.len(), "universe index built");
            UniverseIndex { by_name }
        })
    }

    /// Walk the `extends` chain starting at `first`, nearest parent first.
    /// A parent with no known declaration is included, reported in
    /// `unresolved`, and ends the walk.
    fn ancestor_chain(
        &self,
        origin: &str,
        first: Option<&String>,
        unresolved: &mut Vec<String>,
    ) -> Vec<String> {
        let index = self.index();
        let mut chain = Vec::new();
        let mut visited: BTreeSet<String> = BTreeSet::new();
        visited.insert(origin.to_string());

        let mut next = first.cloned();
        while let Some(name) = next {
            if visited.contains(&name) {
                break;
            }
            next = match index.by_name.get(&name) {
                Some(raw) => raw.parent.clone(),
                None => {
                    unresolved.push(name.clone());
                    None
                }
            };
            visited.insert(name.clone());
            chain.push(name);
        }
        chain
    }
}

impl SymbolParser for DeclParser {
    fn parse(&self, path: &Path) -> Result<ParsedFile, ParseError> {
        let raws = scan_file(path)?;
        let index = self.index();

        let mut parsed = ParsedFile::default();
        for raw in raws {
            let superclasses =
                self.ancestor_chain(&raw.name, raw.parent.as_ref(), &mut parsed.unresolved);

            for referenced in raw.interfaces.iter().chain(raw.mixins.iter()) {
                if !index.by_name.contains_key(referenced) {
                    parsed.unresolved.push(referenced.clone());
                }
            }

            parsed.declarations.push(DeclarationFragment {
                name: raw.name,
                kind: raw.kind,
                superclasses,
                interfaces: raw.interfaces.into_iter().collect(),
                mixins: raw.mixins.into_iter().collect(),
            });
        }

        parsed.unresolved.sort();
        parsed.unresolved.dedup();
        Ok(parsed)
    }
}

/// Read and tokenize one file into raw declarations.
fn scan_file(path: &Path) -> Result<Vec<RawDecl>, ParseError> {
    let source = fs::read_to_string(path).map_err(|e| ParseError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut decls = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let line = line.trim().trim_end_matches('{').trim_end();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        decls.push(parse_line(path, idx + 1, line)?);
    }
    Ok(decls)
}

fn parse_line(path: &Path, lineno: usize, line: &str) -> Result<RawDecl, ParseError> {
    let syntax = |message: String| ParseError::Syntax {
        path: path.to_path_buf(),
        line: lineno,
        message,
    };

    // Commas in implements/uses lists are separators, nothing more.
    let normalized = line.replace(',', " ");
    let mut tokens = normalized.split_whitespace();

    let kind = match tokens.next() {
        Some("class") => TypeKind::NominalType,
        Some("interface") => TypeKind::Interface,
        Some("mixin") => TypeKind::Mixin,
        Some(other) => return Err(syntax(format!("expected declaration keyword, got '{other}'"))),
        None => return Err(syntax("empty declaration".to_string())),
    };

    let name = tokens
        .next()
        .ok_or_else(|| syntax("missing declaration name".to_string()))?;
    check_name(name).map_err(syntax)?;

    let mut parent: Option<String> = None;
    let mut interfaces: Vec<String> = Vec::new();
    let mut mixins: Vec<String> = Vec::new();

    let mut pending = tokens.next();
    while let Some(clause) = pending {
        match clause {
            "extends" => {
                if parent.is_some() {
                    return Err(syntax("duplicate 'extends' clause".to_string()));
                }
                let target = tokens
                    .next()
                    .ok_or_else(|| syntax("'extends' needs a name".to_string()))?;
                check_name(target).map_err(syntax)?;
                parent = Some(target.to_string());
                pending = tokens.next();
            }
            "implements" | "uses" => {
                if kind != TypeKind::NominalType {
                    return Err(syntax(format!("'{clause}' is only valid on a class")));
                }
                let list = if clause == "implements" {
                    &mut interfaces
                } else {
                    &mut mixins
                };
                if !list.is_empty() {
                    return Err(syntax(format!("duplicate '{clause}' clause")));
                }
                let mut took = 0;
                pending = loop {
                    match tokens.next() {
                        Some(tok @ ("extends" | "implements" | "uses")) => break Some(tok),
                        Some(tok) => {
                            check_name(tok).map_err(syntax)?;
                            list.push(tok.to_string());
                            took += 1;
                        }
                        None => break None,
                    }
                };
                if took == 0 {
                    return Err(syntax(format!("'{clause}' needs at least one name")));
                }
            }
            other => return Err(syntax(format!("unexpected token '{other}'"))),
        }
    }

    if kind == TypeKind::Mixin && parent.is_some() {
        return Err(syntax("a mixin cannot extend".to_string()));
    }

    Ok(RawDecl {
        name: name.to_string(),
        kind,
        parent,
        interfaces,
        mixins,
    })
}

fn check_name(name: &str) -> Result<(), String> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(format!("invalid name '{name}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).expect("write test file");
        path
    }

    fn parser_over(paths: &[&PathBuf]) -> DeclParser {
        DeclParser::new(paths.iter().map(|p| (*p).clone()).collect())
    }

    #[test]
    fn parses_all_three_kinds() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.decl",
            "// header comment\n\
             class acme.App\n\
             interface acme.Runnable\n\
             mixin acme.Logging\n",
        );

        let parser = parser_over(&[&path]);
        let parsed = parser.parse(&path).unwrap();

        assert_eq!(parsed.declarations.len(), 3);
        assert_eq!(parsed.declarations[0].kind, TypeKind::NominalType);
        assert_eq!(parsed.declarations[1].kind, TypeKind::Interface);
        assert_eq!(parsed.declarations[2].kind, TypeKind::Mixin);
        assert!(parsed.unresolved.is_empty());
    }

    #[test]
    fn walks_full_ancestor_chain() {
        let dir = tempdir().unwrap();
        let base = write(dir.path(), "base.decl", "class lib.Root\nclass lib.Mid extends lib.Root\n");
        let leaf = write(dir.path(), "leaf.decl", "class app.Leaf extends lib.Mid\n");

        let parser = parser_over(&[&base, &leaf]);
        let parsed = parser.parse(&leaf).unwrap();

        assert_eq!(
            parsed.declarations[0].superclasses,
            vec!["lib.Mid".to_string(), "lib.Root".to_string()],
            "nearest parent first, root last"
        );
        assert!(parsed.unresolved.is_empty());
    }

    #[test]
    fn missing_ancestor_is_reported_not_fatal() {
        let dir = tempdir().unwrap();
        let leaf = write(dir.path(), "leaf.decl", "class app.Leaf extends platform.Base\n");

        let parser = parser_over(&[&leaf]);
        let parsed = parser.parse(&leaf).unwrap();

        assert_eq!(
            parsed.declarations[0].superclasses,
            vec!["platform.Base".to_string()],
            "the unknown parent still anchors the chain"
        );
        assert_eq!(parsed.unresolved, vec!["platform.Base".to_string()]);
    }

    #[test]
    fn interface_chain_and_class_clauses() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.decl",
            "interface a.Marker\n\
             interface a.Sendable extends a.Marker\n\
             mixin a.Log\n\
             class a.Client extends a.Base implements a.Sendable uses a.Log {\n",
        );

        let parser = parser_over(&[&path]);
        let parsed = parser.parse(&path).unwrap();

        let sendable = &parsed.declarations[1];
        assert_eq!(sendable.superclasses, vec!["a.Marker".to_string()]);

        let client = &parsed.declarations[3];
        assert_eq!(client.superclasses, vec!["a.Base".to_string()]);
        assert!(client.interfaces.contains("a.Sendable"));
        assert!(client.mixins.contains("a.Log"));
        // a.Base is nowhere in the universe
        assert_eq!(parsed.unresolved, vec!["a.Base".to_string()]);
    }

    #[test]
    fn comma_separated_lists() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.decl",
            "interface a.X\ninterface a.Y\nclass a.C implements a.X, a.Y\n",
        );

        let parser = parser_over(&[&path]);
        let parsed = parser.parse(&path).unwrap();
        let c = &parsed.declarations[2];
        assert_eq!(c.interfaces.len(), 2);
    }

    #[test]
    fn extends_cycle_terminates() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.decl",
            "class a.A extends a.B\nclass a.B extends a.A\n",
        );

        let parser = parser_over(&[&path]);
        let parsed = parser.parse(&path).unwrap();
        // a.A's chain stops once a.A would repeat
        assert_eq!(
            parsed.declarations[0].superclasses,
            vec!["a.B".to_string()]
        );
    }

    #[test]
    fn malformed_line_is_a_syntax_error() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "bad.decl", "class\n");

        let parser = parser_over(&[&path]);
        let err = parser.parse(&path).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
    }

    #[test]
    fn mixin_cannot_extend_or_implement() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "bad.decl", "mixin a.M implements a.X\n");

        let parser = parser_over(&[&path]);
        assert!(parser.parse(&path).is_err());
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempdir().unwrap();
        let parser = parser_over(&[]);
        let err = parser.parse(&dir.path().join("gone.decl")).unwrap_err();
        assert!(matches!(err, ParseError::Unreadable { .. }));
    }
}
