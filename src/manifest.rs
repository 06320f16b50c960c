//! Package manifest resolution and source-file enumeration.
//!
//! A project lists its installed packages in a `packages.lock` JSON manifest.
//! Each package names the autoload `dirs` and `files` (relative to its
//! directory under the vendor root) that contribute declarations:
//!
//! ```json
//! {
//!   "packages": [
//!     { "name": "acme/core", "autoload": { "dirs": ["src"], "files": ["bootstrap.decl"] } }
//!   ],
//!   "packages-dev": [
//!     { "name": "acme/devtools", "autoload": { "dirs": ["src"] } }
//!   ]
//! }
//! ```
//!
//! Dev packages are not guaranteed to be installed, so a missing dev package
//! directory is skipped; a missing regular package is fatal.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use ignore::WalkBuilder;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::graph::FileStamp;

/// File extension for declaration sources.
pub const DECL_EXTENSION: &str = "decl";

/// Error type for enumeration. Any of these aborts the whole rebuild; the
/// previous snapshot stays authoritative.
#[derive(Debug, thiserror::Error)]
pub enum EnumerationError {
    #[error("unable to load manifest at {}: {message}", path.display())]
    ManifestUnreadable { path: PathBuf, message: String },

    #[error("unable to decode manifest at {}: {message}", path.display())]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("package '{name}' is listed in the manifest but {} does not exist", dir.display())]
    PackageMissing { name: String, dir: PathBuf },
}

/// Produces the current complete list of source files and their
/// modification timestamps. Deterministic in content absent real filesystem
/// change; each path is returned exactly once.
pub trait SourceEnumerator {
    fn enumerate_source_files(&self) -> Result<Vec<FileStamp>, EnumerationError>;
}

#[derive(Debug, Deserialize)]
struct ManifestDoc {
    #[serde(default)]
    packages: Vec<PackageDef>,
    #[serde(default, rename = "packages-dev")]
    packages_dev: Vec<PackageDef>,
}

#[derive(Debug, Deserialize)]
struct PackageDef {
    name: String,
    #[serde(default)]
    autoload: Autoload,
}

#[derive(Debug, Default, Deserialize)]
struct Autoload {
    #[serde(default)]
    dirs: Vec<String>,
    #[serde(default)]
    files: Vec<String>,
}

/// The source roots a manifest resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    pub directories: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Manifest-driven [`SourceEnumerator`].
pub struct PackageEnumerator {
    manifest_path: PathBuf,
    vendor_root: PathBuf,
}

impl PackageEnumerator {
    pub fn new(manifest_path: impl Into<PathBuf>, vendor_root: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            vendor_root: vendor_root.into(),
        }
    }

    /// Resolve the manifest into concrete source directories and files.
    pub fn sources(&self) -> Result<SourceSet, EnumerationError> {
        let content = std::fs::read_to_string(&self.manifest_path).map_err(|e| {
            EnumerationError::ManifestUnreadable {
                path: self.manifest_path.clone(),
                message: e.to_string(),
            }
        })?;
        let doc: ManifestDoc =
            serde_json::from_str(&content).map_err(|e| EnumerationError::ManifestInvalid {
                path: self.manifest_path.clone(),
                message: e.to_string(),
            })?;

        let mut set = SourceSet::default();
        for package in &doc.packages {
            self.add_package(package, &mut set, false)?;
        }
        for package in &doc.packages_dev {
            self.add_package(package, &mut set, true)?;
        }
        Ok(set)
    }

    fn add_package(
        &self,
        package: &PackageDef,
        set: &mut SourceSet,
        is_dev: bool,
    ) -> Result<(), EnumerationError> {
        let package_dir = self.vendor_root.join(&package.name);
        if !package_dir.is_dir() {
            if is_dev {
                debug!(package = %package.name, "dev package not installed, skipping");
                return Ok(());
            }
            return Err(EnumerationError::PackageMissing {
                name: package.name.clone(),
                dir: package_dir,
            });
        }

        for dir in &package.autoload.dirs {
            set.directories.push(package_dir.join(dir));
        }
        for file in &package.autoload.files {
            set.files.push(package_dir.join(file));
        }
        Ok(())
    }
}

impl SourceEnumerator for PackageEnumerator {
    fn enumerate_source_files(&self) -> Result<Vec<FileStamp>, EnumerationError> {
        let set = self.sources()?;
        let mut stamps: Vec<FileStamp> = Vec::new();

        for dir in &set.directories {
            // A package may advertise a directory it never shipped.
            if !dir.is_dir() {
                continue;
            }
            let walk = WalkBuilder::new(dir)
                .hidden(true)
                .git_ignore(true)
                .build();
            for entry in walk.filter_map(|e| e.ok()) {
                let path = entry.path();
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some(DECL_EXTENSION) {
                    continue;
                }
                if let Some(stamp) = stamp_file(path) {
                    stamps.push(stamp);
                }
            }
        }

        for file in &set.files {
            match stamp_file(file) {
                Some(stamp) => stamps.push(stamp),
                None => warn!(file = %file.display(), "listed file is not readable, skipping"),
            }
        }

        stamps.sort_by(|a, b| a.path.cmp(&b.path));
        stamps.dedup_by(|a, b| a.path == b.path);

        debug!(files = stamps.len(), "enumerated source files");
        Ok(stamps)
    }
}

fn stamp_file(path: &Path) -> Option<FileStamp> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_secs() as i64;
    Some(FileStamp {
        path: path.to_path_buf(),
        mtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn setup_package(vendor: &Path, name: &str, files: &[(&str, &str)]) {
        let dir = vendor.join(name);
        for (rel, content) in files {
            let path = dir.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
    }

    fn write_manifest(root: &Path, content: &str) -> PathBuf {
        let path = root.join("packages.lock");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn enumerates_package_dirs_and_files() {
        let dir = tempdir().unwrap();
        let vendor = dir.path().join("vendor");
        setup_package(
            &vendor,
            "acme/core",
            &[
                ("src/base.decl", "class acme.Base\n"),
                ("src/nested/util.decl", "mixin acme.Util\n"),
                ("notes.txt", "not a source file"),
                ("bootstrap.decl", "class acme.Boot\n"),
            ],
        );
        let manifest = write_manifest(
            dir.path(),
            r#"{ "packages": [
                { "name": "acme/core",
                  "autoload": { "dirs": ["src"], "files": ["bootstrap.decl"] } }
            ] }"#,
        );

        let enumerator = PackageEnumerator::new(manifest, vendor);
        let stamps = enumerator.enumerate_source_files().unwrap();
        let names: Vec<_> = stamps
            .iter()
            .map(|s| s.path.file_name().unwrap().to_str().unwrap())
            .collect();

        assert_eq!(stamps.len(), 3);
        assert!(names.contains(&"base.decl"));
        assert!(names.contains(&"util.decl"));
        assert!(names.contains(&"bootstrap.decl"));
        // sorted and unique
        let mut sorted = stamps.clone();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let dir = tempdir().unwrap();
        let enumerator =
            PackageEnumerator::new(dir.path().join("packages.lock"), dir.path().join("vendor"));
        let err = enumerator.enumerate_source_files().unwrap_err();
        assert!(matches!(err, EnumerationError::ManifestUnreadable { .. }));
    }

    #[test]
    fn corrupt_manifest_is_fatal() {
        let dir = tempdir().unwrap();
        let manifest = write_manifest(dir.path(), "{ not json");
        let enumerator = PackageEnumerator::new(manifest, dir.path().join("vendor"));
        let err = enumerator.enumerate_source_files().unwrap_err();
        assert!(matches!(err, EnumerationError::ManifestInvalid { .. }));
    }

    #[test]
    fn missing_regular_package_is_fatal() {
        let dir = tempdir().unwrap();
        let manifest = write_manifest(
            dir.path(),
            r#"{ "packages": [ { "name": "acme/gone", "autoload": { "dirs": ["src"] } } ] }"#,
        );
        let enumerator = PackageEnumerator::new(manifest, dir.path().join("vendor"));
        let err = enumerator.enumerate_source_files().unwrap_err();
        assert!(matches!(err, EnumerationError::PackageMissing { .. }));
    }

    #[test]
    fn missing_dev_package_is_skipped() {
        let dir = tempdir().unwrap();
        let vendor = dir.path().join("vendor");
        setup_package(&vendor, "acme/core", &[("src/a.decl", "class acme.A\n")]);
        let manifest = write_manifest(
            dir.path(),
            r#"{ "packages": [ { "name": "acme/core", "autoload": { "dirs": ["src"] } } ],
                 "packages-dev": [ { "name": "acme/devtools", "autoload": { "dirs": ["src"] } } ] }"#,
        );

        let enumerator = PackageEnumerator::new(manifest, vendor);
        let stamps = enumerator.enumerate_source_files().unwrap();
        assert_eq!(stamps.len(), 1);
    }

    #[test]
    fn advertised_but_absent_dir_is_tolerated() {
        let dir = tempdir().unwrap();
        let vendor = dir.path().join("vendor");
        setup_package(&vendor, "acme/core", &[("readme.md", "hi")]);
        let manifest = write_manifest(
            dir.path(),
            r#"{ "packages": [ { "name": "acme/core", "autoload": { "dirs": ["src"] } } ] }"#,
        );

        let enumerator = PackageEnumerator::new(manifest, vendor);
        assert!(enumerator.enumerate_source_files().unwrap().is_empty());
    }
}
