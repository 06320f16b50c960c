use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level declgraph configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Project-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project root directory (relative to the config file).
    #[serde(default = "default_root")]
    pub root: String,
    /// Package manifest listing autoload roots.
    #[serde(default = "default_manifest")]
    pub manifest: String,
    /// Directory package sources are installed under.
    #[serde(default = "default_vendor_dir")]
    pub vendor_dir: String,
}

/// Snapshot cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path for the persisted snapshot.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_manifest() -> String {
    "packages.lock".to_string()
}

fn default_vendor_dir() -> String {
    "vendor".to_string()
}

fn default_snapshot_path() -> String {
    ".declgraph/snapshot.json".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            manifest: default_manifest(),
            vendor_dir: default_vendor_dir(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl ExplorerConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Resolve the project root relative to the config file's directory.
    pub fn resolve_root(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.project.root)
    }

    /// Resolve the manifest path relative to the project root.
    pub fn resolve_manifest(&self, config_dir: &Path) -> PathBuf {
        self.resolve_root(config_dir).join(&self.project.manifest)
    }

    /// Resolve the vendor directory relative to the project root.
    pub fn resolve_vendor_dir(&self, config_dir: &Path) -> PathBuf {
        self.resolve_root(config_dir).join(&self.project.vendor_dir)
    }

    /// Resolve the snapshot cache path relative to the project root.
    pub fn resolve_snapshot_path(&self, config_dir: &Path) -> PathBuf {
        self.resolve_root(config_dir).join(&self.cache.snapshot_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ExplorerConfig::default();
        assert_eq!(config.project.root, ".");
        assert_eq!(config.project.manifest, "packages.lock");
        assert_eq!(config.project.vendor_dir, "vendor");
        assert_eq!(config.cache.snapshot_path, ".declgraph/snapshot.json");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: ExplorerConfig = toml::from_str(
            r#"
            [project]
            root = "workspace"
            "#,
        )
        .unwrap();
        assert_eq!(config.project.root, "workspace");
        assert_eq!(config.project.manifest, "packages.lock");
        assert_eq!(config.cache.snapshot_path, ".declgraph/snapshot.json");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = ExplorerConfig::load(Path::new("/nonexistent/declgraph.toml"));
        assert_eq!(config.project.root, ".");
    }

    #[test]
    fn paths_resolve_relative_to_config_dir() {
        let mut config = ExplorerConfig::default();
        config.project.root = "app".to_string();
        let dir = Path::new("/srv/project");
        assert_eq!(config.resolve_root(dir), Path::new("/srv/project/app"));
        assert_eq!(
            config.resolve_manifest(dir),
            Path::new("/srv/project/app/packages.lock")
        );
        assert_eq!(
            config.resolve_snapshot_path(dir),
            Path::new("/srv/project/app/.declgraph/snapshot.json")
        );
    }
}
