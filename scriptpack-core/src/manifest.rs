//! Package manifests
//!
//! Locating `package.json` files for package names and reading the fields
//! the registry needs.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use scriptpack_vfs::{LoadError, SourceLoader};

/// Manifest file name
pub const MANIFEST_FILE: &str = "package.json";

/// Scope of type-declaration-only packages
pub const TYPE_SCOPE: &str = "@types/";

/// Directory packages are installed into
pub const PACKAGES_DIR: &str = "node_modules";

/// Failure to materialize a package from its manifest
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManifestError {
    #[error("no package.json found for package '{name}'")]
    NotFound { name: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid manifest '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("package '{name}' declares no type declarations")]
    MissingTypes { name: String },
}

/// `directories` section of a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManifestDirectories {
    pub bin: Option<String>,
}

/// The fields of a `package.json` this crate reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub main: Option<String>,
    pub types: Option<String>,
    pub typings: Option<String>,
    /// Declarations written for plugin authors, preferred over `types`
    pub plugin_types: Option<String>,
    pub directories: ManifestDirectories,
    pub dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(text).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Entry of the type declarations, relative to the package directory
    pub fn declaration_entry(&self) -> Option<&str> {
        self.plugin_types
            .as_deref()
            .or(self.types.as_deref())
            .or(self.typings.as_deref())
    }

    /// Entry of the implementation with a `.js` suffix
    pub fn script_entry(&self) -> Option<String> {
        self.main.as_ref().map(|main| {
            if main.ends_with(".js") {
                main.clone()
            } else {
                format!("{}.js", main)
            }
        })
    }
}

/// Collapse `.` and `..` components without touching the file system
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => result.push(component),
            },
            other => result.push(other),
        }
    }
    result
}

/// Make `path` absolute against the working directory when possible
pub fn absolutize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize_path(&absolute)
}

/// Finds the directory and manifest of a package
#[derive(Clone)]
pub struct ManifestLocator {
    root: PathBuf,
    loader: Arc<dyn SourceLoader>,
}

impl std::fmt::Debug for ManifestLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestLocator")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ManifestLocator {
    pub fn new(root: impl AsRef<Path>, loader: Arc<dyn SourceLoader>) -> Self {
        Self {
            root: absolutize(root.as_ref()),
            loader,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn loader(&self) -> &Arc<dyn SourceLoader> {
        &self.loader
    }

    /// Candidate package directories for `name`, nearest first.
    ///
    /// Absolute names are a path inside the package; the path and its
    /// ancestors are searched. Other names are looked up in the installed
    /// packages directory of the root and of every ancestor of the root.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let name_path = Path::new(name);
        if name_path.is_absolute() {
            return normalize_path(name_path)
                .ancestors()
                .map(Path::to_path_buf)
                .collect();
        }
        self.root
            .ancestors()
            .map(|dir| normalize_path(&dir.join(PACKAGES_DIR).join(name)))
            .collect()
    }

    /// Directory and parsed manifest of a package
    pub async fn locate(&self, name: &str) -> Result<(PathBuf, PackageManifest), ManifestError> {
        for dir in self.candidates(name) {
            let manifest_path = dir.join(MANIFEST_FILE);
            if !self.loader.is_file(&manifest_path).await {
                continue;
            }
            trace!(target: "scriptpack::registry", package = name, path = %manifest_path.display(), "found manifest");
            let text = self.loader.read_to_string(&manifest_path).await?;
            let manifest = PackageManifest::parse(&manifest_path, &text)?;
            return Ok((dir, manifest));
        }
        Err(ManifestError::NotFound {
            name: name.to_string(),
        })
    }

    /// The `directories.bin` override of the package at `dir`, resolved
    /// against `dir`
    pub async fn script_dir(&self, dir: &Path) -> Option<PathBuf> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let text = self.loader.read_to_string(&manifest_path).await.ok()?;
        let manifest = PackageManifest::parse(&manifest_path, &text).ok()?;
        let bin = manifest.directories.bin?;
        Some(normalize_path(&dir.join(bin)))
    }
}
