//! Package Registry
//!
//! Materializes packages at most once per session. Lookup goes through a
//! chain of fallbacks that never fails: the package's own manifest, then the
//! `@types/` scoped package, then an opaque stub.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::ingest::ingest_directory;
use crate::manifest::{normalize_path, ManifestError, ManifestLocator, TYPE_SCOPE};
use crate::store::{Package, SessionState};

pub struct PackageRegistry {
    locator: ManifestLocator,
    /// Packages whose implementation text is never read
    type_only: Vec<String>,
}

impl PackageRegistry {
    pub fn new(locator: ManifestLocator, type_only: Vec<String>) -> Self {
        Self { locator, type_only }
    }

    pub fn locator(&self) -> &ManifestLocator {
        &self.locator
    }

    fn is_type_only(&self, name: &str) -> bool {
        self.type_only.iter().any(|n| n == name)
    }

    /// Read a package from its manifest.
    ///
    /// The implementation comes from `main` (with `.js` appended when
    /// missing) unless the package is type-only; declarations come from
    /// `pluginTypes`, falling back to `types`.
    pub async fn load_package(&self, name: &str) -> Result<Package, ManifestError> {
        let loader = self.locator.loader();
        let (dir, manifest) = self.locator.locate(name).await?;

        let script = match manifest.script_entry() {
            Some(entry) if !self.is_type_only(name) => {
                Some(loader.read_to_string(&normalize_path(&dir.join(entry))).await?)
            }
            _ => None,
        };

        let entry = manifest
            .declaration_entry()
            .ok_or_else(|| ManifestError::MissingTypes {
                name: name.to_string(),
            })?;
        let dts_path = normalize_path(&dir.join(entry));
        let dts = loader.read_to_string(&dts_path).await?;

        Ok(Package {
            name: name.to_string(),
            version: manifest.version.clone().unwrap_or_default(),
            script,
            dts,
            path: dts_path.parent().map(Path::to_path_buf),
            dependencies: manifest.dependencies,
        })
    }

    /// Read the `@types/` counterpart of a package
    pub async fn load_type_scoped(&self, name: &str) -> Result<Package, ManifestError> {
        if name.starts_with(TYPE_SCOPE) {
            return Err(ManifestError::NotFound {
                name: name.to_string(),
            });
        }
        let scoped = format!("{}{}", TYPE_SCOPE, name);
        let package = self.load_package(&scoped).await?;
        Ok(Package {
            name: name.to_string(),
            ..package
        })
    }

    /// Run the fallback chain for `name`
    #[instrument(target = "scriptpack::registry", skip(self))]
    pub async fn fetch(&self, name: &str) -> Package {
        let err = match self.load_package(name).await {
            Ok(package) => return package,
            Err(err) => err,
        };
        debug!(target: "scriptpack::registry", package = name, error = %err, "manifest lookup failed");

        match self.load_type_scoped(name).await {
            Ok(package) => package,
            Err(err) => {
                debug!(target: "scriptpack::registry", package = name, error = %err, "type scoped lookup failed");
                info!(target: "scriptpack::registry", package = name, "using opaque declarations");
                Package::opaque(name)
            }
        }
    }

    /// Existing package, or one materialized through `fetch` and registered
    pub async fn get_or_create(&self, state: &mut SessionState, name: &str) -> Arc<Package> {
        if let Some(package) = state.store.package(name) {
            return package.clone();
        }
        let package = self.fetch(name).await;
        self.register(state, name, package).await
    }

    /// Register a package unless the name is taken. A package with a
    /// directory has the directory's source files ingested under its name.
    #[instrument(target = "scriptpack::registry", skip(self, state, package))]
    pub async fn register(&self, state: &mut SessionState, name: &str, package: Package) -> Arc<Package> {
        if let Some(existing) = state.store.package(name) {
            debug!(target: "scriptpack::registry", package = name, "already registered");
            return existing.clone();
        }
        let package = state.store.insert_package(name, package);
        info!(
            target: "scriptpack::registry",
            package = name,
            version = %package.version,
            "registered package"
        );

        if let Some(dir) = package.path.as_deref() {
            let loader = self.locator.loader().as_ref();
            if let Err(err) = ingest_directory(loader, state, dir, "", name).await {
                warn!(
                    target: "scriptpack::registry",
                    package = name,
                    error = %err,
                    "could not ingest package directory"
                );
            }
        }
        package
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OPAQUE_DECLARATION;
    use scriptpack_vfs::MemoryLoader;

    fn registry(loader: MemoryLoader) -> PackageRegistry {
        let locator = ManifestLocator::new("/app", Arc::new(loader));
        PackageRegistry::new(locator, vec![String::from("@rt/types")])
    }

    fn fixture() -> MemoryLoader {
        MemoryLoader::with_files([
            (
                "/app/node_modules/num/package.json",
                r#"{ "version": "9.1.0", "main": "num", "types": "num.d.ts" }"#,
            ),
            ("/app/node_modules/num/num.js", "define('num', [], function () {});"),
            ("/app/node_modules/num/num.d.ts", "export default class Num {}"),
            (
                "/app/node_modules/@rt/types/package.json",
                r#"{ "version": "1.0.0", "main": "index.js", "pluginTypes": "plugin/index.d.ts", "types": "index.d.ts" }"#,
            ),
            ("/app/node_modules/@rt/types/index.js", "throw new Error();"),
            ("/app/node_modules/@rt/types/plugin/index.d.ts", "export interface IRouter {}"),
            (
                "/app/node_modules/@types/legacy/package.json",
                r#"{ "version": "0.0.1", "types": "index.d.ts" }"#,
            ),
            ("/app/node_modules/@types/legacy/index.d.ts", "export function pad(s: string): string;"),
        ])
    }

    #[tokio::test]
    async fn test_load_package_appends_js_suffix() {
        let package = registry(fixture()).load_package("num").await.unwrap();
        assert_eq!(package.version, "9.1.0");
        assert_eq!(package.script.as_deref(), Some("define('num', [], function () {});"));
        assert_eq!(package.dts, "export default class Num {}");
        assert_eq!(package.path.as_deref(), Some(Path::new("/app/node_modules/num")));
    }

    #[tokio::test]
    async fn test_type_only_package_prefers_plugin_types() {
        let package = registry(fixture()).load_package("@rt/types").await.unwrap();
        assert!(package.script.is_none());
        assert_eq!(package.dts, "export interface IRouter {}");
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_type_scope() {
        let package = registry(fixture()).fetch("legacy").await;
        assert_eq!(package.name, "legacy");
        assert_eq!(package.version, "0.0.1");
        assert!(package.dts.contains("pad"));
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_opaque() {
        let package = registry(fixture()).fetch("left-pad-fake").await;
        assert_eq!(package.version, "*");
        assert_eq!(package.dts, OPAQUE_DECLARATION);
        assert!(package.script.is_none());
    }

    #[tokio::test]
    async fn test_type_scope_is_not_retried_twice() {
        let err = registry(fixture())
            .load_type_scoped("@types/legacy")
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let registry = registry(fixture());
        let mut state = SessionState::new();
        let first = registry.get_or_create(&mut state, "num").await;
        let second = registry.get_or_create(&mut state, "num").await;
        assert!(Arc::ptr_eq(&first, &second));

        let ignored = registry
            .register(&mut state, "num", Package::inline("num", "0.0.0", None, "export {};"))
            .await;
        assert!(Arc::ptr_eq(&first, &ignored));
        assert_eq!(ignored.version, "9.1.0");
    }

    #[tokio::test]
    async fn test_register_ingests_package_directory() {
        let registry = registry(fixture());
        let mut state = SessionState::new();
        registry.get_or_create(&mut state, "num").await;
        assert_eq!(state.file_names, vec!["num/num.d.ts"]);
        assert!(state.store.exists("num/index.d.ts"));
    }
}
