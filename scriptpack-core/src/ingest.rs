//! Directory ingestion
//!
//! The boundary where real files enter a session. Directories are walked
//! depth-first with an explicit stack; every `.ts`/`.tsx` file is stored
//! under its logical path and listed as a compilation root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use scriptpack_vfs::{LoadResult, SourceLoader};
use tracing::{debug, instrument};

use crate::store::{SessionState, SOURCE_SUFFIXES};

/// Join logical path segments with `/`, skipping empty ones
pub fn logical_join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Read every source file below `dir` into the session.
///
/// Files are stored as `<package>/<parent>/<relative path>`; `package` and
/// `parent` may be empty. Returns the ingested texts by logical path.
#[instrument(target = "scriptpack::compiler", skip(loader, state))]
pub async fn ingest_directory(
    loader: &dyn SourceLoader,
    state: &mut SessionState,
    dir: &Path,
    parent: &str,
    package: &str,
) -> LoadResult<BTreeMap<String, String>> {
    let mut result = BTreeMap::new();
    // (real directory, logical parent)
    let mut pending: Vec<(PathBuf, String)> = vec![(dir.to_path_buf(), parent.to_string())];

    while let Some((current, logical_parent)) = pending.pop() {
        let entries = loader.read_dir(&current).await?;
        let mut subdirs = Vec::new();
        for entry in entries {
            let full_path = current.join(&entry.name);
            if entry.is_dir {
                subdirs.push((full_path, logical_join([logical_parent.as_str(), entry.name.as_str()])));
                continue;
            }
            if !SOURCE_SUFFIXES.iter().any(|suffix| entry.name.ends_with(suffix)) {
                continue;
            }
            let logical = logical_join([package, logical_parent.as_str(), entry.name.as_str()]);
            let text = loader.read_to_string(&full_path).await?;
            debug!(target: "scriptpack::compiler", path = %logical, "ingested file");
            state.add_file(&logical, text.as_str(), None);
            result.insert(logical, text);
        }
        // Reverse so the first subdirectory is walked next
        pending.extend(subdirs.into_iter().rev());
    }

    Ok(result)
}
