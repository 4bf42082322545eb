//! Replay selector — picks the roots for an errors-only re-walk.
use crate::error::StoreResult;
use crate::model::{parent_path, FailedDirectory};
use crate::store::RecordStore;
use std::collections::HashSet;
use std::path::Path;

/// Read the failed directories from an existing store.
///
/// Directories nested below another failed directory are dropped: re-walking
/// the outer one already covers them, and walking both would emit the inner
/// subtree twice.
pub fn select_failed_directories(store_path: &Path) -> StoreResult<Vec<FailedDirectory>> {
    let store = RecordStore::open_existing(store_path)?;
    let failed = store.failed_directories()?;
    Ok(prune_nested(failed))
}

/// Keep only the outermost directories. Input order is preserved.
pub fn prune_nested(dirs: Vec<FailedDirectory>) -> Vec<FailedDirectory> {
    let selected: HashSet<String> = dirs.iter().map(|d| d.path.clone()).collect();

    dirs.into_iter()
        .filter(|dir| {
            let mut current = parent_path(&dir.path);
            while let Some(ancestor) = current {
                if selected.contains(ancestor) {
                    return false;
                }
                current = parent_path(ancestor);
            }
            true
        })
        .collect()
}
