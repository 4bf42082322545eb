//! Recursive parallel directory walker.
//!
//! Each directory is one unit of work on the rayon pool. A unit takes an
//! admission slot, emits an entry for every non-directory child, spawns a new
//! unit per subdirectory, emits its own directory entry last and then gives
//! the slot back. The slot is never held while descendants run, so a parent
//! waiting on nothing cannot starve its children of slots.
//!
//! # Ordering
//!
//! Within one directory, child entries are sent before the directory's own
//! entry. Nothing is promised across siblings or across the stream.
use crate::model::{Entry, EntryKind};
use crate::platform::MetadataProvider;
use crate::scanner::admission::AdmissionLimiter;
use crate::scanner::cancel::CancelToken;
use crate::scanner::stats::ScanStats;
use crossbeam_channel::Sender;
use std::fs::{self, DirEntry, ReadDir};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Walker {
    provider: Arc<dyn MetadataProvider>,
    limiter: AdmissionLimiter,
    cancel: CancelToken,
    tx: Sender<Entry>,
    stats: Arc<ScanStats>,
    debug: bool,
}

impl Walker {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        admission_limit: usize,
        cancel: CancelToken,
        tx: Sender<Entry>,
        stats: Arc<ScanStats>,
    ) -> Self {
        Self {
            provider,
            limiter: AdmissionLimiter::new(admission_limit),
            cancel,
            tx,
            stats,
            debug: false,
        }
    }

    /// Log every admitted unit with slot and pipeline occupancy.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    /// Process the directory at `path`, spawning one task per subdirectory
    /// into `scope`. Returns once this directory's own entry is emitted;
    /// descendants keep running in the scope.
    pub fn visit<'s>(&'s self, scope: &rayon::Scope<'s>, path: PathBuf, depth: u32) {
        let _permit = self.limiter.acquire();

        if self.cancel.is_cancelled() {
            ScanStats::bump(&self.stats.units_skipped, 1);
            debug!(path = %path.display(), "cancelled, skipping directory");
            return;
        }

        if self.debug {
            debug!(
                path = %path.display(),
                active = self.limiter.active(),
                pending = self.tx.len(),
                "visiting directory"
            );
        }

        let mut dir = Entry::directory(&path, depth);

        match fs::metadata(&path) {
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to get directory info");
                dir.record_error(format!("failed to get directory info: {err}"));
            }
            Ok(_) => {
                self.apply_metadata(&mut dir, &path);
                match fs::read_dir(&path) {
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "failed to read directory");
                        dir.record_error(format!("failed to read directory: {err}"));
                    }
                    Ok(children) => match self.enumerate(scope, &mut dir, children, depth) {
                        Some(own_size) => dir.own_size = own_size,
                        // Pipeline closed; nobody is listening for this entry.
                        None => return,
                    },
                }
            }
        }

        self.emit(dir);
    }

    /// Emit every non-directory child and spawn a unit per subdirectory.
    ///
    /// Returns the sum of immediate regular file sizes, or `None` if the
    /// pipeline closed mid-way.
    fn enumerate<'s>(
        &'s self,
        scope: &rayon::Scope<'s>,
        dir: &mut Entry,
        children: ReadDir,
        depth: u32,
    ) -> Option<u64> {
        let child_depth = depth + 1;
        let mut own_size: u64 = 0;

        for child in children {
            let child = match child {
                Ok(c) => c,
                Err(err) => {
                    warn!(path = %dir.path, error = %err, "failed to read directory entry");
                    dir.record_error(format!("failed to read directory entry: {err}"));
                    continue;
                }
            };

            let child_path = child.path();
            let entry = match child.file_type() {
                Ok(ft) if ft.is_dir() => {
                    scope.spawn(move |s| self.visit(s, child_path, child_depth));
                    continue;
                }
                Ok(ft) if ft.is_file() => {
                    let entry = self.file_entry(&child, child_path, child_depth);
                    own_size += entry.own_size;
                    entry
                }
                Ok(_) => self.other_entry(&child, child_path, child_depth),
                Err(err) => {
                    let mut entry = Entry::other(&child_path, child_depth);
                    warn!(path = %child_path.display(), error = %err, "failed to read file type");
                    entry.record_error(format!("failed to read file type: {err}"));
                    entry
                }
            };

            if !self.emit(entry) {
                return None;
            }
        }

        Some(own_size)
    }

    fn file_entry(&self, child: &DirEntry, path: PathBuf, depth: u32) -> Entry {
        let mut entry = Entry::file(&path, depth);
        match child.metadata() {
            Ok(meta) => {
                entry.own_size = meta.len();
                self.apply_metadata(&mut entry, &path);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read file");
                entry.record_error(format!("failed to read file: {err}"));
            }
        }
        entry
    }

    /// Symlinks, devices, FIFOs and sockets. Never followed.
    fn other_entry(&self, child: &DirEntry, path: PathBuf, depth: u32) -> Entry {
        let mut entry = Entry::other(&path, depth);
        match child.metadata() {
            Ok(meta) => {
                entry.own_size = meta.len();
                self.apply_metadata(&mut entry, &path);
            }
            Err(err) => entry.record_error(format!("failed to read metadata: {err}")),
        }
        entry
    }

    /// Copy provider timestamps/owner onto `entry`. Provider failures are
    /// recorded but never stop the walk.
    fn apply_metadata(&self, entry: &mut Entry, path: &Path) {
        let meta = self.provider.times_and_owner(path);
        entry.created_at = meta.created_at;
        entry.accessed_at = meta.accessed_at;
        entry.modified_at = meta.modified_at;
        entry.owner = meta.owner;
        if let Some(err) = meta.error {
            warn!(path = %path.display(), error = %err, "metadata provider failed");
            entry.record_error(err);
        }
    }

    /// Count and send one entry. Blocks while the pipeline is full.
    /// Returns `false` once the writer has gone away.
    fn emit(&self, entry: Entry) -> bool {
        let stats = &self.stats;
        match entry.kind {
            EntryKind::Directory => ScanStats::bump(&stats.dirs_found, 1),
            EntryKind::File => {
                ScanStats::bump(&stats.files_found, 1);
                ScanStats::bump(&stats.bytes_found, entry.own_size);
            }
            EntryKind::Other => ScanStats::bump(&stats.others_found, 1),
        }
        if entry.has_error {
            ScanStats::bump(&stats.errors, 1);
        }

        if self.tx.send(entry).is_err() {
            // The writer only drops its receiver when it is gone for good.
            // Stop the rest of the walk from doing pointless work.
            if !self.cancel.is_cancelled() {
                warn!("pipeline closed while walking, raising cancellation");
                self.cancel.cancel();
            }
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{EntryMetadata, FsMetadataProvider};
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    // ── Helpers ──────────────────────────────────────────────────────────

    fn write_bytes(path: &Path, n: usize) {
        let mut f = fs::File::create(path).unwrap();
        f.write_all(&vec![0u8; n]).unwrap();
    }

    /// Walk `root` to completion and return entries in emission order.
    fn walk(root: &Path, provider: Arc<dyn MetadataProvider>, cancel: CancelToken) -> Vec<Entry> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let walker = Walker::new(provider, 4, cancel, tx, Arc::new(ScanStats::default()));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap();
        pool.scope(|s| {
            let w = &walker;
            let root = root.to_path_buf();
            s.spawn(move |s| w.visit(s, root, 1));
        });
        drop(walker);
        rx.into_iter().collect()
    }

    fn by_path(entries: &[Entry]) -> HashMap<String, Entry> {
        entries.iter().map(|e| (e.path.clone(), e.clone())).collect()
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    struct FailingProvider;

    impl MetadataProvider for FailingProvider {
        fn times_and_owner(&self, _path: &Path) -> EntryMetadata {
            EntryMetadata::failed("provider unavailable")
        }
    }

    // ── Tests ────────────────────────────────────────────────────────────

    #[test]
    fn own_sizes_and_depths() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_bytes(&root.join("ten"), 10);
        write_bytes(&root.join("twenty"), 20);
        fs::create_dir(root.join("a")).unwrap();
        write_bytes(&root.join("a").join("five"), 5);

        let entries = walk(root, Arc::new(FsMetadataProvider::new(false)), CancelToken::new());
        assert_eq!(entries.len(), 5);
        let map = by_path(&entries);

        let top = &map[&key(root)];
        assert_eq!(top.kind, EntryKind::Directory);
        assert_eq!(top.depth, 1);
        assert_eq!(top.own_size, 30);

        let a = &map[&key(&root.join("a"))];
        assert_eq!(a.depth, 2);
        assert_eq!(a.own_size, 5);

        let five = &map[&key(&root.join("a").join("five"))];
        assert_eq!(five.kind, EntryKind::File);
        assert_eq!(five.depth, 3);
        assert_eq!(five.own_size, 5);
        assert!(five.modified_at.is_some());
    }

    #[test]
    fn files_are_emitted_before_their_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        for d in ["x", "y", "x/z"] {
            fs::create_dir_all(root.join(d)).unwrap();
        }
        for f in ["f1", "x/f2", "x/f3", "y/f4", "x/z/f5"] {
            write_bytes(&root.join(f), 1);
        }

        let entries = walk(root, Arc::new(FsMetadataProvider::new(false)), CancelToken::new());
        let position: HashMap<&str, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.path.as_str(), i))
            .collect();

        for entry in entries.iter().filter(|e| e.kind == EntryKind::File) {
            let parent = crate::model::parent_path(&entry.path).unwrap();
            assert!(
                position[entry.path.as_str()] < position[parent],
                "{} emitted after its directory",
                entry.path
            );
        }
    }

    #[test]
    fn missing_directory_becomes_error_entry() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("gone");

        let entries = walk(&gone, Arc::new(FsMetadataProvider::new(false)), CancelToken::new());
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.kind, EntryKind::Directory);
        assert!(e.has_error);
        assert!(!e.error_message.as_deref().unwrap_or_default().is_empty());
        assert_eq!(e.own_size, 0);
    }

    #[test]
    fn provider_failure_is_recorded_but_not_fatal() {
        let tmp = TempDir::new().unwrap();
        write_bytes(&tmp.path().join("f"), 7);

        let entries = walk(tmp.path(), Arc::new(FailingProvider), CancelToken::new());
        let map = by_path(&entries);
        let f = &map[&key(&tmp.path().join("f"))];
        assert!(f.has_error);
        assert_eq!(f.own_size, 7, "size still comes from the directory listing");
        assert_eq!(f.modified_at, None);
        assert_eq!(map[&key(tmp.path())].own_size, 7);
    }

    #[test]
    fn cancelled_walk_emits_nothing() {
        let tmp = TempDir::new().unwrap();
        write_bytes(&tmp.path().join("f"), 1);
        let cancel = CancelToken::new();
        cancel.cancel();

        let entries = walk(tmp.path(), Arc::new(FsMetadataProvider::new(false)), cancel);
        assert!(entries.is_empty());
    }

    #[test]
    fn closed_pipeline_raises_cancellation() {
        let tmp = TempDir::new().unwrap();
        for i in 0..3 {
            fs::create_dir(tmp.path().join(format!("d{i}"))).unwrap();
            write_bytes(&tmp.path().join(format!("d{i}/f")), 1);
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let cancel = CancelToken::new();
        let walker = Walker::new(
            Arc::new(FsMetadataProvider::new(false)),
            2,
            cancel.clone(),
            tx,
            Arc::new(ScanStats::default()),
        );
        rayon::scope(|s| {
            let w = &walker;
            let root = tmp.path().to_path_buf();
            s.spawn(move |s| w.visit(s, root, 1));
        });
        assert!(cancel.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_recorded_not_followed() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("real")).unwrap();
        write_bytes(&root.join("real").join("f"), 3);
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let entries = walk(root, Arc::new(FsMetadataProvider::new(false)), CancelToken::new());
        let map = by_path(&entries);
        let link = &map[&key(&root.join("link"))];
        assert_eq!(link.kind, EntryKind::Other);
        assert!(!map.contains_key(&key(&root.join("link").join("f"))));
        // Links are not regular files, so they do not count toward own_size.
        assert_eq!(map[&key(root)].own_size, 0);
    }
}
