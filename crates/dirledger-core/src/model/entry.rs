//! One record per filesystem object encountered by the walk.
//!
//! Entries are built by the walker, persisted once by the batch writer, and
//! (directories only) completed by the aggregation pass. Paths are stored as
//! lossily-converted UTF-8 strings because they are the store's primary key.
use chrono::{DateTime, Utc};
use std::path::{is_separator, Path};

/// What kind of filesystem object an entry describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    File,
    /// Symbolic links, devices, FIFOs, sockets. Recorded, never followed.
    Other,
}

impl EntryKind {
    /// Single-character code persisted in the `kind` column.
    pub fn code(self) -> &'static str {
        match self {
            EntryKind::Directory => "d",
            EntryKind::File => "f",
            EntryKind::Other => "o",
        }
    }

    /// Parse a `kind` column value.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "d" => Some(EntryKind::Directory),
            "f" => Some(EntryKind::File),
            "o" => Some(EntryKind::Other),
            _ => None,
        }
    }
}

/// A single file, directory or other object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,

    /// Absolute path. Unique across the store.
    pub path: String,

    /// 1 for the scan root, parent depth + 1 below it.
    pub depth: u32,

    /// Files: logical size. Directories: sum of immediate regular file
    /// children only; descendant directories are folded in by aggregation.
    pub own_size: u64,

    /// Cumulative size of a directory's subtree. `None` until aggregated.
    pub subtree_size: Option<u64>,

    /// `true` if this entry could not be fully read.
    /// The entry stays in the store so replay can find it.
    pub has_error: bool,
    pub error_message: Option<String>,

    /// Owner identity, only when owner resolution was requested.
    pub owner: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,

    /// Latest `modified_at` anywhere in the subtree. `None` until aggregated.
    pub subtree_modified_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// Create an entry with no size, timestamps or error.
    pub fn new(kind: EntryKind, path: impl Into<String>, depth: u32) -> Self {
        Self {
            kind,
            path: path.into(),
            depth,
            own_size: 0,
            subtree_size: None,
            has_error: false,
            error_message: None,
            owner: None,
            created_at: None,
            accessed_at: None,
            modified_at: None,
            subtree_modified_at: None,
        }
    }

    /// Create a directory entry for `path`.
    pub fn directory(path: &Path, depth: u32) -> Self {
        Self::new(EntryKind::Directory, path.to_string_lossy(), depth)
    }

    /// Create a file entry for `path`.
    pub fn file(path: &Path, depth: u32) -> Self {
        Self::new(EntryKind::File, path.to_string_lossy(), depth)
    }

    /// Create an entry for a non-regular, non-directory object.
    pub fn other(path: &Path, depth: u32) -> Self {
        Self::new(EntryKind::Other, path.to_string_lossy(), depth)
    }

    /// Flag this entry as failed. Further messages are appended with `; `.
    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.has_error = true;
        self.error_message = Some(match self.error_message.take() {
            Some(existing) => format!("{existing}; {message}"),
            None => message,
        });
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// A directory flagged with an error in a previous run.
///
/// Derived from the store on demand; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDirectory {
    pub path: String,
    pub depth: u32,
}

/// Derive the parent of a stored path by stripping the last separator.
///
/// This is an exact parent lookup, so `/a/bc` is never mistaken for a child
/// of `/a/b`. Returns `None` for a path with no separator or for the
/// filesystem root itself.
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches(is_separator);
    let cut = trimmed.rfind(is_separator)?;
    if cut == 0 {
        // "/a" → "/"; "/" itself has no parent.
        return if trimmed.is_empty() { None } else { Some(&path[..1]) };
    }
    let parent = &trimmed[..cut];
    // Keep the separator on drive roots so "C:\dir" → "C:\".
    if parent.ends_with(':') {
        Some(&trimmed[..=cut])
    } else {
        Some(parent)
    }
}
