//! Metadata provider — creation/access/write times and optional owner.
//!
//! The provider never fails hard: any problem comes back as an error message
//! alongside absent timestamps, and the walker records it on the entry.
use crate::platform::owner;
use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

/// Timestamps and ownership for one path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    pub created_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub owner: Option<String>,
    /// Descriptive failure. Timestamps gathered before the failure are kept.
    pub error: Option<String>,
}

impl EntryMetadata {
    /// Metadata for a path that could not be described at all.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Source of timestamps and ownership for walked paths.
///
/// Shared by every walker unit, so implementations must be `Sync`.
pub trait MetadataProvider: Send + Sync {
    /// Describe `path` without following a trailing symbolic link.
    fn times_and_owner(&self, path: &Path) -> EntryMetadata;
}

/// Provider backed by `std::fs::symlink_metadata` plus the platform owner
/// lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadataProvider {
    resolve_owner: bool,
}

impl FsMetadataProvider {
    pub fn new(resolve_owner: bool) -> Self {
        Self { resolve_owner }
    }
}

impl MetadataProvider for FsMetadataProvider {
    fn times_and_owner(&self, path: &Path) -> EntryMetadata {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) => {
                return EntryMetadata::failed(format!(
                    "cannot read metadata for {}: {err}",
                    path.display()
                ))
            }
        };

        let mut result = EntryMetadata {
            created_at: created_time(&meta),
            accessed_at: meta.accessed().ok().map(to_utc),
            modified_at: meta.modified().ok().map(to_utc),
            owner: None,
            error: None,
        };

        if self.resolve_owner {
            match owner::resolve(path, &meta) {
                Ok(name) => result.owner = Some(name),
                Err(err) => {
                    result.error = Some(format!(
                        "cannot resolve owner for {}: {err}",
                        path.display()
                    ))
                }
            }
        }

        result
    }
}

#[inline]
fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Birth time where the platform has one, else the inode change time.
fn created_time(meta: &Metadata) -> Option<DateTime<Utc>> {
    if let Ok(born) = meta.created() {
        return Some(to_utc(born));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        DateTime::<Utc>::from_timestamp(meta.ctime(), meta.ctime_nsec().clamp(0, 999_999_999) as u32)
    }
    #[cfg(not(unix))]
    {
        None
    }
}
