//! Platform-specific functionality — timestamps and ownership.
//!
//! The walker only sees the [`MetadataProvider`] trait; the filesystem
//! implementation and its per-OS owner lookup live here.

pub mod metadata;
pub mod owner;

pub use metadata::{EntryMetadata, FsMetadataProvider, MetadataProvider};
