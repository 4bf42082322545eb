//! Preconditions checked before the engine is started.
//!
//! Every problem is collected so the user can fix them in one go. Nothing
//! here touches the log sink; the caller prints to stderr and exits with
//! code 2.
use crate::args::Args;
use dirledger_core::store::RecordStore;
use dirledger_core::StoreError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrecheckError {
    #[error("cannot read the scan path '{}': {source}", path.display())]
    PathUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("the scan path '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("the store '{}' cannot be a directory", .0.display())]
    StoreIsDirectory(PathBuf),

    #[error(
        "the store '{}' already exists; write to a new file or pass --replay-errors-only",
        .0.display()
    )]
    StoreExists(PathBuf),

    #[error(
        "the store '{}' does not exist; --replay-errors-only needs the store of an earlier scan",
        .0.display()
    )]
    StoreMissing(PathBuf),

    #[error(
        "the store '{}' was not written by an earlier scan: {source}",
        path.display()
    )]
    NotAStore {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("cannot check the store '{}': {source}", path.display())]
    StoreUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Inputs that passed every check.
#[derive(Debug, Clone)]
pub struct Checked {
    pub root: PathBuf,
    pub store: PathBuf,
}

pub fn precheck(args: &Args) -> Result<Checked, Vec<PrecheckError>> {
    let mut problems = Vec::new();

    match fs::metadata(&args.path) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => problems.push(PrecheckError::NotADirectory(args.path.clone())),
        Err(source) => problems.push(PrecheckError::PathUnreadable {
            path: args.path.clone(),
            source,
        }),
    }

    let store = store_path(&args.store);
    match fs::metadata(&store) {
        Ok(meta) if meta.is_dir() => problems.push(PrecheckError::StoreIsDirectory(store.clone())),
        Ok(_) if !args.replay_errors_only => {
            problems.push(PrecheckError::StoreExists(store.clone()))
        }
        Ok(_) => {
            if let Err(source) = RecordStore::verify_existing(&store) {
                problems.push(PrecheckError::NotAStore {
                    path: store.clone(),
                    source,
                });
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if args.replay_errors_only {
                problems.push(PrecheckError::StoreMissing(store.clone()));
            }
        }
        Err(source) => problems.push(PrecheckError::StoreUnreadable {
            path: store.clone(),
            source,
        }),
    }

    if problems.is_empty() {
        Ok(Checked {
            root: args.path.clone(),
            store,
        })
    } else {
        Err(problems)
    }
}

/// `store` with `.db` appended when it has no extension.
pub fn store_path(store: &Path) -> PathBuf {
    if store.extension().is_some() {
        store.to_path_buf()
    } else {
        let mut name = store.as_os_str().to_owned();
        name.push(".db");
        PathBuf::from(name)
    }
}
