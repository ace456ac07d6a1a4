use std::fs::{File, OpenOptions};

use fs4::fs_std::FileExt;

use crate::config::StoreConfig;
use crate::error::{Result, TemplError};

const LOCK_FILE: &str = ".templ.lock";

/// Exclusive advisory lock over the whole store, held while collections are
/// fetched or updated. Released when dropped.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Block until no other process holds the store lock.
    pub fn acquire(store: &StoreConfig) -> Result<Self> {
        store.ensure_exists()?;

        let path = store.root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| TemplError::Io {
                context: format!("opening store lock {}", path.display()),
                source: e,
            })?;

        tracing::debug!("waiting for store lock {}", path.display());
        FileExt::lock_exclusive(&file).map_err(|e| TemplError::Io {
            context: format!("locking {}", path.display()),
            source: e,
        })?;

        Ok(Self { _file: file })
    }
}
