//! The engine's context object: the catalog handle, an optional backend
//! client, and running statistics, threaded explicitly through every
//! mutation instead of living in a process-wide global.
//!
//! The reference implementation kept this as a single `struct flist_settings`
//! written by `libflist_settings_*` into a process-global. `Ctx` is its
//! replacement: ordinary owned state passed by reference, matching how
//! `DirContext` (`s5_fs/src/context.rs`) carries a directory's storage and
//! keys without reaching for globals.

use std::sync::Arc;

use crate::backend::Backend;
use crate::catalog::Catalog;

/// Running totals over one archive build, surfaced at the end of a `putdir`
/// the way the reference CLI prints a summary after walking a tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub regular: u64,
    pub symlink: u64,
    pub directory: u64,
    pub special: u64,
    pub total_size: u64,
}

impl Stats {
    pub fn record_regular(&mut self, size: u64) {
        self.regular += 1;
        self.total_size += size;
    }

    pub fn record_symlink(&mut self) {
        self.symlink += 1;
    }

    pub fn record_directory(&mut self) {
        self.directory += 1;
    }

    pub fn record_special(&mut self) {
        self.special += 1;
    }
}

/// Everything a mutation needs beyond the path and payload it was called
/// with: the catalog to read/write dirnodes through, and, if this archive
/// has one configured, the backend chunks are uploaded to and downloaded
/// from.
#[derive(Debug)]
pub struct Ctx {
    pub catalog: Catalog,
    pub backend: Option<Arc<dyn Backend>>,
    pub stats: Stats,
}

impl Ctx {
    pub fn new(catalog: Catalog) -> Self {
        Ctx {
            catalog,
            backend: None,
            stats: Stats::default(),
        }
    }

    pub fn with_backend(catalog: Catalog, backend: Arc<dyn Backend>) -> Self {
        Ctx {
            catalog,
            backend: Some(backend),
            stats: Stats::default(),
        }
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }
}
