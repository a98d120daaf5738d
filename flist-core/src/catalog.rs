//! The catalog: a local, transactional key-value store holding every
//! dirnode, ACL record, and string-valued metadata field of one archive.
//!
//! Grounded in `registries/redb/src/lib.rs`'s `RedbRegistry` (open-and-ensure-
//! table-exists, `begin_write`/`open_table`/`commit` per mutation), stripped
//! of its `tokio::spawn_blocking` wrapping: the whole engine is synchronous
//! by design (§5), so every operation here runs directly on the caller's
//! thread.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use tracing::debug;

use crate::error::FlistResult;
use crate::hash::Hash128;

/// Dirnodes and ACL records, keyed by `K_path` / `K_acl`.
const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entries");
/// Free-form string metadata (`backend`, `entrypoint`, `environ`, ...).
const METADATA: TableDefinition<&str, &str> = TableDefinition::new("metadata");
/// A prior-generation single-table schema kept only so archives written by
/// it remain readable; never written to by this engine.
const ENTRIES_LEGACY: TableDefinition<&[u8], &[u8]> = TableDefinition::new("flist");

/// The on-disk catalog backing one archive. Cheap to clone: `redb::Database`
/// is internally reference-counted and safe to share within one process.
#[derive(Debug)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    /// Opens (creating if absent) the catalog file at `path`, ensuring both
    /// tables exist so a fresh archive is immediately readable.
    pub fn open(path: impl AsRef<Path>) -> FlistResult<Self> {
        let db = Database::create(path.as_ref())?;
        {
            let write_txn = db.begin_write()?;
            {
                let _ = write_txn.open_table(ENTRIES)?;
                let _ = write_txn.open_table(METADATA)?;
            }
            write_txn.commit()?;
        }
        debug!(path = %path.as_ref().display(), "catalog opened");
        Ok(Catalog { db })
    }

    /// Closes the catalog. A no-op beyond dropping the handle — kept as an
    /// explicit method because the spec's component boundary names `close`
    /// as an operation distinct from `Drop`.
    pub fn close(self) {}

    pub fn exists(&self, key: Hash128) -> FlistResult<bool> {
        Ok(self.sget(key)?.is_some())
    }

    /// Reads a dirnode or ACL record by key. Falls back to the legacy
    /// 32-byte-keyed table only when the 16-byte lookup misses, and only
    /// when `key` was itself produced by widening — callers pass the
    /// canonical 16-byte key and this never writes to the legacy table.
    pub fn sget(&self, key: Hash128) -> FlistResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        if let Some(guard) = table.get(key.as_bytes().as_slice())? {
            return Ok(Some(guard.value().to_vec()));
        }
        drop(table);

        match read_txn.open_table(ENTRIES_LEGACY) {
            Ok(legacy) => Ok(legacy
                .get(key.as_bytes().as_slice())?
                .map(|guard| guard.value().to_vec())),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn sset(&self, key: Hash128, value: &[u8]) -> FlistResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRIES)?;
            table.insert(key.as_bytes().as_slice(), value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn sdel(&self, key: Hash128) -> FlistResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRIES)?;
            table.remove(key.as_bytes().as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn mdget(&self, field: &str) -> FlistResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(METADATA)?;
        Ok(table.get(field)?.map(|guard| guard.value().to_string()))
    }

    pub fn mdset(&self, field: &str, value: &str) -> FlistResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(METADATA)?;
            table.insert(field, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn mddel(&self, field: &str) -> FlistResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(METADATA)?;
            table.remove(field)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_catalog() -> (Catalog, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(dir.path().join("flist.db")).unwrap();
        (catalog, dir)
    }

    #[test]
    fn entries_round_trip() {
        let (catalog, _dir) = temp_catalog();
        let key = Hash128::of(b"some/path");
        assert!(!catalog.exists(key).unwrap());
        catalog.sset(key, b"payload").unwrap();
        assert!(catalog.exists(key).unwrap());
        assert_eq!(catalog.sget(key).unwrap().unwrap(), b"payload");
        catalog.sdel(key).unwrap();
        assert!(!catalog.exists(key).unwrap());
    }

    #[test]
    fn metadata_round_trip() {
        let (catalog, _dir) = temp_catalog();
        assert_eq!(catalog.mdget("entrypoint").unwrap(), None);
        catalog.mdset("entrypoint", "/bin/sh").unwrap();
        assert_eq!(catalog.mdget("entrypoint").unwrap().as_deref(), Some("/bin/sh"));
        catalog.mddel("entrypoint").unwrap();
        assert_eq!(catalog.mdget("entrypoint").unwrap(), None);
    }

    #[test]
    fn reopening_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("flist.db");
        let key = Hash128::of(b"/");

        {
            let catalog = Catalog::open(&db_path).unwrap();
            catalog.sset(key, b"root dirnode").unwrap();
        }
        {
            let catalog = Catalog::open(&db_path).unwrap();
            assert_eq!(catalog.sget(key).unwrap().unwrap(), b"root dirnode");
        }
    }
}
