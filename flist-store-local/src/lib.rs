//! A chunk backend that stores each chunk as a file under a base
//! directory, sharded two levels deep by the leading hex digits of its
//! key — the synchronous counterpart of `blob_stores/local`'s
//! `LocalStore`, without the async `Store` trait or streaming reads this
//! engine never needs (every chunk is already bounded by the archive's
//! block size).

use std::fs;
use std::path::{Path, PathBuf};

use flist_core::backend::Backend;
use flist_core::hash::Hash128;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct LocalBackend {
    base_path: PathBuf,
}

impl LocalBackend {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalBackend {
            base_path: base_path.into(),
        }
    }

    fn path_for(&self, key: Hash128) -> PathBuf {
        let hex = key.to_hex();
        self.base_path.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }
}

impl Backend for LocalBackend {
    fn put(&self, key: Hash128, value: &[u8]) -> std::io::Result<()> {
        let full_path = self.path_for(key);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        trace!(key = %key, bytes = value.len(), "writing chunk");
        fs::write(full_path, value)
    }

    fn get(&self, key: Hash128) -> std::io::Result<Option<Vec<u8>>> {
        let full_path = self.path_for(key);
        match fs::read(full_path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl AsRef<Path> for LocalBackend {
    fn as_ref(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        let key = Hash128::of(b"chunk contents");

        assert_eq!(backend.get(key).unwrap(), None);
        backend.put(key, b"chunk contents").unwrap();
        assert_eq!(backend.get(key).unwrap().unwrap(), b"chunk contents");
    }

    #[test]
    fn sharded_layout_avoids_collisions_between_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        let a = Hash128::of(b"a");
        let b = Hash128::of(b"b");
        backend.put(a, b"A").unwrap();
        backend.put(b, b"B").unwrap();
        assert_eq!(backend.get(a).unwrap().unwrap(), b"A");
        assert_eq!(backend.get(b).unwrap().unwrap(), b"B");
    }
}
