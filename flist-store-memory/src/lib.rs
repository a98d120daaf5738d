//! An in-process chunk backend, used by tests and by callers that just
//! want to build an archive's catalog without wiring up a real store — the
//! synchronous counterpart of `blob_stores/memory`'s `MemoryStore`.
//!
//! Backed by a plain `RefCell<HashMap>` rather than the teacher's
//! `DashMap`: this engine has no internal concurrency (§5), so there is no
//! concurrent access to guard against.

use std::cell::RefCell;
use std::collections::HashMap;

use flist_core::backend::Backend;
use flist_core::hash::Hash128;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    chunks: RefCell<HashMap<Hash128, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            chunks: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Backend for MemoryBackend {
    fn put(&self, key: Hash128, value: &[u8]) -> std::io::Result<()> {
        self.chunks.borrow_mut().insert(key, value.to_vec());
        Ok(())
    }

    fn get(&self, key: Hash128) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.chunks.borrow().get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let backend = MemoryBackend::new();
        let key = Hash128::of(b"chunk");
        assert_eq!(backend.get(key).unwrap(), None);
        backend.put(key, b"chunk").unwrap();
        assert_eq!(backend.get(key).unwrap().unwrap(), b"chunk");
        assert_eq!(backend.len(), 1);
    }
}
