//! The backend client adapter: a narrow, synchronous interface to a remote
//! content-addressed blob store. The store's own wire protocol is out of
//! scope for this crate (§1); implementors just need to get bytes in and
//! out by key.

use crate::hash::Hash128;

/// A content-addressed blob store reachable by opaque `put`/`get`.
///
/// Implementations are expected to treat `put` as idempotent: putting the
/// same key twice (e.g. because two files share a chunk) must succeed
/// without re-uploading or erroring.
pub trait Backend: std::fmt::Debug {
    fn put(&self, key: Hash128, value: &[u8]) -> std::io::Result<()>;
    fn get(&self, key: Hash128) -> std::io::Result<Option<Vec<u8>>>;
}

/// Connection parameters for a remote backend, as carried in the `backend`
/// metadata record (§6): `{"host": ..., "port": ..., "namespace": ...}`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub host: String,
    pub port: u16,
    pub namespace: String,
}
