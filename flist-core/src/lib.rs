//! A content-addressed directory archive format: a catalog of dirnodes and
//! ACL records describing a directory tree, with regular file content
//! split into encrypted, deduplicated chunks held by a separate backend.
//!
//! The catalog, wire codec, and chunk envelope are concrete (`redb`,
//! `minicbor`, `XChaCha20Poly1305`); the chunk backend is pluggable behind
//! [`Backend`](backend::Backend) so callers can point the same engine at a
//! local directory, an in-memory store, or a remote grid.

pub mod backend;
pub mod catalog;
pub mod chunker;
pub mod context;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod hash;
pub mod metadata;
pub mod model;
pub mod ops;

pub use context::{Ctx, Stats};
pub use error::{Error, FlistResult};
pub use hash::Hash128;
pub use model::{AclRecord, DirNode, DirTree, Inode};

use std::path::Path;

/// Opens the catalog at `db_path`, returning a ready-to-use [`Ctx`] with no
/// backend configured. Callers that need chunk upload/download attach one
/// with [`Ctx::with_backend`] or by assigning `ctx.backend` directly.
pub fn open(db_path: impl AsRef<Path>) -> FlistResult<Ctx> {
    let catalog = catalog::Catalog::open(db_path)?;
    Ok(Ctx::new(catalog))
}
