//! The crate-wide error type. Every mutation API returns a `FlistResult`;
//! the engine never panics or aborts the process on a recoverable
//! precondition failure — the `diep`-style fatal exits of the reference
//! implementation are migration artifacts, not a contract to preserve.

use thiserror::Error;

pub type FlistResult<T> = Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("path not found: {path}")]
    NotFound { path: String },

    #[error("path already exists: {path}")]
    AlreadyExists { path: String },

    #[error("invalid path: {reason}")]
    InvalidPath { reason: String },

    #[error("corrupt archive: {detail}")]
    CorruptArchive { detail: String },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[source] std::io::Error),

    #[error("no backend configured for this operation")]
    BackendMissing,

    #[error("catalog I/O error")]
    Catalog(#[from] redb::Error),

    #[error("local I/O error")]
    Io(#[from] std::io::Error),
}

impl From<redb::DatabaseError> for Error {
    fn from(e: redb::DatabaseError) -> Self {
        Error::Catalog(e.into())
    }
}

impl From<redb::TransactionError> for Error {
    fn from(e: redb::TransactionError) -> Self {
        Error::Catalog(e.into())
    }
}

impl From<redb::TableError> for Error {
    fn from(e: redb::TableError) -> Self {
        Error::Catalog(e.into())
    }
}

impl From<redb::StorageError> for Error {
    fn from(e: redb::StorageError) -> Self {
        Error::Catalog(e.into())
    }
}

impl From<redb::CommitError> for Error {
    fn from(e: redb::CommitError) -> Self {
        Error::Catalog(e.into())
    }
}
