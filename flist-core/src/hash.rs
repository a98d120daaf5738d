//! Keyless BLAKE2b hashing used for path keys, ACL keys, and chunk ids.
//!
//! The reference implementation computed these with a 128-bit BLAKE2b digest
//! (`blake2b(hash, path, "", KEYLENGTH, ...)` with an empty key). `Hash128`
//! is the Rust equivalent: a newtype over a 16-byte array with the same
//! lowercase-hex rendering as the source's `libflist_hashhex`.

use blake2::Blake2bVar;
use blake2::digest::{Update, VariableOutput};
use data_encoding::HEXLOWER;
use std::fmt;

/// A 16-byte (128-bit) BLAKE2b digest, used for `K_path`, `K_acl`, chunk ids
/// and chunk cipher keys.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash128([u8; 16]);

impl Hash128 {
    /// Hashes `data` with keyless BLAKE2b, truncated to 16 bytes of output.
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        let mut hasher = Blake2bVar::new(16).expect("16 is a valid blake2b output length");
        hasher.update(data.as_ref());
        let mut out = [0u8; 16];
        hasher
            .finalize_variable(&mut out)
            .expect("output buffer is exactly the configured length");
        Hash128(out)
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Hash128(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }

    /// Derives a 24-byte nonce from this hash, keyless BLAKE2b at the wider
    /// output size. Used to turn a chunk's plaintext-derived key into a
    /// deterministic XChaCha20-Poly1305 nonce (see `crypto::seal`).
    pub(crate) fn derive_nonce24(&self) -> [u8; 24] {
        self.widen::<24>()
    }

    /// Widens this 16-byte digest to a 32-byte XChaCha20-Poly1305 key via a
    /// second, wider-output keyless BLAKE2b pass over the same bytes. Used
    /// to turn the chunk cipher key (a `Hash128`) into the 256-bit key the
    /// AEAD construction requires.
    pub(crate) fn derive_cipher_key(&self) -> [u8; 32] {
        self.widen::<32>()
    }

    fn widen<const N: usize>(&self) -> [u8; N] {
        let mut hasher = Blake2bVar::new(N).expect("requested output length is valid for blake2b");
        hasher.update(&self.0);
        let mut out = [0u8; N];
        hasher
            .finalize_variable(&mut out)
            .expect("output buffer is exactly the configured length");
        out
    }
}

impl From<[u8; 16]> for Hash128 {
    fn from(value: [u8; 16]) -> Self {
        Hash128(value)
    }
}

impl From<Hash128> for [u8; 16] {
    fn from(value: Hash128) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for Hash128 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash128").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for Hash128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Normalizes a path the way `flist_clean_path` does: strip one leading and
/// one trailing slash. The root directory normalizes to the empty string.
pub fn normalize_path(path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    path.to_string()
}

/// `K_path`: the path key for a normalized path.
pub fn path_key(normalized_path: &str) -> Hash128 {
    Hash128::of(normalized_path.as_bytes())
}

/// `K_acl`: the ACL key for a `(uname, gname, mode)` triple.
///
/// The triple is serialized as `uname\0gname\0mode` before hashing; this
/// format is internal (never persisted) and only needs to be stable within
/// one process run of the engine, since the ACL key is recomputed from the
/// triple on every access rather than stored alongside it.
pub fn acl_key(uname: &str, gname: &str, mode: u16) -> Hash128 {
    let mut buf = Vec::with_capacity(uname.len() + gname.len() + 8);
    buf.extend_from_slice(uname.as_bytes());
    buf.push(0);
    buf.extend_from_slice(gname.as_bytes());
    buf.push(0);
    buf.extend_from_slice(&mode.to_le_bytes());
    Hash128::of(&buf)
}

/// Computes the parent path of a normalized path, the way `dirname` would,
/// except the root (`""`) is its own parent.
pub fn parent_path(normalized_path: &str) -> String {
    if normalized_path.is_empty() {
        return String::new();
    }
    match normalized_path.rfind('/') {
        Some(idx) => normalized_path[..idx].to_string(),
        None => String::new(),
    }
}

/// The leaf name of a normalized path (the last path component).
pub fn leaf_name(normalized_path: &str) -> &str {
    match normalized_path.rfind('/') {
        Some(idx) => &normalized_path[idx + 1..],
        None => normalized_path,
    }
}
