//! The chunk encryption envelope.
//!
//! Each chunk is sealed with `XChaCha20Poly1305`, an AEAD construction that
//! fills the "AES-256-GCM-like" role the spec asks for (authenticated,
//! 256-bit-keyed stream cipher) using the AEAD family already present in
//! this codebase's dependency tree. The symmetric key is always the
//! BLAKE2b-128 hash of the plaintext (`plain_key`), so identical plaintexts
//! always derive identical keys.
//!
//! Nonce derivation is not specified by the reference implementation; this
//! engine fixes it as `BLAKE2b-192(plain_key)` — deterministic and
//! key-dependent, which is required for identical plaintexts to produce
//! identical ciphertexts (and therefore identical `chunk_id`s, the dedup
//! behavior required by property 4 in the spec).

use chacha20poly1305::{KeyInit, XChaCha20Poly1305, aead::Aead};

use crate::error::Error;
use crate::hash::Hash128;

/// Encrypts `plaintext`, returning the ciphertext. The key and nonce are
/// both derived from `plain_key` (see module docs), so this function is a
/// pure, deterministic mapping from `(plaintext, plain_key)` to ciphertext.
pub fn seal(plaintext: &[u8], plain_key: Hash128) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new((&plain_key.derive_cipher_key()).into());
    let nonce = plain_key.derive_nonce24();
    cipher
        .encrypt(nonce.as_slice().into(), plaintext)
        .expect("XChaCha20Poly1305 encryption of an in-memory buffer cannot fail")
}

/// Decrypts `ciphertext` with `plain_key`, verifying the AEAD tag. A
/// tampered or mismatched ciphertext surfaces as `Error::CorruptArchive`,
/// per the spec's `IntegrityError` requirement.
pub fn open(ciphertext: &[u8], plain_key: Hash128) -> Result<Vec<u8>, Error> {
    let cipher = XChaCha20Poly1305::new((&plain_key.derive_cipher_key()).into());
    let nonce = plain_key.derive_nonce24();
    cipher
        .decrypt(nonce.as_slice().into(), ciphertext)
        .map_err(|_| Error::CorruptArchive {
            detail: "chunk failed integrity verification during decryption".to_string(),
        })
}

/// Seals a plaintext block into `(ciphertext, chunk_id, plain_key)`, the
/// three values the chunker needs to both upload the block and record it in
/// a file inode's chunk manifest.
pub fn encrypt_chunk(plaintext: &[u8]) -> (Vec<u8>, Hash128, Hash128) {
    let plain_key = Hash128::of(plaintext);
    let ciphertext = seal(plaintext, plain_key);
    let chunk_id = Hash128::of(&ciphertext);
    (ciphertext, chunk_id, plain_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_and_open_round_trip() {
        let plaintext = b"hi\n";
        let (ciphertext, chunk_id, plain_key) = encrypt_chunk(plaintext);
        assert_eq!(plain_key, Hash128::of(plaintext));
        assert_eq!(chunk_id, Hash128::of(&ciphertext));

        let recovered = open(&ciphertext, plain_key).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn identical_plaintexts_encrypt_identically() {
        let (c1, id1, _) = encrypt_chunk(b"same bytes");
        let (c2, id2, _) = encrypt_chunk(b"same bytes");
        assert_eq!(c1, c2);
        assert_eq!(id1, id2);
    }

    #[test]
    fn tampered_ciphertext_fails_integrity_check() {
        let (mut ciphertext, _, plain_key) = encrypt_chunk(b"tamper me");
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xff;
        let err = open(&ciphertext, plain_key).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive { .. }));
    }
}
