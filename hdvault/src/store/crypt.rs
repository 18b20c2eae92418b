//! Password-based authenticated encryption for keychain blobs
//!
//! Layout: `version(1) ‖ salt(32) ‖ nonce(12) ‖ ciphertext+tag`. The
//! key is PBKDF2-HMAC-SHA512 over the password; the KDF is intentionally
//! expensive to resist brute force, so encrypt/decrypt are the costly
//! calls of this crate. Wrong password and corrupted data are reported
//! identically to avoid an oracle.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Format tag of the envelope produced by this build
pub const BLOB_VERSION: u8 = 1;

const PBKDF2_ITERATIONS: u32 = 19_162;
const SALT_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;
const TAG_SIZE: usize = 16;

const VERSION_START: usize = 0;
const SALT_START: usize = VERSION_START + 1;
const NONCE_START: usize = SALT_START + SALT_SIZE;
const CIPHERTEXT_START: usize = NONCE_START + NONCE_SIZE;

/// Minimal length of a well-formed blob (empty plaintext)
const MIN_BLOB_SIZE: usize = CIPHERTEXT_START + TAG_SIZE;

fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut *key);
    key
}

/// Encrypt `plaintext` under `password` with a fresh salt and nonce
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_SIZE];
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(password, &salt);
    let cipher = ChaCha20Poly1305::new_from_slice(&*key)
        .map_err(|_| Error::Serialization("Invalid encryption key length".to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| Error::Serialization("Encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(MIN_BLOB_SIZE + plaintext.len());
    blob.push(BLOB_VERSION);
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob; the plaintext comes back in zeroizing storage
///
/// Truncation, bit flips anywhere and a wrong password all surface as
/// [`Error::AuthenticationFailed`]; only an unknown format tag is
/// distinguished, before any KDF work is done.
pub fn decrypt(blob: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
    if blob.is_empty() {
        return Err(Error::AuthenticationFailed);
    }
    if blob[VERSION_START] != BLOB_VERSION {
        return Err(Error::UnsupportedVersion(blob[VERSION_START] as u16));
    }
    if blob.len() < MIN_BLOB_SIZE {
        return Err(Error::AuthenticationFailed);
    }

    let salt = &blob[SALT_START..NONCE_START];
    let nonce = &blob[NONCE_START..CIPHERTEXT_START];
    let ciphertext = &blob[CIPHERTEXT_START..];

    let key = derive_key(password, salt);
    let cipher = ChaCha20Poly1305::new_from_slice(&*key)
        .map_err(|_| Error::AuthenticationFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| Error::AuthenticationFailed)
}
