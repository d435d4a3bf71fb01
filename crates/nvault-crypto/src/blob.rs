//! Whole-blob AES-256-SIV encryption/decryption
//!
//! Sealed blob format (binary):
//! ```text
//! [16 bytes: SIV tag][N bytes: ciphertext]
//! nonce = 16 random bytes, stored separately as lowercase hex metadata
//! ```
//!
//! Attachments are bounded to a few megabytes and buffered whole; each
//! blob is one AEAD pass, there is no chunking layer.

use aes_siv::{
    aead::{Aead, KeyInit},
    Aes256SivAead, Nonce,
};
use rand::RngCore;

use crate::key::MasterKey;
use crate::{IV_SIZE, TAG_SIZE};

/// HKDF domain string for the blob sealing key
const BLOB_KEY_DOMAIN: &[u8] = b"nvault-blob-aes-siv";

/// Encrypt a plaintext blob under the master key.
///
/// Generates a fresh random 16-byte IV per call, so sealing the same
/// plaintext twice yields unrelated ciphertexts.
///
/// Returns `(iv_hex, sealed)` where `iv_hex` is 32 lowercase hex chars to
/// store in metadata and `sealed` is `[16-byte tag][ciphertext]` to write
/// to blob storage.
pub fn encrypt_blob(key: &MasterKey, plaintext: &[u8]) -> anyhow::Result<(String, Vec<u8>)> {
    let cipher = blob_cipher(key)?;

    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| anyhow::anyhow!("blob encryption failed: {e}"))?;

    Ok((hex::encode(iv), sealed))
}

/// Decrypt a sealed blob with the master key and its recorded IV.
///
/// - `iv_hex`: the 32-hex-char IV stored alongside the note metadata
/// - `sealed`: `[16-byte tag][ciphertext]` as read from blob storage
///
/// Returns the original plaintext, byte-exact. Fails on a wrong key, wrong
/// IV, or any modification of the sealed bytes.
pub fn decrypt_blob(key: &MasterKey, iv_hex: &str, sealed: &[u8]) -> anyhow::Result<Vec<u8>> {
    let iv = parse_iv(iv_hex)?;

    if sealed.len() < TAG_SIZE {
        anyhow::bail!(
            "sealed blob too short: {} bytes (minimum {})",
            sealed.len(),
            TAG_SIZE
        );
    }

    let cipher = blob_cipher(key)?;

    cipher
        .decrypt(Nonce::from_slice(&iv), sealed)
        .map_err(|_| anyhow::anyhow!("blob decryption failed: wrong key, wrong IV, or corrupted data"))
}

/// Parse and validate a hex-encoded 16-byte IV.
fn parse_iv(iv_hex: &str) -> anyhow::Result<[u8; IV_SIZE]> {
    let decoded = hex::decode(iv_hex).map_err(|e| anyhow::anyhow!("invalid IV hex: {e}"))?;
    if decoded.len() != IV_SIZE {
        anyhow::bail!("invalid IV length: {} bytes (expected {})", decoded.len(), IV_SIZE);
    }
    let mut iv = [0u8; IV_SIZE];
    iv.copy_from_slice(&decoded);
    Ok(iv)
}

/// Build the AES-256-SIV cipher from the master key.
fn blob_cipher(key: &MasterKey) -> anyhow::Result<Aes256SivAead> {
    // AES-256-SIV requires a 64-byte key (two 32-byte sub-keys)
    let mut double_key = [0u8; 64];
    let hkdf = hkdf::Hkdf::<sha2::Sha256>::new(None, key.as_bytes());
    hkdf.expand(BLOB_KEY_DOMAIN, &mut double_key)
        .map_err(|e| anyhow::anyhow!("HKDF expand for AES-SIV: {e}"))?;

    Ok(Aes256SivAead::new((&double_key).into()))
}
