//! nvault-crypto: at-rest encryption for note attachments
//!
//! One symmetric master key (32 bytes, supplied as 64 hex chars) seals every
//! attachment blob. Sealing is AES-256-SIV with a fresh random 16-byte IV
//! per blob:
//!
//! ```text
//! Master Key (32 bytes, from config)
//!   └── Blob Sealing Key (64 bytes, HKDF-SHA256 expand, domain="nvault-blob-aes-siv")
//!         └── AES-256-SIV(nonce = random 128-bit IV)
//!
//! stored object = [16 bytes: SIV tag][N bytes: ciphertext]
//! metadata      = IV as 32 lowercase hex chars
//! ```
//!
//! The IV travels in note metadata, never inside the stored object; the
//! authentication tag travels inside the object. Decryption therefore needs
//! exactly the (locator, IV) pair and fails closed on a wrong key, wrong IV,
//! or tampered ciphertext.

pub mod blob;
pub mod key;

pub use blob::{decrypt_blob, encrypt_blob};
pub use key::MasterKey;

/// Size of the master key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of a blob IV in bytes (AES-SIV 128-bit nonce)
pub const IV_SIZE: usize = 16;

/// Size of the SIV authentication tag prepended to the ciphertext
pub const TAG_SIZE: usize = 16;
