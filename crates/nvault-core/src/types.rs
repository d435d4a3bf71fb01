use serde::{Deserialize, Serialize};

/// Metadata for an encrypted note attachment.
///
/// `encrypted_path` (the ciphertext locator) and `iv` are storage-internal:
/// they are persisted with the note but must never be exposed through the
/// API. Response types project them out structurally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Storage-side object name (final component of the locator)
    pub file_name: String,
    /// Client-supplied filename, returned on download
    pub original_name: String,
    /// MIME type as supplied at upload
    pub mime_type: String,
    /// Plaintext size in bytes
    pub size: u64,
    /// Ciphertext locator relative to the blob root
    pub encrypted_path: String,
    /// Hex-encoded 16-byte IV used to seal this blob
    pub iv: String,
}
