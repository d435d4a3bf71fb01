//! nvault-store: the encrypted blob store
//!
//! Attachments enter as staged plaintext files, get sealed with the master
//! key, and land as opaque objects under the blob root. The locator handed
//! back (an `xx/yy/<uuid>.enc` relative path) plus the IV recorded in note
//! metadata are everything needed to get the plaintext back.

pub mod blobs;
pub mod health;
pub mod operator;

pub use blobs::{BlobStore, SealedBlob};
pub use health::check_health;
pub use operator::build_operator;
