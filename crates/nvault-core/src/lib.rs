pub mod config;
pub mod error;
pub mod types;

pub use error::{NvaultError, NvaultResult};
pub use types::FileMeta;
