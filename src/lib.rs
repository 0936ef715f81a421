pub mod config;
pub mod cookies;
pub mod errors;
pub mod prefix;
pub mod storage;

pub use errors::{Result, StorageError};
pub use prefix::{compute_effective_key, Prefix};
