pub mod api;
pub mod config;
pub mod error;
pub mod key;

pub use api::{MemoryApi, NativeApi, RegistryApi};
pub use config::{BoolDecoding, KeyConfig};
pub use error::{RegError, Result};
pub use key::RegKey;

// Re-export for convenience
pub use regkey_raw::{Access, KeyInfo, RawValue, RootKey, ValueTag};
