//! The seam between typed key access and the store behind it
//!
//! [`RegistryApi`] mirrors the platform registry calls one to one, including
//! their buffer conventions: callers hand in buffers and get
//! [`RawError::MoreData`](regkey_raw::RawError::MoreData) back when they are
//! too small.

pub mod memory;
pub mod native;

pub use memory::MemoryApi;
pub use native::NativeApi;

use regkey_raw::{Access, KeyInfo, RawKey, Result, ValueTag};

pub trait RegistryApi: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    fn open_key(&self, parent: RawKey, path: &str, access: Access) -> Result<RawKey>;

    fn close_key(&self, key: RawKey) -> Result<()>;

    fn query_info(&self, key: RawKey) -> Result<KeyInfo>;

    /// Name of the subkey at `index`; `name` must fit the name plus a NUL.
    fn enum_key(&self, key: RawKey, index: u32, name: &mut [u16]) -> Result<String>;

    /// Name and type of the value at `index`.
    fn enum_value(&self, key: RawKey, index: u32, name: &mut [u16]) -> Result<(String, ValueTag)>;

    /// Copy the data of value `name` into `data`; returns its length and type.
    fn query_value(&self, key: RawKey, name: &str, data: &mut [u8]) -> Result<(usize, ValueTag)>;

    fn set_value(&self, key: RawKey, name: &str, tag: ValueTag, data: &[u8]) -> Result<()>;
}
