//! # regkey-raw
//!
//! Low-level building blocks for Windows Registry access.
//!
//! This crate provides the value-type codes, status codes and byte-level
//! decoders used by the registry API, plus thin bindings to the `advapi32`
//! registry calls. Everything here is a one-to-one mapping onto the platform;
//! the typed, handle-owning layer lives in `regkey`.
//!
//! ## Platform support
//!
//! The bindings in [`sys`] only do real work on Windows. On every other target
//! they compile to stubs that return [`RawError::Unsupported`], so the decoders
//! and constants stay usable (and testable) everywhere.
//!
//! ## Usage
//!
//! ```ignore
//! use regkey_raw::{sys, Access, RootKey, ValueTag};
//!
//! let key = sys::open_key(RootKey::CurrentUser.raw(), "Software\\Test", Access::ReadWrite)?;
//! sys::set_value(key, "Enabled", ValueTag::DWord, &1u32.to_le_bytes())?;
//!
//! let mut data = [0u8; 16];
//! let (len, tag) = sys::query_value(key, "Enabled", &mut data)?;
//! assert_eq!(tag, ValueTag::DWord);
//! assert_eq!(regkey_raw::value::decode_dword(&data[..len]), Some(1));
//!
//! sys::close_key(key)?;
//! ```

pub mod buffer;
pub mod root;
pub mod status;
pub mod sys;
pub mod tag;
pub mod value;

// Re-export for convenience
pub use buffer::with_buffer;
pub use root::{Access, KeyInfo, RawKey, RootKey};
pub use status::{RawError, Result};
pub use tag::ValueTag;
pub use value::RawValue;
