//! advapi32 registry primitives
//!
//! Each function is a single call into the platform registry API. Buffers are
//! supplied by the caller; a buffer that is too small yields
//! [`RawError::MoreData`] (see [`crate::buffer::with_buffer`]). Names are
//! passed as Rust strings and converted to NUL-terminated UTF-16 here.
//!
//! On targets other than Windows every function returns
//! [`RawError::Unsupported`].

use crate::root::{Access, KeyInfo, RawKey};
use crate::status::Result;
use crate::tag::ValueTag;

/// Whether the platform registry can be reached from this build
pub const fn is_supported() -> bool {
    cfg!(windows)
}

#[cfg(windows)]
mod imp {
    use std::ptr;

    use windows_sys::Win32::System::Registry::{
        RegCloseKey, RegEnumKeyExW, RegEnumValueW, RegOpenKeyExW, RegQueryInfoKeyW,
        RegQueryValueExW, RegSetValueExW, HKEY, KEY_READ, KEY_SET_VALUE,
    };

    use super::*;
    use crate::status::{check, RawError};
    use crate::value::{to_wide, wide_to_string};

    fn hkey(key: RawKey) -> HKEY {
        key.0 as HKEY
    }

    fn wide(name: &str) -> Result<Vec<u16>> {
        to_wide(name).ok_or_else(|| RawError::InvalidName(name.to_string()))
    }

    fn buffer_len(len: usize) -> u32 {
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    pub fn open_key(parent: RawKey, path: &str, access: Access) -> Result<RawKey> {
        let path = wide(path)?;
        let sam = match access {
            Access::ReadWrite => KEY_READ | KEY_SET_VALUE,
            Access::ReadOnly => KEY_READ,
        };
        let mut opened: HKEY = ptr::null_mut();

        // SAFETY: `path` is NUL-terminated and outlives the call; `opened` is a
        // valid out-pointer.
        let status = unsafe { RegOpenKeyExW(hkey(parent), path.as_ptr(), 0, sam, &mut opened) };
        check("RegOpenKeyExW", status)?;

        Ok(RawKey(opened as usize))
    }

    pub fn close_key(key: RawKey) -> Result<()> {
        // SAFETY: closing consumes the handle; callers never reuse it.
        let status = unsafe { RegCloseKey(hkey(key)) };
        check("RegCloseKey", status)
    }

    pub fn query_info(key: RawKey) -> Result<KeyInfo> {
        let mut info = KeyInfo::default();

        // SAFETY: every non-null pointer refers to a live u32 in `info`.
        let status = unsafe {
            RegQueryInfoKeyW(
                hkey(key),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null(),
                &mut info.subkeys,
                &mut info.max_subkey_len,
                ptr::null_mut(),
                &mut info.values,
                &mut info.max_value_name_len,
                &mut info.max_value_len,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        check("RegQueryInfoKeyW", status)?;

        Ok(info)
    }

    pub fn enum_key(key: RawKey, index: u32, name: &mut [u16]) -> Result<String> {
        let mut len = buffer_len(name.len());

        // SAFETY: `name` holds `len` writable code units.
        let status = unsafe {
            RegEnumKeyExW(
                hkey(key),
                index,
                name.as_mut_ptr(),
                &mut len,
                ptr::null(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        check("RegEnumKeyExW", status)?;

        Ok(wide_to_string(&name[..(len as usize).min(name.len())]))
    }

    pub fn enum_value(key: RawKey, index: u32, name: &mut [u16]) -> Result<(String, ValueTag)> {
        let mut len = buffer_len(name.len());
        let mut tag: u32 = 0;

        // SAFETY: `name` holds `len` writable code units; no data is requested.
        let status = unsafe {
            RegEnumValueW(
                hkey(key),
                index,
                name.as_mut_ptr(),
                &mut len,
                ptr::null(),
                &mut tag,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        check("RegEnumValueW", status)?;

        Ok((
            wide_to_string(&name[..(len as usize).min(name.len())]),
            ValueTag::from_raw(tag),
        ))
    }

    pub fn query_value(key: RawKey, name: &str, data: &mut [u8]) -> Result<(usize, ValueTag)> {
        let name = wide(name)?;
        let mut len = buffer_len(data.len());
        let mut tag: u32 = 0;

        // SAFETY: `name` is NUL-terminated; `data` holds `len` writable bytes.
        let status = unsafe {
            RegQueryValueExW(
                hkey(key),
                name.as_ptr(),
                ptr::null(),
                &mut tag,
                data.as_mut_ptr(),
                &mut len,
            )
        };
        if status != 0 {
            return Err(RawError::from_status(
                "RegQueryValueExW",
                status,
                Some(len as usize),
            ));
        }

        Ok(((len as usize).min(data.len()), ValueTag::from_raw(tag)))
    }

    pub fn set_value(key: RawKey, name: &str, tag: ValueTag, data: &[u8]) -> Result<()> {
        let name = wide(name)?;
        let len = u32::try_from(data.len()).map_err(|_| RawError::Status {
            op: "RegSetValueExW",
            code: crate::status::code::ERROR_INVALID_PARAMETER,
        })?;

        // SAFETY: `name` is NUL-terminated; `data` is readable for `len` bytes.
        let status = unsafe {
            RegSetValueExW(
                hkey(key),
                name.as_ptr(),
                0,
                tag.to_raw(),
                data.as_ptr(),
                len,
            )
        };
        check("RegSetValueExW", status)
    }
}

#[cfg(not(windows))]
mod imp {
    use super::*;
    use crate::status::RawError;

    pub fn open_key(_parent: RawKey, _path: &str, _access: Access) -> Result<RawKey> {
        Err(RawError::Unsupported)
    }

    pub fn close_key(_key: RawKey) -> Result<()> {
        Err(RawError::Unsupported)
    }

    pub fn query_info(_key: RawKey) -> Result<KeyInfo> {
        Err(RawError::Unsupported)
    }

    pub fn enum_key(_key: RawKey, _index: u32, _name: &mut [u16]) -> Result<String> {
        Err(RawError::Unsupported)
    }

    pub fn enum_value(_key: RawKey, _index: u32, _name: &mut [u16]) -> Result<(String, ValueTag)> {
        Err(RawError::Unsupported)
    }

    pub fn query_value(_key: RawKey, _name: &str, _data: &mut [u8]) -> Result<(usize, ValueTag)> {
        Err(RawError::Unsupported)
    }

    pub fn set_value(_key: RawKey, _name: &str, _tag: ValueTag, _data: &[u8]) -> Result<()> {
        Err(RawError::Unsupported)
    }
}

/// Open `path` below `parent` with the requested rights.
///
/// # Errors
///
/// Returns an error if:
/// - The path does not exist (`ERROR_FILE_NOT_FOUND`)
/// - The caller lacks the requested rights (`ERROR_ACCESS_DENIED`)
/// - The path contains an interior NUL
pub fn open_key(parent: RawKey, path: &str, access: Access) -> Result<RawKey> {
    imp::open_key(parent, path, access)
}

/// Release a key handle obtained from [`open_key`].
pub fn close_key(key: RawKey) -> Result<()> {
    imp::close_key(key)
}

/// Query counts and size maxima for an open key.
pub fn query_info(key: RawKey) -> Result<KeyInfo> {
    imp::query_info(key)
}

/// Read the name of the subkey at `index` into `name`.
///
/// Fails with `ERROR_NO_MORE_ITEMS` past the last subkey and with
/// [`RawError::MoreData`] (without a size) when `name` cannot hold the name
/// plus its NUL.
pub fn enum_key(key: RawKey, index: u32, name: &mut [u16]) -> Result<String> {
    imp::enum_key(key, index, name)
}

/// Read the name and type of the value at `index`, without its data.
pub fn enum_value(key: RawKey, index: u32, name: &mut [u16]) -> Result<(String, ValueTag)> {
    imp::enum_value(key, index, name)
}

/// Read the value `name` into `data`, returning the stored length and type.
///
/// When `data` is too small the error carries the size the platform needs.
pub fn query_value(key: RawKey, name: &str, data: &mut [u8]) -> Result<(usize, ValueTag)> {
    imp::query_value(key, name, data)
}

/// Store `data` under `name` with type `tag`, replacing any existing value.
pub fn set_value(key: RawKey, name: &str, tag: ValueTag, data: &[u8]) -> Result<()> {
    imp::set_value(key, name, tag, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root::RootKey;

    #[test]
    #[cfg(not(windows))]
    fn test_unsupported_off_windows() {
        assert!(!is_supported());
        let err = open_key(RootKey::CurrentUser.raw(), "Software", Access::ReadOnly).unwrap_err();
        assert!(matches!(err, crate::RawError::Unsupported));
    }

    #[test]
    #[cfg(windows)]
    fn test_open_current_user_software() {
        let key = open_key(RootKey::CurrentUser.raw(), "Software", Access::ReadOnly).unwrap();
        let info = query_info(key).unwrap();
        assert!(info.subkeys > 0);
        close_key(key).unwrap();
    }
}
