use once_cell::sync::Lazy;

use regkey_raw::{sys, Access, KeyInfo, RawError, RawKey, Result, ValueTag};

use super::RegistryApi;

/// The host registry, reached through `advapi32`
///
/// A single instance is bound lazily per process. On hosts without a registry
/// the binding records that and every call fails with
/// [`RawError::Unsupported`] before reaching the platform layer.
pub struct NativeApi {
    available: bool,
}

impl NativeApi {
    fn bind() -> Self {
        let available = sys::is_supported();
        if available {
            tracing::debug!("Bound native registry API (advapi32)");
        } else {
            tracing::warn!("Native registry API is not available on this platform");
        }
        Self { available }
    }

    pub fn instance() -> &'static NativeApi {
        static INSTANCE: Lazy<NativeApi> = Lazy::new(NativeApi::bind);
        &INSTANCE
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    fn ensure(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(RawError::Unsupported)
        }
    }
}

impl RegistryApi for NativeApi {
    fn name(&self) -> &'static str {
        "native"
    }

    fn open_key(&self, parent: RawKey, path: &str, access: Access) -> Result<RawKey> {
        self.ensure()?;
        sys::open_key(parent, path, access)
    }

    fn close_key(&self, key: RawKey) -> Result<()> {
        self.ensure()?;
        sys::close_key(key)
    }

    fn query_info(&self, key: RawKey) -> Result<KeyInfo> {
        self.ensure()?;
        sys::query_info(key)
    }

    fn enum_key(&self, key: RawKey, index: u32, name: &mut [u16]) -> Result<String> {
        self.ensure()?;
        sys::enum_key(key, index, name)
    }

    fn enum_value(&self, key: RawKey, index: u32, name: &mut [u16]) -> Result<(String, ValueTag)> {
        self.ensure()?;
        sys::enum_value(key, index, name)
    }

    fn query_value(&self, key: RawKey, name: &str, data: &mut [u8]) -> Result<(usize, ValueTag)> {
        self.ensure()?;
        sys::query_value(key, name, data)
    }

    fn set_value(&self, key: RawKey, name: &str, tag: ValueTag, data: &[u8]) -> Result<()> {
        self.ensure()?;
        sys::set_value(key, name, tag, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_singleton() {
        let api1 = NativeApi::instance();
        let api2 = NativeApi::instance();
        assert!(std::ptr::eq(api1, api2));
        assert_eq!(api1.is_available(), cfg!(windows));
    }

    #[test]
    #[cfg(not(windows))]
    fn test_native_fails_fast_off_windows() {
        let err = NativeApi::instance()
            .open_key(regkey_raw::RootKey::CurrentUser.raw(), "Software", Access::ReadOnly)
            .unwrap_err();
        assert!(matches!(err, RawError::Unsupported));
    }
}
