use std::collections::BTreeMap;
use std::fmt;

use regkey_raw::value::{decode_dword, decode_utf16, decode_uvarint, encode_dword};
use regkey_raw::{with_buffer, KeyInfo, RawKey, RawValue, RootKey, ValueTag};

use crate::api::{NativeApi, RegistryApi};
use crate::config::{BoolDecoding, KeyConfig};
use crate::error::{RegError, Result};

/// An open registry key
///
/// The handle is released by [`RegKey::close`] or, failing that, when the
/// value is dropped. Every accessor is a direct round-trip to the store.
pub struct RegKey<'a> {
    api: &'a dyn RegistryApi,
    raw: RawKey,
    path: String,
    config: KeyConfig,
    open: bool,
}

impl RegKey<'static> {
    /// Open `path` under `root` in the host registry with default settings.
    pub fn open(path: &str, root: RootKey) -> Result<Self> {
        Self::open_with(NativeApi::instance(), path, root, KeyConfig::default())
    }
}

impl<'a> RegKey<'a> {
    pub fn open_with(
        api: &'a dyn RegistryApi,
        path: &str,
        root: RootKey,
        config: KeyConfig,
    ) -> Result<Self> {
        let full_path = join_path(root.name(), path);
        let raw = api
            .open_key(root.raw(), path, config.access)
            .map_err(|e| RegError::access(&full_path, e))?;

        tracing::info!(
            "Opened registry key {} ({:?}, {} api)",
            full_path,
            config.access,
            api.name()
        );

        Ok(Self {
            api,
            raw,
            path: full_path,
            config,
            open: true,
        })
    }

    /// Open `path` relative to this key, with the same api and settings.
    pub fn open_subkey(&self, path: &str) -> Result<RegKey<'a>> {
        let full_path = join_path(&self.path, path);
        let raw = self
            .api
            .open_key(self.raw, path, self.config.access)
            .map_err(|e| RegError::access(&full_path, e))?;

        tracing::debug!("Opened registry subkey {}", full_path);

        Ok(RegKey {
            api: self.api,
            raw,
            path: full_path,
            config: self.config,
            open: true,
        })
    }

    /// Release the key.
    pub fn close(mut self) -> Result<()> {
        self.open = false;
        self.api.close_key(self.raw)?;
        tracing::debug!("Closed registry key {}", self.path);
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &KeyConfig {
        &self.config
    }

    pub fn info(&self) -> Result<KeyInfo> {
        Ok(self.api.query_info(self.raw)?)
    }

    /// Names of the direct subkeys, in the order the store reports them.
    pub fn subkeys(&self) -> Result<Vec<String>> {
        let info = self.info()?;
        let initial = (info.max_subkey_len as usize + 1).max(self.config.initial_buffer);
        let mut names = Vec::with_capacity(info.subkeys as usize);

        for index in 0..info.subkeys {
            let name = with_buffer::<u16, _>(
                "RegEnumKeyExW",
                initial,
                self.config.max_buffer,
                |buf| self.api.enum_key(self.raw, index, buf),
            );
            match name {
                Ok(name) => names.push(name),
                Err(e) if e.is_no_more_items() => {
                    tracing::debug!(
                        "{} lost subkeys during enumeration ({} of {})",
                        self.path,
                        index,
                        info.subkeys
                    );
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(names)
    }

    /// Value names mapped to their coarse type label.
    ///
    /// Only string, DWORD and binary values appear; their data is not read.
    pub fn values(&self) -> Result<BTreeMap<String, &'static str>> {
        let info = self.info()?;
        let initial = (info.max_value_name_len as usize + 1).max(self.config.initial_buffer);
        let mut values = BTreeMap::new();

        for index in 0..info.values {
            let entry = with_buffer::<u16, _>(
                "RegEnumValueW",
                initial,
                self.config.max_buffer,
                |buf| self.api.enum_value(self.raw, index, buf),
            );
            let (name, tag) = match entry {
                Ok(entry) => entry,
                Err(e) if e.is_no_more_items() => break,
                Err(e) => return Err(e.into()),
            };
            match tag.label() {
                Some(label) => {
                    values.insert(name, label);
                }
                None => tracing::debug!("Skipping {}\\{} of type {}", self.path, name, tag),
            }
        }

        Ok(values)
    }

    /// Bytes and type of the value `name`, undecoded.
    pub fn raw_value(&self, name: &str) -> Result<RawValue> {
        let (data, tag) = with_buffer::<u8, _>(
            "RegQueryValueExW",
            self.config.initial_buffer,
            self.config.max_buffer,
            |buf| {
                let (len, tag) = self.api.query_value(self.raw, name, buf)?;
                Ok((buf[..len].to_vec(), tag))
            },
        )
        .map_err(|e| RegError::value(name, e))?;

        tracing::debug!(
            "Registry read: {}\\{} = {} bytes of {}",
            self.path,
            name,
            data.len(),
            tag
        );

        Ok(RawValue::new(tag, data))
    }

    fn typed_value(&self, name: &str, expected: ValueTag) -> Result<RawValue> {
        let value = self.raw_value(name)?;
        if value.tag != expected {
            return Err(RegError::TypeMismatch {
                name: name.to_string(),
                expected,
                found: value.tag,
            });
        }
        Ok(value)
    }

    pub fn dword_value(&self, name: &str) -> Result<u32> {
        let value = self.typed_value(name, ValueTag::DWord)?;
        decode_dword(&value.data).ok_or_else(|| RegError::ValueRange {
            name: name.to_string(),
            reason: format!("{} bytes cannot hold a DWORD", value.len()),
        })
    }

    pub fn set_dword_value(&self, name: &str, value: u32) -> Result<()> {
        self.api
            .set_value(self.raw, name, ValueTag::DWord, &encode_dword(value))
            .map_err(|e| RegError::write(&self.path, e))?;

        tracing::debug!("Registry write: {}\\{} = {}", self.path, name, value);
        Ok(())
    }

    /// Read a DWORD value that must hold 0 or 1.
    ///
    /// The bytes are decoded according to [`KeyConfig::bool_decoding`].
    pub fn bool_value(&self, name: &str) -> Result<bool> {
        let value = self.typed_value(name, ValueTag::DWord)?;
        let decoded = match self.config.bool_decoding {
            BoolDecoding::Dword => decode_dword(&value.data).map(u64::from),
            BoolDecoding::Varint => decode_uvarint(&value.data).map(|(v, _)| v),
        };

        match decoded {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(other) => Err(RegError::ValueRange {
                name: name.to_string(),
                reason: format!("{other} is not a boolean"),
            }),
            None => Err(RegError::ValueRange {
                name: name.to_string(),
                reason: format!(
                    "{} bytes do not decode as {:?}",
                    value.len(),
                    self.config.bool_decoding
                ),
            }),
        }
    }

    pub fn string_value(&self, name: &str) -> Result<String> {
        let value = self.typed_value(name, ValueTag::String)?;
        Ok(decode_utf16(&value.data))
    }
}

impl Drop for RegKey<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.api.close_key(self.raw) {
                tracing::warn!("Failed to close registry key {}: {}", self.path, e);
            }
        }
    }
}

impl fmt::Debug for RegKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegKey")
            .field("path", &self.path)
            .field("raw", &self.raw)
            .field("api", &self.api.name())
            .finish()
    }
}

fn join_path(parent: &str, child: &str) -> String {
    let child = child.trim_matches('\\');
    if child.is_empty() {
        parent.to_string()
    } else {
        format!("{parent}\\{child}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use regkey_raw::tag::code;
    use regkey_raw::value::encode_utf16;
    use regkey_raw::RawError;

    const TEST_KEY: &str = "Software\\Test";

    fn seeded() -> MemoryApi {
        let api = MemoryApi::new();
        api.create_key(RootKey::CurrentUser, TEST_KEY);
        api
    }

    fn open(api: &MemoryApi) -> RegKey<'_> {
        RegKey::open_with(api, TEST_KEY, RootKey::CurrentUser, KeyConfig::default()).unwrap()
    }

    #[test]
    fn test_enabled_scenario() {
        let api = seeded();
        let key = open(&api);
        assert_eq!(key.path(), "HKEY_CURRENT_USER\\Software\\Test");

        key.set_dword_value("Enabled", 1).unwrap();
        assert!(key.bool_value("Enabled").unwrap());
        key.close().unwrap();

        let config = KeyConfig::default().with_bool_decoding(BoolDecoding::Varint);
        let key = RegKey::open_with(&api, TEST_KEY, RootKey::CurrentUser, config).unwrap();
        assert!(key.bool_value("Enabled").unwrap());
    }

    #[test]
    fn test_dword_roundtrip() {
        let api = seeded();
        let key = open(&api);
        for v in [0, 1, 0x7F, 0x80, 0xFFFF, 0x8000_0000, u32::MAX] {
            key.set_dword_value("Counter", v).unwrap();
            assert_eq!(key.dword_value("Counter").unwrap(), v);
        }
    }

    #[test]
    fn test_dword_on_string_is_type_mismatch() {
        let api = seeded();
        api.put_value(RootKey::CurrentUser, TEST_KEY, "Name", ValueTag::String, encode_utf16("x"));
        let key = open(&api);

        let err = key.dword_value("Name").unwrap_err();
        assert!(matches!(
            err,
            RegError::TypeMismatch {
                expected: ValueTag::DWord,
                found: ValueTag::String,
                ..
            }
        ));
        assert!(matches!(key.bool_value("Name"), Err(RegError::TypeMismatch { .. })));
    }

    #[test]
    fn test_missing_values_are_not_found() {
        let api = seeded();
        let key = open(&api);
        assert!(matches!(key.string_value("Missing"), Err(RegError::NotFound { .. })));
        assert!(matches!(key.dword_value("Missing"), Err(RegError::NotFound { .. })));
        assert!(matches!(key.bool_value("Missing"), Err(RegError::NotFound { .. })));
    }

    #[test]
    fn test_string_value() {
        let api = seeded();
        api.put_value(
            RootKey::CurrentUser,
            TEST_KEY,
            "Greeting",
            ValueTag::String,
            encode_utf16("grüß dich"),
        );
        let key = open(&api);
        assert_eq!(key.string_value("greeting").unwrap(), "grüß dich");

        key.set_dword_value("Count", 3).unwrap();
        assert!(matches!(key.string_value("Count"), Err(RegError::TypeMismatch { .. })));
    }

    #[test]
    fn test_short_dword_is_value_range() {
        let api = seeded();
        api.put_value(RootKey::CurrentUser, TEST_KEY, "Short", ValueTag::DWord, vec![1, 0]);
        let key = open(&api);
        assert!(matches!(key.dword_value("Short"), Err(RegError::ValueRange { .. })));
        assert!(matches!(key.bool_value("Short"), Err(RegError::ValueRange { .. })));
    }

    #[test]
    fn test_bool_rejects_values_outside_zero_and_one() {
        let api = seeded();
        let key = open(&api);

        key.set_dword_value("Flag", 0).unwrap();
        assert!(!key.bool_value("Flag").unwrap());

        key.set_dword_value("Flag", 2).unwrap();
        assert!(matches!(key.bool_value("Flag"), Err(RegError::ValueRange { .. })));

        key.set_dword_value("Flag", 256).unwrap();
        assert!(matches!(key.bool_value("Flag"), Err(RegError::ValueRange { .. })));
    }

    #[test]
    fn test_varint_decoding_reads_only_leading_bytes() {
        let api = seeded();
        let config = KeyConfig::default().with_bool_decoding(BoolDecoding::Varint);
        let key = RegKey::open_with(&api, TEST_KEY, RootKey::CurrentUser, config).unwrap();

        // 256 is stored as 00 01 00 00, whose varint prefix is a lone zero.
        key.set_dword_value("Flag", 256).unwrap();
        assert!(!key.bool_value("Flag").unwrap());

        api.put_value(RootKey::CurrentUser, TEST_KEY, "Broken", ValueTag::DWord, vec![0x80; 4]);
        assert!(matches!(key.bool_value("Broken"), Err(RegError::ValueRange { .. })));
    }

    #[test]
    fn test_bool_decodings_disagree_on_128_and_256() {
        let api = seeded();
        let dword = open(&api);
        let varint = RegKey::open_with(
            &api,
            TEST_KEY,
            RootKey::CurrentUser,
            KeyConfig::default().with_bool_decoding(BoolDecoding::Varint),
        )
        .unwrap();

        for stored in [128, 256] {
            dword.set_dword_value("Flag", stored).unwrap();
            assert!(matches!(dword.bool_value("Flag"), Err(RegError::ValueRange { .. })));
            assert!(!varint.bool_value("Flag").unwrap());
        }

        for stored in [0, 1] {
            dword.set_dword_value("Flag", stored).unwrap();
            assert_eq!(dword.bool_value("Flag").unwrap(), stored == 1);
            assert_eq!(varint.bool_value("Flag").unwrap(), stored == 1);
        }
    }

    #[test]
    fn test_subkeys() {
        let api = seeded();
        let key = open(&api);
        assert!(key.subkeys().unwrap().is_empty());

        api.create_key(RootKey::CurrentUser, "Software\\Test\\Beta");
        api.create_key(RootKey::CurrentUser, "Software\\Test\\Alpha");
        assert_eq!(key.subkeys().unwrap(), vec!["Beta", "Alpha"]);
    }

    fn seeded_listing() -> MemoryApi {
        let api = seeded();
        api.create_key(RootKey::CurrentUser, "Software\\Test\\a");
        api.create_key(RootKey::CurrentUser, "Software\\Test\\b");
        api.put_value(RootKey::CurrentUser, TEST_KEY, "x", ValueTag::DWord, vec![1, 0, 0, 0]);
        api.put_value(RootKey::CurrentUser, TEST_KEY, "y", ValueTag::Binary, vec![2]);
        api
    }

    #[test]
    fn test_enumeration_failure_is_platform_error() {
        let api = seeded_listing();
        let key = open(&api);
        api.fail_enum_from(1, regkey_raw::status::code::ERROR_INVALID_HANDLE);

        for err in [key.subkeys().unwrap_err(), key.values().unwrap_err()] {
            assert!(matches!(
                err,
                RegError::Platform(RawError::Status { code: 6, .. })
            ));
        }
    }

    #[test]
    fn test_key_shrinking_during_enumeration_ends_listing() {
        let api = seeded_listing();
        let key = open(&api);
        api.fail_enum_from(1, regkey_raw::status::code::ERROR_NO_MORE_ITEMS);

        assert_eq!(key.subkeys().unwrap(), vec!["a"]);
        let values = key.values().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("x"), Some(&"uint32"));

        api.clear_enum_failure();
        assert_eq!(key.subkeys().unwrap(), vec!["a", "b"]);
        assert_eq!(key.values().unwrap().len(), 2);
    }

    #[test]
    fn test_long_subkey_names_are_read_whole() {
        let api = seeded();
        let long = "k".repeat(300);
        api.create_key(RootKey::CurrentUser, &format!("{TEST_KEY}\\{long}"));

        let config = KeyConfig::default().with_initial_buffer(8);
        let key = RegKey::open_with(&api, TEST_KEY, RootKey::CurrentUser, config).unwrap();
        assert_eq!(key.subkeys().unwrap(), vec![long]);
    }

    #[test]
    fn test_values_lists_supported_tags_only() {
        let api = seeded();
        api.put_value(RootKey::CurrentUser, TEST_KEY, "Name", ValueTag::String, encode_utf16("x"));
        api.put_value(RootKey::CurrentUser, TEST_KEY, "Blob", ValueTag::Binary, vec![1, 2, 3]);
        api.put_value(
            RootKey::CurrentUser,
            TEST_KEY,
            "Big",
            ValueTag::from_raw(code::REG_QWORD),
            vec![0; 8],
        );
        api.put_value(
            RootKey::CurrentUser,
            TEST_KEY,
            "Multi",
            ValueTag::from_raw(code::REG_MULTI_SZ),
            vec![0; 4],
        );
        let key = open(&api);
        key.set_dword_value("Enabled", 1).unwrap();

        let values = key.values().unwrap();
        let expected: BTreeMap<String, &str> = [
            ("Blob".to_string(), "binary"),
            ("Enabled".to_string(), "uint32"),
            ("Name".to_string(), "string"),
        ]
        .into_iter()
        .collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_large_value_is_read_completely() {
        let api = seeded();
        let blob: Vec<u8> = (0..5000u32).map(|i| i as u8).collect();
        api.put_value(RootKey::CurrentUser, TEST_KEY, "Blob", ValueTag::Binary, blob.clone());
        let key = open(&api);

        let value = key.raw_value("Blob").unwrap();
        assert_eq!(value, RawValue::new(ValueTag::Binary, blob));
    }

    #[test]
    fn test_value_beyond_max_buffer_fails() {
        let api = seeded();
        api.put_value(RootKey::CurrentUser, TEST_KEY, "Blob", ValueTag::Binary, vec![0; 4096]);
        let config = KeyConfig::default().with_max_buffer(2048);
        let key = RegKey::open_with(&api, TEST_KEY, RootKey::CurrentUser, config).unwrap();

        let err = key.raw_value("Blob").unwrap_err();
        assert!(matches!(
            err,
            RegError::Platform(RawError::BufferLimit { limit: 2048, .. })
        ));
    }

    #[test]
    fn test_open_missing_path_is_access_error() {
        let api = MemoryApi::new();
        let err = RegKey::open_with(
            &api,
            "Software\\Nope",
            RootKey::CurrentUser,
            KeyConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RegError::Access { .. }));
        assert!(err.to_string().contains("HKEY_CURRENT_USER\\Software\\Nope"));
    }

    #[test]
    fn test_read_only_handle_rejects_writes() {
        let api = seeded();
        let key = RegKey::open_with(
            &api,
            TEST_KEY,
            RootKey::CurrentUser,
            KeyConfig::default().read_only(),
        )
        .unwrap();
        assert!(matches!(
            key.set_dword_value("Enabled", 1),
            Err(RegError::Access { .. })
        ));
        assert!(api.value(RootKey::CurrentUser, TEST_KEY, "Enabled").is_none());
    }

    #[test]
    fn test_write_protected_key_cannot_be_opened_for_write() {
        let api = seeded();
        api.set_read_only(RootKey::CurrentUser, TEST_KEY, true);
        let err = RegKey::open_with(&api, TEST_KEY, RootKey::CurrentUser, KeyConfig::default())
            .unwrap_err();
        assert!(matches!(err, RegError::Access { .. }));
    }

    #[test]
    fn test_close_leaves_store_unchanged() {
        let api = seeded();
        api.put_value(RootKey::CurrentUser, TEST_KEY, "Enabled", ValueTag::DWord, vec![1, 0, 0, 0]);
        let before = api.snapshot();

        let key = open(&api);
        assert_eq!(api.open_handles(), 1);
        key.close().unwrap();

        assert_eq!(api.open_handles(), 0);
        assert_eq!(api.snapshot(), before);
    }

    #[test]
    fn test_drop_releases_handle() {
        let api = seeded();
        {
            let key = open(&api);
            let _sub = key.open_subkey("").unwrap();
            assert_eq!(api.open_handles(), 2);
        }
        assert_eq!(api.open_handles(), 0);
    }

    #[test]
    fn test_open_subkey() {
        let api = seeded();
        api.put_value(
            RootKey::CurrentUser,
            "Software\\Test\\Inner",
            "Level",
            ValueTag::DWord,
            vec![7, 0, 0, 0],
        );
        let key = open(&api);
        let inner = key.open_subkey("Inner").unwrap();
        assert_eq!(inner.path(), "HKEY_CURRENT_USER\\Software\\Test\\Inner");
        assert_eq!(inner.dword_value("Level").unwrap(), 7);
        assert!(matches!(key.open_subkey("Outer"), Err(RegError::Access { .. })));
    }
}
