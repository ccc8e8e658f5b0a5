//! Predefined root keys, raw key handles and key metadata

use std::fmt;
use std::str::FromStr;

/// Handle values of the predefined registry keys
pub mod hkey {
    pub const HKEY_CLASSES_ROOT: usize = 0x8000_0000;
    pub const HKEY_CURRENT_USER: usize = 0x8000_0001;
    pub const HKEY_LOCAL_MACHINE: usize = 0x8000_0002;
    pub const HKEY_USERS: usize = 0x8000_0003;
    pub const HKEY_CURRENT_CONFIG: usize = 0x8000_0005;
}

/// Opaque numeric value of a registry key handle
///
/// Predefined keys use the fixed values in [`hkey`]; keys returned by an open
/// call carry whatever value the platform handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawKey(pub usize);

impl RawKey {
    pub fn is_predefined(self) -> bool {
        RootKey::from_raw(self).is_some()
    }
}

impl fmt::Display for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match RootKey::from_raw(*self) {
            Some(root) => write!(f, "{root}"),
            None => write!(f, "0x{:X}", self.0),
        }
    }
}

/// The registry hives a path can be opened under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKey {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
    CurrentConfig,
}

impl RootKey {
    pub const ALL: [RootKey; 5] = [
        RootKey::ClassesRoot,
        RootKey::CurrentUser,
        RootKey::LocalMachine,
        RootKey::Users,
        RootKey::CurrentConfig,
    ];

    pub fn raw(self) -> RawKey {
        RawKey(match self {
            RootKey::ClassesRoot => hkey::HKEY_CLASSES_ROOT,
            RootKey::CurrentUser => hkey::HKEY_CURRENT_USER,
            RootKey::LocalMachine => hkey::HKEY_LOCAL_MACHINE,
            RootKey::Users => hkey::HKEY_USERS,
            RootKey::CurrentConfig => hkey::HKEY_CURRENT_CONFIG,
        })
    }

    pub fn from_raw(raw: RawKey) -> Option<Self> {
        RootKey::ALL.into_iter().find(|root| root.raw() == raw)
    }

    pub fn name(self) -> &'static str {
        match self {
            RootKey::ClassesRoot => "HKEY_CLASSES_ROOT",
            RootKey::CurrentUser => "HKEY_CURRENT_USER",
            RootKey::LocalMachine => "HKEY_LOCAL_MACHINE",
            RootKey::Users => "HKEY_USERS",
            RootKey::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            RootKey::ClassesRoot => "HKCR",
            RootKey::CurrentUser => "HKCU",
            RootKey::LocalMachine => "HKLM",
            RootKey::Users => "HKU",
            RootKey::CurrentConfig => "HKCC",
        }
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RootKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RootKey::ALL
            .into_iter()
            .find(|root| {
                root.name().eq_ignore_ascii_case(wanted)
                    || root.short_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("Unknown registry root: {wanted}"))
    }
}

/// Rights requested when opening a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// Read plus permission to set values
    #[default]
    ReadWrite,
    ReadOnly,
}

impl Access {
    pub fn can_write(self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

/// Counts and size maxima reported for an open key
///
/// Name lengths are in UTF-16 code units without the terminating NUL; the
/// data length is in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyInfo {
    pub subkeys: u32,
    pub values: u32,
    pub max_subkey_len: u32,
    pub max_value_name_len: u32,
    pub max_value_len: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_key_parsing() {
        assert_eq!("HKCU".parse::<RootKey>(), Ok(RootKey::CurrentUser));
        assert_eq!("hkey_local_machine".parse::<RootKey>(), Ok(RootKey::LocalMachine));
        assert_eq!(" hku ".parse::<RootKey>(), Ok(RootKey::Users));
        assert!("HKEY_NOWHERE".parse::<RootKey>().is_err());
    }

    #[test]
    fn test_root_key_raw_values() {
        for root in RootKey::ALL {
            assert_eq!(RootKey::from_raw(root.raw()), Some(root));
            assert!(root.raw().is_predefined());
        }
        assert_eq!(RootKey::CurrentUser.raw(), RawKey(0x8000_0001));
        assert!(!RawKey(0x1234).is_predefined());
    }

    #[test]
    fn test_raw_key_display() {
        assert_eq!(RootKey::CurrentUser.raw().to_string(), "HKEY_CURRENT_USER");
        assert_eq!(RawKey(0x2A0).to_string(), "0x2A0");
    }
}
