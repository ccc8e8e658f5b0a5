//! Registry value types
//!
//! Every registry value carries a numeric type code next to its bytes. Only
//! three of them are interpreted here; anything else is kept as
//! [`ValueTag::Unknown`] with the original code.

/// Raw value-type codes as stored by the registry
pub mod code {
    /// No defined value type
    pub const REG_NONE: u32 = 0;

    /// NUL-terminated UTF-16LE string
    pub const REG_SZ: u32 = 1;

    /// UTF-16LE string with unexpanded environment references
    pub const REG_EXPAND_SZ: u32 = 2;

    /// Arbitrary binary data
    pub const REG_BINARY: u32 = 3;

    /// 32-bit little-endian unsigned integer
    pub const REG_DWORD: u32 = 4;

    /// Sequence of NUL-terminated UTF-16LE strings
    pub const REG_MULTI_SZ: u32 = 7;

    /// 64-bit little-endian unsigned integer
    pub const REG_QWORD: u32 = 11;
}

/// Type discriminator of a registry value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    String,
    DWord,
    Binary,
    Unknown(u32),
}

impl ValueTag {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            code::REG_SZ => ValueTag::String,
            code::REG_DWORD => ValueTag::DWord,
            code::REG_BINARY => ValueTag::Binary,
            other => ValueTag::Unknown(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            ValueTag::String => code::REG_SZ,
            ValueTag::DWord => code::REG_DWORD,
            ValueTag::Binary => code::REG_BINARY,
            ValueTag::Unknown(raw) => raw,
        }
    }

    /// Coarse label used when listing values without decoding them.
    ///
    /// Returns `None` for tags outside the supported set.
    pub fn label(self) -> Option<&'static str> {
        match self {
            ValueTag::String => Some("string"),
            ValueTag::DWord => Some("uint32"),
            ValueTag::Binary => Some("binary"),
            ValueTag::Unknown(_) => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueTag::String => "REG_SZ",
            ValueTag::DWord => "REG_DWORD",
            ValueTag::Binary => "REG_BINARY",
            ValueTag::Unknown(code::REG_NONE) => "REG_NONE",
            ValueTag::Unknown(code::REG_EXPAND_SZ) => "REG_EXPAND_SZ",
            ValueTag::Unknown(code::REG_MULTI_SZ) => "REG_MULTI_SZ",
            ValueTag::Unknown(code::REG_QWORD) => "REG_QWORD",
            ValueTag::Unknown(_) => "unknown",
        }
    }
}

impl From<u32> for ValueTag {
    fn from(raw: u32) -> Self {
        ValueTag::from_raw(raw)
    }
}

impl std::fmt::Display for ValueTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueTag::Unknown(raw) => write!(f, "{} ({raw})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_codes_roundtrip() {
        for raw in [code::REG_SZ, code::REG_DWORD, code::REG_BINARY] {
            assert_eq!(ValueTag::from_raw(raw).to_raw(), raw);
        }
        assert_eq!(ValueTag::from_raw(code::REG_QWORD), ValueTag::Unknown(11));
        assert_eq!(ValueTag::Unknown(11).to_raw(), code::REG_QWORD);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ValueTag::String.label(), Some("string"));
        assert_eq!(ValueTag::DWord.label(), Some("uint32"));
        assert_eq!(ValueTag::Binary.label(), Some("binary"));
        assert_eq!(ValueTag::from_raw(code::REG_MULTI_SZ).label(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueTag::DWord.to_string(), "REG_DWORD");
        assert_eq!(ValueTag::Unknown(2).to_string(), "REG_EXPAND_SZ (2)");
        assert_eq!(ValueTag::Unknown(99).to_string(), "unknown (99)");
    }
}
