use std::str::FromStr;

use regkey_raw::Access;
use serde::Serialize;

use crate::error::RegError;

/// Buffer size, in elements, of the first attempt of every buffered call
pub const DEFAULT_INITIAL_BUFFER: usize = 1024;

/// Largest buffer a single call may grow to
pub const DEFAULT_MAX_BUFFER: usize = 16 * 1024 * 1024;

/// How `bool_value` turns DWORD bytes into a boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolDecoding {
    /// Fixed-width little-endian DWORD, like `dword_value`
    ///
    /// This departs from the varint reading for stored values such as 128
    /// (`80 00 00 00`) and 256 (`00 01 00 00`): the varint reading takes both
    /// as `false`, this one rejects both with `ValueRange`. Pick
    /// [`BoolDecoding::Varint`] to keep the varint behavior.
    #[default]
    Dword,
    /// Unsigned varint over the raw bytes, reading only the leading bytes
    /// of the DWORD
    Varint,
}

impl FromStr for BoolDecoding {
    type Err = RegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dword" => Ok(BoolDecoding::Dword),
            "varint" => Ok(BoolDecoding::Varint),
            other => Err(RegError::Config(format!(
                "Unknown bool decoding '{other}', expected 'dword' or 'varint'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyConfig {
    pub access: Access,
    pub initial_buffer: usize,
    pub max_buffer: usize,
    pub bool_decoding: BoolDecoding,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            access: Access::ReadWrite,
            initial_buffer: DEFAULT_INITIAL_BUFFER,
            max_buffer: DEFAULT_MAX_BUFFER,
            bool_decoding: BoolDecoding::Dword,
        }
    }
}

impl KeyConfig {
    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_initial_buffer(mut self, size: usize) -> Self {
        self.initial_buffer = size.max(1);
        self
    }

    pub fn with_max_buffer(mut self, size: usize) -> Self {
        self.max_buffer = size.max(1);
        self
    }

    pub fn with_bool_decoding(mut self, decoding: BoolDecoding) -> Self {
        self.bool_decoding = decoding;
        self
    }

    /// Defaults overlaid with `REGKEY_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each `REGKEY_*` name
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(size) = Self::parse_size(&lookup, "REGKEY_INITIAL_BUFFER") {
            config = config.with_initial_buffer(size);
        }
        if let Some(size) = Self::parse_size(&lookup, "REGKEY_MAX_BUFFER") {
            config = config.with_max_buffer(size);
        }
        if let Some(raw) = lookup("REGKEY_BOOL_DECODING") {
            match raw.parse() {
                Ok(decoding) => config.bool_decoding = decoding,
                Err(e) => tracing::warn!("Ignoring REGKEY_BOOL_DECODING: {}", e),
            }
        }

        if config.initial_buffer > config.max_buffer {
            tracing::warn!(
                "Initial buffer {} exceeds max buffer {}, clamping",
                config.initial_buffer,
                config.max_buffer
            );
            config.initial_buffer = config.max_buffer;
        }

        config
    }

    fn parse_size(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<usize> {
        let raw = lookup(name)?;
        match raw.trim().parse::<usize>() {
            Ok(size) if size > 0 => Some(size),
            _ => {
                tracing::warn!("Ignoring {}={:?}: expected a positive integer", name, raw);
                None
            }
        }
    }
}
