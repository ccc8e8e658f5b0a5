//! Raw registry values and byte-level decoders

use crate::tag::ValueTag;

/// Bytes of a registry value together with its stored type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub tag: ValueTag,
    pub data: Vec<u8>,
}

impl RawValue {
    pub fn new(tag: ValueTag, data: Vec<u8>) -> Self {
        Self { tag, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decode a DWORD from its little-endian storage form.
///
/// Only the first four bytes are used. Returns `None` if fewer are present.
pub fn decode_dword(data: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

pub fn encode_dword(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Decode an unsigned LEB128 varint from the start of `data`.
///
/// Returns the value and the number of bytes consumed, or `None` when the
/// input ends before a terminating byte or the value does not fit in 64 bits.
///
/// ## Encoding
///
/// | Bits | Meaning                                  |
/// |------|------------------------------------------|
/// | 0-6  | next 7 bits of the value, least first    |
/// | 7    | continuation: another byte follows       |
pub fn decode_uvarint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;

    for (i, &byte) in data.iter().enumerate() {
        // The tenth byte may only contribute the top bit.
        if i == 9 && byte > 1 {
            return None;
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
        shift += 7;
        if shift >= 64 {
            return None;
        }
    }

    None
}

/// Decode REG_SZ storage into text.
///
/// The data is UTF-16LE; decoding stops at the first NUL code unit, a
/// trailing odd byte is ignored and unpaired surrogates become U+FFFD.
pub fn decode_utf16(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Turn a NUL-padded UTF-16 name buffer into text, stopping at the first NUL.
pub fn wide_to_string(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

/// Encode text as a NUL-terminated UTF-16 name.
///
/// Returns `None` if the text contains an interior NUL, which the registry
/// API cannot represent.
pub fn to_wide(text: &str) -> Option<Vec<u16>> {
    if text.contains('\0') {
        return None;
    }
    Some(text.encode_utf16().chain(std::iter::once(0)).collect())
}

/// Encode text as REG_SZ storage (UTF-16LE with a terminating NUL).
pub fn encode_utf16(text: &str) -> Vec<u8> {
    text.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}
