//! Byte order for multi-byte integers and length prefixes.

use std::fmt;

/// Tag token selecting big-endian byte order.
pub const BIG: &str = "big";

/// Tag token selecting little-endian byte order.
pub const LITTLE: &str = "little";

/// The byte order of a multi-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Endianness {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    #[default]
    Little,
}

impl Endianness {
    /// Parse a tag token. Returns `None` for anything but `big` or `little`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            BIG => Some(Endianness::Big),
            LITTLE => Some(Endianness::Little),
            _ => None,
        }
    }

    /// The tag token naming this byte order.
    pub fn token(self) -> &'static str {
        match self {
            Endianness::Big => BIG,
            Endianness::Little => LITTLE,
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
