use crate::endian::Endianness;

/// Default maximum string payload: 16 MiB.
pub const DEFAULT_MAX_STRING_LENGTH: usize = 16 * 1024 * 1024;

/// Configuration supplied to every encode and decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecConfig {
    /// Byte order for fields whose tag does not name one. Default: little.
    pub default_endianness: Endianness,
    /// Maximum byte length of a null-terminated or length-prefixed string.
    /// Default: 16 MiB.
    pub max_string_length: usize,
}

impl CodecConfig {
    /// Configuration with the given default byte order.
    pub fn new(default_endianness: Endianness) -> Self {
        Self {
            default_endianness,
            ..Self::default()
        }
    }

    /// Configuration defaulting to big-endian fields.
    pub fn big_endian() -> Self {
        Self::new(Endianness::Big)
    }

    /// Configuration defaulting to little-endian fields.
    pub fn little_endian() -> Self {
        Self::new(Endianness::Little)
    }

    /// Replace the maximum string length.
    pub fn with_max_string_length(mut self, max_string_length: usize) -> Self {
        self.max_string_length = max_string_length;
        self
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            default_endianness: Endianness::Little,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
        }
    }
}
