//! The closed set of encodable field kinds.
//!
//! Every field type that can appear in a record implements [`Field`], which
//! exposes the field either as a [`FieldValue`] (read side, used by the
//! encoder) or a [`FieldSlot`] (write side, used by the decoder). The encoder
//! and decoder dispatch on these enums; a field type outside the set does not
//! implement `Field` and is rejected at compile time.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Width of a length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixWidth {
    U8,
    U16,
    U32,
    U64,
}

impl PrefixWidth {
    /// Size of the prefix on the wire, in bytes.
    pub const fn size(self) -> usize {
        match self {
            PrefixWidth::U8 => 1,
            PrefixWidth::U16 => 2,
            PrefixWidth::U32 => 4,
            PrefixWidth::U64 => 8,
        }
    }

    /// Size of the prefix on the wire, in bits.
    pub const fn bits(self) -> u32 {
        self.size() as u32 * 8
    }

    /// Largest payload length the prefix can express.
    pub const fn max_len(self) -> u64 {
        match self {
            PrefixWidth::U8 => u8::MAX as u64,
            PrefixWidth::U16 => u16::MAX as u64,
            PrefixWidth::U32 => u32::MAX as u64,
            PrefixWidth::U64 => u64::MAX,
        }
    }
}

/// Semantic kind of a field, independent of its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    /// Zero bytes; the count comes from the field's tag.
    Padding,
    /// Raw bytes followed by a single `0x00`.
    NullString,
    /// Byte count in the given width, then raw bytes.
    Prefixed(PrefixWidth),
    /// Raw bytes with no length marker. Encode-only.
    Raw,
}

impl Kind {
    /// Whether the kind can be read back from a stream.
    pub const fn is_decodable(self) -> bool {
        !matches!(self, Kind::Raw)
    }

    /// Wire size of fixed-width integer kinds.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Kind::U8 | Kind::I8 => Some(1),
            Kind::U16 | Kind::I16 => Some(2),
            Kind::U32 | Kind::I32 => Some(4),
            Kind::U64 | Kind::I64 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::U8 => f.write_str("u8"),
            Kind::I8 => f.write_str("i8"),
            Kind::U16 => f.write_str("u16"),
            Kind::I16 => f.write_str("i16"),
            Kind::U32 => f.write_str("u32"),
            Kind::I32 => f.write_str("i32"),
            Kind::U64 => f.write_str("u64"),
            Kind::I64 => f.write_str("i64"),
            Kind::Padding => f.write_str("padding"),
            Kind::NullString => f.write_str("a null-terminated string"),
            Kind::Prefixed(width) => write!(f, "a {}-bit length-prefixed string", width.bits()),
            Kind::Raw => f.write_str("an unprefixed byte sequence"),
        }
    }
}

/// A field's current value, borrowed for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    Padding,
    NullString(&'a [u8]),
    Prefixed(PrefixWidth, &'a [u8]),
    Raw(&'a [u8]),
}

impl FieldValue<'_> {
    /// Semantic kind of the borrowed field.
    pub fn kind(&self) -> Kind {
        match self {
            FieldValue::U8(_) => Kind::U8,
            FieldValue::I8(_) => Kind::I8,
            FieldValue::U16(_) => Kind::U16,
            FieldValue::I16(_) => Kind::I16,
            FieldValue::U32(_) => Kind::U32,
            FieldValue::I32(_) => Kind::I32,
            FieldValue::U64(_) => Kind::U64,
            FieldValue::I64(_) => Kind::I64,
            FieldValue::Padding => Kind::Padding,
            FieldValue::NullString(_) => Kind::NullString,
            FieldValue::Prefixed(width, _) => Kind::Prefixed(*width),
            FieldValue::Raw(_) => Kind::Raw,
        }
    }
}

/// A field's storage, borrowed mutably for decoding.
#[derive(Debug)]
pub enum FieldSlot<'a> {
    U8(&'a mut u8),
    I8(&'a mut i8),
    U16(&'a mut u16),
    I16(&'a mut i16),
    U32(&'a mut u32),
    I32(&'a mut i32),
    U64(&'a mut u64),
    I64(&'a mut i64),
    Padding,
    NullString(&'a mut Vec<u8>),
    Prefixed(PrefixWidth, &'a mut Vec<u8>),
    /// Unprefixed bytes have no decodable form.
    Raw,
}

impl FieldSlot<'_> {
    /// Semantic kind of the borrowed field.
    pub fn kind(&self) -> Kind {
        match self {
            FieldSlot::U8(_) => Kind::U8,
            FieldSlot::I8(_) => Kind::I8,
            FieldSlot::U16(_) => Kind::U16,
            FieldSlot::I16(_) => Kind::I16,
            FieldSlot::U32(_) => Kind::U32,
            FieldSlot::I32(_) => Kind::I32,
            FieldSlot::U64(_) => Kind::U64,
            FieldSlot::I64(_) => Kind::I64,
            FieldSlot::Padding => Kind::Padding,
            FieldSlot::NullString(_) => Kind::NullString,
            FieldSlot::Prefixed(width, _) => Kind::Prefixed(*width),
            FieldSlot::Raw => Kind::Raw,
        }
    }
}

/// A type that can be stored in a record field.
pub trait Field {
    /// Borrow the field for encoding.
    fn value(&self) -> FieldValue<'_>;

    /// Borrow the field for decoding.
    fn slot(&mut self) -> FieldSlot<'_>;
}

macro_rules! int_field {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Field for $ty {
                fn value(&self) -> FieldValue<'_> {
                    FieldValue::$variant(*self)
                }

                fn slot(&mut self) -> FieldSlot<'_> {
                    FieldSlot::$variant(self)
                }
            }
        )*
    };
}

int_field! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
}

/// Filler bytes. The count comes from `extraParams[1]` of the field's tag,
/// e.g. `"15,8"` for eight zero bytes at index 15.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Padding;

impl Field for Padding {
    fn value(&self) -> FieldValue<'_> {
        FieldValue::Padding
    }

    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Padding
    }
}

/// Unprefixed bytes are appended verbatim and cannot be decoded.
impl Field for Vec<u8> {
    fn value(&self) -> FieldValue<'_> {
        FieldValue::Raw(self.as_slice())
    }

    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Raw
    }
}

/// Text is appended as its UTF-8 bytes and cannot be decoded.
impl Field for String {
    fn value(&self) -> FieldValue<'_> {
        FieldValue::Raw(self.as_bytes())
    }

    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Raw
    }
}

macro_rules! byte_string {
    ($(#[$doc:meta])* $name:ident, |$bytes:ident| $value:expr, |$buf:ident| $slot:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
        pub struct $name(pub Vec<u8>);

        impl $name {
            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            pub fn into_inner(self) -> Vec<u8> {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Vec<u8>;

            fn deref(&self) -> &Vec<u8> {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Vec<u8> {
                &mut self.0
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }
        }

        impl From<&[u8]> for $name {
            fn from(bytes: &[u8]) -> Self {
                Self(bytes.to_vec())
            }
        }

        impl From<&str> for $name {
            fn from(text: &str) -> Self {
                Self(text.as_bytes().to_vec())
            }
        }

        impl Field for $name {
            fn value(&self) -> FieldValue<'_> {
                let $bytes = self.0.as_slice();
                $value
            }

            fn slot(&mut self) -> FieldSlot<'_> {
                let $buf = &mut self.0;
                $slot
            }
        }
    };
}

byte_string!(
    /// Bytes terminated by a single `0x00` on the wire. An embedded zero byte
    /// ends the string early when decoded.
    NullString,
    |bytes| FieldValue::NullString(bytes),
    |buf| FieldSlot::NullString(buf)
);

byte_string!(
    /// Bytes preceded by an 8-bit length.
    LengthString,
    |bytes| FieldValue::Prefixed(PrefixWidth::U8, bytes),
    |buf| FieldSlot::Prefixed(PrefixWidth::U8, buf)
);

byte_string!(
    /// Bytes preceded by a 16-bit length in the field's byte order.
    LengthString16,
    |bytes| FieldValue::Prefixed(PrefixWidth::U16, bytes),
    |buf| FieldSlot::Prefixed(PrefixWidth::U16, buf)
);

byte_string!(
    /// Bytes preceded by a 32-bit length in the field's byte order.
    LengthString32,
    |bytes| FieldValue::Prefixed(PrefixWidth::U32, bytes),
    |buf| FieldSlot::Prefixed(PrefixWidth::U32, buf)
);

byte_string!(
    /// Bytes preceded by a 64-bit length in the field's byte order.
    LengthString64,
    |bytes| FieldValue::Prefixed(PrefixWidth::U64, bytes),
    |buf| FieldSlot::Prefixed(PrefixWidth::U64, buf)
);
