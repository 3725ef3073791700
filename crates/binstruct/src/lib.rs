//! Declarative binary struct codec.
//!
//! A record's byte layout is described per field: a declared index giving the
//! wire order, an optional byte-order override, and a semantic kind chosen by
//! the field's type:
//! - `u8`/`i8` through `u64`/`i64`: fixed-width integers
//! - [`Padding`]: N zero bytes, N taken from the field's tag
//! - [`NullString`]: bytes ended by `0x00`
//! - [`LengthString`] .. [`LengthString64`]: bytes preceded by their length
//! - `Vec<u8>`, `String`: raw bytes, encode-only
//!
//! Encoding and decoding resolve the same ordered field descriptors, so a
//! record decodes exactly as it was encoded while its layout is unchanged.
//! Every dynamically sized read is bounded by
//! [`CodecConfig::max_string_length`].

mod macros;

pub mod config;
pub mod decoder;
pub mod descriptor;
pub mod encoder;
pub mod endian;
pub mod error;
pub mod kind;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod codec;

#[cfg(feature = "async")]
pub use codec::RecordCodec;
pub use config::{CodecConfig, DEFAULT_MAX_STRING_LENGTH};
pub use decoder::unmarshal;
pub use descriptor::{extract, FieldDescriptor, FieldMeta, FieldSpec, Getter, Record, Setter};
pub use encoder::{marshal, marshal_into};
pub use endian::Endianness;
pub use error::{CodecError, LayoutError, Result};
pub use kind::{
    Field, FieldSlot, FieldValue, Kind, LengthString, LengthString16, LengthString32,
    LengthString64, NullString, Padding, PrefixWidth,
};
pub use reader::RecordReader;
pub use writer::RecordWriter;
