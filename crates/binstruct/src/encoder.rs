use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::descriptor::{extract, FieldDescriptor, Record};
use crate::endian::Endianness;
use crate::error::{CodecError, Result};
use crate::kind::{FieldValue, PrefixWidth};

/// Encode a record into a new buffer.
///
/// Fields are written in ascending index order. The record is not modified.
pub fn marshal<R: Record>(record: &R, config: &CodecConfig) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    marshal_into(record, config, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a record, appending to `dst`.
///
/// On error `dst` is restored to its length on entry; no partial record is
/// left behind.
pub fn marshal_into<R: Record>(record: &R, config: &CodecConfig, dst: &mut BytesMut) -> Result<()> {
    let fields = extract(record, config)?;
    let start = dst.len();

    for field in &fields {
        if let Err(err) = encode_field(field, field.value(record), config, dst) {
            dst.truncate(start);
            return Err(err);
        }
    }

    trace!(
        fields = fields.len(),
        bytes = dst.len() - start,
        "encoded record"
    );
    Ok(())
}

fn encode_field<R>(
    field: &FieldDescriptor<R>,
    value: FieldValue<'_>,
    config: &CodecConfig,
    dst: &mut BytesMut,
) -> Result<()> {
    trace!(field = field.name, index = field.index, kind = %field.kind, "encoding field");
    let big = field.endianness == Endianness::Big;

    match value {
        FieldValue::U8(v) => dst.put_u8(v),
        FieldValue::I8(v) => dst.put_i8(v),
        FieldValue::U16(v) if big => dst.put_u16(v),
        FieldValue::U16(v) => dst.put_u16_le(v),
        FieldValue::I16(v) if big => dst.put_i16(v),
        FieldValue::I16(v) => dst.put_i16_le(v),
        FieldValue::U32(v) if big => dst.put_u32(v),
        FieldValue::U32(v) => dst.put_u32_le(v),
        FieldValue::I32(v) if big => dst.put_i32(v),
        FieldValue::I32(v) => dst.put_i32_le(v),
        FieldValue::U64(v) if big => dst.put_u64(v),
        FieldValue::U64(v) => dst.put_u64_le(v),
        FieldValue::I64(v) if big => dst.put_i64(v),
        FieldValue::I64(v) => dst.put_i64_le(v),
        FieldValue::Padding => dst.put_bytes(0, field.padding()),
        FieldValue::NullString(bytes) => {
            check_length(field.name, bytes, config)?;
            if bytes.contains(&0) {
                debug!(
                    field = field.name,
                    "null-terminated string contains a zero byte; decoding will stop early"
                );
            }
            dst.reserve(bytes.len() + 1);
            dst.put_slice(bytes);
            dst.put_u8(0);
        }
        FieldValue::Prefixed(width, bytes) => {
            check_length(field.name, bytes, config)?;
            dst.reserve(width.size() + bytes.len());
            put_prefix(field, width, bytes.len(), dst)?;
            dst.put_slice(bytes);
        }
        FieldValue::Raw(bytes) => dst.put_slice(bytes),
    }

    Ok(())
}

fn check_length(field: &'static str, bytes: &[u8], config: &CodecConfig) -> Result<()> {
    if bytes.len() > config.max_string_length {
        debug!(
            field,
            size = bytes.len(),
            max = config.max_string_length,
            "string too large"
        );
        return Err(CodecError::StringTooLarge {
            field,
            size: bytes.len() as u64,
            max: config.max_string_length,
        });
    }
    Ok(())
}

fn put_prefix<R>(
    field: &FieldDescriptor<R>,
    width: PrefixWidth,
    len: usize,
    dst: &mut BytesMut,
) -> Result<()> {
    if len as u64 > width.max_len() {
        return Err(CodecError::PrefixOverflow {
            field: field.name,
            size: len,
            bits: width.bits(),
        });
    }

    let big = field.endianness == Endianness::Big;
    match width {
        PrefixWidth::U8 => dst.put_u8(len as u8),
        PrefixWidth::U16 if big => dst.put_u16(len as u16),
        PrefixWidth::U16 => dst.put_u16_le(len as u16),
        PrefixWidth::U32 if big => dst.put_u32(len as u32),
        PrefixWidth::U32 => dst.put_u32_le(len as u32),
        PrefixWidth::U64 if big => dst.put_u64(len as u64),
        PrefixWidth::U64 => dst.put_u64_le(len as u64),
    }
    Ok(())
}
