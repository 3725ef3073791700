use std::io::{ErrorKind, Read};

use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::descriptor::{extract, FieldDescriptor, Record};
use crate::endian::Endianness;
use crate::error::{CodecError, Result};
use crate::kind::{FieldSlot, PrefixWidth};

const DISCARD_CHUNK_SIZE: usize = 512;

/// Decode a record from `src`, filling the fields of `out` in ascending
/// index order.
///
/// Fails before reading anything if the record has an unprefixed field. Fields
/// decoded before a failure keep their new values, so `out` is left partially
/// updated on error.
///
/// Null-terminated strings are scanned one byte at a time; wrap unbuffered
/// streams in a [`std::io::BufReader`] or use [`RecordReader`](crate::RecordReader).
pub fn unmarshal<S, R>(src: &mut S, out: &mut R, config: &CodecConfig) -> Result<()>
where
    S: Read + ?Sized,
    R: Record,
{
    let fields = extract(&*out, config)?;

    if let Some(field) = fields.iter().find(|field| !field.kind.is_decodable()) {
        return Err(CodecError::Undecodable {
            field: field.name,
            kind: field.kind,
        });
    }

    let mut input = FieldInput::new(src);
    for field in &fields {
        trace!(field = field.name, index = field.index, kind = %field.kind, "decoding field");
        decode_field(field, field.slot(out), &mut input, config)?;
    }

    trace!(
        fields = fields.len(),
        bytes = input.consumed,
        "decoded record"
    );
    Ok(())
}

fn decode_field<S, R>(
    field: &FieldDescriptor<R>,
    slot: FieldSlot<'_>,
    input: &mut FieldInput<'_, S>,
    config: &CodecConfig,
) -> Result<()>
where
    S: Read + ?Sized,
{
    let name = field.name;
    let big = field.endianness == Endianness::Big;

    match slot {
        FieldSlot::U8(v) => *v = input.array::<1>(name)?[0],
        FieldSlot::I8(v) => *v = i8::from_ne_bytes(input.array::<1>(name)?),
        FieldSlot::U16(v) => {
            let b = input.array(name)?;
            *v = if big { u16::from_be_bytes(b) } else { u16::from_le_bytes(b) };
        }
        FieldSlot::I16(v) => {
            let b = input.array(name)?;
            *v = if big { i16::from_be_bytes(b) } else { i16::from_le_bytes(b) };
        }
        FieldSlot::U32(v) => {
            let b = input.array(name)?;
            *v = if big { u32::from_be_bytes(b) } else { u32::from_le_bytes(b) };
        }
        FieldSlot::I32(v) => {
            let b = input.array(name)?;
            *v = if big { i32::from_be_bytes(b) } else { i32::from_le_bytes(b) };
        }
        FieldSlot::U64(v) => {
            let b = input.array(name)?;
            *v = if big { u64::from_be_bytes(b) } else { u64::from_le_bytes(b) };
        }
        FieldSlot::I64(v) => {
            let b = input.array(name)?;
            *v = if big { i64::from_be_bytes(b) } else { i64::from_le_bytes(b) };
        }
        FieldSlot::Padding => input.discard(name, field.padding())?,
        FieldSlot::NullString(buf) => {
            *buf = input.until_nul(name, config.max_string_length)?;
        }
        FieldSlot::Prefixed(width, buf) => {
            let len = read_prefix(name, width, big, input)?;
            if len > config.max_string_length as u64 {
                debug!(
                    field = name,
                    size = len,
                    max = config.max_string_length,
                    "length prefix too large"
                );
                return Err(CodecError::StringTooLarge {
                    field: name,
                    size: len,
                    max: config.max_string_length,
                });
            }
            *buf = input.payload(name, len)?;
        }
        FieldSlot::Raw => {
            return Err(CodecError::Undecodable {
                field: name,
                kind: field.kind,
            })
        }
    }

    Ok(())
}

fn read_prefix<S>(
    name: &'static str,
    width: PrefixWidth,
    big: bool,
    input: &mut FieldInput<'_, S>,
) -> Result<u64>
where
    S: Read + ?Sized,
{
    let len = match width {
        PrefixWidth::U8 => input.array::<1>(name)?[0] as u64,
        PrefixWidth::U16 => {
            let b = input.array(name)?;
            (if big { u16::from_be_bytes(b) } else { u16::from_le_bytes(b) }) as u64
        }
        PrefixWidth::U32 => {
            let b = input.array(name)?;
            (if big { u32::from_be_bytes(b) } else { u32::from_le_bytes(b) }) as u64
        }
        PrefixWidth::U64 => {
            let b = input.array(name)?;
            if big {
                u64::from_be_bytes(b)
            } else {
                u64::from_le_bytes(b)
            }
        }
    };
    Ok(len)
}

/// Exact reads over a stream that may return short counts.
struct FieldInput<'s, S: ?Sized> {
    inner: &'s mut S,
    consumed: u64,
}

impl<'s, S: Read + ?Sized> FieldInput<'s, S> {
    fn new(inner: &'s mut S) -> Self {
        Self { inner, consumed: 0 }
    }

    /// Fill `buf` completely, retrying short and interrupted reads.
    fn fill(&mut self, field: &'static str, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            let read = match self.inner.read(&mut buf[filled..]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(CodecError::Io(err)),
            };

            if read == 0 {
                debug!(field, expected = buf.len(), read = filled, "input ended mid-field");
                return Err(CodecError::UnexpectedEof {
                    field,
                    expected: buf.len(),
                    read: filled,
                });
            }

            filled += read;
            self.consumed += read as u64;
        }
        Ok(())
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(field, &mut buf)?;
        Ok(buf)
    }

    /// Read exactly `len` bytes. The buffer grows with the bytes delivered,
    /// not with the length claimed by the prefix.
    fn payload(&mut self, field: &'static str, len: u64) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let read = (&mut *self.inner).take(len).read_to_end(&mut out)?;
        self.consumed += read as u64;

        if (read as u64) < len {
            debug!(field, expected = len, read, "input ended mid-field");
            return Err(CodecError::UnexpectedEof {
                field,
                expected: len as usize,
                read,
            });
        }
        Ok(out)
    }

    fn discard(&mut self, field: &'static str, count: usize) -> Result<()> {
        let mut chunk = [0u8; DISCARD_CHUNK_SIZE];
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(DISCARD_CHUNK_SIZE);
            self.fill(field, &mut chunk[..n]).map_err(|err| match err {
                CodecError::UnexpectedEof { read, .. } => CodecError::UnexpectedEof {
                    field,
                    expected: count,
                    read: count - remaining + read,
                },
                other => other,
            })?;
            remaining -= n;
        }
        Ok(())
    }

    /// Read up to and including a zero byte, returning the bytes before it.
    fn until_nul(&mut self, field: &'static str, max: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let [byte] = self.array::<1>(field).map_err(|err| match err {
                CodecError::UnexpectedEof { .. } => CodecError::UnexpectedEof {
                    field,
                    expected: out.len() + 1,
                    read: out.len(),
                },
                other => other,
            })?;
            if byte == 0 {
                return Ok(out);
            }
            if out.len() == max {
                debug!(field, max, "null-terminated string exceeds limit");
                return Err(CodecError::StringTooLarge {
                    field,
                    size: out.len() as u64 + 1,
                    max,
                });
            }
            out.push(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;
    use crate::descriptor::{FieldMeta, FieldSpec};
    use crate::encoder::marshal;
    use crate::kind::{
        Field, LengthString, LengthString16, LengthString32, LengthString64, NullString, Padding,
    };

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Everything {
        a: i8,
        b: u8,
        c: i16,
        d: u16,
        e: i32,
        f: u32,
        g: i64,
        h: u64,
        pad: Padding,
        text: NullString,
        s8: LengthString,
        s16: LengthString16,
        s32: LengthString32,
        s64: LengthString64,
        untagged: u32,
    }

    impl Record for Everything {
        fn layout() -> Vec<FieldSpec<Self>> {
            vec![
                FieldSpec::<Self>::tagged("a", "0", |r| r.a.value(), |r| r.a.slot()),
                FieldSpec::<Self>::tagged("b", "1", |r| r.b.value(), |r| r.b.slot()),
                FieldSpec::<Self>::tagged("c", "2,big", |r| r.c.value(), |r| r.c.slot()),
                FieldSpec::<Self>::tagged("d", "3,little", |r| r.d.value(), |r| r.d.slot()),
                FieldSpec::<Self>::tagged("e", "4", |r| r.e.value(), |r| r.e.slot()),
                FieldSpec::<Self>::tagged("f", "5,big", |r| r.f.value(), |r| r.f.slot()),
                FieldSpec::<Self>::tagged("g", "6", |r| r.g.value(), |r| r.g.slot()),
                FieldSpec::<Self>::tagged("h", "7,little", |r| r.h.value(), |r| r.h.slot()),
                FieldSpec::<Self>::tagged("pad", "8,8", |r| r.pad.value(), |r| r.pad.slot()),
                FieldSpec::<Self>::tagged("text", "9", |r| r.text.value(), |r| r.text.slot()),
                FieldSpec::<Self>::tagged("s8", "10", |r| r.s8.value(), |r| r.s8.slot()),
                FieldSpec::<Self>::tagged("s16", "11,big", |r| r.s16.value(), |r| r.s16.slot()),
                FieldSpec::<Self>::tagged("s32", "12", |r| r.s32.value(), |r| r.s32.slot()),
                FieldSpec::<Self>::tagged("s64", "13,big", |r| r.s64.value(), |r| r.s64.slot()),
            ]
        }
    }

    fn everything() -> Everything {
        Everything {
            a: -100,
            b: 200,
            c: -30_000,
            d: 60_000,
            e: -2_000_000_000,
            f: 4_000_000_000,
            g: i64::MIN + 7,
            h: u64::MAX - 7,
            pad: Padding,
            text: NullString::from("testing testing"),
            s8: LengthString::from("eight"),
            s16: LengthString16::from("sixteen"),
            s32: LengthString32::new(vec![0xAB; 300]),
            s64: LengthString64::from(""),
            untagged: 0,
        }
    }

    #[test]
    fn roundtrip_every_kind() {
        for config in [CodecConfig::big_endian(), CodecConfig::little_endian()] {
            let expected = everything();
            let wire = marshal(&expected, &config).unwrap();

            let mut out = Everything::default();
            let mut cursor = Cursor::new(wire.as_ref());
            unmarshal(&mut cursor, &mut out, &config).unwrap();

            assert_eq!(out, expected);
            assert_eq!(cursor.position() as usize, wire.len());
        }
    }

    #[test]
    fn untagged_fields_are_untouched() {
        let config = CodecConfig::default();
        let wire = marshal(&everything(), &config).unwrap();

        let mut out = Everything {
            untagged: 0xDEAD,
            ..Everything::default()
        };
        unmarshal(&mut wire.as_ref(), &mut out, &config).unwrap();
        assert_eq!(out.untagged, 0xDEAD);
    }

    #[derive(Debug, Default)]
    struct Pair {
        pad: Padding,
        text: NullString,
        short: LengthString,
        big: LengthString64,
    }

    impl Record for Pair {
        fn layout() -> Vec<FieldSpec<Self>> {
            vec![
                FieldSpec::<Self>::new(
                    "pad",
                    FieldMeta::new(0).padding(4),
                    |r| r.pad.value(),
                    |r| r.pad.slot(),
                ),
                FieldSpec::<Self>::tagged("text", "1", |r| r.text.value(), |r| r.text.slot()),
                FieldSpec::<Self>::tagged("short", "2", |r| r.short.value(), |r| r.short.slot()),
                FieldSpec::<Self>::tagged("big", "3,big", |r| r.big.value(), |r| r.big.slot()),
            ]
        }
    }

    fn pair_wire(padding: &[u8], text: &[u8], short: &[u8], big_prefix: u64) -> Vec<u8> {
        let mut wire = padding.to_vec();
        wire.extend_from_slice(text);
        wire.extend_from_slice(short);
        wire.extend_from_slice(&big_prefix.to_be_bytes());
        wire
    }

    #[test]
    fn padding_nul_and_prefix_consume_exact_bytes() {
        let mut wire = pair_wire(&[0xEE; 4], b"ab\0", b"\x03xyz", 0);
        wire.extend_from_slice(b"trailing");

        let mut out = Pair::default();
        let mut cursor = Cursor::new(wire.as_slice());
        unmarshal(&mut cursor, &mut out, &CodecConfig::default()).unwrap();

        assert_eq!(out.text.as_slice(), b"ab");
        assert_eq!(out.short.as_slice(), b"xyz");
        assert!(out.big.is_empty());
        assert_eq!(cursor.position(), 4 + 3 + 4 + 8);
    }

    #[test]
    fn oversized_prefix_is_rejected_before_reading_payload() {
        let wire = pair_wire(&[0; 4], b"\0", b"\0", u64::MAX);

        let mut out = Pair::default();
        let err = unmarshal(&mut wire.as_slice(), &mut out, &CodecConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::StringTooLarge {
                field: "big",
                size: u64::MAX,
                ..
            }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn prefix_over_configured_limit() {
        let wire = pair_wire(&[0; 4], b"\0", b"\x05hello", 0);
        let config = CodecConfig::default().with_max_string_length(4);

        let mut out = Pair::default();
        let err = unmarshal(&mut wire.as_slice(), &mut out, &config).unwrap_err();
        assert!(matches!(
            err,
            CodecError::StringTooLarge {
                field: "short",
                size: 5,
                max: 4
            }
        ));
    }

    #[test]
    fn prefix_at_configured_limit_is_accepted() {
        let mut wire = pair_wire(&[0; 4], b"\0", b"\x04abcd", 4);
        wire.extend_from_slice(b"wxyz");
        let config = CodecConfig::default().with_max_string_length(4);

        let mut out = Pair::default();
        let mut src = wire.as_slice();
        unmarshal(&mut src, &mut out, &config).unwrap();
        assert_eq!(out.short.as_slice(), b"abcd");
        assert_eq!(out.big.as_slice(), b"wxyz");
        assert!(src.is_empty());
    }

    #[test]
    fn short_payload_reports_delivered_bytes() {
        let mut wire = pair_wire(&[0; 4], b"\0", b"\0", 1 << 40);
        wire.extend_from_slice(&[0x5A; 10]);
        let config = CodecConfig::default().with_max_string_length(usize::MAX);

        let mut out = Pair::default();
        let err = unmarshal(&mut wire.as_slice(), &mut out, &config).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnexpectedEof {
                field: "big",
                expected,
                read: 10
            } if expected as u64 == 1 << 40
        ));
    }

    #[test]
    fn null_string_scan_is_bounded() {
        let wire = pair_wire(&[0; 4], b"abcdef\0", b"\0", 0);
        let config = CodecConfig::default().with_max_string_length(4);

        let mut out = Pair::default();
        let err = unmarshal(&mut wire.as_slice(), &mut out, &config).unwrap_err();
        assert!(matches!(
            err,
            CodecError::StringTooLarge {
                field: "text",
                max: 4,
                ..
            }
        ));

        let wire = pair_wire(&[0; 4], b"abcd\0", b"\0", 0);
        unmarshal(&mut wire.as_slice(), &mut out, &config).unwrap();
        assert_eq!(out.text.as_slice(), b"abcd");
    }

    #[test]
    fn missing_terminator_is_unexpected_eof() {
        let wire = [0u8; 4].iter().chain(b"abc").copied().collect::<Vec<_>>();

        let mut out = Pair::default();
        let err = unmarshal(&mut wire.as_slice(), &mut out, &CodecConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnexpectedEof {
                field: "text",
                expected: 4,
                read: 3
            }
        ));
    }

    #[test]
    fn truncated_padding_reports_bytes_read() {
        let wire = [0u8; 3];
        let mut out = Pair::default();
        let err = unmarshal(&mut wire.as_slice(), &mut out, &CodecConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnexpectedEof {
                field: "pad",
                expected: 4,
                read: 3
            }
        ));
    }

    #[test]
    fn truncated_payload_is_unexpected_eof() {
        let wire = pair_wire(&[0; 4], b"\0", b"\x05he", 0);
        let wire = &wire[..4 + 1 + 3];

        let mut out = Pair::default();
        let err = unmarshal(&mut &wire[..], &mut out, &CodecConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnexpectedEof {
                field: "short",
                expected: 5,
                read: 2
            }
        ));
    }

    #[test]
    fn earlier_fields_keep_decoded_values_on_failure() {
        let wire = pair_wire(&[0; 4], b"kept\0", b"", 0);
        let wire = &wire[..4 + 5];

        let mut out = Pair::default();
        assert!(unmarshal(&mut &wire[..], &mut out, &CodecConfig::default()).is_err());
        assert_eq!(out.text.as_slice(), b"kept");
    }

    struct WithRaw {
        head: u8,
        raw: Vec<u8>,
    }

    impl Record for WithRaw {
        fn layout() -> Vec<FieldSpec<Self>> {
            vec![
                FieldSpec::<Self>::tagged("head", "0", |r| r.head.value(), |r| r.head.slot()),
                FieldSpec::<Self>::tagged("raw", "1", |r| r.raw.value(), |r| r.raw.slot()),
            ]
        }
    }

    #[test]
    fn raw_field_fails_before_reading() {
        let mut out = WithRaw {
            head: 0,
            raw: Vec::new(),
        };
        let mut cursor = Cursor::new(vec![9u8, 1, 2, 3]);

        let err = unmarshal(&mut cursor, &mut out, &CodecConfig::default()).unwrap_err();
        assert!(matches!(err, CodecError::Undecodable { field: "raw", .. }));
        assert!(err.is_fatal());
        assert_eq!(cursor.position(), 0);
        assert_eq!(out.head, 0);
    }

    #[test]
    fn layout_errors_surface_through_unmarshal() {
        struct BadTag {
            value: u8,
        }

        impl Record for BadTag {
            fn layout() -> Vec<FieldSpec<Self>> {
                vec![FieldSpec::<Self>::tagged(
                    "value",
                    "first",
                    |r| r.value.value(),
                    |r| r.value.slot(),
                )]
            }
        }

        let mut out = BadTag { value: 0 };
        let err = unmarshal(&mut &[1u8][..], &mut out, &CodecConfig::default()).unwrap_err();
        assert!(matches!(err, CodecError::Layout(_)));
        assert!(err.is_fatal());
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn short_reads_are_filled() {
        let config = CodecConfig::big_endian();
        let expected = everything();
        let wire = marshal(&expected, &config).unwrap();

        let mut reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut out = Everything::default();
        unmarshal(&mut reader, &mut out, &config).unwrap();
        assert_eq!(out, expected);
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let config = CodecConfig::default();
        let expected = everything();
        let wire = marshal(&expected, &config).unwrap();

        let mut reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire.to_vec()),
        };
        let mut out = Everything::default();
        unmarshal(&mut reader, &mut out, &config).unwrap();
        assert_eq!(out, expected);
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::ConnectionReset))
        }
    }

    #[test]
    fn io_errors_propagate() {
        let mut out = Everything::default();
        let err = unmarshal(&mut Failing, &mut out, &CodecConfig::default()).unwrap_err();
        assert!(matches!(err, CodecError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
        assert!(!CodecError::Io(std::io::Error::from(ErrorKind::Other)).is_fatal());
    }
}
