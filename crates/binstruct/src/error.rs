use crate::kind::Kind;

/// Errors in a record's layout metadata.
///
/// These describe a broken layout contract rather than bad input data, so they
/// surface on the first encode or decode of the affected record type.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Token 0 of the field's tag is not a base-10 unsigned integer.
    #[error("field `{field}`: malformed index token {token:?}")]
    MalformedIndex {
        field: &'static str,
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A padding field has no byte count in `extraParams[1]`.
    #[error("padding field `{field}` has no byte count")]
    MissingPaddingCount { field: &'static str },

    /// A padding field's byte count is not a base-10 unsigned integer.
    #[error("padding field `{field}`: invalid byte count {token:?}")]
    InvalidPaddingCount {
        field: &'static str,
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A padding field's byte count exceeds the configured maximum.
    #[error("padding field `{field}`: {count} bytes exceeds max {max}")]
    PaddingTooLarge {
        field: &'static str,
        count: usize,
        max: usize,
    },

    /// Two fields declare the same index, so their wire order is ambiguous.
    #[error("fields `{first}` and `{second}` both declare index {index}")]
    DuplicateIndex {
        index: u64,
        first: &'static str,
        second: &'static str,
    },
}

/// Errors that can occur while encoding or decoding a record.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The record's layout metadata is broken.
    #[error("invalid record layout: {0}")]
    Layout(#[from] LayoutError),

    /// The field's kind carries no length on the wire and cannot be decoded.
    #[error("field `{field}` is {kind} and cannot be decoded (no length on the wire)")]
    Undecodable { field: &'static str, kind: Kind },

    /// A string payload or length prefix exceeds the configured maximum.
    #[error("field `{field}`: string too large ({size} bytes, max {max})")]
    StringTooLarge {
        field: &'static str,
        size: u64,
        max: usize,
    },

    /// A payload's length does not fit the width of its length prefix.
    #[error("field `{field}`: {size} bytes do not fit a {bits}-bit length prefix")]
    PrefixOverflow {
        field: &'static str,
        size: usize,
        bits: u32,
    },

    /// The stream ended before the field was complete.
    #[error("unexpected end of input in field `{field}` ({read} of {expected} bytes)")]
    UnexpectedEof {
        field: &'static str,
        expected: usize,
        read: usize,
    },

    /// The record's layout reads no bytes, so a stream of records never
    /// advances.
    #[error("record layout reads no bytes")]
    EmptyRecord,

    /// The stream accepted no more bytes while a record was being written.
    #[error("stream closed (incomplete record)")]
    Closed,

    /// An I/O error occurred while reading or writing records.
    #[error("record I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Whether the error reflects a broken layout contract rather than a
    /// runtime data or I/O condition.
    ///
    /// Fatal errors recur on every call for the same record type; retrying is
    /// pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CodecError::Layout(_) | CodecError::Undecodable { .. } | CodecError::EmptyRecord
        )
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
