//! Field descriptor extraction.
//!
//! A record type publishes a static layout table ([`Record::layout`]). Each
//! encode or decode call resolves that table into an ordered list of
//! [`FieldDescriptor`]s: the declared index, the effective byte order, the
//! raw tag tokens, and the field's kind. The list is sorted by declared index,
//! which is the wire order regardless of where a field is declared.

use std::fmt;

use tracing::trace;

use crate::config::CodecConfig;
use crate::endian::Endianness;
use crate::error::LayoutError;
use crate::kind::{FieldSlot, FieldValue, Kind};

/// Borrows a record's field for encoding.
pub type Getter<R> = for<'a> fn(&'a R) -> FieldValue<'a>;

/// Borrows a record's field for decoding.
pub type Setter<R> = for<'a> fn(&'a mut R) -> FieldSlot<'a>;

/// A record whose fields can be encoded and decoded.
///
/// Usually implemented with the [`record!`](crate::record!) macro. Fields not
/// listed by [`layout`](Record::layout) are neither encoded nor decoded.
pub trait Record: Sized {
    /// The layout entries of every encodable field, in any order.
    fn layout() -> Vec<FieldSpec<Self>>;
}

/// Parsed layout metadata of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    index: u64,
    endianness: Option<Endianness>,
    params: Vec<String>,
}

impl FieldMeta {
    /// Metadata for the field at `index`, using the default byte order.
    pub fn new(index: u64) -> Self {
        Self {
            index,
            endianness: None,
            params: vec![index.to_string()],
        }
    }

    /// Parse a tag of the form `"<index>[,<endianness>][,<extraParam>]"`.
    ///
    /// Token 0 must be a base-10 unsigned index. Any later `big` or `little`
    /// token overrides the byte order; the last one wins. All tokens are kept
    /// verbatim as parameters.
    pub fn parse(field: &'static str, tag: &str) -> Result<Self, LayoutError> {
        let params: Vec<String> = tag.split(',').map(str::to_owned).collect();
        let index = params[0]
            .parse::<u64>()
            .map_err(|source| LayoutError::MalformedIndex {
                field,
                token: params[0].clone(),
                source,
            })?;
        let endianness = params[1..]
            .iter()
            .filter_map(|token| Endianness::from_token(token))
            .last();

        Ok(Self {
            index,
            endianness,
            params,
        })
    }

    /// Override the byte order.
    pub fn endian(mut self, endianness: Endianness) -> Self {
        self.endianness = Some(endianness);
        self.params.push(endianness.token().to_owned());
        self
    }

    /// Set the zero-byte count of a padding field.
    pub fn padding(mut self, count: usize) -> Self {
        self.params.insert(1, count.to_string());
        self
    }

    /// Declared wire position.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Byte order override, if the tag names one.
    pub fn endianness(&self) -> Option<Endianness> {
        self.endianness
    }

    /// Tag tokens, including the index at position 0.
    pub fn params(&self) -> &[String] {
        &self.params
    }
}

#[derive(Debug, Clone)]
enum Source {
    Tag(&'static str),
    Meta(FieldMeta),
}

/// One entry of a record's layout table.
pub struct FieldSpec<R> {
    name: &'static str,
    source: Source,
    get: Getter<R>,
    set: Setter<R>,
}

impl<R> FieldSpec<R> {
    /// A field described by a tag string such as `"5,big"` or `"15,8"`.
    ///
    /// The tag is parsed on every call; a malformed tag fails the call.
    pub fn tagged(name: &'static str, tag: &'static str, get: Getter<R>, set: Setter<R>) -> Self {
        Self {
            name,
            source: Source::Tag(tag),
            get,
            set,
        }
    }

    /// A field described by structured metadata.
    pub fn new(name: &'static str, meta: FieldMeta, get: Getter<R>, set: Setter<R>) -> Self {
        Self {
            name,
            source: Source::Meta(meta),
            get,
            set,
        }
    }

    /// Name of the described field.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<R> fmt::Debug for FieldSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Resolved encoding metadata of one field, valid for a single call.
pub struct FieldDescriptor<R> {
    pub name: &'static str,
    pub index: u64,
    pub kind: Kind,
    pub endianness: Endianness,
    /// Tag tokens, including the index at position 0.
    pub params: Vec<String>,
    padding: usize,
    get: Getter<R>,
    set: Setter<R>,
}

impl<R> FieldDescriptor<R> {
    /// Zero-byte count of a padding field; `0` for every other kind.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Borrow the described field of `record` for encoding.
    pub fn value<'a>(&self, record: &'a R) -> FieldValue<'a> {
        (self.get)(record)
    }

    /// Borrow the described field of `record` for decoding.
    pub fn slot<'a>(&self, record: &'a mut R) -> FieldSlot<'a> {
        (self.set)(record)
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("kind", &self.kind)
            .field("endianness", &self.endianness)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Resolve the ordered field descriptors of `record`.
///
/// Fails if a tag has a malformed index, if a padding field has no valid byte
/// count or one above [`CodecConfig::max_string_length`], or if two fields
/// share an index.
pub fn extract<R: Record>(
    record: &R,
    config: &CodecConfig,
) -> Result<Vec<FieldDescriptor<R>>, LayoutError> {
    let mut fields = R::layout()
        .into_iter()
        .map(|spec| resolve(spec, record, config))
        .collect::<Result<Vec<_>, _>>()?;

    fields.sort_by_key(|field| field.index);

    if let Some(pair) = fields.windows(2).find(|pair| pair[0].index == pair[1].index) {
        return Err(LayoutError::DuplicateIndex {
            index: pair[0].index,
            first: pair[0].name,
            second: pair[1].name,
        });
    }

    trace!(fields = fields.len(), "extracted field descriptors");
    Ok(fields)
}

fn resolve<R>(
    spec: FieldSpec<R>,
    record: &R,
    config: &CodecConfig,
) -> Result<FieldDescriptor<R>, LayoutError> {
    let meta = match spec.source {
        Source::Tag(tag) => FieldMeta::parse(spec.name, tag)?,
        Source::Meta(meta) => meta,
    };
    let kind = (spec.get)(record).kind();

    let padding = if kind == Kind::Padding {
        padding_count(spec.name, &meta.params, config.max_string_length)?
    } else {
        0
    };

    Ok(FieldDescriptor {
        name: spec.name,
        index: meta.index,
        kind,
        endianness: meta.endianness.unwrap_or(config.default_endianness),
        params: meta.params,
        padding,
        get: spec.get,
        set: spec.set,
    })
}

fn padding_count(field: &'static str, params: &[String], max: usize) -> Result<usize, LayoutError> {
    let token = params
        .get(1)
        .ok_or(LayoutError::MissingPaddingCount { field })?;
    let count = token
        .parse::<usize>()
        .map_err(|source| LayoutError::InvalidPaddingCount {
            field,
            token: token.clone(),
            source,
        })?;
    if count > max {
        return Err(LayoutError::PaddingTooLarge { field, count, max });
    }
    Ok(count)
}
