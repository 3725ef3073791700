//! `tokio_util` codec carrying one record per frame.

use std::marker::PhantomData;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::CodecConfig;
use crate::decoder::unmarshal;
use crate::descriptor::Record;
use crate::encoder::marshal_into;
use crate::error::CodecError;

/// Encodes and decodes records of type `R` over a byte stream.
///
/// Records carry no outer framing; decoding attempts a full record over the
/// buffered bytes and waits for more input when the buffer ends mid-record.
/// After a short attempt the codec remembers how many bytes that attempt
/// needed and does not retry until at least that many are buffered.
pub struct RecordCodec<R> {
    config: CodecConfig,
    pending: usize,
    _record: PhantomData<fn() -> R>,
}

impl<R> RecordCodec<R> {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            config,
            pending: 0,
            _record: PhantomData,
        }
    }

    /// Current codec configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl<R> Default for RecordCodec<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for RecordCodec<R> {
    fn clone(&self) -> Self {
        Self::with_config(self.config)
    }
}

impl<R> std::fmt::Debug for RecordCodec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCodec")
            .field("config", &self.config)
            .finish()
    }
}

impl<R: Record + Default> Decoder for RecordCodec<R> {
    type Item = R;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < self.pending {
            return Ok(None); // Need more data
        }

        let mut input: &[u8] = src;
        let mut record = R::default();

        match unmarshal(&mut input, &mut record, &self.config) {
            Ok(()) => {
                let consumed = src.len() - input.len();
                if consumed == 0 {
                    return Err(CodecError::EmptyRecord);
                }
                self.pending = 0;
                src.advance(consumed);
                Ok(Some(record))
            }
            Err(CodecError::UnexpectedEof { expected, read, .. }) => {
                // The attempt consumed every buffered byte before running short.
                self.pending = src.len().saturating_add(expected.saturating_sub(read));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

impl<R: Record> Encoder<R> for RecordCodec<R> {
    type Error = CodecError;

    fn encode(&mut self, item: R, dst: &mut BytesMut) -> Result<(), Self::Error> {
        marshal_into(&item, &self.config, dst)
    }
}

impl<R: Record> Encoder<&R> for RecordCodec<R> {
    type Error = CodecError;

    fn encode(&mut self, item: &R, dst: &mut BytesMut) -> Result<(), Self::Error> {
        marshal_into(item, &self.config, dst)
    }
}
