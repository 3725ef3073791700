use std::io::{BufReader, Read};

use crate::config::CodecConfig;
use crate::decoder::unmarshal;
use crate::descriptor::Record;
use crate::error::Result;

const READ_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reads complete records from any `Read` stream.
///
/// The stream is buffered internally, so null-terminated fields do not cost a
/// read call per byte.
pub struct RecordReader<T> {
    inner: BufReader<T>,
    config: CodecConfig,
}

impl<T: Read> RecordReader<T> {
    /// Create a new record reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    /// Create a new record reader with explicit configuration.
    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self {
            inner: BufReader::with_capacity(READ_BUFFER_CAPACITY, inner),
            config,
        }
    }

    /// Decode the next record into `out` (blocking).
    ///
    /// On error `out` may be partially updated.
    pub fn read_into<R: Record>(&mut self, out: &mut R) -> Result<()> {
        unmarshal(&mut self.inner, out, &self.config)
    }

    /// Decode the next record into a fresh default value (blocking).
    pub fn read<R: Record + Default>(&mut self) -> Result<R> {
        let mut record = R::default();
        self.read_into(&mut record)?;
        Ok(record)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        self.inner.get_ref()
    }

    /// Mutably borrow the underlying stream.
    ///
    /// Reading from it directly skips any bytes already buffered.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Consume the reader and return the inner stream. Buffered bytes are lost.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }

    /// Update the maximum string length for subsequent records.
    pub fn set_max_string_length(&mut self, max_string_length: usize) {
        self.config.max_string_length = max_string_length;
    }

    /// Current record reader configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}
