use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::config::CodecConfig;
use crate::descriptor::Record;
use crate::encoder::marshal_into;
use crate::error::{CodecError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete records to any `Write` stream.
pub struct RecordWriter<T> {
    inner: T,
    buf: BytesMut,
    config: CodecConfig,
}

impl<T: Write> RecordWriter<T> {
    /// Create a new record writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    /// Create a new record writer with explicit configuration.
    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and write a complete record (blocking).
    ///
    /// Nothing is written if encoding fails.
    pub fn write_record<R: Record>(&mut self, record: &R) -> Result<()> {
        self.buf.clear();
        marshal_into(record, &self.config, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(CodecError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(CodecError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(CodecError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the maximum string length for subsequent records.
    pub fn set_max_string_length(&mut self, max_string_length: usize) {
        self.config.max_string_length = max_string_length;
    }

    /// Current record writer configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}
