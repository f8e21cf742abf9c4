//! Writing binary slaw streams.

use std::io::{self, Write};

use tracing::{debug, trace};

use crate::codec::codec_for;
use crate::error::{Result, SlawError};
use crate::interop::convert_to;
use crate::io::FileHeader;
use crate::limits::SLAW_VERSION_CURRENT;
use crate::model::Slaw;

/// Options for writing slaw streams.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Wire version of the records (1 or 2).
    pub version: u8,
    /// zstd level for a compressed stream; `None` writes a plain stream.
    pub compression_level: Option<i32>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            version: SLAW_VERSION_CURRENT,
            compression_level: None,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn compressed(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }
}

enum Sink<W: Write> {
    Plain(W),
    Zstd(zstd::Encoder<'static, W>),
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Zstd(w) => w.flush(),
        }
    }
}

/// Writes slawx as a binary stream, native byte order.
pub struct SlawWriter<W: Write> {
    sink: Sink<W>,
    version: u8,
    records: u64,
}

impl<W: Write> SlawWriter<W> {
    pub fn new(inner: W) -> Result<Self> {
        Self::with_options(inner, WriteOptions::default())
    }

    /// Opens the stream and writes its header.
    pub fn with_options(inner: W, options: WriteOptions) -> Result<Self> {
        codec_for(options.version)?;
        let mut sink = match options.compression_level {
            Some(level) => Sink::Zstd(
                zstd::Encoder::new(inner, level).map_err(|e| SlawError::Compression(e.to_string()))?,
            ),
            None => Sink::Plain(inner),
        };
        sink.write_all(&FileHeader::native(options.version).encode())?;
        debug!(
            version = options.version,
            compressed = options.compression_level.is_some(),
            "opened slaw output stream"
        );
        Ok(Self { sink, version: options.version, records: 0 })
    }

    /// Appends one record, downgrading it first when the stream is old.
    pub fn write(&mut self, s: &Slaw) -> Result<()> {
        let (bytes, len) = convert_to(s, self.version)?;
        self.sink.write_all(&bytes[..len])?;
        trace!(record = self.records, len, "wrote slaw");
        self.records += 1;
        Ok(())
    }

    /// Completes the stream and hands back the underlying writer.
    pub fn finish(self) -> Result<W> {
        let mut inner = match self.sink {
            Sink::Plain(w) => w,
            Sink::Zstd(enc) => enc.finish().map_err(|e| SlawError::Compression(e.to_string()))?,
        };
        inner.flush()?;
        debug!(records = self.records, "closed slaw output stream");
        Ok(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SlawReader;
    use crate::limits::{FILE_MAGIC, SLAW_VERSION_V1, ZSTD_MAGIC};

    fn sample() -> Vec<Slaw> {
        let key = Slaw::string("k").unwrap();
        vec![
            Slaw::map([(&key, &Slaw::scalar(3u8).unwrap())]).unwrap(),
            Slaw::boolean(true).unwrap(),
            Slaw::protein(None, Some(&Slaw::map([(&key, &key)]).unwrap()), &[0; 40]).unwrap(),
        ]
    }

    fn roundtrip(options: WriteOptions) -> Vec<u8> {
        let mut w = SlawWriter::with_options(Vec::new(), options).unwrap();
        for s in sample() {
            w.write(&s).unwrap();
        }
        let out = w.finish().unwrap();
        let back: Result<Vec<Slaw>> = SlawReader::new(&out[..]).unwrap().collect();
        assert_eq!(back.unwrap(), sample());
        out
    }

    #[test]
    fn test_plain_stream() {
        let out = roundtrip(WriteOptions::new());
        assert_eq!(out[..4], FILE_MAGIC);
        assert_eq!(out[4], SLAW_VERSION_CURRENT);
        let body: usize = sample().iter().map(Slaw::len_bytes).sum();
        assert_eq!(out.len(), 8 + body);
    }

    #[test]
    fn test_v1_stream() {
        let out = roundtrip(WriteOptions::new().version(SLAW_VERSION_V1));
        assert_eq!(out[4], SLAW_VERSION_V1);
    }

    #[test]
    fn test_compressed_stream() {
        let out = roundtrip(WriteOptions::new().compressed(3));
        assert_eq!(out[..4], ZSTD_MAGIC);
    }

    #[test]
    fn test_empty_stream() {
        let out = SlawWriter::new(Vec::new()).unwrap().finish().unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(SlawReader::new(&out[..]).unwrap().read().unwrap(), None);
    }

    #[test]
    fn test_rejects_unknown_version() {
        assert_eq!(
            SlawWriter::with_options(Vec::new(), WriteOptions::new().version(9)).err(),
            Some(SlawError::WrongVersion { version: 9 })
        );
    }
}
