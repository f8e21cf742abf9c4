//! Reading binary slaw streams.

use std::io::{self, Chain, Cursor, Read};

use tracing::{debug, trace};

use crate::codec::primitives::alloc_zeroed;
use crate::codec::{codec_for, SlawCodec};
use crate::error::{Result, SlawError};
use crate::interop::{convert_from, Endian};
use crate::io::FileHeader;
use crate::limits::{DEFAULT_MAX_SLAW_BYTES, FILE_HEADER_LEN, ZSTD_MAGIC};
use crate::model::Slaw;

/// Options for reading slaw streams.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Largest record accepted, checked before the record is allocated.
    pub max_slaw_bytes: u64,
    /// Accept a stream wrapped in a zstd frame.
    pub allow_compressed: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_slaw_bytes: DEFAULT_MAX_SLAW_BYTES,
            allow_compressed: true,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_slaw_bytes(mut self, max: u64) -> Self {
        self.max_slaw_bytes = max;
        self
    }

    pub fn allow_compressed(mut self, allow: bool) -> Self {
        self.allow_compressed = allow;
        self
    }
}

type Sniffed<R> = Chain<Cursor<Vec<u8>>, R>;

enum Source<R: Read> {
    Plain(Sniffed<R>),
    Zstd(zstd::Decoder<'static, io::BufReader<Sniffed<R>>>),
}

impl<R: Read> Read for Source<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Plain(r) => r.read(buf),
            Source::Zstd(r) => r.read(buf),
        }
    }
}

/// Reads as much of `buf` as the stream holds; returns the count filled.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Iterates the records of a binary slaw stream.
///
/// Records of an older version or the opposite byte order are converted to
/// current native slawx as they are read.
pub struct SlawReader<R: Read> {
    source: Source<R>,
    header: FileHeader,
    codec: &'static dyn SlawCodec,
    options: ReadOptions,
    records: u64,
}

impl<R: Read> SlawReader<R> {
    pub fn new(inner: R) -> Result<Self> {
        Self::with_options(inner, ReadOptions::default())
    }

    /// Opens a stream, detecting zstd compression and checking the header.
    pub fn with_options(mut inner: R, options: ReadOptions) -> Result<Self> {
        let mut sniff = vec![0u8; ZSTD_MAGIC.len()];
        let got = read_full(&mut inner, &mut sniff)?;
        sniff.truncate(got);
        let compressed = sniff == ZSTD_MAGIC;
        let chained = Cursor::new(sniff).chain(inner);
        let mut source = if compressed {
            if !options.allow_compressed {
                return Err(SlawError::WrongFormat { context: "compressed stream not allowed" });
            }
            Source::Zstd(zstd::Decoder::new(chained).map_err(|e| SlawError::Compression(e.to_string()))?)
        } else {
            Source::Plain(chained)
        };

        let mut buf = [0u8; FILE_HEADER_LEN];
        let got = read_full(&mut source, &mut buf)?;
        let header = FileHeader::decode(&buf[..got])?;
        header.check_readable()?;
        let codec = codec_for(header.version)?;
        debug!(
            version = header.version,
            big_endian = header.is_big_endian(),
            compressed,
            "opened slaw stream"
        );
        Ok(Self { source, header, codec, options, records: 0 })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Reads the next record; `Ok(None)` at a clean end of stream.
    pub fn read(&mut self) -> Result<Option<Slaw>> {
        let word = self.codec.word_bytes();
        let swapped = self.header.needs_swap();

        let mut head = vec![0u8; word];
        let got = read_full(&mut self.source, &mut head)?;
        if got == 0 {
            debug!(records = self.records, "slaw stream ended");
            return Ok(None);
        }
        if got < word {
            return Err(SlawError::EndOfFile);
        }

        let prefix = self.codec.prefix_len(&head, swapped)?;
        if prefix > word {
            head.resize(prefix, 0);
            if read_full(&mut self.source, &mut head[word..])? < prefix - word {
                return Err(SlawError::corrupt("stream ends inside a slaw header"));
            }
        }
        let len = self.codec.declared_len(&head, swapped)?;
        if len < prefix {
            return Err(SlawError::corrupt("slaw length shorter than its header"));
        }
        if len as u64 > self.options.max_slaw_bytes {
            return Err(SlawError::TooLarge {
                field: "slaw",
                len: len as u64,
                max: self.options.max_slaw_bytes,
            });
        }

        let mut bytes = alloc_zeroed(len)?;
        bytes[..prefix].copy_from_slice(&head);
        let want = len - prefix;
        if read_full(&mut self.source, &mut bytes[prefix..])? != want {
            return Err(SlawError::corrupt("stream ends inside a slaw"));
        }
        trace!(record = self.records, len, "read slaw");
        self.records += 1;

        let endian = if swapped { Endian::Opposite } else { Endian::Current };
        convert_from(bytes, endian, self.header.version).map(Some)
    }
}

impl<R: Read> Iterator for SlawReader<R> {
    type Item = Result<Slaw>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{SwapDirection, V1, V2};
    use crate::error::ErrorCode;
    use crate::interop::convert_to;
    use crate::limits::{FLAG_BIG_ENDIAN, SLAW_VERSION_V1, TYPE_SLAW};

    fn records() -> Vec<Slaw> {
        vec![
            Slaw::string("hello").unwrap(),
            Slaw::array(&[1.5f64, 2.5, -3.0]).unwrap(),
            Slaw::protein(
                Some(&Slaw::list([&Slaw::string("d").unwrap()]).unwrap()),
                None,
                b"rude!",
            )
            .unwrap(),
        ]
    }

    fn stream(header: FileHeader, bodies: &[Vec<u8>]) -> Vec<u8> {
        let mut out = header.encode().to_vec();
        for b in bodies {
            out.extend_from_slice(b);
        }
        out
    }

    #[test]
    fn test_reads_native_records() {
        let bodies: Vec<Vec<u8>> = records().iter().map(|s| s.as_bytes().to_vec()).collect();
        let data = stream(FileHeader::native(2), &bodies);
        let read: Vec<Slaw> = SlawReader::new(&data[..]).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(read, records());
    }

    #[test]
    fn test_reads_foreign_endian_records() {
        let bodies: Vec<Vec<u8>> = records()
            .iter()
            .map(|s| {
                let mut b = s.as_bytes().to_vec();
                V2.swap(&mut b, SwapDirection::ToForeign).unwrap();
                b
            })
            .collect();
        let flags = if cfg!(target_endian = "big") { 0 } else { FLAG_BIG_ENDIAN };
        let header = FileHeader { version: 2, kind: TYPE_SLAW, flags };
        let data = stream(header, &bodies);
        let mut reader = SlawReader::new(&data[..]).unwrap();
        assert!(reader.header().needs_swap());
        for expected in records() {
            assert_eq!(reader.read().unwrap().unwrap(), expected);
        }
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn test_reads_v1_records() {
        let bodies: Vec<Vec<u8>> = records()
            .iter()
            .map(|s| convert_to(s, SLAW_VERSION_V1).unwrap().0)
            .collect();
        let data = stream(FileHeader::native(SLAW_VERSION_V1), &bodies);
        let read: Result<Vec<Slaw>> = SlawReader::new(&data[..]).unwrap().collect();
        assert_eq!(read.unwrap(), records());
    }

    #[test]
    fn test_reads_foreign_v1_records() {
        let v = Slaw::array(&[7u16; 1500]).unwrap();
        let (mut body, _) = convert_to(&v, SLAW_VERSION_V1).unwrap();
        V1.swap(&mut body, SwapDirection::ToForeign).unwrap();
        let flags = if cfg!(target_endian = "big") { 0 } else { FLAG_BIG_ENDIAN };
        let data = stream(FileHeader { version: 1, kind: TYPE_SLAW, flags }, &[body]);
        let mut reader = SlawReader::new(&data[..]).unwrap();
        assert_eq!(reader.read().unwrap().unwrap(), v);
    }

    #[test]
    fn test_truncation() {
        let body = Slaw::string("a longer string than wee").unwrap().into_bytes();
        let data = stream(FileHeader::native(2), &[body.clone()]);

        let mut reader = SlawReader::new(&data[..data.len() - 8]).unwrap();
        assert_eq!(reader.read().unwrap_err().code(), ErrorCode::CorruptSlaw);

        let mut reader = SlawReader::new(&data[..FILE_HEADER_LEN + 3]).unwrap();
        assert_eq!(reader.read().unwrap_err(), SlawError::EndOfFile);

        assert_eq!(
            SlawReader::new(&data[..5]).err().map(|e| e.code()),
            Some(ErrorCode::WrongFormat)
        );
    }

    #[test]
    fn test_max_slaw_bytes() {
        let body = Slaw::array(&[0u64; 64]).unwrap().into_bytes();
        let data = stream(FileHeader::native(2), &[body]);
        let options = ReadOptions::new().max_slaw_bytes(128);
        let mut reader = SlawReader::with_options(&data[..], options).unwrap();
        assert!(matches!(reader.read().unwrap_err(), SlawError::TooLarge { max: 128, .. }));
    }

    #[test]
    fn test_unknown_header_word() {
        let data = stream(FileHeader::native(2), &[vec![0xff; 8]]);
        let mut reader = SlawReader::new(&data[..]).unwrap();
        assert!(reader.read().is_err());
    }

    #[test]
    fn test_compressed_stream() {
        let bodies: Vec<Vec<u8>> = records().iter().map(|s| s.as_bytes().to_vec()).collect();
        let plain = stream(FileHeader::native(2), &bodies);
        let packed = zstd::encode_all(&plain[..], 3).unwrap();

        let read: Result<Vec<Slaw>> = SlawReader::new(&packed[..]).unwrap().collect();
        assert_eq!(read.unwrap(), records());

        let strict = ReadOptions::new().allow_compressed(false);
        assert_eq!(
            SlawReader::with_options(&packed[..], strict).err().map(|e| e.code()),
            Some(ErrorCode::WrongFormat)
        );
    }
}
