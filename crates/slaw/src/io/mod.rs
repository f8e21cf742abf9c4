//! Binary slaw streams.
//!
//! A stream is an 8-byte [`FileHeader`] followed by records back to back,
//! each a complete slaw in the header's version and byte order. The whole
//! stream may be wrapped in a zstd frame.
//!
//! # Example
//!
//! ```
//! use slaw::io::{SlawReader, SlawWriter};
//! use slaw::Slaw;
//!
//! let mut w = SlawWriter::new(Vec::new())?;
//! w.write(&Slaw::string("hello")?)?;
//! let bytes = w.finish()?;
//!
//! let mut r = SlawReader::new(&bytes[..])?;
//! assert_eq!(r.read()?.unwrap().view().string(), Some("hello"));
//! assert!(r.read()?.is_none());
//! # Ok::<(), slaw::SlawError>(())
//! ```

mod header;
mod reader;
mod writer;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub use header::FileHeader;
pub use reader::{ReadOptions, SlawReader};
pub use writer::{SlawWriter, WriteOptions};

use crate::error::{Result, SlawError};
use crate::model::Slaw;

/// Reads every record of the stream at `path`.
pub fn read_slaw_file(path: impl AsRef<Path>) -> Result<Vec<Slaw>> {
    let file = File::open(path)?;
    SlawReader::new(BufReader::new(file))?.collect()
}

/// Writes `slawx` to a new current-version stream at `path`.
pub fn write_slaw_file<'a>(path: impl AsRef<Path>, slawx: impl IntoIterator<Item = &'a Slaw>) -> Result<()> {
    let file = File::create(path)?;
    let mut w = SlawWriter::new(BufWriter::new(file))?;
    for s in slawx {
        w.write(s)?;
    }
    let buffered = w.finish()?;
    buffered.into_inner().map_err(|e| SlawError::Io(e.error().to_string()))?;
    Ok(())
}

impl Slaw {
    /// Encodes this slaw as a one-record stream.
    pub fn to_stream_bytes(&self, options: WriteOptions) -> Result<Vec<u8>> {
        let mut w = SlawWriter::with_options(Vec::new(), options)?;
        w.write(self)?;
        w.finish()
    }

    /// Reads the first record of a stream.
    pub fn from_stream_bytes(bytes: &[u8]) -> Result<Slaw> {
        SlawReader::new(bytes)?.read()?.ok_or(SlawError::EndOfFile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::SLAW_VERSION_V1;

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.slaw");
        let values = vec![
            Slaw::string("first").unwrap(),
            Slaw::vector(&[1.0f32, 2.0, 3.0]).unwrap(),
            Slaw::nil().unwrap(),
        ];
        write_slaw_file(&path, &values).unwrap();
        assert_eq!(read_slaw_file(&path).unwrap(), values);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_slaw_file(dir.path().join("absent.slaw")).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Io);
    }

    #[test]
    fn test_stream_bytes() {
        let s = Slaw::cons(&Slaw::string("x").unwrap(), &Slaw::scalar(-4i16).unwrap()).unwrap();
        for options in [WriteOptions::new(), WriteOptions::new().version(SLAW_VERSION_V1)] {
            let bytes = s.to_stream_bytes(options).unwrap();
            assert_eq!(Slaw::from_stream_bytes(&bytes).unwrap(), s);
        }
        let empty = crate::io::FileHeader::native(2).encode();
        assert_eq!(Slaw::from_stream_bytes(&empty).unwrap_err(), SlawError::EndOfFile);
    }
}
