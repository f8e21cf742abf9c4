//! The 8-byte header opening every binary slaw stream.
//!
//! ```text
//! ff ff 0b 10 | version | type | flags (big-endian u16)
//! ```
//!
//! The magic can never start valid UTF-8, UTF-16 or UTF-32 text. Only one
//! flag is defined, [`FLAG_BIG_ENDIAN`]; unknown flags are ignored.

use tracing::warn;

use crate::error::{Result, SlawError};
use crate::limits::{FILE_HEADER_LEN, FILE_MAGIC, FLAG_BIG_ENDIAN, SLAW_VERSION_CURRENT, TYPE_SLAW};

/// Decoded stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Wire version of every record in the stream.
    pub version: u8,
    /// Stream type ([`TYPE_SLAW`] for slaw streams).
    pub kind: u8,
    pub flags: u16,
}

impl FileHeader {
    /// Header for a slaw stream of `version` written by this machine.
    pub fn native(version: u8) -> Self {
        let flags = if cfg!(target_endian = "big") { FLAG_BIG_ENDIAN } else { 0 };
        Self { version, kind: TYPE_SLAW, flags }
    }

    /// True when the records were written big-endian.
    pub fn is_big_endian(&self) -> bool {
        self.flags & FLAG_BIG_ENDIAN != 0
    }

    /// True when the records need a byte swap on this machine.
    pub fn needs_swap(&self) -> bool {
        self.is_big_endian() != cfg!(target_endian = "big")
    }

    pub fn encode(&self) -> [u8; FILE_HEADER_LEN] {
        let mut buf = [0u8; FILE_HEADER_LEN];
        buf[..4].copy_from_slice(&FILE_MAGIC);
        buf[4] = self.version;
        buf[5] = self.kind;
        buf[6..].copy_from_slice(&self.flags.to_be_bytes());
        buf
    }

    /// Parses a header without judging its version or type.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < FILE_HEADER_LEN {
            warn!(len = buf.len(), "binary slaw stream is shorter than its header");
            return Err(SlawError::WrongFormat { context: "stream shorter than header" });
        }
        if buf[..4] != FILE_MAGIC {
            warn!(magic = ?&buf[..4], "binary slaw stream does not begin with the magic number");
            return Err(SlawError::WrongFormat { context: "bad magic number" });
        }
        Ok(Self {
            version: buf[4],
            kind: buf[5],
            flags: u16::from_be_bytes([buf[6], buf[7]]),
        })
    }

    /// Rejects headers this crate cannot read records from.
    pub fn check_readable(&self) -> Result<()> {
        if self.version == 0 || self.version > SLAW_VERSION_CURRENT {
            warn!(version = self.version, max = SLAW_VERSION_CURRENT, "unsupported slaw stream version");
            return Err(SlawError::WrongVersion { version: self.version });
        }
        if self.kind != TYPE_SLAW {
            warn!(kind = self.kind, "binary file is not a slaw stream");
            return Err(SlawError::WrongFormat { context: "stream type is not slaw" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::limits::TYPE_POOL;

    #[test]
    fn test_layout() {
        let h = FileHeader { version: 2, kind: TYPE_SLAW, flags: FLAG_BIG_ENDIAN };
        assert_eq!(h.encode(), [0xff, 0xff, 0x0b, 0x10, 2, 1, 0, 1]);
        assert_eq!(FileHeader::decode(&h.encode()).unwrap(), h);
        assert!(h.is_big_endian());
    }

    #[test]
    fn test_native_needs_no_swap() {
        let h = FileHeader::native(SLAW_VERSION_CURRENT);
        assert!(!h.needs_swap());
        h.check_readable().unwrap();
    }

    #[test]
    fn test_unknown_flags_ignored() {
        let mut buf = FileHeader::native(1).encode();
        buf[6] |= 0x80;
        let h = FileHeader::decode(&buf).unwrap();
        assert_eq!(h.is_big_endian(), cfg!(target_endian = "big"));
        h.check_readable().unwrap();
    }

    #[test]
    fn test_rejections() {
        assert_eq!(FileHeader::decode(&[0xff; 5]).unwrap_err().code(), ErrorCode::WrongFormat);
        assert_eq!(FileHeader::decode(b"slawfile").unwrap_err().code(), ErrorCode::WrongFormat);
        assert_eq!(
            FileHeader::native(3).check_readable().unwrap_err(),
            SlawError::WrongVersion { version: 3 }
        );
        let pool = FileHeader { kind: TYPE_POOL, ..FileHeader::native(2) };
        assert_eq!(pool.check_readable().unwrap_err().code(), ErrorCode::WrongFormat);
    }
}
