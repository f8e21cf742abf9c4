//! Versioned binary layouts.
//!
//! Two wire layouts exist: [`V1`] (4-byte "quads") and [`V2`] (8-byte
//! "octs", the current format). Both implement [`SlawCodec`], the one
//! interface the rest of the crate uses to inspect, build and byte-swap
//! encoded slawx, so walking, fabrication and ordering never look at header
//! bits themselves.

pub mod primitives;
pub mod v1;
pub mod v2;

use std::fmt;

use crate::error::{Result, SlawError};
use crate::limits::{SLAW_VERSION_CURRENT, SLAW_VERSION_V1};
use crate::model::{Personality, SlawType};

pub use v1::V1;
pub use v2::V2;

/// Which way an in-place byte swap goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    /// The buffer was written by an opposite-endian machine; make it native.
    ToNative,
    /// The buffer is native; produce what an opposite-endian machine would
    /// have written.
    ToForeign,
}

impl SwapDirection {
    /// (swap when reading structure, swap when writing it back)
    pub(crate) fn flags(self) -> (bool, bool) {
        match self {
            SwapDirection::ToNative => (true, false),
            SwapDirection::ToForeign => (false, true),
        }
    }
}

/// Decoded list or map header.
#[derive(Debug, Clone, Copy)]
pub struct ListParts<'a> {
    pub is_map: bool,
    pub count: u64,
    /// The elements, back to back, and nothing else.
    pub body: &'a [u8],
}

/// Decoded numeric header.
#[derive(Debug, Clone, Copy)]
pub struct NumericParts<'a> {
    pub personality: Personality,
    /// Array breadth; `None` for singletons.
    pub breadth: Option<u64>,
    /// Exactly `unit_bytes * max(breadth, 1)` bytes (0 for an empty array).
    pub data: &'a [u8],
}

/// Decoded protein parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProteinParts<'a> {
    pub nonstandard: bool,
    pub descrips: Option<&'a [u8]>,
    pub ingests: Option<&'a [u8]>,
    pub rude: &'a [u8],
}

/// One wire layout.
///
/// Inspection methods take a buffer that starts at a slaw and may extend past
/// it; they bounds-check every access and report inconsistencies as
/// `CorruptSlaw`, `CorruptProtein` or `UnidentifiedSlaw`. Encoders take
/// children already encoded in the same layout.
pub trait SlawCodec: Send + Sync + fmt::Debug {
    /// Version number carried in file headers.
    fn version(&self) -> u8;

    /// Word size in bytes.
    fn word_bytes(&self) -> usize;

    // === Lengths ===

    /// Bytes of header that must be available before [`declared_len`] can
    /// answer, given at least the first word.
    ///
    /// [`declared_len`]: SlawCodec::declared_len
    fn prefix_len(&self, head: &[u8], swapped: bool) -> Result<usize>;

    /// Total encoded length in bytes declared by the header at the start of
    /// `s`. Unknown headers yield `UnidentifiedSlaw`, never 0.
    fn declared_len(&self, s: &[u8], swapped: bool) -> Result<usize>;

    /// Native-endian declared length.
    fn byte_len(&self, s: &[u8]) -> Result<usize> {
        self.declared_len(s, false)
    }

    /// The exact slice occupied by the slaw at the start of `s`.
    fn slaw_at<'a>(&self, s: &'a [u8]) -> Result<&'a [u8]> {
        let len = self.byte_len(s)?;
        s.get(..len).ok_or(SlawError::corrupt("slaw length runs past end of buffer"))
    }

    // === Inspection ===

    /// Kind of the slaw at the start of `s`; `Null` for an empty buffer.
    fn slaw_type(&self, s: &[u8]) -> SlawType;

    fn boolean_value(&self, s: &[u8]) -> Result<bool>;

    /// String contents without the terminator.
    fn string_bytes<'a>(&self, s: &'a [u8]) -> Result<&'a [u8]>;

    /// (car, cdr), each exactly sized.
    fn cons_parts<'a>(&self, s: &'a [u8]) -> Result<(&'a [u8], &'a [u8])>;

    fn list_parts<'a>(&self, s: &'a [u8]) -> Result<ListParts<'a>>;

    fn numeric_parts<'a>(&self, s: &'a [u8]) -> Result<NumericParts<'a>>;

    fn protein_parts<'a>(&self, s: &'a [u8]) -> Result<ProteinParts<'a>>;

    fn is_protein(&self, s: &[u8]) -> bool;

    /// True when `s` starts with a protein header written in the opposite
    /// byte order.
    fn is_swapped_protein(&self, s: &[u8]) -> bool;

    // === Endianness ===

    /// Byte-swaps the slaw filling `s` in place, recursing into children.
    fn swap(&self, s: &mut [u8], direction: SwapDirection) -> Result<()>;

    /// Makes a protein of unknown byte order native.
    fn fix_endian(&self, s: &mut [u8]) -> Result<()> {
        if self.is_swapped_protein(s) {
            self.swap(s, SwapDirection::ToNative)
        } else if self.is_protein(s) {
            Ok(())
        } else {
            tracing::warn!(version = self.version(), "endian fix requested on something that is not a protein");
            Err(SlawError::CorruptProtein { context: "endian fix requested on a non-protein" })
        }
    }

    // === Construction ===

    fn encode_nil(&self) -> Result<Vec<u8>>;

    fn encode_boolean(&self, v: bool) -> Result<Vec<u8>>;

    fn encode_string(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    fn encode_cons(&self, car: &[u8], cdr: &[u8]) -> Result<Vec<u8>>;

    fn encode_list(&self, items: &[&[u8]], is_map: bool) -> Result<Vec<u8>>;

    /// Encodes a numeric singleton (`breadth == None`) or array. `data` holds
    /// native-endian units back to back.
    fn encode_numeric(&self, personality: Personality, breadth: Option<u64>, data: &[u8]) -> Result<Vec<u8>>;

    /// Encodes a standard protein. Empty `rude` means no rude data.
    fn encode_protein(&self, descrips: Option<&[u8]>, ingests: Option<&[u8]>, rude: &[u8]) -> Result<Vec<u8>>;
}

/// Returns the codec for a wire version.
pub fn codec_for(version: u8) -> Result<&'static dyn SlawCodec> {
    match version {
        SLAW_VERSION_V1 => Ok(&V1),
        SLAW_VERSION_CURRENT => Ok(&V2),
        _ => Err(SlawError::WrongVersion { version }),
    }
}

/// Checks that `data` is exactly as long as the personality and breadth
/// require.
pub(crate) fn check_numeric_len(personality: &Personality, breadth: Option<u64>, data: &[u8]) -> Result<()> {
    let units = breadth.unwrap_or(1);
    let expected = (personality.unit_bytes() as u64)
        .checked_mul(units)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(SlawError::OutOfMemory { bytes: u64::MAX })?;
    if data.len() != expected {
        return Err(SlawError::WrongLength {
            context: "numeric payload bytes",
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Iterator over back-to-back encoded children.
///
/// Yields each child's exact slice; an element that overruns the region ends
/// iteration with `CorruptSlaw`.
pub struct Children<'a> {
    codec: &'a dyn SlawCodec,
    rest: &'a [u8],
    failed: bool,
}

impl<'a> Children<'a> {
    pub fn new(codec: &'a dyn SlawCodec, body: &'a [u8]) -> Self {
        Self { codec, rest: body, failed: false }
    }
}

impl<'a> Iterator for Children<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.is_empty() {
            return None;
        }
        match self.codec.slaw_at(self.rest) {
            Ok(child) => {
                self.rest = &self.rest[child.len()..];
                Some(Ok(child))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_for() {
        assert_eq!(codec_for(1).unwrap().version(), 1);
        assert_eq!(codec_for(2).unwrap().word_bytes(), 8);
        assert_eq!(codec_for(3).unwrap_err(), SlawError::WrongVersion { version: 3 });
        assert!(codec_for(0).is_err());
    }

    #[test]
    fn test_children_iterates_exact_slices() {
        let a = V2.encode_string(b"hi").unwrap();
        let b = V2.encode_nil().unwrap();
        let mut body = a.clone();
        body.extend_from_slice(&b);
        let kids: Vec<_> = Children::new(&V2, &body).collect::<Result<_>>().unwrap();
        assert_eq!(kids, vec![&a[..], &b[..]]);
    }

    #[test]
    fn test_children_stops_on_overrun() {
        let s = V2.encode_string(b"a longer string").unwrap();
        let truncated = &s[..s.len() - 8];
        let mut kids = Children::new(&V2, truncated);
        assert!(kids.next().unwrap().is_err());
        assert!(kids.next().is_none());
    }
}
