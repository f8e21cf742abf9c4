//! Version and byte-order negotiation.
//!
//! [`convert_from`] turns bytes of any supported version and byte order
//! into a current [`Slaw`]; [`convert_to`] encodes a current slaw in an
//! older version (always native byte order).

use tracing::debug;

use crate::codec::{codec_for, SlawCodec, SwapDirection, V2};
use crate::error::{Result, SlawError};
use crate::fabricate::fabricate;
use crate::limits::SLAW_VERSION_CURRENT;
use crate::model::Slaw;

/// Byte order of an incoming buffer relative to this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Current,
    Opposite,
    /// Decided from the buffer; only proteins carry enough to tell.
    Unknown,
}

/// Normalizes `bytes` (one slaw of wire version `version`, written in byte
/// order `endian`) to a validated current-version slaw.
///
/// Trailing bytes past the slaw's declared length are ignored.
pub fn convert_from(mut bytes: Vec<u8>, endian: Endian, version: u8) -> Result<Slaw> {
    let codec = codec_for(version)?;
    if bytes.is_empty() {
        return Err(SlawError::corrupt("empty buffer"));
    }
    let word = codec.word_bytes();
    let swapped = match endian {
        Endian::Current => false,
        Endian::Opposite => true,
        Endian::Unknown => codec.is_swapped_protein(&bytes),
    };
    let head_len = codec.prefix_len(bytes.get(..word).unwrap_or(&bytes), swapped)?;
    let head = bytes
        .get(..head_len)
        .ok_or(SlawError::corrupt("buffer shorter than its header"))?;
    let len = codec.declared_len(head, swapped)?;
    if len > bytes.len() {
        return Err(SlawError::corrupt("slaw length runs past end of buffer"));
    }
    bytes.truncate(len);
    if swapped {
        codec.swap(&mut bytes, SwapDirection::ToNative)?;
    }
    if version == SLAW_VERSION_CURRENT {
        return Slaw::from_bytes(bytes);
    }
    let current = fabricate(codec, &bytes, &V2)?;
    debug!(from = version, to = SLAW_VERSION_CURRENT, len = current.len(), "converted slaw");
    Slaw::from_bytes(current)
}

/// Encodes `s` for wire version `version`. Returns the bytes and their
/// length, which is exactly what a reader of that version will consume.
pub fn convert_to(s: &Slaw, version: u8) -> Result<(Vec<u8>, usize)> {
    let codec = codec_for(version)?;
    let bytes = if version == SLAW_VERSION_CURRENT {
        s.as_bytes().to_vec()
    } else {
        let out = fabricate(&V2, s.as_bytes(), codec)?;
        debug!(from = SLAW_VERSION_CURRENT, to = version, len = out.len(), "converted slaw");
        out
    };
    let len = bytes.len();
    Ok((bytes, len))
}

/// Declared length of the native-endian slaw at the start of `bytes`, in
/// the layout of `version`.
pub fn byte_length(bytes: &[u8], version: u8) -> Result<usize> {
    codec_for(version)?.byte_len(bytes)
}
