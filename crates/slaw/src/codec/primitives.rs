//! Word-level primitives shared by the v1 and v2 layouts.
//!
//! Both layouts store words in the byte order of the machine that wrote
//! them. Every load and store takes a `swapped` flag: when set, the word is
//! byte-reversed on the way through, which is how foreign-endian buffers are
//! inspected without rewriting them first.

use std::ops::Range;

use crate::error::{Result, SlawError};

// =============================================================================
// ALLOCATION
// =============================================================================

/// Allocates a zero-filled buffer of `len` bytes, reporting failure as
/// `OutOfMemory` instead of aborting.
pub fn alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| SlawError::OutOfMemory { bytes: len as u64 })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Converts a word count into a byte count, treating overflow as an
/// allocation failure.
pub fn words_to_bytes(words: u64, word_bytes: usize) -> Result<usize> {
    words
        .checked_mul(word_bytes as u64)
        .and_then(|b| usize::try_from(b).ok())
        .ok_or(SlawError::OutOfMemory { bytes: u64::MAX })
}

/// Rounds `n` up to a multiple of `word`.
#[inline]
pub fn round_up(n: u64, word: u64) -> u64 {
    n.div_ceil(word) * word
}

// =============================================================================
// RANDOM ACCESS
// =============================================================================

/// Loads a 64-bit word at byte offset `at`.
#[inline]
pub fn load_u64(buf: &[u8], at: usize, swapped: bool, context: &'static str) -> Result<u64> {
    let bytes = at
        .checked_add(8)
        .and_then(|end| buf.get(at..end))
        .ok_or(SlawError::corrupt(context))?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    let v = u64::from_ne_bytes(arr);
    Ok(if swapped { v.swap_bytes() } else { v })
}

/// Loads a 32-bit word at byte offset `at`.
#[inline]
pub fn load_u32(buf: &[u8], at: usize, swapped: bool, context: &'static str) -> Result<u32> {
    let bytes = at
        .checked_add(4)
        .and_then(|end| buf.get(at..end))
        .ok_or(SlawError::corrupt(context))?;
    let mut arr = [0u8; 4];
    arr.copy_from_slice(bytes);
    let v = u32::from_ne_bytes(arr);
    Ok(if swapped { v.swap_bytes() } else { v })
}

/// Stores a 64-bit word at byte offset `at`.
#[inline]
pub fn store_u64(buf: &mut [u8], at: usize, v: u64, swapped: bool) -> Result<()> {
    let v = if swapped { v.swap_bytes() } else { v };
    let dst = at
        .checked_add(8)
        .and_then(|end| buf.get_mut(at..end))
        .ok_or(SlawError::corrupt("word store past end of buffer"))?;
    dst.copy_from_slice(&v.to_ne_bytes());
    Ok(())
}

/// Stores a 32-bit word at byte offset `at`.
#[inline]
pub fn store_u32(buf: &mut [u8], at: usize, v: u32, swapped: bool) -> Result<()> {
    let v = if swapped { v.swap_bytes() } else { v };
    let dst = at
        .checked_add(4)
        .and_then(|end| buf.get_mut(at..end))
        .ok_or(SlawError::corrupt("word store past end of buffer"))?;
    dst.copy_from_slice(&v.to_ne_bytes());
    Ok(())
}

/// Reverses every `prim`-byte primitive in `data` in place.
pub fn swap_prims(data: &mut [u8], prim: usize) {
    if prim > 1 {
        for chunk in data.chunks_exact_mut(prim) {
            chunk.reverse();
        }
    }
}

/// Byte range, within an 8-byte word, of its `n` least significant bytes.
///
/// Small payloads live there ("special bytes"), so where they sit in memory
/// depends on the machine's byte order.
#[inline]
pub fn special_range(n: usize) -> Range<usize> {
    #[cfg(target_endian = "little")]
    {
        0..n
    }
    #[cfg(target_endian = "big")]
    {
        8 - n..8
    }
}

/// Reverses the `n` least significant bytes of `ilk`, leaving the rest alone.
///
/// After a whole-word byte swap, bytes packed into the low end of a word come
/// out in the opposite order; this puts them back.
pub fn reswap_special_bytes(mut ilk: u64, n: u32) -> u64 {
    if n == 0 {
        return ilk;
    }
    let mut jlk = 0u64;
    for _ in 0..n {
        jlk = (jlk << 8) | (ilk & 0xff);
        ilk >>= 8;
    }
    if n >= 8 { jlk } else { (ilk << (8 * n)) | jlk }
}

/// Exchanges the two 16-bit halves of the low 32 bits of `ilk`.
pub fn reswap_special_u16s(ilk: u64) -> u64 {
    (ilk & 0xffff_ffff_0000_0000) | ((ilk << 16) & 0xffff_0000) | ((ilk >> 16) & 0xffff)
}

// =============================================================================
// DECODING
// =============================================================================

/// Cursor over a slaw buffer.
///
/// Reads words sequentially with bounds checking; running past the end is
/// reported as `CorruptSlaw` with the caller's context.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    swapped: bool,
}

impl<'a> Reader<'a> {
    /// Creates a reader over native-endian data.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, swapped: false }
    }

    /// Creates a reader that byte-reverses every word it loads.
    pub fn with_swap(data: &'a [u8], swapped: bool) -> Self {
        Self { data, pos: 0, swapped }
    }

    /// Returns the current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or(&[])
    }

    /// Reads a 32-bit word.
    #[inline]
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        let v = load_u32(self.data, self.pos, self.swapped, context)?;
        self.pos += 4;
        Ok(v)
    }

    /// Reads a 64-bit word.
    #[inline]
    pub fn read_u64(&mut self, context: &'static str) -> Result<u64> {
        let v = load_u64(self.data, self.pos, self.swapped, context)?;
        self.pos += 8;
        Ok(v)
    }

    /// Reads exactly `n` raw bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        let bytes = self
            .pos
            .checked_add(n)
            .and_then(|end| self.data.get(self.pos..end))
            .ok_or(SlawError::corrupt(context))?;
        self.pos += n;
        Ok(bytes)
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Builder for an encoded slaw.
///
/// The whole buffer is reserved and zeroed up front so padding never carries
/// stale bytes; words are then written in order.
#[derive(Debug)]
pub struct Writer {
    buf: Vec<u8>,
    pos: usize,
}

impl Writer {
    /// Allocates a zeroed buffer of exactly `len` bytes.
    pub fn with_len(len: usize) -> Result<Self> {
        Ok(Self { buf: alloc_zeroed(len)?, pos: 0 })
    }

    /// Returns the current write offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Writes a native-endian 64-bit word.
    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        store_u64(&mut self.buf, self.pos, v, false)?;
        self.pos += 8;
        Ok(())
    }

    /// Writes a native-endian 32-bit word.
    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        store_u32(&mut self.buf, self.pos, v, false)?;
        self.pos += 4;
        Ok(())
    }

    /// Copies raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let dst = self
            .pos
            .checked_add(bytes.len())
            .and_then(|end| self.buf.get_mut(self.pos..end))
            .ok_or(SlawError::corrupt("encoded slaw larger than its computed length"))?;
        dst.copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Skips ahead to the next multiple of `word`, leaving zeros behind.
    pub fn pad_to(&mut self, word: usize) {
        self.pos = self.pos.div_ceil(word) * word;
    }

    /// Finishes the buffer. The whole allocation is returned; any bytes not
    /// written stay zero.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_store_roundtrip() {
        let mut buf = vec![0u8; 16];
        store_u64(&mut buf, 8, 0x0102_0304_0506_0708, false).unwrap();
        assert_eq!(load_u64(&buf, 8, false, "t").unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(load_u64(&buf, 8, true, "t").unwrap(), 0x0807_0605_0403_0201);

        store_u32(&mut buf, 0, 0xdead_beef, true).unwrap();
        assert_eq!(load_u32(&buf, 0, true, "t").unwrap(), 0xdead_beef);
        assert_eq!(load_u32(&buf, 0, false, "t").unwrap(), 0xefbe_adde);
    }

    #[test]
    fn test_load_out_of_bounds() {
        let buf = [0u8; 7];
        assert_eq!(
            load_u64(&buf, 0, false, "short oct"),
            Err(SlawError::CorruptSlaw { context: "short oct" })
        );
        assert!(load_u32(&buf, usize::MAX - 1, false, "wrap").is_err());
    }

    #[test]
    fn test_reswap_special_bytes() {
        assert_eq!(reswap_special_bytes(0x3400_0000_0061_6263, 3), 0x3400_0000_0063_6261);
        assert_eq!(reswap_special_bytes(0xaabb, 0), 0xaabb);
        // involution
        let v = 0x1234_5678_9abc_def0;
        for n in 0..8 {
            assert_eq!(reswap_special_bytes(reswap_special_bytes(v, n), n), v);
        }
    }

    #[test]
    fn test_reswap_special_u16s() {
        assert_eq!(reswap_special_u16s(0xffff_0000_1111_2222), 0xffff_0000_2222_1111);
    }

    #[test]
    fn test_swap_prims() {
        let mut data = [1, 2, 3, 4, 5, 6, 7, 8];
        swap_prims(&mut data, 4);
        assert_eq!(data, [4, 3, 2, 1, 8, 7, 6, 5]);
        swap_prims(&mut data, 1);
        assert_eq!(data, [4, 3, 2, 1, 8, 7, 6, 5]);
    }

    #[test]
    fn test_writer_zero_pads() {
        let mut w = Writer::with_len(16).unwrap();
        w.write_bytes(b"abc").unwrap();
        w.pad_to(8);
        assert_eq!(w.position(), 8);
        w.write_u32(7).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..8], b"abc\0\0\0\0\0");
        assert_eq!(&bytes[12..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_writer_overflow_rejected() {
        let mut w = Writer::with_len(4).unwrap();
        assert!(w.write_u64(1).is_err());
    }

    #[test]
    fn test_reader_sequence() {
        let mut buf = vec![0u8; 12];
        store_u32(&mut buf, 0, 5, false).unwrap();
        store_u64(&mut buf, 4, 9, false).unwrap();
        let mut r = Reader::new(&buf);
        assert_eq!(r.read_u32("a").unwrap(), 5);
        assert_eq!(r.read_u64("b").unwrap(), 9);
        assert_eq!(r.position(), 12);
        assert!(r.remaining().is_empty());
        assert!(r.read_bytes(1, "c").is_err());
    }

    #[test]
    fn test_words_to_bytes_overflow() {
        assert_eq!(words_to_bytes(3, 8).unwrap(), 24);
        assert!(words_to_bytes(u64::MAX, 8).is_err());
    }
}
