//! Version 1 layout: 4-byte quads, kept for reading and writing legacy data.
//!
//! Kinds are told apart by the highest set bit of the header quad ("wee"
//! forms pack their length or count into the header). Anything too big for
//! a wee form gets a length-follows header: the flag bit, plus a 4- or
//! 8-byte length word right after the header.

use super::primitives::{Writer, load_u32, load_u64, round_up, store_u32, store_u64, swap_prims, words_to_bytes};
use super::{ListParts, NumericParts, ProteinParts, SlawCodec, SwapDirection, check_numeric_len};
use crate::error::{Result, SlawError};
use crate::limits::{MAX_NESTING_DEPTH, MAX_V1_WEE_BREADTH, SLAW_VERSION_V1};
use crate::model::{NumericClass, Personality, Shape, SlawType};

const QUAD: usize = 4;
const U32_MAX: u64 = u32::MAX as u64;

const LENGTH_FOLLOWS: u32 = 0x8000_0000;
const EIGHT_BYTE_LENGTH: u32 = 0x4000_0000;
const PURE_ILK: u32 = 0x3fff_ffff;

const NIL_ILK: u32 = 0x0101_0101;

const WEE_CONS_SUPER: u32 = 0x8000_0000;
const WEE_CONS_ILK: u32 = 0x4000_0000;
const WEE_CONS_SUB: u32 = 0x3fff_ffff;

const WEE_STRING_SUPER: u32 = 0xc000_0000;
const WEE_STRING_ILK: u32 = 0x2000_0000;
const WEE_STRING_SUB: u32 = 0x1fff_ffff;

const WEE_LIST_SUPER: u32 = 0xe000_0000;
const WEE_LIST_ILK: u32 = 0x1000_0000;
const WEE_LIST_MAP: u32 = 0x0800_0000;
const WEE_LIST_SUB: u32 = 0x07ff_ffff;

const BOOLEAN_SUPER: u32 = 0xffff_fffc;
const BOOLEAN_ILK: u32 = 0x0000_0002;

const CONS_PURE: u32 = 0x2000_0001;
const STRING_PURE: u32 = 0x2000_0002;
const LIST_PURE: u32 = 0x2000_0004;
const LIST_MAP: u32 = 0x0000_0001;

// Numerics.
const NUMERIC_SUPER: u32 = 0xf000_0000;
const NUMERIC_ILK: u32 = 0x0800_0000;
const FLOAT_FLAG: u32 = 0x0400_0000;
const COMPLEX_FLAG: u32 = 0x0200_0000;
const UNSIGNED_FLAG: u32 = 0x0100_0000;
const WIDE_FLAG: u32 = 0x0080_0000;
const STUMPY_FLAG: u32 = 0x0040_0000;
const MVEC_FLAG: u32 = 0x0020_0000;
const VEC_BITS: u32 = 0x0018_0000;
const VEC_SHIFTY: u32 = 19;
const BREADTH_FOLLOWS: u32 = 0x0004_0000;
const EIGHT_BYTE_BREADTH: u32 = 0x0002_0000;
const ARRAY_MASK: u32 = 0x0007_ff00;
const WEE_BREADTH_MASK: u32 = 0x0003_ff00;
const WEE_BREADTH_SHIFTY: u32 = 8;
const UNIT_BSIZE_MASK: u32 = 0x0000_00ff;

// Proteins.
const PROTEIN_TEST_MASK: u32 = 0xa080_80e0;
const PROTEIN_ILK: u32 = 0x0080_0080 | LENGTH_FOLLOWS;
const PROTEIN_WEE: u32 = 0x1000_0000;
const PROTEIN_NONSTD: u32 = 0x0800_0000;
const PROTEIN_DESCRIPS: u32 = 0x0400_0000;
const PROTEIN_INGESTS: u32 = 0x0200_0000;
const PROTEIN_RUDE: u32 = 0x0100_0000;
const PROTEIN_PAD_BITS: u32 = 0x0000_7f00;
const PROTEIN_PAD_SHIFTY: u32 = 8;
const PROTEIN_QUADLEN_BITS: u32 = 0x007f_0000;
const PROTEIN_QUADLEN_SHIFTY: u32 = 16;
const WEE_PROTEIN_MAX_QUADLEN: u64 = (PROTEIN_QUADLEN_BITS >> PROTEIN_QUADLEN_SHIFTY) as u64;
// proteins are padded to a multiple of 16 bytes
const PROTEIN_PAD_QUADS: u64 = 4;

/// The version 1 codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct V1;

// =============================================================================
// HEADER TESTS
// =============================================================================

fn is_wee_cons(ilk: u32) -> bool {
    ilk & WEE_CONS_SUPER == 0 && ilk & WEE_CONS_ILK != 0
}

fn is_wee_string(ilk: u32) -> bool {
    ilk & WEE_STRING_SUPER == 0 && ilk & WEE_STRING_ILK != 0
}

fn is_wee_list(ilk: u32) -> bool {
    ilk & WEE_LIST_SUPER == 0 && ilk & WEE_LIST_ILK != 0
}

fn is_boolean(ilk: u32) -> bool {
    ilk & BOOLEAN_SUPER == 0 && ilk & BOOLEAN_ILK != 0
}

fn length_follows(ilk: u32) -> bool {
    ilk & LENGTH_FOLLOWS != 0
}

fn is_full(ilk: u32, pure: u32) -> bool {
    length_follows(ilk) && ilk & PURE_ILK == pure
}

fn is_string(ilk: u32) -> bool {
    is_wee_string(ilk) || is_full(ilk, STRING_PURE)
}

fn is_cons(ilk: u32) -> bool {
    is_wee_cons(ilk) || is_full(ilk, CONS_PURE)
}

fn is_full_list(ilk: u32) -> bool {
    length_follows(ilk) && ilk & PURE_ILK & !LIST_MAP == LIST_PURE
}

fn is_list(ilk: u32) -> bool {
    is_wee_list(ilk) || is_full_list(ilk)
}

fn is_numeric(ilk: u32) -> bool {
    ilk & NUMERIC_SUPER == 0 && ilk & NUMERIC_ILK != 0
}

fn is_numeric_array(ilk: u32) -> bool {
    ilk & ARRAY_MASK != 0
}

fn is_protein_ilk(ilk: u32) -> bool {
    ilk & PROTEIN_TEST_MASK == PROTEIN_ILK
}

fn is_wee_protein(ilk: u32) -> bool {
    is_protein_ilk(ilk) && ilk & PROTEIN_WEE != 0
}

fn numeric_bsize(ilk: u32) -> u64 {
    u64::from(ilk & UNIT_BSIZE_MASK) + 1
}

/// Offset of the first payload byte after the header and any length word.
fn payload_offset(ilk: u32) -> usize {
    if length_follows(ilk) && !is_wee_protein(ilk) {
        if ilk & EIGHT_BYTE_LENGTH != 0 { 3 * QUAD } else { 2 * QUAD }
    } else {
        QUAD
    }
}

fn header(s: &[u8]) -> Result<u32> {
    load_u32(s, 0, false, "truncated slaw header")
}

fn quads_to_bytes(quads: u64) -> Result<usize> {
    quads
        .checked_mul(QUAD as u64)
        .and_then(|b| usize::try_from(b).ok())
        .ok_or(SlawError::corrupt("declared length overflows"))
}

/// (header quads, breadth) of a numeric array.
fn array_breadth(buf: &[u8], at: usize, ilk: u32, swapped: bool) -> Result<(u64, u64)> {
    if ilk & BREADTH_FOLLOWS == 0 {
        let field = u64::from((ilk & WEE_BREADTH_MASK) >> WEE_BREADTH_SHIFTY);
        // a zero field can only appear with the follows flag set
        Ok((1, field.saturating_sub(1)))
    } else if ilk & EIGHT_BYTE_BREADTH != 0 {
        Ok((3, load_u64(buf, at + QUAD, swapped, "truncated array breadth")?))
    } else {
        Ok((2, u64::from(load_u32(buf, at + QUAD, swapped, "truncated array breadth")?)))
    }
}

/// Length in quads of the slaw at `at`.
fn quadlen(buf: &[u8], at: usize, swapped: bool) -> Result<u64> {
    let ilk = load_u32(buf, at, swapped, "truncated slaw header")?;
    if is_wee_list(ilk) {
        return Ok(u64::from(load_u32(buf, at + QUAD, swapped, "truncated list length")?));
    }
    if is_numeric(ilk) {
        let bsize = numeric_bsize(ilk);
        if !is_numeric_array(ilk) {
            return Ok(1 + bsize.div_ceil(QUAD as u64));
        }
        let (head, breadth) = array_breadth(buf, at, ilk, swapped)?;
        let bytes = bsize
            .checked_mul(breadth)
            .ok_or(SlawError::corrupt("numeric array too large"))?;
        return Ok(head + bytes.div_ceil(QUAD as u64));
    }
    if is_wee_string(ilk) {
        return Ok(1 + u64::from(ilk & WEE_STRING_SUB));
    }
    if is_wee_cons(ilk) {
        return Ok(1 + u64::from(ilk & WEE_CONS_SUB));
    }
    if ilk == NIL_ILK || is_boolean(ilk) {
        return Ok(1);
    }
    if is_wee_protein(ilk) {
        return Ok(1 + u64::from((ilk & PROTEIN_QUADLEN_BITS) >> PROTEIN_QUADLEN_SHIFTY));
    }
    if length_follows(ilk) {
        let len = if ilk & EIGHT_BYTE_LENGTH != 0 {
            load_u64(buf, at + QUAD, swapped, "truncated length word")?
                .checked_add(3)
                .ok_or(SlawError::corrupt("declared length overflows"))?
        } else {
            2 + u64::from(load_u32(buf, at + QUAD, swapped, "truncated length word")?)
        };
        return Ok(len);
    }
    if ilk == 0 {
        return Ok(1);
    }
    Err(SlawError::unidentified("v1 slaw header"))
}

fn check_quads(child: &[u8]) -> Result<u64> {
    if child.len() % QUAD != 0 {
        return Err(SlawError::corrupt("child is not a whole number of quads"));
    }
    Ok((child.len() / QUAD) as u64)
}

fn sum_quads(items: &[&[u8]]) -> Result<u64> {
    items.iter().try_fold(0u64, |acc, item| {
        acc.checked_add(check_quads(item)?)
            .ok_or(SlawError::OutOfMemory { bytes: u64::MAX })
    })
}

/// Starts a length-follows slaw whose payload is `quads` long; the header and
/// length word are written, the payload is left to the caller.
fn prepfully(ilk: u32, quads: u64) -> Result<Writer> {
    let eight = quads > U32_MAX;
    let overhead = if eight { 3 } else { 2 };
    let total = quads
        .checked_add(overhead)
        .ok_or(SlawError::OutOfMemory { bytes: u64::MAX })?;
    let mut w = Writer::with_len(words_to_bytes(total, QUAD)?)?;
    if eight {
        w.write_u32(ilk | LENGTH_FOLLOWS | EIGHT_BYTE_LENGTH)?;
        w.write_u64(quads)?;
    } else {
        w.write_u32(ilk | LENGTH_FOLLOWS)?;
        w.write_u32(quads as u32)?;
    }
    Ok(w)
}

fn protein_pad(quads: u64, overhead: u64) -> u64 {
    let q = quads + overhead;
    round_up(q, PROTEIN_PAD_QUADS) - q
}

impl V1 {
    fn protein_child<'a>(&self, s: &'a [u8], at: usize, end: usize) -> Result<&'a [u8]> {
        let region = s
            .get(at..end)
            .ok_or(SlawError::CorruptProtein { context: "protein part starts past its end" })?;
        self.slaw_at(region)
            .map_err(|_| SlawError::CorruptProtein { context: "protein part overruns the protein" })
    }

    /// The exact extent of the slaw at the start of `s` plus its header.
    fn sized(&self, s: &[u8]) -> Result<(u32, usize)> {
        let ilk = header(s)?;
        let end = self.byte_len(s)?;
        if end > s.len() {
            return Err(SlawError::corrupt("slaw length runs past end of buffer"));
        }
        Ok((ilk, end))
    }
}

impl SlawCodec for V1 {
    fn version(&self) -> u8 {
        SLAW_VERSION_V1
    }

    fn word_bytes(&self) -> usize {
        QUAD
    }

    fn prefix_len(&self, head: &[u8], swapped: bool) -> Result<usize> {
        let ilk = load_u32(head, 0, swapped, "truncated slaw header")?;
        if is_wee_list(ilk) {
            return Ok(2 * QUAD);
        }
        if is_numeric(ilk) {
            if is_numeric_array(ilk) && ilk & BREADTH_FOLLOWS != 0 {
                return Ok(if ilk & EIGHT_BYTE_BREADTH != 0 { 3 * QUAD } else { 2 * QUAD });
            }
            return Ok(QUAD);
        }
        Ok(payload_offset(ilk))
    }

    fn declared_len(&self, s: &[u8], swapped: bool) -> Result<usize> {
        quads_to_bytes(quadlen(s, 0, swapped)?)
    }

    fn slaw_type(&self, s: &[u8]) -> SlawType {
        if s.is_empty() {
            return SlawType::Null;
        }
        let Ok(ilk) = header(s) else {
            return SlawType::Unknown;
        };
        if ilk == NIL_ILK {
            SlawType::Nil
        } else if is_string(ilk) {
            SlawType::String
        } else if is_numeric(ilk) {
            SlawType::Numeric
        } else if is_cons(ilk) {
            SlawType::Cons
        } else if is_list(ilk) {
            SlawType::List
        } else if is_protein_ilk(ilk) {
            SlawType::Protein
        } else if is_boolean(ilk) {
            SlawType::Boolean
        } else {
            SlawType::Unknown
        }
    }

    fn boolean_value(&self, s: &[u8]) -> Result<bool> {
        let ilk = header(s)?;
        if !is_boolean(ilk) {
            return Err(SlawError::corrupt("expected a boolean"));
        }
        Ok(ilk & 1 == 1)
    }

    fn string_bytes<'a>(&self, s: &'a [u8]) -> Result<&'a [u8]> {
        let (ilk, end) = self.sized(s)?;
        if !is_string(ilk) {
            return Err(SlawError::corrupt("expected a string"));
        }
        let data = s
            .get(payload_offset(ilk)..end)
            .ok_or(SlawError::corrupt("string shorter than its header"))?;
        let len = data
            .iter()
            .position(|&b| b == 0)
            .ok_or(SlawError::corrupt("string without terminator"))?;
        Ok(&data[..len])
    }

    fn cons_parts<'a>(&self, s: &'a [u8]) -> Result<(&'a [u8], &'a [u8])> {
        let (ilk, end) = self.sized(s)?;
        if !is_cons(ilk) {
            return Err(SlawError::corrupt("expected a cons"));
        }
        let body = s
            .get(payload_offset(ilk)..end)
            .ok_or(SlawError::corrupt("cons shorter than its header"))?;
        let car = self.slaw_at(body)?;
        let cdr = self.slaw_at(&body[car.len()..])?;
        if car.len() + cdr.len() != body.len() {
            return Err(SlawError::corrupt("cons length disagrees with its car and cdr"));
        }
        Ok((car, cdr))
    }

    fn list_parts<'a>(&self, s: &'a [u8]) -> Result<ListParts<'a>> {
        let (ilk, end) = self.sized(s)?;
        let (is_map, count, start) = if is_wee_list(ilk) {
            (ilk & WEE_LIST_MAP != 0, u64::from(ilk & WEE_LIST_SUB), 2 * QUAD)
        } else if is_full_list(ilk) {
            if ilk & EIGHT_BYTE_LENGTH != 0 {
                (ilk & LIST_MAP != 0, load_u64(s, 3 * QUAD, false, "truncated list count")?, 5 * QUAD)
            } else {
                let count = load_u32(s, 2 * QUAD, false, "truncated list count")?;
                (ilk & LIST_MAP != 0, u64::from(count), 3 * QUAD)
            }
        } else {
            return Err(SlawError::corrupt("expected a list"));
        };
        let body = s
            .get(start..end)
            .ok_or(SlawError::corrupt("list shorter than its header"))?;
        Ok(ListParts { is_map, count, body })
    }

    fn numeric_parts<'a>(&self, s: &'a [u8]) -> Result<NumericParts<'a>> {
        let ilk = header(s)?;
        if !is_numeric(ilk) {
            return Err(SlawError::corrupt("expected a numeric"));
        }
        let class = match (ilk & FLOAT_FLAG != 0, ilk & UNSIGNED_FLAG != 0) {
            (false, false) => NumericClass::Int,
            (false, true) => NumericClass::Unt,
            (true, false) => NumericClass::Float,
            (true, true) => return Err(SlawError::unidentified("unsigned float")),
        };
        let bits = match (ilk & STUMPY_FLAG != 0, ilk & WIDE_FLAG != 0) {
            (true, false) => 8,
            (true, true) => 16,
            (false, false) => 32,
            (false, true) => 64,
        };
        let vec = ((ilk & VEC_BITS) >> VEC_SHIFTY) as u8;
        let shape = if ilk & MVEC_FLAG != 0 {
            Shape::Multivector(2 + vec)
        } else if vec == 0 {
            Shape::Scalar
        } else {
            Shape::Vector(vec + 1)
        };
        let personality = Personality::new(class, bits, shape, ilk & COMPLEX_FLAG != 0)
            .map_err(|_| SlawError::unidentified("numeric personality"))?;
        let bsize = numeric_bsize(ilk);
        if bsize != personality.unit_bytes() as u64 {
            tracing::warn!(bsize, personality = %personality, "numeric unit size does not match personality");
            return Err(SlawError::corrupt("numeric unit size disagrees with its personality"));
        }
        let (start, breadth) = if is_numeric_array(ilk) {
            let (head, breadth) = array_breadth(s, 0, ilk, false)?;
            (head as usize * QUAD, Some(breadth))
        } else {
            (QUAD, None)
        };
        let len = bsize
            .checked_mul(breadth.unwrap_or(1))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(SlawError::corrupt("numeric array too large"))?;
        let data = start
            .checked_add(len)
            .and_then(|end| s.get(start..end))
            .ok_or(SlawError::corrupt("numeric runs past end of buffer"))?;
        Ok(NumericParts { personality, breadth, data })
    }

    fn protein_parts<'a>(&self, s: &'a [u8]) -> Result<ProteinParts<'a>> {
        let ilk = header(s)?;
        if !is_protein_ilk(ilk) {
            return Err(SlawError::CorruptProtein { context: "not a native-endian protein" });
        }
        let end = self
            .byte_len(s)
            .ok()
            .filter(|&e| e <= s.len())
            .ok_or(SlawError::CorruptProtein { context: "protein length runs past end of buffer" })?;
        if ilk & PROTEIN_NONSTD != 0 {
            return Ok(ProteinParts { nonstandard: true, descrips: None, ingests: None, rude: &[] });
        }
        let mut at = payload_offset(ilk);
        if at > end {
            return Err(SlawError::CorruptProtein { context: "protein shorter than its header" });
        }
        let mut descrips = None;
        let mut ingests = None;
        if ilk & PROTEIN_DESCRIPS != 0 {
            let d = self.protein_child(s, at, end)?;
            at += d.len();
            descrips = Some(d);
        }
        if ilk & PROTEIN_INGESTS != 0 {
            let i = self.protein_child(s, at, end)?;
            at += i.len();
            ingests = Some(i);
        }
        let pad = ((ilk & PROTEIN_PAD_BITS) >> PROTEIN_PAD_SHIFTY) as usize;
        let rude: &[u8] = if ilk & PROTEIN_RUDE != 0 {
            let len = (end - at)
                .checked_sub(pad)
                .ok_or(SlawError::CorruptProtein { context: "rude padding exceeds the protein" })?;
            &s[at..at + len]
        } else if end - at != pad {
            return Err(SlawError::CorruptProtein { context: "protein parts do not fill its length" });
        } else {
            &[]
        };
        Ok(ProteinParts { nonstandard: false, descrips, ingests, rude })
    }

    fn is_protein(&self, s: &[u8]) -> bool {
        header(s).is_ok_and(is_protein_ilk)
    }

    fn is_swapped_protein(&self, s: &[u8]) -> bool {
        load_u32(s, 0, true, "truncated slaw header").is_ok_and(is_protein_ilk)
    }

    fn swap(&self, s: &mut [u8], direction: SwapDirection) -> Result<()> {
        let stop = s.len();
        swap_one(s, 0, stop, direction, 0).map(|_| ())
    }

    fn encode_nil(&self) -> Result<Vec<u8>> {
        let mut w = Writer::with_len(QUAD)?;
        w.write_u32(NIL_ILK)?;
        Ok(w.into_bytes())
    }

    fn encode_boolean(&self, v: bool) -> Result<Vec<u8>> {
        let mut w = Writer::with_len(QUAD)?;
        w.write_u32(BOOLEAN_ILK | u32::from(v))?;
        Ok(w.into_bytes())
    }

    fn encode_string(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if bytes.contains(&0) {
            return Err(SlawError::WrongFormat { context: "v1 strings cannot hold NUL bytes" });
        }
        let pad_quads = round_up(bytes.len() as u64 + 1, QUAD as u64) / QUAD as u64;
        let mut w = if pad_quads <= u64::from(WEE_STRING_SUB) {
            let mut w = Writer::with_len(words_to_bytes(1 + pad_quads, QUAD)?)?;
            w.write_u32(WEE_STRING_ILK | pad_quads as u32)?;
            w
        } else {
            prepfully(STRING_PURE, pad_quads)?
        };
        w.write_bytes(bytes)?;
        Ok(w.into_bytes())
    }

    fn encode_cons(&self, car: &[u8], cdr: &[u8]) -> Result<Vec<u8>> {
        let quads = sum_quads(&[car, cdr])?;
        let mut w = if quads <= u64::from(WEE_CONS_SUB) {
            let mut w = Writer::with_len(words_to_bytes(1 + quads, QUAD)?)?;
            w.write_u32(WEE_CONS_ILK | quads as u32)?;
            w
        } else {
            prepfully(CONS_PURE, quads)?
        };
        w.write_bytes(car)?;
        w.write_bytes(cdr)?;
        Ok(w.into_bytes())
    }

    fn encode_list(&self, items: &[&[u8]], is_map: bool) -> Result<Vec<u8>> {
        let quads = sum_quads(items)?;
        let count = items.len() as u64;
        let mut w = if quads + 2 <= U32_MAX && count <= u64::from(WEE_LIST_SUB) {
            let total = quads + 2;
            let mut w = Writer::with_len(words_to_bytes(total, QUAD)?)?;
            let map = if is_map { WEE_LIST_MAP } else { 0 };
            w.write_u32(WEE_LIST_ILK | map | count as u32)?;
            w.write_u32(total as u32)?;
            w
        } else {
            let map = if is_map { LIST_MAP } else { 0 };
            if count > U32_MAX || quads + 1 > U32_MAX {
                // header, 8-byte length, 8-byte count
                let mut w = Writer::with_len(words_to_bytes(quads + 5, QUAD)?)?;
                w.write_u32(LIST_PURE | map | LENGTH_FOLLOWS | EIGHT_BYTE_LENGTH)?;
                w.write_u64(quads + 2)?;
                w.write_u64(count)?;
                w
            } else {
                let mut w = Writer::with_len(words_to_bytes(quads + 3, QUAD)?)?;
                w.write_u32(LIST_PURE | map | LENGTH_FOLLOWS)?;
                w.write_u32((quads + 1) as u32)?;
                w.write_u32(count as u32)?;
                w
            }
        };
        for item in items {
            w.write_bytes(item)?;
        }
        Ok(w.into_bytes())
    }

    fn encode_numeric(&self, personality: Personality, breadth: Option<u64>, data: &[u8]) -> Result<Vec<u8>> {
        check_numeric_len(&personality, breadth, data)?;
        let mut ilk = NUMERIC_ILK | (personality.unit_bytes() as u32 - 1);
        match personality.class() {
            NumericClass::Int => {}
            NumericClass::Unt => ilk |= UNSIGNED_FLAG,
            NumericClass::Float => ilk |= FLOAT_FLAG,
        }
        ilk |= match personality.bits() {
            8 => STUMPY_FLAG,
            16 => STUMPY_FLAG | WIDE_FLAG,
            32 => 0,
            _ => WIDE_FLAG,
        };
        if personality.is_complex() {
            ilk |= COMPLEX_FLAG;
        }
        ilk |= match personality.shape() {
            Shape::Scalar => 0,
            Shape::Vector(n) => u32::from(n - 1) << VEC_SHIFTY,
            Shape::Multivector(n) => MVEC_FLAG | (u32::from(n - 2) << VEC_SHIFTY),
        };
        let data_quads = (data.len() as u64).div_ceil(QUAD as u64);

        let mut w = match breadth {
            None => {
                let mut w = Writer::with_len(words_to_bytes(1 + data_quads, QUAD)?)?;
                w.write_u32(ilk)?;
                w
            }
            Some(b) if b <= MAX_V1_WEE_BREADTH => {
                let mut w = Writer::with_len(words_to_bytes(1 + data_quads, QUAD)?)?;
                w.write_u32(ilk | ((b as u32 + 1) << WEE_BREADTH_SHIFTY))?;
                w
            }
            Some(b) if b <= U32_MAX => {
                let mut w = Writer::with_len(words_to_bytes(2 + data_quads, QUAD)?)?;
                w.write_u32(ilk | BREADTH_FOLLOWS)?;
                w.write_u32(b as u32)?;
                w
            }
            Some(b) => {
                let mut w = Writer::with_len(words_to_bytes(3 + data_quads, QUAD)?)?;
                w.write_u32(ilk | BREADTH_FOLLOWS | EIGHT_BYTE_BREADTH)?;
                w.write_u64(b)?;
                w
            }
        };
        w.write_bytes(data)?;
        Ok(w.into_bytes())
    }

    fn encode_protein(&self, descrips: Option<&[u8]>, ingests: Option<&[u8]>, rude: &[u8]) -> Result<Vec<u8>> {
        let qd = descrips.map(check_quads).transpose()?.unwrap_or(0);
        let qi = ingests.map(check_quads).transpose()?.unwrap_or(0);
        let rude_len = rude.len() as u64;
        let q_rude = rude_len.div_ceil(QUAD as u64);
        let extra = q_rude * QUAD as u64 - rude_len;
        let quads = qd
            .checked_add(qi)
            .and_then(|q| q.checked_add(q_rude))
            .ok_or(SlawError::OutOfMemory { bytes: u64::MAX })?;

        let mut ilk = PROTEIN_ILK;
        if qd > 0 {
            ilk |= PROTEIN_DESCRIPS;
        }
        if qi > 0 {
            ilk |= PROTEIN_INGESTS;
        }
        if q_rude > 0 {
            ilk |= PROTEIN_RUDE;
        }

        let padding = protein_pad(quads, 1);
        let candidate = quads + padding;
        let mut w = if candidate <= WEE_PROTEIN_MAX_QUADLEN {
            ilk |= PROTEIN_PAD_BITS & (((padding * 4 + extra) as u32) << PROTEIN_PAD_SHIFTY);
            ilk |= PROTEIN_WEE;
            ilk |= PROTEIN_QUADLEN_BITS & ((candidate as u32) << PROTEIN_QUADLEN_SHIFTY);
            let mut w = Writer::with_len(words_to_bytes(1 + candidate, QUAD)?)?;
            w.write_u32(ilk)?;
            w
        } else {
            let mut padding = protein_pad(quads, 2);
            if quads + padding > U32_MAX {
                padding = protein_pad(quads, 3);
            }
            ilk |= PROTEIN_PAD_BITS & (((padding * 4 + extra) as u32) << PROTEIN_PAD_SHIFTY);
            prepfully(ilk, quads + padding)?
        };
        if let Some(d) = descrips {
            w.write_bytes(d)?;
        }
        if let Some(i) = ingests {
            w.write_bytes(i)?;
        }
        w.write_bytes(rude)?;
        Ok(w.into_bytes())
    }
}

// =============================================================================
// ENDIAN SWAP
// =============================================================================

fn swap_u32_at(buf: &mut [u8], at: usize, rd: bool, wr: bool) -> Result<()> {
    let v = load_u32(buf, at, rd, "truncated word")?;
    store_u32(buf, at, v, wr)
}

fn swap_u64_at(buf: &mut [u8], at: usize, rd: bool, wr: bool) -> Result<()> {
    let v = load_u64(buf, at, rd, "truncated word")?;
    store_u64(buf, at, v, wr)
}

/// Swaps back-to-back slawx in `[p, stop)`, ending early at a zero quad.
fn swap_sequence(buf: &mut [u8], mut p: usize, stop: usize, direction: SwapDirection, depth: usize) -> Result<()> {
    while p < stop {
        if load_u32(buf, p, false, "truncated slaw header")? == 0 {
            break;
        }
        p = swap_one(buf, p, stop, direction, depth)?;
    }
    Ok(())
}

/// Swaps the slaw at `at`, which must end by `stop`. Returns its end offset.
fn swap_one(buf: &mut [u8], at: usize, stop: usize, direction: SwapDirection, depth: usize) -> Result<usize> {
    if depth > MAX_NESTING_DEPTH {
        return Err(SlawError::corrupt("slaw nesting too deep"));
    }
    let (rd, wr) = direction.flags();
    let ilk = load_u32(buf, at, rd, "truncated slaw header")?;
    let end = at
        .checked_add(quads_to_bytes(quadlen(buf, at, rd)?)?)
        .filter(|&e| e <= stop)
        .ok_or(SlawError::corrupt("slaw overruns its container"))?;
    let array = if is_numeric(ilk) && is_numeric_array(ilk) {
        Some(array_breadth(buf, at, ilk, rd)?)
    } else {
        None
    };

    swap_u32_at(buf, at, rd, wr)?;
    let eight = ilk & EIGHT_BYTE_LENGTH != 0;
    let payload = payload_offset(ilk);
    if payload > QUAD {
        if eight {
            swap_u64_at(buf, at + QUAD, rd, wr)?;
        } else {
            swap_u32_at(buf, at + QUAD, rd, wr)?;
        }
    }
    let payload = at + payload;

    if ilk == NIL_ILK || is_string(ilk) {
        return Ok(end);
    }
    if is_numeric(ilk) {
        let (head, units) = match array {
            Some((head, breadth)) => {
                match head {
                    2 => swap_u32_at(buf, at + QUAD, rd, wr)?,
                    3 => swap_u64_at(buf, at + QUAD, rd, wr)?,
                    _ => {}
                }
                (head as usize, breadth)
            }
            None => (1, 1),
        };
        let prim = match (ilk & STUMPY_FLAG != 0, ilk & WIDE_FLAG != 0) {
            (true, false) => return Ok(end),
            (true, true) => 2,
            (false, false) => 4,
            (false, true) => 8,
        };
        let bsize = numeric_bsize(ilk);
        if bsize % prim != 0 {
            return Err(SlawError::corrupt("numeric unit is not a whole number of primitives"));
        }
        let start = at + head * QUAD;
        let len = usize::try_from(bsize * units).map_err(|_| SlawError::corrupt("numeric too large"))?;
        let data = buf
            .get_mut(start..start + len)
            .ok_or(SlawError::corrupt("numeric runs past end of buffer"))?;
        swap_prims(data, prim as usize);
        return Ok(end);
    }
    if is_cons(ilk) {
        swap_sequence(buf, payload, end, direction, depth + 1)?;
        return Ok(end);
    }
    if is_wee_list(ilk) {
        // the quad after the header (the total length) was handled as the count
        swap_u32_at(buf, at + QUAD, rd, wr)?;
        swap_sequence(buf, at + 2 * QUAD, end, direction, depth + 1)?;
        return Ok(end);
    }
    if is_full_list(ilk) {
        let first = if eight {
            swap_u64_at(buf, payload, rd, wr)?;
            payload + 8
        } else {
            swap_u32_at(buf, payload, rd, wr)?;
            payload + QUAD
        };
        swap_sequence(buf, first, end, direction, depth + 1)?;
        return Ok(end);
    }
    if is_protein_ilk(ilk) {
        if ilk & PROTEIN_NONSTD == 0 {
            let parts = usize::from(ilk & PROTEIN_DESCRIPS != 0) + usize::from(ilk & PROTEIN_INGESTS != 0);
            let mut p = payload;
            for _ in 0..parts {
                p = swap_one(buf, p, end, direction, depth + 1)?;
            }
        }
        return Ok(end);
    }
    if is_boolean(ilk) || ilk == 0 {
        return Ok(end);
    }
    Err(SlawError::unidentified("v1 slaw header"))
}
