//! Version 2 layout: 8-byte octs, the current format.
//!
//! The top nibble of the header oct selects the kind:
//!
//! | nibble | kind |
//! |--------|------|
//! | 0 | protein written in the opposite byte order |
//! | 1 | protein |
//! | 2 | nil / boolean |
//! | 3 | wee string (payload in the header) |
//! | 4, 5, 6 | list, map, cons |
//! | 7 | full string |
//! | 8, 9, 10 | numeric singleton: int, unt, float |
//! | 12, 13, 14 | numeric array: int, unt, float |
//!
//! Payloads of at most a few bytes live in the header's least significant
//! bytes, whose memory position depends on byte order (see
//! [`special_range`]).

use super::primitives::{
    Writer, load_u64, reswap_special_bytes, reswap_special_u16s, round_up, special_range, store_u64, swap_prims,
};
use super::{ListParts, NumericParts, ProteinParts, SlawCodec, SwapDirection, check_numeric_len};
use crate::error::{Result, SlawError};
use crate::limits::{MAX_NESTING_DEPTH, MAX_WEE_CONTAINER, SLAW_VERSION_CURRENT};
use crate::model::{NumericClass, Personality, Shape, SlawType};

const OCT: usize = 8;

const NIB_SHIFTY: u32 = 60;
const NIB_PROTEIN: u64 = 1;
const NIB_SYMBOL: u64 = 2;
const NIB_WEE_STRING: u64 = 3;
const NIB_LIST: u64 = 4;
const NIB_MAP: u64 = 5;
const NIB_CONS: u64 = 6;
const NIB_FULL_STRING: u64 = 7;

const NIL_ILK: u64 = 0x2000_0000_0000_0002;
const FALSE_ILK: u64 = 0x2000_0000_0000_0000;

const LEN_MASK: u64 = 0x00ff_ffff_ffff_ffff;
const COUNT_SHIFTY: u32 = 56;
const CONS_MASK: u64 = 0xff00_0000_0000_0000;
const CONS_ILK: u64 = 0x6200_0000_0000_0000;

// Numeric header.
const NUM_FLAG: u64 = 1 << 63;
const ARRAY_FLAG: u64 = 1 << 62;
const FLOAT_FLAG: u64 = 1 << 61;
const UNSIGNED_FLAG: u64 = 1 << 60;
const SIZE_SHIFTY: u32 = 58;
const COMPLEX_FLAG: u64 = 1 << 57;
const VEC_SHIFTY: u32 = 54;
const BSIZE_SHIFTY: u32 = 46;
const BREADTH_MASK: u64 = 0x0000_3fff_ffff_ffff;
const PERSONALITY_BITS: u64 = 0xffff_c000_0000_0000;

// Protein header and flags oct.
const PROTEIN_MASK: u64 = 0xf000_0000_0000_00f0;
const PROTEIN_TAG: u64 = 0x1000_0000_0000_0000;
const SWAPPED_PROTEIN_TAG: u64 = 0x0000_0000_0000_0010;
const PROTEIN_MAX_OCTLEN: u64 = 1 << 56;
const NONSTD_FLAG: u64 = 1 << 63;
const DESCRIPS_FLAG: u64 = 1 << 62;
const INGESTS_FLAG: u64 = 1 << 61;
const VERY_RUDE_FLAG: u64 = 1 << 59;
const WEE_RUDE_SHIFTY: u32 = 56;
const WEE_RUDE_MAX: usize = 7;
const VERY_RUDE_LEN_MASK: u64 = 0x07ff_ffff_ffff_ffff;

/// The version 2 codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct V2;

#[inline]
fn nibble(ilk: u64) -> u64 {
    ilk >> NIB_SHIFTY
}

fn protein_octlen(ilk: u64) -> u64 {
    let c = ilk & !PROTEIN_MASK;
    (c & 0xf) | (c >> 4)
}

fn numeric_bsize(ilk: u64) -> u64 {
    ((ilk >> BSIZE_SHIFTY) & 0xff) + 1
}

/// Length in octs declared by a (native view of a) header; 0 when unknown.
fn octlen(ilk: u64) -> u64 {
    match nibble(ilk) {
        0 => {
            let native = ilk.swap_bytes();
            if native & PROTEIN_MASK == PROTEIN_TAG { protein_octlen(native) } else { 0 }
        }
        NIB_PROTEIN => {
            if ilk & PROTEIN_MASK == PROTEIN_TAG { protein_octlen(ilk) } else { 0 }
        }
        NIB_SYMBOL | NIB_WEE_STRING => 1,
        NIB_LIST | NIB_MAP | NIB_CONS | NIB_FULL_STRING => ilk & LEN_MASK,
        8..=10 => {
            let bsize = numeric_bsize(ilk);
            if bsize <= 4 { 1 } else { 1 + bsize.div_ceil(8) }
        }
        12..=14 => {
            let bsize = numeric_bsize(ilk);
            match bsize.checked_mul(ilk & BREADTH_MASK) {
                Some(bytes) => 1 + bytes.div_ceil(8),
                None => 0,
            }
        }
        _ => 0,
    }
}

fn octs_to_bytes(octs: u64) -> Result<usize> {
    octs.checked_mul(OCT as u64)
        .and_then(|b| usize::try_from(b).ok())
        .ok_or(SlawError::corrupt("declared length overflows"))
}

fn header(s: &[u8]) -> Result<u64> {
    load_u64(s, 0, false, "truncated slaw header")
}

fn size_code(bits: u8) -> u64 {
    u64::from((bits / 8).trailing_zeros())
}

fn vec_code(shape: Shape) -> u64 {
    match shape {
        Shape::Scalar => 0,
        Shape::Vector(n) => u64::from(n) - 1,
        Shape::Multivector(n) => 4 + u64::from(n) - 2,
    }
}

/// Header bits describing a numeric's personality, array-ness and unit size.
///
/// Comparing these as unsigned integers is the first step of numeric
/// ordering.
pub(crate) fn personality_key(p: &Personality, is_array: bool) -> u64 {
    numeric_ilk(p, is_array) & PERSONALITY_BITS
}

fn numeric_ilk(p: &Personality, is_array: bool) -> u64 {
    let mut ilk = NUM_FLAG;
    if is_array {
        ilk |= ARRAY_FLAG;
    }
    match p.class() {
        NumericClass::Int => {}
        NumericClass::Unt => ilk |= UNSIGNED_FLAG,
        NumericClass::Float => ilk |= FLOAT_FLAG,
    }
    ilk |= size_code(p.bits()) << SIZE_SHIFTY;
    if p.is_complex() {
        ilk |= COMPLEX_FLAG;
    }
    ilk |= vec_code(p.shape()) << VEC_SHIFTY;
    ilk | ((p.unit_bytes() as u64 - 1) << BSIZE_SHIFTY)
}

/// Packs up to 7 bytes into the special bytes of an otherwise zero oct.
fn special_oct(bytes: &[u8]) -> u64 {
    let mut oct = [0u8; OCT];
    let r = special_range(bytes.len());
    oct[r].copy_from_slice(bytes);
    u64::from_ne_bytes(oct)
}

/// Splits off the terminator, which must be the only zero byte.
fn check_terminated(body: &[u8]) -> Result<&[u8]> {
    let Some((&0, text)) = body.split_last() else {
        return Err(SlawError::corrupt("string terminator is not a zero byte"));
    };
    if text.contains(&0) {
        return Err(SlawError::corrupt("string holds a zero byte"));
    }
    Ok(text)
}

fn check_octs(child: &[u8]) -> Result<u64> {
    if child.len() % OCT != 0 {
        return Err(SlawError::corrupt("child is not a whole number of octs"));
    }
    Ok((child.len() / OCT) as u64)
}

fn encode_container(nib: u64, items: &[&[u8]]) -> Result<Vec<u8>> {
    let count = items.len() as u64;
    let wee = count < MAX_WEE_CONTAINER;
    let mut octs: u64 = if wee { 1 } else { 2 };
    for item in items {
        octs = octs
            .checked_add(check_octs(item)?)
            .ok_or(SlawError::OutOfMemory { bytes: u64::MAX })?;
    }
    if octs > LEN_MASK {
        return Err(SlawError::TooLarge { field: "container octs", len: octs, max: LEN_MASK });
    }
    let count_field = if wee { count } else { MAX_WEE_CONTAINER };
    let mut w = Writer::with_len(octs_to_bytes(octs)?)?;
    w.write_u64((nib << NIB_SHIFTY) | (count_field << COUNT_SHIFTY) | octs)?;
    if !wee {
        w.write_u64(count)?;
    }
    for item in items {
        w.write_bytes(item)?;
    }
    Ok(w.into_bytes())
}

impl V2 {
    fn protein_header(&self, s: &[u8]) -> Result<(u64, usize, u64)> {
        let ilk = header(s)?;
        if ilk & PROTEIN_MASK != PROTEIN_TAG {
            return Err(SlawError::CorruptProtein { context: "not a native-endian protein" });
        }
        let octs = protein_octlen(ilk);
        if octs < 2 {
            return Err(SlawError::CorruptProtein { context: "protein shorter than its header" });
        }
        let end = octs_to_bytes(octs)?;
        if end > s.len() {
            return Err(SlawError::CorruptProtein { context: "protein length runs past end of buffer" });
        }
        let flags = load_u64(s, OCT, false, "truncated protein header")?;
        Ok((ilk, end, flags))
    }

    fn protein_child<'a>(&self, s: &'a [u8], at: usize, end: usize) -> Result<&'a [u8]> {
        let region = s
            .get(at..end)
            .ok_or(SlawError::CorruptProtein { context: "protein part starts past its end" })?;
        self.slaw_at(region)
            .map_err(|_| SlawError::CorruptProtein { context: "protein part overruns the protein" })
    }
}

impl SlawCodec for V2 {
    fn version(&self) -> u8 {
        SLAW_VERSION_CURRENT
    }

    fn word_bytes(&self) -> usize {
        OCT
    }

    fn prefix_len(&self, _head: &[u8], _swapped: bool) -> Result<usize> {
        Ok(OCT)
    }

    fn declared_len(&self, s: &[u8], swapped: bool) -> Result<usize> {
        let ilk = load_u64(s, 0, swapped, "truncated slaw header")?;
        match octlen(ilk) {
            0 => Err(SlawError::unidentified("v2 slaw header")),
            octs => octs_to_bytes(octs),
        }
    }

    fn slaw_type(&self, s: &[u8]) -> SlawType {
        if s.is_empty() {
            return SlawType::Null;
        }
        let Ok(ilk) = header(s) else {
            return SlawType::Unknown;
        };
        match nibble(ilk) {
            NIB_PROTEIN if ilk & PROTEIN_MASK == PROTEIN_TAG => SlawType::Protein,
            NIB_SYMBOL if ilk == NIL_ILK => SlawType::Nil,
            NIB_SYMBOL if ilk & !1 == FALSE_ILK => SlawType::Boolean,
            NIB_WEE_STRING | NIB_FULL_STRING => SlawType::String,
            NIB_LIST | NIB_MAP => SlawType::List,
            NIB_CONS if ilk & CONS_MASK == CONS_ILK => SlawType::Cons,
            8..=10 | 12..=14 => SlawType::Numeric,
            _ => SlawType::Unknown,
        }
    }

    fn boolean_value(&self, s: &[u8]) -> Result<bool> {
        let ilk = header(s)?;
        if ilk & !1 != FALSE_ILK {
            return Err(SlawError::corrupt("expected a boolean"));
        }
        Ok(ilk & 1 == 1)
    }

    fn string_bytes<'a>(&self, s: &'a [u8]) -> Result<&'a [u8]> {
        let ilk = header(s)?;
        match nibble(ilk) {
            NIB_WEE_STRING => {
                let n = ((ilk >> COUNT_SHIFTY) & 7) as usize;
                if n == 0 {
                    return Err(SlawError::corrupt("wee string without terminator"));
                }
                let r = special_range(n);
                check_terminated(&s[r])
            }
            NIB_FULL_STRING => {
                let octs = ilk & LEN_MASK;
                let pad = ((ilk >> COUNT_SHIFTY) & 0xf) as usize;
                if octs < 2 || pad >= OCT {
                    return Err(SlawError::corrupt("malformed full string header"));
                }
                let total = octs_to_bytes(octs - 1)?;
                let len = total
                    .checked_sub(pad + 1)
                    .ok_or(SlawError::corrupt("string shorter than its terminator"))?;
                let body = s
                    .get(OCT..OCT + len + 1)
                    .ok_or(SlawError::corrupt("string runs past end of buffer"))?;
                check_terminated(body)
            }
            _ => Err(SlawError::corrupt("expected a string")),
        }
    }

    fn cons_parts<'a>(&self, s: &'a [u8]) -> Result<(&'a [u8], &'a [u8])> {
        let ilk = header(s)?;
        if ilk & CONS_MASK != CONS_ILK {
            return Err(SlawError::corrupt("expected a cons"));
        }
        let end = octs_to_bytes(ilk & LEN_MASK)?;
        let body = s
            .get(OCT..end)
            .ok_or(SlawError::corrupt("cons runs past end of buffer"))?;
        let car = self.slaw_at(body)?;
        let cdr = self.slaw_at(&body[car.len()..])?;
        if car.len() + cdr.len() != body.len() {
            return Err(SlawError::corrupt("cons length disagrees with its car and cdr"));
        }
        Ok((car, cdr))
    }

    fn list_parts<'a>(&self, s: &'a [u8]) -> Result<ListParts<'a>> {
        let ilk = header(s)?;
        let is_map = match nibble(ilk) {
            NIB_LIST => false,
            NIB_MAP => true,
            _ => return Err(SlawError::corrupt("expected a list")),
        };
        let wee_count = (ilk >> COUNT_SHIFTY) & 0xf;
        let (count, start) = if wee_count == MAX_WEE_CONTAINER {
            (load_u64(s, OCT, false, "truncated list count")?, 2 * OCT)
        } else {
            (wee_count, OCT)
        };
        let end = octs_to_bytes(ilk & LEN_MASK)?;
        if end < start {
            return Err(SlawError::corrupt("list shorter than its header"));
        }
        let body = s
            .get(start..end)
            .ok_or(SlawError::corrupt("list runs past end of buffer"))?;
        Ok(ListParts { is_map, count, body })
    }

    fn numeric_parts<'a>(&self, s: &'a [u8]) -> Result<NumericParts<'a>> {
        let ilk = header(s)?;
        if ilk & NUM_FLAG == 0 {
            return Err(SlawError::corrupt("expected a numeric"));
        }
        let class = match (ilk & FLOAT_FLAG != 0, ilk & UNSIGNED_FLAG != 0) {
            (false, false) => NumericClass::Int,
            (false, true) => NumericClass::Unt,
            (true, false) => NumericClass::Float,
            (true, true) => return Err(SlawError::unidentified("unsigned float")),
        };
        let bits = 8u8 << ((ilk >> SIZE_SHIFTY) & 3);
        let vec = (ilk >> VEC_SHIFTY) & 7;
        let shape = match vec {
            0 => Shape::Scalar,
            1..=3 => Shape::Vector(vec as u8 + 1),
            _ => Shape::Multivector((vec & 3) as u8 + 2),
        };
        let personality = Personality::new(class, bits, shape, ilk & COMPLEX_FLAG != 0)
            .map_err(|_| SlawError::unidentified("numeric personality"))?;
        let bsize = numeric_bsize(ilk);
        if bsize != personality.unit_bytes() as u64 {
            tracing::warn!(bsize, personality = %personality, "numeric unit size does not match personality");
            return Err(SlawError::corrupt("numeric unit size disagrees with its personality"));
        }
        if ilk & ARRAY_FLAG != 0 {
            let breadth = ilk & BREADTH_MASK;
            let len = usize::try_from(bsize * breadth)
                .map_err(|_| SlawError::corrupt("numeric array too large"))?;
            let data = s
                .get(OCT..OCT + len)
                .ok_or(SlawError::corrupt("numeric array runs past end of buffer"))?;
            Ok(NumericParts { personality, breadth: Some(breadth), data })
        } else if bsize <= 4 {
            if (ilk & BREADTH_MASK) >> (8 * bsize) != 0 {
                return Err(SlawError::corrupt("stray bits in numeric header"));
            }
            Ok(NumericParts { personality, breadth: None, data: &s[special_range(bsize as usize)] })
        } else if ilk & BREADTH_MASK != 0 {
            Err(SlawError::corrupt("stray bits in numeric header"))
        } else {
            let data = s
                .get(OCT..OCT + bsize as usize)
                .ok_or(SlawError::corrupt("numeric runs past end of buffer"))?;
            Ok(NumericParts { personality, breadth: None, data })
        }
    }

    fn protein_parts<'a>(&self, s: &'a [u8]) -> Result<ProteinParts<'a>> {
        let (_, end, flags) = self.protein_header(s)?;
        if flags & NONSTD_FLAG != 0 {
            return Ok(ProteinParts { nonstandard: true, descrips: None, ingests: None, rude: &[] });
        }
        let mut at = 2 * OCT;
        let mut descrips = None;
        let mut ingests = None;
        if flags & DESCRIPS_FLAG != 0 {
            let d = self.protein_child(s, at, end)?;
            at += d.len();
            descrips = Some(d);
        }
        if flags & INGESTS_FLAG != 0 {
            let i = self.protein_child(s, at, end)?;
            at += i.len();
            ingests = Some(i);
        }
        let rude = if flags & VERY_RUDE_FLAG != 0 {
            let len = usize::try_from(flags & VERY_RUDE_LEN_MASK)
                .map_err(|_| SlawError::CorruptProtein { context: "rude data too large" })?;
            let rude = at
                .checked_add(len)
                .filter(|&e| e <= end)
                .and_then(|e| s.get(at..e))
                .ok_or(SlawError::CorruptProtein { context: "rude data overruns the protein" })?;
            at += rude.len().next_multiple_of(OCT);
            rude
        } else {
            let n = ((flags >> WEE_RUDE_SHIFTY) & 7) as usize;
            let r = special_range(n);
            &s[OCT + r.start..OCT + r.end]
        };
        if at != end {
            return Err(SlawError::CorruptProtein { context: "protein parts do not fill its length" });
        }
        Ok(ProteinParts { nonstandard: false, descrips, ingests, rude })
    }

    fn is_protein(&self, s: &[u8]) -> bool {
        header(s).is_ok_and(|ilk| ilk & PROTEIN_MASK == PROTEIN_TAG)
    }

    fn is_swapped_protein(&self, s: &[u8]) -> bool {
        header(s).is_ok_and(|ilk| ilk & PROTEIN_MASK == SWAPPED_PROTEIN_TAG)
    }

    fn swap(&self, s: &mut [u8], direction: SwapDirection) -> Result<()> {
        let stop = s.len();
        swap_one(s, 0, stop, direction, 0).map(|_| ())
    }

    fn encode_nil(&self) -> Result<Vec<u8>> {
        let mut w = Writer::with_len(OCT)?;
        w.write_u64(NIL_ILK)?;
        Ok(w.into_bytes())
    }

    fn encode_boolean(&self, v: bool) -> Result<Vec<u8>> {
        let mut w = Writer::with_len(OCT)?;
        w.write_u64(FALSE_ILK | u64::from(v))?;
        Ok(w.into_bytes())
    }

    fn encode_string(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let len = bytes.len() as u64;
        if bytes.len() < OCT - 1 {
            let mut w = Writer::with_len(OCT)?;
            let ilk = (NIB_WEE_STRING << NIB_SHIFTY) | ((len + 1) << COUNT_SHIFTY);
            // the terminator is the zero byte just past the string
            let mut with_nul = [0u8; OCT - 1];
            with_nul[..bytes.len()].copy_from_slice(bytes);
            w.write_u64(ilk | special_oct(&with_nul[..bytes.len() + 1]))?;
            return Ok(w.into_bytes());
        }
        let term = len + 1;
        let padded = round_up(term, OCT as u64);
        let pad = padded - term;
        let octs = padded / OCT as u64 + 1;
        if octs > LEN_MASK {
            return Err(SlawError::TooLarge { field: "string", len, max: LEN_MASK * OCT as u64 });
        }
        let mut w = Writer::with_len(octs_to_bytes(octs)?)?;
        w.write_u64((NIB_FULL_STRING << NIB_SHIFTY) | (pad << COUNT_SHIFTY) | octs)?;
        w.write_bytes(bytes)?;
        Ok(w.into_bytes())
    }

    fn encode_cons(&self, car: &[u8], cdr: &[u8]) -> Result<Vec<u8>> {
        encode_container(NIB_CONS, &[car, cdr])
    }

    fn encode_list(&self, items: &[&[u8]], is_map: bool) -> Result<Vec<u8>> {
        encode_container(if is_map { NIB_MAP } else { NIB_LIST }, items)
    }

    fn encode_numeric(&self, personality: Personality, breadth: Option<u64>, data: &[u8]) -> Result<Vec<u8>> {
        check_numeric_len(&personality, breadth, data)?;
        let unit = personality.unit_bytes();
        match breadth {
            Some(b) => {
                if b > BREADTH_MASK {
                    return Err(SlawError::TooLarge { field: "array breadth", len: b, max: BREADTH_MASK });
                }
                let octs = 1 + (data.len() as u64).div_ceil(OCT as u64);
                let mut w = Writer::with_len(octs_to_bytes(octs)?)?;
                w.write_u64(numeric_ilk(&personality, true) | b)?;
                w.write_bytes(data)?;
                Ok(w.into_bytes())
            }
            None if unit <= 4 => {
                let mut w = Writer::with_len(OCT)?;
                w.write_u64(numeric_ilk(&personality, false) | special_oct(data))?;
                Ok(w.into_bytes())
            }
            None => {
                let octs = 1 + (unit as u64).div_ceil(OCT as u64);
                let mut w = Writer::with_len(octs_to_bytes(octs)?)?;
                w.write_u64(numeric_ilk(&personality, false))?;
                w.write_bytes(data)?;
                Ok(w.into_bytes())
            }
        }
    }

    fn encode_protein(&self, descrips: Option<&[u8]>, ingests: Option<&[u8]>, rude: &[u8]) -> Result<Vec<u8>> {
        let od = descrips.map(check_octs).transpose()?.unwrap_or(0);
        let oi = ingests.map(check_octs).transpose()?.unwrap_or(0);
        let rude_len = rude.len() as u64;
        if rude_len > VERY_RUDE_LEN_MASK {
            return Err(SlawError::TooLarge { field: "rude data", len: rude_len, max: VERY_RUDE_LEN_MASK });
        }
        let wee = rude.len() <= WEE_RUDE_MAX;
        let orude = if wee { 0 } else { rude_len.div_ceil(OCT as u64) };
        let octs = [od, oi, orude]
            .iter()
            .try_fold(2u64, |acc, &n| acc.checked_add(n))
            .filter(|&n| n < PROTEIN_MAX_OCTLEN)
            .ok_or(SlawError::TooLarge { field: "protein octs", len: u64::MAX, max: PROTEIN_MAX_OCTLEN - 1 })?;

        let ilk = PROTEIN_TAG | (octs & 0xf) | ((octs & !0xf) << 4);
        let mut flags = 0;
        if descrips.is_some() {
            flags |= DESCRIPS_FLAG;
        }
        if ingests.is_some() {
            flags |= INGESTS_FLAG;
        }
        if wee {
            flags |= (rude_len << WEE_RUDE_SHIFTY) | special_oct(rude);
        } else {
            flags |= VERY_RUDE_FLAG | rude_len;
        }

        let mut w = Writer::with_len(octs_to_bytes(octs)?)?;
        w.write_u64(ilk)?;
        w.write_u64(flags)?;
        if let Some(d) = descrips {
            w.write_bytes(d)?;
        }
        if let Some(i) = ingests {
            w.write_bytes(i)?;
        }
        if !wee {
            w.write_bytes(rude)?;
        }
        Ok(w.into_bytes())
    }
}

// =============================================================================
// ENDIAN SWAP
// =============================================================================

/// Swaps the slaw at `at`, which must end by `stop`. Returns its end offset.
fn swap_one(buf: &mut [u8], at: usize, stop: usize, direction: SwapDirection, depth: usize) -> Result<usize> {
    if depth > MAX_NESTING_DEPTH {
        return Err(SlawError::corrupt("slaw nesting too deep"));
    }
    let (rd, wr) = direction.flags();
    let ilk = load_u64(buf, at, rd, "truncated slaw header")?;
    let octs = octlen(ilk);
    if octs == 0 {
        return Err(SlawError::unidentified("v2 slaw header"));
    }
    let end = at
        .checked_add(octs_to_bytes(octs)?)
        .filter(|&e| e <= stop)
        .ok_or(SlawError::corrupt("slaw overruns its container"))?;

    let nib = nibble(ilk);
    let bsize = numeric_bsize(ilk);
    let fixed = match nib {
        NIB_WEE_STRING => reswap_special_bytes(ilk, ((ilk >> COUNT_SHIFTY) & 7) as u32),
        8..=10 if bsize <= 4 => match (ilk >> SIZE_SHIFTY) & 3 {
            0 => reswap_special_bytes(ilk, bsize as u32),
            1 if bsize == 4 => reswap_special_u16s(ilk),
            1 | 2 => ilk,
            _ => return Err(SlawError::corrupt("64-bit numeric packed into a header")),
        },
        NIB_PROTEIN | NIB_SYMBOL | NIB_LIST | NIB_MAP | NIB_CONS | NIB_FULL_STRING | 8..=10 | 12..=14 => ilk,
        0 => return Err(SlawError::CorruptProtein { context: "protein header has the wrong byte order" }),
        _ => return Err(SlawError::unidentified("v2 slaw header")),
    };
    store_u64(buf, at, fixed, wr)?;

    match nib {
        NIB_LIST | NIB_MAP | NIB_CONS => {
            let mut p = at + OCT;
            if (ilk >> COUNT_SHIFTY) & 0xf == MAX_WEE_CONTAINER {
                let count = load_u64(buf, p, rd, "truncated list count")?;
                store_u64(buf, p, count, wr)?;
                p += OCT;
            }
            while p < end {
                p = swap_one(buf, p, end, direction, depth + 1)?;
            }
        }
        8..=10 | 12..=14 if !(nib <= 10 && bsize <= 4) => {
            let prim = 1usize << ((ilk >> SIZE_SHIFTY) & 3);
            let units = if nib >= 12 { ilk & BREADTH_MASK } else { 1 };
            let len = usize::try_from(bsize * units).map_err(|_| SlawError::corrupt("numeric too large"))?;
            let data = buf
                .get_mut(at + OCT..at + OCT + len)
                .ok_or(SlawError::corrupt("numeric runs past end of buffer"))?;
            swap_prims(data, prim);
        }
        NIB_PROTEIN => {
            if end < at + 2 * OCT {
                return Err(SlawError::CorruptProtein { context: "protein shorter than its header" });
            }
            let flags = load_u64(buf, at + OCT, rd, "truncated protein header")?;
            let fixed_flags = if flags & VERY_RUDE_FLAG == 0 {
                reswap_special_bytes(flags, ((flags >> WEE_RUDE_SHIFTY) & 7) as u32)
            } else {
                flags
            };
            store_u64(buf, at + OCT, fixed_flags, wr)?;
            if flags & NONSTD_FLAG == 0 {
                let parts = usize::from(flags & DESCRIPS_FLAG != 0) + usize::from(flags & INGESTS_FLAG != 0);
                let mut p = at + 2 * OCT;
                for _ in 0..parts {
                    p = swap_one(buf, p, end, direction, depth + 1)?;
                }
            }
        }
        _ => {}
    }
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Primitive;

    fn nat(v: u64) -> [u8; 8] {
        v.to_ne_bytes()
    }

    #[test]
    fn test_nil_and_booleans() {
        assert_eq!(V2.encode_nil().unwrap(), nat(0x2000_0000_0000_0002));
        assert_eq!(V2.encode_boolean(true).unwrap(), nat(0x2000_0000_0000_0001));
        let f = V2.encode_boolean(false).unwrap();
        assert_eq!(V2.slaw_type(&f), SlawType::Boolean);
        assert!(!V2.boolean_value(&f).unwrap());
        assert_eq!(V2.slaw_type(&V2.encode_nil().unwrap()), SlawType::Nil);
        assert_eq!(V2.slaw_type(&nat(0x2000_0000_0000_0007)), SlawType::Unknown);
    }

    #[test]
    fn test_wee_string_layout() {
        let s = V2.encode_string(b"abc").unwrap();
        assert_eq!(s.len(), 8);
        let ilk = u64::from_ne_bytes(s[..8].try_into().unwrap());
        let expected: u64 = if cfg!(target_endian = "little") { 0x3400_0000_0063_6261 } else { 0x3400_0000_6162_6300 };
        assert_eq!(ilk, expected);
        assert_eq!(V2.string_bytes(&s).unwrap(), b"abc");
        assert_eq!(V2.string_bytes(&V2.encode_string(b"").unwrap()).unwrap(), b"");
        assert_eq!(V2.string_bytes(&V2.encode_string(b"sixsix").unwrap()).unwrap(), b"sixsix");
    }

    #[test]
    fn test_full_string_layout() {
        let s = V2.encode_string(b"seven!!").unwrap();
        // 8 bytes with terminator: one payload oct, no pad
        assert_eq!(s.len(), 16);
        let ilk = u64::from_ne_bytes(s[..8].try_into().unwrap());
        assert_eq!(ilk, 0x7000_0000_0000_0002);
        assert_eq!(V2.string_bytes(&s).unwrap(), b"seven!!");

        let long = V2.encode_string(b"hello, world").unwrap();
        let ilk = u64::from_ne_bytes(long[..8].try_into().unwrap());
        assert_eq!(ilk, 0x7300_0000_0000_0003);
        assert_eq!(V2.byte_len(&long).unwrap(), 24);
        assert_eq!(&long[8 + 12..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_wee_string_must_be_terminated_once() {
        let good = V2.encode_string(b"ab").unwrap();
        let at = special_range(3).start;

        let mut inner_nul = good.clone();
        inner_nul[at + 1] = 0;
        assert_eq!(V2.string_bytes(&inner_nul).unwrap_err(), SlawError::corrupt("string holds a zero byte"));

        let mut bad_term = good;
        bad_term[at + 2] = b'z';
        assert_eq!(
            V2.string_bytes(&bad_term).unwrap_err(),
            SlawError::corrupt("string terminator is not a zero byte")
        );
    }

    #[test]
    fn test_full_string_must_be_terminated_once() {
        let good = V2.encode_string(b"hello, world").unwrap();

        let mut inner_nul = good.clone();
        inner_nul[8 + 5] = 0;
        assert_eq!(V2.string_bytes(&inner_nul).unwrap_err().code(), crate::ErrorCode::CorruptSlaw);

        let mut bad_term = good.clone();
        bad_term[8 + 12] = b'!';
        assert_eq!(V2.string_bytes(&bad_term).unwrap_err().code(), crate::ErrorCode::CorruptSlaw);

        // padding after the terminator is not part of the text
        let mut dirty_pad = good;
        dirty_pad[8 + 14] = b'x';
        assert_eq!(V2.string_bytes(&dirty_pad).unwrap(), b"hello, world");
    }

    #[test]
    fn test_list_and_wee_count_limit() {
        let item = V2.encode_nil().unwrap();
        let items: Vec<&[u8]> = vec![&item; 14];
        let l = V2.encode_list(&items, false).unwrap();
        assert_eq!(l.len(), 8 * 15);
        let parts = V2.list_parts(&l).unwrap();
        assert_eq!(parts.count, 14);
        assert!(!parts.is_map);

        let items: Vec<&[u8]> = vec![&item; 15];
        let l = V2.encode_list(&items, true).unwrap();
        assert_eq!(l.len(), 8 * 17);
        let ilk = u64::from_ne_bytes(l[..8].try_into().unwrap());
        assert_eq!(ilk, 0x5f00_0000_0000_0011);
        let parts = V2.list_parts(&l).unwrap();
        assert_eq!(parts.count, 15);
        assert!(parts.is_map);
        assert_eq!(parts.body.len(), 8 * 15);
    }

    #[test]
    fn test_cons_parts() {
        let a = V2.encode_string(b"key").unwrap();
        let b = V2.encode_boolean(true).unwrap();
        let c = V2.encode_cons(&a, &b).unwrap();
        let ilk = u64::from_ne_bytes(c[..8].try_into().unwrap());
        assert_eq!(ilk, 0x6200_0000_0000_0003);
        assert_eq!(V2.slaw_type(&c), SlawType::Cons);
        let (car, cdr) = V2.cons_parts(&c).unwrap();
        assert_eq!(car, &a[..]);
        assert_eq!(cdr, &b[..]);
    }

    #[test]
    fn test_numeric_singletons() {
        let mut data = Vec::new();
        (-5i32).write_ne(&mut data);
        let n = V2.encode_numeric(Personality::of::<i32>(), None, &data).unwrap();
        assert_eq!(n.len(), 8);
        let ilk = u64::from_ne_bytes(n[..8].try_into().unwrap());
        assert_eq!(ilk >> 32, 0x8800_c000);
        let parts = V2.numeric_parts(&n).unwrap();
        assert_eq!(parts.data, &data[..]);
        assert_eq!(parts.breadth, None);

        let mut data = Vec::new();
        1.5f64.write_ne(&mut data);
        let n = V2.encode_numeric(Personality::of::<f64>(), None, &data).unwrap();
        assert_eq!(n.len(), 16);
        assert_eq!(V2.numeric_parts(&n).unwrap().data, &data[..]);
    }

    #[test]
    fn test_numeric_array() {
        let mut data = Vec::new();
        for v in [1u8, 2, 3, 4, 5] {
            v.write_ne(&mut data);
        }
        let p = Personality::of::<u8>();
        let n = V2.encode_numeric(p, Some(5), &data).unwrap();
        assert_eq!(n.len(), 16);
        let parts = V2.numeric_parts(&n).unwrap();
        assert_eq!(parts.breadth, Some(5));
        assert_eq!(parts.data, &data[..]);
        assert_eq!(&n[13..], &[0, 0, 0]);

        let empty = V2.encode_numeric(p, Some(0), &[]).unwrap();
        assert_eq!(empty.len(), 8);
        assert_eq!(V2.numeric_parts(&empty).unwrap().breadth, Some(0));

        assert!(V2.encode_numeric(p, Some(4), &data).is_err());
    }

    #[test]
    fn test_numeric_unit_size_mismatch() {
        // int32 personality claiming an 8-byte unit
        let ilk: u64 = 0x8800_0000_0000_0000 | (7 << 46);
        let mut buf = nat(ilk).to_vec();
        buf.extend_from_slice(&[0; 8]);
        assert_eq!(V2.numeric_parts(&buf).unwrap_err(), SlawError::corrupt("numeric unit size disagrees with its personality"));
    }

    #[test]
    fn test_unsigned_float_is_unidentified() {
        let ilk: u64 = 0xb800_0000_0000_0000 | (3 << 46);
        assert_eq!(V2.slaw_type(&nat(ilk)), SlawType::Unknown);
        assert!(matches!(V2.numeric_parts(&nat(ilk)), Err(SlawError::UnidentifiedSlaw { .. })));
    }

    #[test]
    fn test_protein_layout_wee_rude() {
        let p = V2.encode_protein(None, None, &[1, 2, 3]).unwrap();
        assert_eq!(p.len(), 16);
        let ilk = u64::from_ne_bytes(p[..8].try_into().unwrap());
        assert_eq!(ilk, 0x1000_0000_0000_0002);
        let parts = V2.protein_parts(&p).unwrap();
        assert_eq!(parts.rude, &[1, 2, 3]);
        assert!(parts.descrips.is_none() && parts.ingests.is_none());
    }

    #[test]
    fn test_protein_layout_very_rude() {
        let d = V2.encode_list(&[], false).unwrap();
        let rude: Vec<u8> = (0..20).collect();
        let p = V2.encode_protein(Some(&d), None, &rude).unwrap();
        // header + flags + descrips + 3 rude octs
        assert_eq!(p.len(), 8 * 6);
        let parts = V2.protein_parts(&p).unwrap();
        assert_eq!(parts.descrips, Some(&d[..]));
        assert_eq!(parts.rude, &rude[..]);
        assert_eq!(&p[p.len() - 4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_protein_with_trailing_octs_is_corrupt() {
        let d = V2.encode_list(&[], false).unwrap();
        let p = V2.encode_protein(Some(&d), None, &[9]).unwrap();
        assert_eq!(p.len(), 24);

        // claim one more oct than the parts use
        let mut padded = p.clone();
        padded[..8].copy_from_slice(&nat(PROTEIN_TAG | 4));
        padded.extend_from_slice(&[0; 8]);
        assert_eq!(
            V2.protein_parts(&padded).unwrap_err(),
            SlawError::CorruptProtein { context: "protein parts do not fill its length" }
        );

        let rude: Vec<u8> = (0..9).collect();
        let mut p = V2.encode_protein(None, None, &rude).unwrap();
        assert_eq!(p.len(), 32);
        p[..8].copy_from_slice(&nat(PROTEIN_TAG | 5));
        p.extend_from_slice(&[0; 8]);
        assert!(matches!(V2.protein_parts(&p), Err(SlawError::CorruptProtein { .. })));
    }

    #[test]
    fn test_numeric_singleton_stray_bits() {
        let mut data = Vec::new();
        7i16.write_ne(&mut data);
        let n = V2.encode_numeric(Personality::of::<i16>(), None, &data).unwrap();
        let ilk = u64::from_ne_bytes(n[..8].try_into().unwrap());
        assert_eq!(V2.numeric_parts(&n).unwrap().data, &data[..]);

        let stray = nat(ilk | (1 << 20));
        assert_eq!(V2.numeric_parts(&stray).unwrap_err(), SlawError::corrupt("stray bits in numeric header"));

        let mut data = Vec::new();
        2.5f64.write_ne(&mut data);
        let mut n = V2.encode_numeric(Personality::of::<f64>(), None, &data).unwrap();
        let ilk = u64::from_ne_bytes(n[..8].try_into().unwrap());
        n[..8].copy_from_slice(&nat(ilk | 1));
        assert!(V2.numeric_parts(&n).is_err());
    }

    #[test]
    fn test_long_protein_length_split() {
        // octlen of 0x123 spreads over the low nibble and bits 8 and up
        assert_eq!(protein_octlen(PROTEIN_TAG | 0x3 | (0x120 << 4)), 0x123);
    }

    #[test]
    fn test_truncated_inputs() {
        let s = V2.encode_string(b"a long enough string").unwrap();
        assert!(V2.slaw_at(&s[..16]).is_err());
        assert_eq!(V2.slaw_type(&[]), SlawType::Null);
        assert_eq!(V2.slaw_type(&[1, 2, 3]), SlawType::Unknown);
        assert!(matches!(V2.byte_len(&nat(0xb000_0000_0000_0000)), Err(SlawError::UnidentifiedSlaw { .. })));
    }

    #[test]
    fn test_swap_roundtrip_all_kinds() {
        let s = V2.encode_string(b"xy").unwrap();
        let long = V2.encode_string(b"a string that is long").unwrap();
        let mut i16s = Vec::new();
        for v in [1i16, -300] {
            v.write_ne(&mut i16s);
        }
        let v2i16 = Personality::of::<i16>().with_shape(Shape::Vector(2)).unwrap();
        let n = V2.encode_numeric(v2i16, None, &i16s).unwrap();
        let mut u8s = Vec::new();
        for v in [7u8, 8, 9] {
            v.write_ne(&mut u8s);
        }
        let v3u8 = Personality::of::<u8>().with_shape(Shape::Vector(3)).unwrap();
        let b = V2.encode_numeric(v3u8, None, &u8s).unwrap();
        let mut f64s = Vec::new();
        for v in [1.0f64, 2.0, 3.0] {
            v.write_ne(&mut f64s);
        }
        let arr = V2.encode_numeric(Personality::of::<f64>(), Some(3), &f64s).unwrap();
        let c = V2.encode_cons(&s, &n).unwrap();
        let list = V2.encode_list(&[&c, &long, &b, &arr], false).unwrap();
        let prot = V2.encode_protein(Some(&list), Some(&c), b"rude!").unwrap();

        let mut buf = prot.clone();
        V2.swap(&mut buf, SwapDirection::ToForeign).unwrap();
        assert_ne!(buf, prot);
        assert!(V2.is_swapped_protein(&buf));
        V2.swap(&mut buf, SwapDirection::ToNative).unwrap();
        assert_eq!(buf, prot);
    }

    #[test]
    fn test_swap_hand_built_foreign_wee_rude() {
        // header 0x1000000000000002; flags: wee rude length 3, bytes "abc"
        let big: [u8; 16] = [0x10, 0, 0, 0, 0, 0, 0, 2, 3, 0, 0, 0, 0, b'a', b'b', b'c'];
        let little: [u8; 16] = [2, 0, 0, 0, 0, 0, 0, 0x10, b'a', b'b', b'c', 0, 0, 0, 0, 3];
        let (native, foreign) = if cfg!(target_endian = "little") { (little, big) } else { (big, little) };

        assert_eq!(V2.encode_protein(None, None, b"abc").unwrap(), native);
        let mut buf = foreign.to_vec();
        assert!(V2.is_swapped_protein(&buf));
        V2.swap(&mut buf, SwapDirection::ToNative).unwrap();
        assert_eq!(buf, native);
        assert_eq!(V2.protein_parts(&buf).unwrap().rude, b"abc");

        let mut back = native.to_vec();
        V2.swap(&mut back, SwapDirection::ToForeign).unwrap();
        assert_eq!(back, foreign);
    }

    #[test]
    fn test_fix_endian() {
        let p = V2.encode_protein(None, None, b"hi").unwrap();
        let mut foreign = p.clone();
        V2.swap(&mut foreign, SwapDirection::ToForeign).unwrap();
        V2.fix_endian(&mut foreign).unwrap();
        assert_eq!(foreign, p);

        let mut native = p.clone();
        V2.fix_endian(&mut native).unwrap();
        assert_eq!(native, p);

        let mut nil = V2.encode_nil().unwrap();
        assert!(matches!(V2.fix_endian(&mut nil), Err(SlawError::CorruptProtein { .. })));
    }

    #[test]
    fn test_swap_rejects_overrun() {
        let s = V2.encode_string(b"long enough string").unwrap();
        let items: Vec<&[u8]> = vec![&s];
        let mut l = V2.encode_list(&items, false).unwrap();
        // claim one oct fewer than the child needs
        let ilk = u64::from_ne_bytes(l[..8].try_into().unwrap()) - 1;
        l[..8].copy_from_slice(&ilk.to_ne_bytes());
        let len = l.len() - 8;
        assert!(matches!(
            V2.swap(&mut l[..len], SwapDirection::ToForeign),
            Err(SlawError::CorruptSlaw { .. })
        ));
    }
}
