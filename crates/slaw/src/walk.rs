//! Event-driven traversal.
//!
//! [`walk`] decomposes an encoded slaw into a stream of begin/end/handle
//! events delivered to a [`SlawHandler`]. Any codec can drive it, and the
//! handler never sees header bits, so the same handler works for every wire
//! version. The fabricator ([`crate::fabricate`]) and the overview printer
//! ([`crate::spew`]) are both handlers.
//!
//! Numeric values arrive as primitives bracketed by shape events:
//!
//! - a singleton real scalar is a single `handle_int`/`handle_unt`/`handle_float`
//! - vectors, multivectors and complex units are wrapped in their begin/end pair
//!   (complex vectors nest one complex pair per component)
//! - arrays wrap their units in `begin_array`/`end_array`, except that an
//!   empty array is a single `handle_empty_array`
//!
//! A handler error aborts the walk and is returned unchanged.

use crate::codec::{Children, SlawCodec};
use crate::error::{Result, SlawError};
use crate::limits::MAX_NESTING_DEPTH;
use crate::model::{read_component, Component, NumericClass, Personality, Shape, SlawType};

/// Receives traversal events. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait SlawHandler {
    fn handle_nil(&mut self) -> Result<()> {
        Ok(())
    }

    fn handle_boolean(&mut self, value: bool) -> Result<()> {
        Ok(())
    }

    fn handle_string(&mut self, value: &str) -> Result<()> {
        Ok(())
    }

    fn handle_int(&mut self, value: i64, bits: u8) -> Result<()> {
        Ok(())
    }

    fn handle_unt(&mut self, value: u64, bits: u8) -> Result<()> {
        Ok(())
    }

    fn handle_float(&mut self, value: f64, bits: u8) -> Result<()> {
        Ok(())
    }

    /// A zero-breadth array; there are no units to describe its shape.
    fn handle_empty_array(&mut self, personality: Personality) -> Result<()> {
        Ok(())
    }

    fn begin_cons(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_cons(&mut self) -> Result<()> {
        Ok(())
    }

    /// `len` is the element count the header declares.
    fn begin_list(&mut self, len: u64) -> Result<()> {
        Ok(())
    }

    fn end_list(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_map(&mut self, len: u64) -> Result<()> {
        Ok(())
    }

    fn end_map(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_array(&mut self, personality: Personality, breadth: u64) -> Result<()> {
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_vector(&mut self, dims: u8) -> Result<()> {
        Ok(())
    }

    fn end_vector(&mut self) -> Result<()> {
        Ok(())
    }

    /// `dims` is the dimension of the space; `2^dims` coefficients follow.
    fn begin_multivector(&mut self, dims: u8) -> Result<()> {
        Ok(())
    }

    fn end_multivector(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_complex(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_complex(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_protein(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_protein(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_descrips(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_descrips(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_ingests(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_ingests(&mut self) -> Result<()> {
        Ok(())
    }

    fn handle_rude_data(&mut self, rude: &[u8]) -> Result<()> {
        Ok(())
    }

    /// A nonstandard protein, as its complete encoding.
    fn handle_nonstd_protein(&mut self, raw: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Walks the slaw at the start of `s`, which is encoded with `codec`.
pub fn walk<H: SlawHandler + ?Sized>(codec: &dyn SlawCodec, s: &[u8], handler: &mut H) -> Result<()> {
    let s = codec.slaw_at(s)?;
    walk_one(codec, s, handler, 0)
}

/// Checks that `s` is exactly one well-formed slaw: lengths and counts
/// agree, every child fits, every kind is known, strings are UTF-8 and
/// nesting is bounded.
pub fn validate(codec: &dyn SlawCodec, s: &[u8]) -> Result<()> {
    if s.is_empty() {
        return Err(SlawError::corrupt("empty buffer"));
    }
    if codec.byte_len(s)? != s.len() {
        return Err(SlawError::corrupt("buffer length disagrees with slaw length"));
    }
    walk_one(codec, s, &mut Validator, 0)
}

/// True when `s` starts with a string whose text is valid UTF-8.
///
/// Validation already rejects bad text; this answers the question for raw
/// buffers without validating the rest of the slaw.
pub fn string_is_valid_utf8(codec: &dyn SlawCodec, s: &[u8]) -> bool {
    codec.slaw_type(s) == SlawType::String && codec.string_bytes(s).is_ok_and(|b| std::str::from_utf8(b).is_ok())
}

struct Validator;

impl SlawHandler for Validator {}

fn walk_one<H: SlawHandler + ?Sized>(codec: &dyn SlawCodec, s: &[u8], h: &mut H, depth: usize) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(SlawError::corrupt("slaw nests too deeply"));
    }
    match codec.slaw_type(s) {
        SlawType::Nil => h.handle_nil(),
        SlawType::Boolean => h.handle_boolean(codec.boolean_value(s)?),
        SlawType::String => {
            let bytes = codec.string_bytes(s)?;
            let text = std::str::from_utf8(bytes).map_err(|_| SlawError::corrupt("string is not valid UTF-8"))?;
            h.handle_string(text)
        }
        SlawType::Cons => {
            let (car, cdr) = codec.cons_parts(s)?;
            h.begin_cons()?;
            walk_one(codec, car, h, depth + 1)?;
            walk_one(codec, cdr, h, depth + 1)?;
            h.end_cons()
        }
        SlawType::List => {
            let parts = codec.list_parts(s)?;
            if parts.is_map {
                h.begin_map(parts.count)?;
            } else {
                h.begin_list(parts.count)?;
            }
            let mut seen = 0u64;
            for child in Children::new(codec, parts.body) {
                walk_one(codec, child?, h, depth + 1)?;
                seen += 1;
            }
            if seen != parts.count {
                return Err(SlawError::corrupt("list count disagrees with its elements"));
            }
            if parts.is_map { h.end_map() } else { h.end_list() }
        }
        SlawType::Numeric => walk_numeric(codec, s, h),
        SlawType::Protein => {
            let p = codec.protein_parts(s)?;
            if p.nonstandard {
                return h.handle_nonstd_protein(s);
            }
            h.begin_protein()?;
            if let Some(d) = p.descrips {
                h.begin_descrips()?;
                walk_one(codec, d, h, depth + 1)?;
                h.end_descrips()?;
            }
            if let Some(i) = p.ingests {
                h.begin_ingests()?;
                walk_one(codec, i, h, depth + 1)?;
                h.end_ingests()?;
            }
            if !p.rude.is_empty() {
                h.handle_rude_data(p.rude)?;
            }
            h.end_protein()
        }
        SlawType::Null | SlawType::Unknown => Err(SlawError::unidentified("slaw header")),
    }
}

// =============================================================================
// NUMERICS
// =============================================================================

fn walk_numeric<H: SlawHandler + ?Sized>(codec: &dyn SlawCodec, s: &[u8], h: &mut H) -> Result<()> {
    let parts = codec.numeric_parts(s)?;
    let p = parts.personality;
    match parts.breadth {
        None => emit_unit(&p, parts.data, h),
        Some(0) => h.handle_empty_array(p),
        Some(breadth) => {
            h.begin_array(p, breadth)?;
            for unit in parts.data.chunks_exact(p.unit_bytes()) {
                emit_unit(&p, unit, h)?;
            }
            h.end_array()
        }
    }
}

fn emit_unit<H: SlawHandler + ?Sized>(p: &Personality, unit: &[u8], h: &mut H) -> Result<()> {
    let width = p.prim_bytes();
    let prim = |i: usize, h: &mut H| -> Result<()> {
        let bytes = unit
            .get(i * width..(i + 1) * width)
            .ok_or(SlawError::corrupt("numeric unit shorter than its personality"))?;
        emit_prim(p.class(), p.bits(), bytes, h)
    };
    let complex_pair = |i: usize, h: &mut H| -> Result<()> {
        h.begin_complex()?;
        prim(2 * i, h)?;
        prim(2 * i + 1, h)?;
        h.end_complex()
    };
    match p.shape() {
        Shape::Scalar if p.is_complex() => complex_pair(0, h),
        Shape::Scalar => prim(0, h),
        Shape::Vector(n) => {
            h.begin_vector(n)?;
            for i in 0..n as usize {
                if p.is_complex() {
                    complex_pair(i, h)?;
                } else {
                    prim(i, h)?;
                }
            }
            h.end_vector()
        }
        Shape::Multivector(n) => {
            h.begin_multivector(n)?;
            for i in 0..p.dims() {
                prim(i, h)?;
            }
            h.end_multivector()
        }
    }
}

fn emit_prim<H: SlawHandler + ?Sized>(class: NumericClass, bits: u8, bytes: &[u8], h: &mut H) -> Result<()> {
    match read_component(class, bits, bytes) {
        Some(Component::Int(v)) => h.handle_int(v, bits),
        Some(Component::Unt(v)) => h.handle_unt(v, bits),
        Some(Component::Float(v)) => h.handle_float(v, bits),
        None => Err(SlawError::corrupt("numeric primitive has an impossible width")),
    }
}
