//! Semantic total order over encoded slawx.
//!
//! Kinds order as null, nil, boolean, string, numeric, cons, list/map,
//! protein, unknown. Within a kind:
//!
//! - booleans: false before true
//! - strings: byte-wise
//! - numerics: personality, then singletons before arrays, then breadth,
//!   then primitive by primitive (floats by IEEE total order)
//! - conses: car, then cdr
//! - lists before maps, then element by element, a prefix before its
//!   extensions
//! - proteins: standard before nonstandard; standard by descrips, ingests,
//!   then rude data (length first); nonstandard by length, then bytes
//!
//! A part that fails to decode falls back to byte order, so the result is
//! always a total order.

use std::cmp::Ordering;

use crate::codec::{v2::personality_key, Children, SlawCodec};
use crate::model::{read_component, Component, SlawType};

/// Compares two slawx encoded with `codec`.
pub fn compare(codec: &dyn SlawCodec, a: &[u8], b: &[u8]) -> Ordering {
    let (ta, tb) = (codec.slaw_type(a), codec.slaw_type(b));
    if ta != tb {
        return ta.cmp(&tb);
    }
    let by_kind = match ta {
        SlawType::Null | SlawType::Nil => Some(Ordering::Equal),
        SlawType::Boolean => match (codec.boolean_value(a), codec.boolean_value(b)) {
            (Ok(x), Ok(y)) => Some(x.cmp(&y)),
            _ => None,
        },
        SlawType::String => match (codec.string_bytes(a), codec.string_bytes(b)) {
            (Ok(x), Ok(y)) => Some(x.cmp(y)),
            _ => None,
        },
        SlawType::Numeric => compare_numeric(codec, a, b),
        SlawType::Cons => match (codec.cons_parts(a), codec.cons_parts(b)) {
            (Ok((car_a, cdr_a)), Ok((car_b, cdr_b))) => {
                Some(compare(codec, car_a, car_b).then_with(|| compare(codec, cdr_a, cdr_b)))
            }
            _ => None,
        },
        SlawType::List => compare_list(codec, a, b),
        SlawType::Protein => compare_protein(codec, a, b),
        SlawType::Unknown => None,
    };
    by_kind.unwrap_or_else(|| a.cmp(b))
}

fn compare_numeric(codec: &dyn SlawCodec, a: &[u8], b: &[u8]) -> Option<Ordering> {
    let na = codec.numeric_parts(a).ok()?;
    let nb = codec.numeric_parts(b).ok()?;
    let pa = na.personality;
    let pb = nb.personality;
    let head = personality_key(&pa, false)
        .cmp(&personality_key(&pb, false))
        .then(na.breadth.is_some().cmp(&nb.breadth.is_some()))
        .then(na.breadth.cmp(&nb.breadth));
    if head != Ordering::Equal {
        return Some(head);
    }
    let width = pa.prim_bytes();
    for (x, y) in na.data.chunks_exact(width).zip(nb.data.chunks_exact(width)) {
        let ord = match (read_component(pa.class(), pa.bits(), x)?, read_component(pb.class(), pb.bits(), y)?) {
            (Component::Int(x), Component::Int(y)) => x.cmp(&y),
            (Component::Unt(x), Component::Unt(y)) => x.cmp(&y),
            (Component::Float(x), Component::Float(y)) => x.total_cmp(&y),
            _ => return None,
        };
        if ord != Ordering::Equal {
            return Some(ord);
        }
    }
    Some(Ordering::Equal)
}

fn compare_list(codec: &dyn SlawCodec, a: &[u8], b: &[u8]) -> Option<Ordering> {
    let la = codec.list_parts(a).ok()?;
    let lb = codec.list_parts(b).ok()?;
    if la.is_map != lb.is_map {
        return Some(la.is_map.cmp(&lb.is_map));
    }
    let mut xs = Children::new(codec, la.body);
    let mut ys = Children::new(codec, lb.body);
    loop {
        match (xs.next(), ys.next()) {
            (None, None) => return Some(Ordering::Equal),
            (None, Some(_)) => return Some(Ordering::Less),
            (Some(_), None) => return Some(Ordering::Greater),
            (Some(x), Some(y)) => {
                let ord = compare(codec, x.ok()?, y.ok()?);
                if ord != Ordering::Equal {
                    return Some(ord);
                }
            }
        }
    }
}

fn compare_protein(codec: &dyn SlawCodec, a: &[u8], b: &[u8]) -> Option<Ordering> {
    let pa = codec.protein_parts(a).ok()?;
    let pb = codec.protein_parts(b).ok()?;
    if pa.nonstandard || pb.nonstandard {
        return Some(
            pa.nonstandard
                .cmp(&pb.nonstandard)
                .then(a.len().cmp(&b.len()))
                .then_with(|| a.cmp(b)),
        );
    }
    let part = |x: Option<&[u8]>, y: Option<&[u8]>| match (x, y) {
        (Some(x), Some(y)) => compare(codec, x, y),
        (x, y) => x.is_some().cmp(&y.is_some()),
    };
    Some(
        part(pa.descrips, pb.descrips)
            .then_with(|| part(pa.ingests, pb.ingests))
            .then(pa.rude.len().cmp(&pb.rude.len()))
            .then_with(|| pa.rude.cmp(pb.rude)),
    )
}
