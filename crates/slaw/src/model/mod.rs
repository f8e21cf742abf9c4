//! Value model.
//!
//! This module contains the types callers build and inspect slawx with:
//! - [`Slaw`] and its borrowed view [`SlawRef`] (kinds via [`SlawKind`])
//! - Numeric personalities and typed access ([`Personality`], [`NumericRef`])
//! - Lists, maps and their search helpers ([`ListRef`])
//! - Proteins ([`ProteinRef`])
//! - The mutable builder ([`Slabu`])

pub mod coerce;
pub mod numeric;
pub mod protein;
pub mod slabu;
pub mod slaw;

pub use numeric::{Component, NumericClass, NumericRef, Personality, Primitive, Shape};
pub use protein::{fix_endian, swap_endian, ProteinRef};
pub use slabu::Slabu;
pub use slaw::{ListRef, Slaw, SlawKind, SlawRef};

pub(crate) use numeric::{read_component, write_float, write_int, write_unt};

/// Coarse kind of an encoded slaw, in semantic ordering priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlawType {
    /// Empty buffer.
    Null,
    Nil,
    Boolean,
    String,
    Numeric,
    Cons,
    /// List or map.
    List,
    Protein,
    /// Header outside the known kind set.
    Unknown,
}
