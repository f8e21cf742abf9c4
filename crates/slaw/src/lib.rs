//! Slaw: a self-describing binary value format.
//!
//! A slaw is one value in a compact, word-aligned binary layout that carries
//! its own type information: nil, booleans, UTF-8 strings, numerics (scalars,
//! vectors, multivectors, complex numbers and arrays of them), conses, lists,
//! maps and proteins (descrips + ingests + opaque rude data).
//!
//! # Overview
//!
//! - **Self-describing**: every value starts with a header word naming its kind
//!   and length, so a reader can skip what it does not understand
//! - **In-place**: a slaw is read directly from its bytes; nothing is parsed
//!   into an intermediate tree
//! - **Portable**: two wire versions and either byte order are accepted and
//!   normalized to the current native layout
//!
//! # Quick Start
//!
//! ```rust
//! use slaw::{Slabu, Slaw, SlawKind};
//!
//! let mut ingests = Slabu::new();
//! ingests.map_put(Slaw::string("x")?, Slaw::scalar(3i32)?)?;
//! ingests.map_put(Slaw::string("x")?, Slaw::scalar(4i32)?)?;
//!
//! let descrips = Slaw::list([&Slaw::string("pointer")?])?;
//! let p = Slaw::protein(Some(&descrips), Some(&ingests.into_map()?), b"")?;
//!
//! let view = p.view().protein().unwrap();
//! let x = view.ingests().unwrap().list().unwrap().get("x").unwrap();
//! assert_eq!(x.as_i64()?, 4);
//! assert!(matches!(view.descrips().unwrap().kind(), SlawKind::List(_)));
//! # Ok::<(), slaw::SlawError>(())
//! ```
//!
//! # Modules
//!
//! - [`model`]: Values, views, personalities, proteins and the [`Slabu`] builder
//! - [`codec`]: The v1 and v2 wire layouts behind the [`SlawCodec`] trait
//! - [`walk`]: Event-driven traversal and full validation
//! - [`fabricate`]: Building slawx from traversal events (transcoding)
//! - [`ordering`]: Semantic total order
//! - [`interop`]: Version and byte-order conversion
//! - [`io`]: Binary slaw streams and files
//! - [`spew`]: Human-readable overviews
//! - [`error`]: Error types
//! - [`limits`]: Format constants and safety limits
//!
//! # Security
//!
//! Decoding is safe on untrusted input:
//! - Every length, count and child is bounds-checked before use
//! - Nesting depth and stream record sizes are bounded
//! - Allocation failures are reported as errors rather than aborting
//!
//! # Wire Format
//!
//! Values in memory are always version 2 (8-byte words, native byte order).
//! Version 1 (4-byte words) and opposite-endian data are converted by
//! [`convert_from`] and produced by [`convert_to`].

pub mod codec;
pub mod error;
pub mod fabricate;
pub mod interop;
pub mod io;
pub mod limits;
pub mod model;
pub mod ordering;
pub mod spew;
pub mod walk;

// Re-export commonly used types at crate root
pub use codec::{SlawCodec, SwapDirection, V1, V2};
pub use error::{ErrorCode, Result, SlawError};
pub use fabricate::{fabricate, Fabricator};
pub use interop::{byte_length, convert_from, convert_to, Endian};
pub use io::{read_slaw_file, write_slaw_file, FileHeader, ReadOptions, SlawReader, SlawWriter, WriteOptions};
pub use model::{
    fix_endian, swap_endian, Component, ListRef, NumericClass, NumericRef, Personality, Primitive, ProteinRef, Shape,
    Slabu, Slaw, SlawKind, SlawRef, SlawType,
};
pub use spew::overview;
pub use walk::{string_is_valid_utf8, validate, walk, SlawHandler};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
