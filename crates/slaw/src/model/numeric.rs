//! Numeric personalities and typed element access.
//!
//! A numeric slaw is a singleton or an array of "units"; each unit is one
//! scalar, vector or multivector, real or complex, built from primitives of a
//! single class and width. [`Personality`] names that combination without
//! exposing any header bits.

use std::fmt;

use crate::error::{Result, SlawError};

/// Primitive number class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumericClass {
    Int,
    Unt,
    Float,
}

impl NumericClass {
    fn name(self) -> &'static str {
        match self {
            NumericClass::Int => "int",
            NumericClass::Unt => "unt",
            NumericClass::Float => "float",
        }
    }
}

/// Unit shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    /// Vector of 2 to 4 components.
    Vector(u8),
    /// Multivector over a 2 to 5 dimensional space (2^n coefficients).
    Multivector(u8),
}

/// Complete description of a numeric unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Personality {
    class: NumericClass,
    bits: u8,
    shape: Shape,
    complex: bool,
}

impl Personality {
    /// Validates and builds a personality.
    ///
    /// Widths are 8, 16, 32 or 64 bits; floats are 32 or 64 bits; vectors
    /// have 2 to 4 components and multivectors 2 to 5 dimensions; multivectors
    /// cannot be complex.
    pub fn new(class: NumericClass, bits: u8, shape: Shape, complex: bool) -> Result<Self> {
        if !matches!(bits, 8 | 16 | 32 | 64) {
            return Err(SlawError::RangeErr { context: "numeric width must be 8, 16, 32 or 64 bits" });
        }
        if class == NumericClass::Float && bits < 32 {
            return Err(SlawError::RangeErr { context: "floats are 32 or 64 bits" });
        }
        match shape {
            Shape::Scalar => {}
            Shape::Vector(n) if (2..=4).contains(&n) => {}
            Shape::Multivector(n) if (2..=5).contains(&n) => {
                if complex {
                    return Err(SlawError::RangeErr { context: "multivectors cannot be complex" });
                }
            }
            Shape::Vector(_) => {
                return Err(SlawError::RangeErr { context: "vector width must be 2 to 4" });
            }
            Shape::Multivector(_) => {
                return Err(SlawError::RangeErr { context: "multivector dimension must be 2 to 5" });
            }
        }
        Ok(Self { class, bits, shape, complex })
    }

    /// Real scalar personality for primitive type `T`.
    pub fn of<T: Primitive>() -> Self {
        Self { class: T::CLASS, bits: T::BITS, shape: Shape::Scalar, complex: false }
    }

    /// Same primitive with a different shape.
    pub fn with_shape(self, shape: Shape) -> Result<Self> {
        Self::new(self.class, self.bits, shape, self.complex)
    }

    /// Same primitive and shape, real or complex.
    pub fn with_complex(self, complex: bool) -> Result<Self> {
        Self::new(self.class, self.bits, self.shape, complex)
    }

    pub fn class(&self) -> NumericClass {
        self.class
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_complex(&self) -> bool {
        self.complex
    }

    /// Bytes per primitive.
    pub fn prim_bytes(&self) -> usize {
        usize::from(self.bits / 8)
    }

    /// Number of vector components or multivector coefficients (1 for scalars).
    pub fn dims(&self) -> usize {
        match self.shape {
            Shape::Scalar => 1,
            Shape::Vector(n) => usize::from(n),
            Shape::Multivector(n) => 1 << n,
        }
    }

    /// Primitives per unit, counting real and imaginary parts separately.
    pub fn components(&self) -> usize {
        self.dims() * if self.complex { 2 } else { 1 }
    }

    /// Bytes per unit.
    pub fn unit_bytes(&self) -> usize {
        self.components() * self.prim_bytes()
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            Shape::Scalar => {}
            Shape::Vector(n) => write!(f, "v{}", n)?,
            Shape::Multivector(n) => write!(f, "m{}", n)?,
        }
        write!(f, "{}{}", self.class.name(), self.bits)?;
        if self.complex {
            f.write_str("c")?;
        }
        Ok(())
    }
}

// =============================================================================
// PRIMITIVES
// =============================================================================

mod sealed {
    pub trait Sealed {}
}

/// A primitive number type that can appear inside a numeric slaw.
///
/// Implemented for `i8`..`i64`, `u8`..`u64`, `f32` and `f64`; sealed.
pub trait Primitive: Copy + PartialEq + fmt::Debug + sealed::Sealed {
    const CLASS: NumericClass;
    const BITS: u8;

    /// Appends the native-endian bytes of `self`.
    fn write_ne(self, out: &mut Vec<u8>);

    /// Reads a value from exactly `BITS / 8` native-endian bytes.
    fn read_ne(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_primitive {
    ($($t:ty => $class:ident, $bits:expr);* $(;)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Primitive for $t {
                const CLASS: NumericClass = NumericClass::$class;
                const BITS: u8 = $bits;

                #[inline]
                fn write_ne(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_ne_bytes());
                }

                #[inline]
                fn read_ne(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$t>::from_ne_bytes)
                }
            }
        )*
    };
}

impl_primitive! {
    i8 => Int, 8;
    i16 => Int, 16;
    i32 => Int, 32;
    i64 => Int, 64;
    u8 => Unt, 8;
    u16 => Unt, 16;
    u32 => Unt, 32;
    u64 => Unt, 64;
    f32 => Float, 32;
    f64 => Float, 64;
}

/// One primitive read out of a numeric slaw, widened to 64 bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component {
    Int(i64),
    Unt(u64),
    Float(f64),
}

/// Reads one primitive of the given class and width.
pub(crate) fn read_component(class: NumericClass, bits: u8, bytes: &[u8]) -> Option<Component> {
    Some(match (class, bits) {
        (NumericClass::Int, 8) => Component::Int(i64::from(i8::read_ne(bytes)?)),
        (NumericClass::Int, 16) => Component::Int(i64::from(i16::read_ne(bytes)?)),
        (NumericClass::Int, 32) => Component::Int(i64::from(i32::read_ne(bytes)?)),
        (NumericClass::Int, 64) => Component::Int(i64::read_ne(bytes)?),
        (NumericClass::Unt, 8) => Component::Unt(u64::from(u8::read_ne(bytes)?)),
        (NumericClass::Unt, 16) => Component::Unt(u64::from(u16::read_ne(bytes)?)),
        (NumericClass::Unt, 32) => Component::Unt(u64::from(u32::read_ne(bytes)?)),
        (NumericClass::Unt, 64) => Component::Unt(u64::read_ne(bytes)?),
        (NumericClass::Float, 32) => Component::Float(f64::from(f32::read_ne(bytes)?)),
        (NumericClass::Float, 64) => Component::Float(f64::read_ne(bytes)?),
        _ => return None,
    })
}

/// Appends a signed primitive truncated to `bits`.
pub(crate) fn write_int(v: i64, bits: u8, out: &mut Vec<u8>) -> Result<()> {
    match bits {
        8 => (v as i8).write_ne(out),
        16 => (v as i16).write_ne(out),
        32 => (v as i32).write_ne(out),
        64 => v.write_ne(out),
        _ => return Err(SlawError::badness("integer width must be 8, 16, 32 or 64")),
    }
    Ok(())
}

/// Appends an unsigned primitive truncated to `bits`.
pub(crate) fn write_unt(v: u64, bits: u8, out: &mut Vec<u8>) -> Result<()> {
    match bits {
        8 => (v as u8).write_ne(out),
        16 => (v as u16).write_ne(out),
        32 => (v as u32).write_ne(out),
        64 => v.write_ne(out),
        _ => return Err(SlawError::badness("integer width must be 8, 16, 32 or 64")),
    }
    Ok(())
}

/// Appends a float primitive of `bits` width.
pub(crate) fn write_float(v: f64, bits: u8, out: &mut Vec<u8>) -> Result<()> {
    match bits {
        32 => (v as f32).write_ne(out),
        64 => v.write_ne(out),
        _ => return Err(SlawError::badness("float width must be 32 or 64")),
    }
    Ok(())
}

// =============================================================================
// BORROWED VIEW
// =============================================================================

/// Borrowed view of a numeric slaw's payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRef<'a> {
    personality: Personality,
    breadth: Option<u64>,
    data: &'a [u8],
}

impl<'a> NumericRef<'a> {
    pub(crate) fn new(personality: Personality, breadth: Option<u64>, data: &'a [u8]) -> Self {
        Self { personality, breadth, data }
    }

    pub fn personality(&self) -> Personality {
        self.personality
    }

    /// True for arrays, including empty ones.
    pub fn is_array(&self) -> bool {
        self.breadth.is_some()
    }

    /// Array breadth, or `None` for a singleton.
    pub fn breadth(&self) -> Option<u64> {
        self.breadth
    }

    /// Number of units: the breadth of an array, 1 for a singleton.
    pub fn units(&self) -> usize {
        self.data.len() / self.personality.unit_bytes().max(1)
    }

    /// Raw native-endian payload, exactly `units() * unit_bytes()` long.
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Iterates every primitive in memory order (complex parts as re, im).
    pub fn components(&self) -> impl Iterator<Item = Component> + 'a {
        let class = self.personality.class;
        let bits = self.personality.bits;
        self.data
            .chunks_exact(self.personality.prim_bytes())
            .filter_map(move |c| read_component(class, bits, c))
    }

    /// Copies all primitives out as `T`, if `T` matches the class and width.
    pub fn to_vec<T: Primitive>(&self) -> Option<Vec<T>> {
        if T::CLASS != self.personality.class || T::BITS != self.personality.bits {
            return None;
        }
        self.data
            .chunks_exact(self.personality.prim_bytes())
            .map(T::read_ne)
            .collect()
    }

    /// The `index`th primitive as `T`.
    pub fn get<T: Primitive>(&self, index: usize) -> Option<T> {
        if T::CLASS != self.personality.class || T::BITS != self.personality.bits {
            return None;
        }
        let width = self.personality.prim_bytes();
        let start = index.checked_mul(width)?;
        T::read_ne(self.data.get(start..start.checked_add(width)?)?)
    }

    /// The value when this is a real scalar singleton or a one-element array.
    pub(crate) fn single(&self) -> Option<Component> {
        if self.personality.components() != 1 || self.units() != 1 {
            return None;
        }
        read_component(self.personality.class, self.personality.bits, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personality_validation() {
        assert!(Personality::new(NumericClass::Float, 16, Shape::Scalar, false).is_err());
        assert!(Personality::new(NumericClass::Int, 12, Shape::Scalar, false).is_err());
        assert!(Personality::new(NumericClass::Int, 8, Shape::Vector(5), false).is_err());
        assert!(Personality::new(NumericClass::Int, 8, Shape::Multivector(6), false).is_err());
        assert!(Personality::new(NumericClass::Int, 8, Shape::Multivector(3), true).is_err());
        assert!(Personality::new(NumericClass::Unt, 16, Shape::Vector(3), true).is_ok());
    }

    #[test]
    fn test_unit_sizes() {
        let p = Personality::new(NumericClass::Float, 64, Shape::Vector(3), true).unwrap();
        assert_eq!(p.components(), 6);
        assert_eq!(p.unit_bytes(), 48);

        let m = Personality::new(NumericClass::Float, 64, Shape::Multivector(5), false).unwrap();
        assert_eq!(m.dims(), 32);
        assert_eq!(m.unit_bytes(), 256);

        assert_eq!(Personality::of::<u16>().unit_bytes(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Personality::of::<f32>().to_string(), "float32");
        let p = Personality::new(NumericClass::Int, 32, Shape::Vector(2), true).unwrap();
        assert_eq!(p.to_string(), "v2int32c");
        let m = Personality::new(NumericClass::Unt, 8, Shape::Multivector(4), false).unwrap();
        assert_eq!(m.to_string(), "m4unt8");
    }

    #[test]
    fn test_components_and_get() {
        let mut data = Vec::new();
        for v in [1i16, -2, 3] {
            v.write_ne(&mut data);
        }
        let p = Personality::of::<i16>();
        let n = NumericRef::new(p, Some(3), &data);
        assert_eq!(n.units(), 3);
        assert_eq!(n.get::<i16>(1), Some(-2));
        assert_eq!(n.get::<i16>(3), None);
        assert_eq!(n.get::<u16>(0), None);
        assert_eq!(n.to_vec::<i16>(), Some(vec![1, -2, 3]));
        let comps: Vec<_> = n.components().collect();
        assert_eq!(comps[1], Component::Int(-2));
        assert_eq!(n.single(), None);
    }

    #[test]
    fn test_write_helpers() {
        let mut out = Vec::new();
        write_int(-1, 8, &mut out).unwrap();
        write_unt(0x1234, 16, &mut out).unwrap();
        write_float(1.5, 32, &mut out).unwrap();
        assert_eq!(out.len(), 7);
        assert!(write_float(1.0, 16, &mut out).is_err());
        assert_eq!(read_component(NumericClass::Int, 8, &out[..1]), Some(Component::Int(-1)));
        assert_eq!(read_component(NumericClass::Unt, 16, &out[1..3]), Some(Component::Unt(0x1234)));
        assert_eq!(read_component(NumericClass::Float, 32, &out[3..]), Some(Component::Float(1.5)));
    }
}
