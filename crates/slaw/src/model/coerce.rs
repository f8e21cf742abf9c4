//! Lenient conversions of slawx to plain Rust numbers.
//!
//! Scalars convert when the value fits exactly; booleans read as 0 and 1,
//! strings are parsed, one-element lists and arrays stand for their element.
//! Anything else is `NotNumeric`; a value that would lose information is
//! `RangeErr`.
//!
//! The `path_get_*` helpers look a value up with [`SlawRef::path_get`] and
//! coerce it, answering a caller-supplied default when either step fails.

use crate::error::{Result, SlawError};
use crate::model::numeric::Component;
use crate::model::slabu::split_terms;
use crate::model::{Shape, Slaw, SlawKind, SlawRef};

impl SlawRef<'_> {
    pub fn as_i64(&self) -> Result<i64> {
        match scalar_value(*self)? {
            Component::Int(v) => Ok(v),
            Component::Unt(v) => i64::try_from(v).map_err(|_| range("value exceeds int64")),
            Component::Float(f) => {
                if f.fract() != 0.0 || !(-9.223_372_036_854_775_808e18..9.223_372_036_854_775_808e18).contains(&f) {
                    return Err(range("float is not an exact int64"));
                }
                Ok(f as i64)
            }
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        match scalar_value(*self)? {
            Component::Int(v) => u64::try_from(v).map_err(|_| range("negative value for unt64")),
            Component::Unt(v) => Ok(v),
            Component::Float(f) => {
                if f.fract() != 0.0 || !(0.0..1.844_674_407_370_955_2e19).contains(&f) {
                    return Err(range("float is not an exact unt64"));
                }
                Ok(f as u64)
            }
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match scalar_value(*self)? {
            Component::Int(v) => {
                let f = v as f64;
                if f as i128 != i128::from(v) {
                    return Err(range("int64 has more significant bits than float64"));
                }
                Ok(f)
            }
            Component::Unt(v) => {
                let f = v as f64;
                if f as u128 != u128::from(v) {
                    return Err(range("unt64 has more significant bits than float64"));
                }
                Ok(f)
            }
            Component::Float(f) => Ok(f),
        }
    }

    /// Booleans as themselves, the strings "true" and "false" in any case,
    /// and numbers that are exactly 0 or 1.
    pub fn as_bool(&self) -> Result<bool> {
        let s = delistify(*self);
        if let SlawKind::String(t) = s.kind() {
            if t.eq_ignore_ascii_case("true") {
                return Ok(true);
            }
            if t.eq_ignore_ascii_case("false") {
                return Ok(false);
            }
        }
        match s.as_u64()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(range("number is neither 0 nor 1")),
        }
    }

    /// Reads up to `capacity` float64 components.
    ///
    /// Accepts a list of coercible elements, a comma separated string, a
    /// real vector, or an array of real scalars. Longer inputs are
    /// `WrongLength`.
    pub fn as_f64_vec(&self, capacity: usize) -> Result<Vec<f64>> {
        match self.kind() {
            SlawKind::List(l) | SlawKind::Map(l) => {
                if l.len() > capacity {
                    return Err(too_long(capacity, l.len()));
                }
                l.iter().map(|e| e.as_f64()).collect()
            }
            SlawKind::String(t) => {
                let parts: Vec<&str> = split_terms(t, ",").into_iter().map(|p| p.trim_matches(' ')).collect();
                if parts.len() > capacity {
                    return Err(too_long(capacity, parts.len()));
                }
                parts
                    .into_iter()
                    .map(|p| match parse_number(p)? {
                        Component::Int(v) => Ok(v as f64),
                        Component::Unt(v) => Ok(v as f64),
                        Component::Float(f) => Ok(f),
                    })
                    .collect()
            }
            SlawKind::Numeric(n) => {
                let p = n.personality();
                let accepted = !p.is_complex()
                    && match p.shape() {
                        Shape::Vector(_) => !n.is_array(),
                        Shape::Scalar => n.is_array(),
                        Shape::Multivector(_) => false,
                    };
                if !accepted {
                    return Err(SlawError::NotNumeric);
                }
                if n.units() > capacity && n.is_array() {
                    return Err(too_long(capacity, n.units()));
                }
                let out: Vec<f64> = n
                    .components()
                    .map(|c| match c {
                        Component::Int(v) => v as f64,
                        Component::Unt(v) => v as f64,
                        Component::Float(f) => f,
                    })
                    .collect();
                if out.len() > capacity {
                    return Err(too_long(capacity, out.len()));
                }
                Ok(out)
            }
            _ => Err(SlawError::NotNumeric),
        }
    }
}

impl<'a> SlawRef<'a> {
    /// The string at `path`, or `default` when there is none.
    pub fn path_get_string(&self, path: &str, default: &'a str) -> &'a str {
        self.path_get(path).and_then(|s| s.string()).unwrap_or(default)
    }

    pub fn path_get_i64(&self, path: &str, default: i64) -> i64 {
        self.path_get(path).and_then(|s| s.as_i64().ok()).unwrap_or(default)
    }

    pub fn path_get_u64(&self, path: &str, default: u64) -> u64 {
        self.path_get(path).and_then(|s| s.as_u64().ok()).unwrap_or(default)
    }

    pub fn path_get_f64(&self, path: &str, default: f64) -> f64 {
        self.path_get(path).and_then(|s| s.as_f64().ok()).unwrap_or(default)
    }

    pub fn path_get_bool(&self, path: &str, default: bool) -> bool {
        self.path_get(path).and_then(|s| s.as_bool().ok()).unwrap_or(default)
    }
}

impl Slaw {
    pub fn as_i64(&self) -> Result<i64> {
        self.view().as_i64()
    }

    pub fn as_u64(&self) -> Result<u64> {
        self.view().as_u64()
    }

    pub fn as_f64(&self) -> Result<f64> {
        self.view().as_f64()
    }

    pub fn as_bool(&self) -> Result<bool> {
        self.view().as_bool()
    }
}

fn range(context: &'static str) -> SlawError {
    SlawError::RangeErr { context }
}

fn too_long(expected: usize, actual: usize) -> SlawError {
    SlawError::WrongLength { context: "components", expected, actual }
}

/// Unwraps one-element lists.
fn delistify(mut s: SlawRef<'_>) -> SlawRef<'_> {
    while let Some(l) = s.list() {
        match l.nth(0) {
            Some(only) if l.len() == 1 => s = only,
            _ => break,
        }
    }
    s
}

fn scalar_value(s: SlawRef<'_>) -> Result<Component> {
    match delistify(s).kind() {
        SlawKind::Boolean(b) => Ok(Component::Unt(u64::from(b))),
        SlawKind::Numeric(n) => n.single().ok_or(SlawError::NotNumeric),
        SlawKind::String(t) => parse_number(t),
        _ => Err(SlawError::NotNumeric),
    }
}

/// Parses a decimal or `0x` hexadecimal integer, or a float.
fn parse_number(text: &str) -> Result<Component> {
    let (neg, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if body.is_empty() {
        return Err(SlawError::NotNumeric);
    }
    let digits = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X"));
    let (digits, radix) = match digits {
        Some(hex) => (hex, 16),
        None => (body, 10),
    };
    if !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix)) {
        let magnitude = u64::from_str_radix(digits, radix).map_err(|_| range("integer literal overflows"))?;
        if !neg {
            return Ok(Component::Unt(magnitude));
        }
        let v = -i128::from(magnitude);
        return i64::try_from(v)
            .map(Component::Int)
            .map_err(|_| range("integer literal overflows"));
    }
    if radix == 16 {
        return Err(SlawError::NotNumeric);
    }
    text.parse::<f64>().map(Component::Float).map_err(|_| SlawError::NotNumeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::model::Personality;

    fn s(v: &str) -> Slaw {
        Slaw::string(v).unwrap()
    }

    #[test]
    fn test_scalar_coercions() {
        assert_eq!(Slaw::scalar(-5i8).unwrap().as_i64().unwrap(), -5);
        assert_eq!(Slaw::scalar(7u32).unwrap().as_u64().unwrap(), 7);
        assert_eq!(Slaw::scalar(2.0f32).unwrap().as_i64().unwrap(), 2);
        assert_eq!(Slaw::scalar(3i16).unwrap().as_f64().unwrap(), 3.0);
        assert_eq!(Slaw::boolean(true).unwrap().as_i64().unwrap(), 1);
    }

    #[test]
    fn test_range_errors() {
        let code = |r: Result<i64>| r.unwrap_err().code();
        assert_eq!(code(Slaw::scalar(2.5f64).unwrap().as_i64()), ErrorCode::RangeErr);
        assert_eq!(code(Slaw::scalar(u64::MAX).unwrap().as_i64()), ErrorCode::RangeErr);
        assert_eq!(Slaw::scalar(-1i32).unwrap().as_u64().unwrap_err().code(), ErrorCode::RangeErr);
        assert_eq!(
            Slaw::scalar(i64::MAX).unwrap().as_f64().unwrap_err().code(),
            ErrorCode::RangeErr
        );
        assert_eq!(Slaw::scalar(f64::NAN).unwrap().as_i64().unwrap_err().code(), ErrorCode::RangeErr);
    }

    #[test]
    fn test_not_numeric() {
        let code = |s: Slaw| s.as_i64().unwrap_err().code();
        assert_eq!(code(Slaw::nil().unwrap()), ErrorCode::NotNumeric);
        assert_eq!(code(s("twelve")), ErrorCode::NotNumeric);
        assert_eq!(code(s("12abc")), ErrorCode::NotNumeric);
        assert_eq!(code(Slaw::vector(&[1i32, 2]).unwrap()), ErrorCode::NotNumeric);
        assert_eq!(code(Slaw::empty_array(Personality::of::<i8>()).unwrap()), ErrorCode::NotNumeric);
    }

    #[test]
    fn test_strings_and_lists() {
        assert_eq!(s("42").as_i64().unwrap(), 42);
        assert_eq!(s("-0x10").as_i64().unwrap(), -16);
        assert_eq!(s("0xff").as_u64().unwrap(), 255);
        assert_eq!(s("1.5e2").as_f64().unwrap(), 150.0);
        assert!(s("nan").as_f64().unwrap().is_nan());
        assert_eq!(s("99999999999999999999").as_u64().unwrap_err().code(), ErrorCode::RangeErr);

        let wrapped = Slaw::list([&Slaw::list([&s("9")]).unwrap()]).unwrap();
        assert_eq!(wrapped.as_i64().unwrap(), 9);
        assert_eq!(Slaw::array(&[6u8]).unwrap().as_i64().unwrap(), 6);
    }

    #[test]
    fn test_as_bool() {
        assert!(s("TRUE").as_bool().unwrap());
        assert!(!s("False").as_bool().unwrap());
        assert!(Slaw::scalar(1u8).unwrap().as_bool().unwrap());
        assert!(!Slaw::boolean(false).unwrap().as_bool().unwrap());
        assert_eq!(Slaw::scalar(2i32).unwrap().as_bool().unwrap_err().code(), ErrorCode::RangeErr);
    }

    #[test]
    fn test_path_getters_fall_back_to_defaults() {
        let hand = Slaw::map([
            (&s("id"), &Slaw::scalar(12u32).unwrap()),
            (&s("scale"), &s("0.5")),
            (&s("left"), &Slaw::boolean(true).unwrap()),
            (&s("name"), &s("pinch")),
        ])
        .unwrap();
        let ingests = Slaw::map([(&s("hand"), &hand)]).unwrap();
        let p = Slaw::protein(None, Some(&ingests), &[]).unwrap();
        let v = p.view();

        assert_eq!(v.path_get_i64("hand/id", -1), 12);
        assert_eq!(v.path_get_u64("hand/id", 0), 12);
        assert_eq!(v.path_get_f64("hand/scale", 1.0), 0.5);
        assert!(v.path_get_bool("hand/left", false));
        assert_eq!(v.path_get_string("hand/name", "none"), "pinch");

        // missing paths and failed coercions both answer the default
        assert_eq!(v.path_get_i64("hand/missing", -1), -1);
        assert_eq!(v.path_get_i64("hand/name", -1), -1);
        assert_eq!(v.path_get_string("hand/id", "none"), "none");
        assert!(v.path_get_bool("hand/name", true));
        assert_eq!(s("flat").view().path_get_u64("", 9), 9);
    }

    #[test]
    fn test_as_f64_vec() {
        let v = Slaw::vector(&[1i32, 2, 3]).unwrap();
        assert_eq!(v.view().as_f64_vec(4).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(s(" 1, 2.5 ,3").view().as_f64_vec(3).unwrap(), vec![1.0, 2.5, 3.0]);
        assert_eq!(s("4,5,").view().as_f64_vec(2).unwrap(), vec![4.0, 5.0]);
        let l = Slaw::list([&Slaw::scalar(1u8).unwrap(), &s("2")]).unwrap();
        assert_eq!(l.view().as_f64_vec(2).unwrap(), vec![1.0, 2.0]);
        let a = Slaw::array(&[1.0f32; 5]).unwrap();
        assert_eq!(a.view().as_f64_vec(4).unwrap_err().code(), ErrorCode::WrongLength);
        assert_eq!(s("hi").view().as_f64_vec(4).unwrap_err().code(), ErrorCode::NotNumeric);
        assert_eq!(
            Slaw::complex(1.0f64, 2.0).unwrap().view().as_f64_vec(4).unwrap_err().code(),
            ErrorCode::NotNumeric
        );
    }
}
