//! Owned slawx and borrowed views.
//!
//! A [`Slaw`] always holds one complete, validated, native-endian v2
//! encoding. Views ([`SlawRef`], [`ListRef`], [`NumericRef`],
//! [`ProteinRef`]) borrow from it and never expose header words; every
//! accessor answers `None` when asked for the wrong kind.

use std::cmp::Ordering;
use std::fmt;

use crate::codec::{Children, SlawCodec, V2};
use crate::error::{Result, SlawError};
use crate::model::numeric::{NumericRef, Personality, Primitive, Shape};
use crate::model::protein::ProteinRef;
use crate::model::slabu::split_terms;
use crate::model::{Slabu, SlawType};
use crate::ordering;
use crate::walk;

/// An immutable, validated slaw.
///
/// Equality and hashing are byte-wise; ordering is the semantic ordering
/// with byte order as the final tie-break, so `a == b` exactly when
/// `a.cmp(&b)` is `Equal`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Slaw {
    bytes: Vec<u8>,
}

/// Borrowed view of one validated slaw.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlawRef<'a> {
    bytes: &'a [u8],
}

/// What a slaw is, with its contents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlawKind<'a> {
    Nil,
    Boolean(bool),
    String(&'a str),
    Numeric(NumericRef<'a>),
    Cons(SlawRef<'a>, SlawRef<'a>),
    List(ListRef<'a>),
    Map(ListRef<'a>),
    Protein(ProteinRef<'a>),
}

/// Borrowed view of a list or map.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ListRef<'a> {
    is_map: bool,
    count: u64,
    body: &'a [u8],
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

impl Slaw {
    /// Wraps bytes produced by the v2 encoder from already-validated parts.
    pub(crate) fn from_trusted(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Validates a complete native-endian v2 encoding and takes ownership.
    ///
    /// The buffer must hold exactly one slaw: every length, count and child
    /// must agree, strings must be UTF-8 and nesting stays within
    /// [`MAX_NESTING_DEPTH`](crate::limits::MAX_NESTING_DEPTH).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        walk::validate(&V2, &bytes)?;
        Ok(Self { bytes })
    }

    /// Like [`from_bytes`](Slaw::from_bytes), copying the input.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes.to_vec())
    }

    pub fn nil() -> Result<Self> {
        Ok(Self::from_trusted(V2.encode_nil()?))
    }

    pub fn boolean(v: bool) -> Result<Self> {
        Ok(Self::from_trusted(V2.encode_boolean(v)?))
    }

    /// Builds a string slaw. Interior NUL bytes are rejected.
    pub fn string(s: &str) -> Result<Self> {
        if s.as_bytes().contains(&0) {
            return Err(SlawError::RangeErr { context: "strings cannot contain NUL bytes" });
        }
        Ok(Self::from_trusted(V2.encode_string(s.as_bytes())?))
    }

    pub fn cons<'a, 'b>(car: impl Into<SlawRef<'a>>, cdr: impl Into<SlawRef<'b>>) -> Result<Self> {
        Ok(Self::from_trusted(V2.encode_cons(car.into().bytes, cdr.into().bytes)?))
    }

    pub fn list<'a, I>(items: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<SlawRef<'a>>,
    {
        let items: Vec<&[u8]> = items.into_iter().map(|s| s.into().bytes).collect();
        Ok(Self::from_trusted(V2.encode_list(&items, false)?))
    }

    /// Builds a map from key/value pairs. A repeated key keeps the last
    /// value at the position of its first occurrence.
    pub fn map<'a, 'b, I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SlawRef<'a>>,
        V: Into<SlawRef<'b>>,
    {
        let mut sb = Slabu::new();
        for (k, v) in pairs {
            sb.push(Slaw::cons(k, v)?);
        }
        sb.into_map()
    }

    /// Builds a numeric slaw from raw native-endian units.
    pub fn numeric(personality: Personality, breadth: Option<u64>, data: &[u8]) -> Result<Self> {
        Ok(Self::from_trusted(V2.encode_numeric(personality, breadth, data)?))
    }

    pub fn scalar<T: Primitive>(v: T) -> Result<Self> {
        let mut data = Vec::with_capacity(8);
        v.write_ne(&mut data);
        Self::numeric(Personality::of::<T>(), None, &data)
    }

    pub fn complex<T: Primitive>(re: T, im: T) -> Result<Self> {
        let mut data = Vec::with_capacity(16);
        re.write_ne(&mut data);
        im.write_ne(&mut data);
        Self::numeric(Personality::of::<T>().with_complex(true)?, None, &data)
    }

    /// Builds a 2, 3 or 4 component vector.
    pub fn vector<T: Primitive>(components: &[T]) -> Result<Self> {
        let p = Personality::of::<T>().with_shape(Shape::Vector(dims_u8(components.len())?))?;
        Self::numeric(p, None, &pack(components))
    }

    pub fn complex_vector<T: Primitive>(components: &[(T, T)]) -> Result<Self> {
        let p = Personality::of::<T>()
            .with_shape(Shape::Vector(dims_u8(components.len())?))?
            .with_complex(true)?;
        let mut data = Vec::with_capacity(components.len() * 2 * p.prim_bytes());
        for &(re, im) in components {
            re.write_ne(&mut data);
            im.write_ne(&mut data);
        }
        Self::numeric(p, None, &data)
    }

    /// Builds a multivector from its 4, 8, 16 or 32 coefficients.
    pub fn multivector<T: Primitive>(coefficients: &[T]) -> Result<Self> {
        let n = coefficients.len();
        if !n.is_power_of_two() || n < 4 {
            return Err(SlawError::RangeErr { context: "multivectors have 4, 8, 16 or 32 coefficients" });
        }
        let p = Personality::of::<T>().with_shape(Shape::Multivector(n.trailing_zeros() as u8))?;
        Self::numeric(p, None, &pack(coefficients))
    }

    /// Builds an array of scalars.
    pub fn array<T: Primitive>(items: &[T]) -> Result<Self> {
        Self::numeric(Personality::of::<T>(), Some(items.len() as u64), &pack(items))
    }

    /// Builds an array of `N`-component vectors.
    pub fn vector_array<T: Primitive, const N: usize>(items: &[[T; N]]) -> Result<Self> {
        let p = Personality::of::<T>().with_shape(Shape::Vector(dims_u8(N)?))?;
        let mut data = Vec::with_capacity(items.len() * p.unit_bytes());
        for unit in items {
            for &c in unit {
                c.write_ne(&mut data);
            }
        }
        Self::numeric(p, Some(items.len() as u64), &data)
    }

    /// Builds a zero-breadth array of any personality.
    pub fn empty_array(personality: Personality) -> Result<Self> {
        Self::numeric(personality, Some(0), &[])
    }

    /// Concatenates the elements of several lists (or maps) into one list.
    pub fn lists_concat(lists: &[ListRef<'_>]) -> Result<Self> {
        let mut items = Vec::new();
        for l in lists {
            items.extend(l.iter().map(|s| s.bytes));
        }
        Ok(Self::from_trusted(V2.encode_list(&items, false)?))
    }

    /// Merges maps left to right: later maps override values of earlier
    /// keys, and each key keeps the position where it first appeared.
    pub fn maps_merge(maps: &[ListRef<'_>]) -> Result<Self> {
        let mut sb = Slabu::new();
        for m in maps {
            for entry in m.iter().filter(|e| e.slaw_type() == SlawType::Cons) {
                sb.push(Slaw::from(entry));
            }
        }
        sb.into_map()
    }

    /// Joins the text of string elements, putting `sep` between every pair
    /// of elements. Non-string elements add no text but keep their
    /// separators; no elements give the empty string.
    pub fn strings_join<'a, I>(items: I, sep: &str) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<SlawRef<'a>>,
    {
        let mut text = String::new();
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                text.push_str(sep);
            }
            if let Some(t) = item.into().string() {
                text.push_str(t);
            }
        }
        Self::string(&text)
    }

    /// [`strings_join`](Slaw::strings_join) with no separator.
    pub fn strings_concat<'a, I>(items: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<SlawRef<'a>>,
    {
        Self::strings_join(items, "")
    }

    /// Builds a string from format arguments.
    ///
    /// ```rust
    /// use slaw::Slaw;
    ///
    /// let s = Slaw::string_format(format_args!("{}/{}", "pool", 7)).unwrap();
    /// assert_eq!(s.view().string(), Some("pool/7"));
    /// ```
    pub fn string_format(args: fmt::Arguments<'_>) -> Result<Self> {
        match args.as_str() {
            Some(text) => Self::string(text),
            None => Self::string(&args.to_string()),
        }
    }

    // === Access ===

    pub fn view(&self) -> SlawRef<'_> {
        SlawRef { bytes: &self.bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn slaw_type(&self) -> SlawType {
        self.view().slaw_type()
    }

    pub fn kind(&self) -> SlawKind<'_> {
        self.view().kind()
    }
}

fn dims_u8(n: usize) -> Result<u8> {
    u8::try_from(n).map_err(|_| SlawError::RangeErr { context: "vector width must be 2, 3 or 4" })
}

fn pack<T: Primitive>(items: &[T]) -> Vec<u8> {
    let mut data = Vec::with_capacity(items.len() * 8);
    for &v in items {
        v.write_ne(&mut data);
    }
    data
}

impl<'a> From<&'a Slaw> for SlawRef<'a> {
    fn from(s: &'a Slaw) -> Self {
        s.view()
    }
}

impl From<SlawRef<'_>> for Slaw {
    fn from(s: SlawRef<'_>) -> Self {
        Slaw::from_trusted(s.bytes.to_vec())
    }
}

impl Ord for Slaw {
    fn cmp(&self, other: &Self) -> Ordering {
        self.view().cmp(&other.view())
    }
}

impl PartialOrd for Slaw {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Slaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}

impl fmt::Display for Slaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(crate::spew::overview(self.view()).trim_end())
    }
}

// =============================================================================
// VIEWS
// =============================================================================

impl<'a> SlawRef<'a> {
    /// Callers guarantee `bytes` is exactly one validated v2 slaw.
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn slaw_type(&self) -> SlawType {
        V2.slaw_type(self.bytes)
    }

    pub fn to_slaw(&self) -> Slaw {
        Slaw::from(*self)
    }

    pub fn kind(&self) -> SlawKind<'a> {
        // validated at construction; a failed decode here cannot occur
        self.try_kind().unwrap_or(SlawKind::Nil)
    }

    fn try_kind(&self) -> Result<SlawKind<'a>> {
        Ok(match self.slaw_type() {
            SlawType::Boolean => SlawKind::Boolean(V2.boolean_value(self.bytes)?),
            SlawType::String => SlawKind::String(self.string().ok_or(SlawError::corrupt("string is not UTF-8"))?),
            SlawType::Numeric => {
                let p = V2.numeric_parts(self.bytes)?;
                SlawKind::Numeric(NumericRef::new(p.personality, p.breadth, p.data))
            }
            SlawType::Cons => {
                let (car, cdr) = V2.cons_parts(self.bytes)?;
                SlawKind::Cons(SlawRef::new(car), SlawRef::new(cdr))
            }
            SlawType::List => {
                let l = self.list().ok_or(SlawError::corrupt("expected a list"))?;
                if l.is_map { SlawKind::Map(l) } else { SlawKind::List(l) }
            }
            SlawType::Protein => SlawKind::Protein(ProteinRef::new(self.bytes, V2.protein_parts(self.bytes)?)),
            SlawType::Nil | SlawType::Null | SlawType::Unknown => SlawKind::Nil,
        })
    }

    pub fn is_nil(&self) -> bool {
        self.slaw_type() == SlawType::Nil
    }

    pub fn boolean(&self) -> Option<bool> {
        V2.boolean_value(self.bytes).ok()
    }

    pub fn string(&self) -> Option<&'a str> {
        V2.string_bytes(self.bytes).ok().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn numeric(&self) -> Option<NumericRef<'a>> {
        let p = V2.numeric_parts(self.bytes).ok()?;
        Some(NumericRef::new(p.personality, p.breadth, p.data))
    }

    pub fn cons(&self) -> Option<(SlawRef<'a>, SlawRef<'a>)> {
        let (car, cdr) = V2.cons_parts(self.bytes).ok()?;
        Some((SlawRef::new(car), SlawRef::new(cdr)))
    }

    /// The list or map, if this is one.
    pub fn list(&self) -> Option<ListRef<'a>> {
        let p = V2.list_parts(self.bytes).ok()?;
        Some(ListRef { is_map: p.is_map, count: p.count, body: p.body })
    }

    pub fn protein(&self) -> Option<ProteinRef<'a>> {
        let p = V2.protein_parts(self.bytes).ok()?;
        Some(ProteinRef::new(self.bytes, p))
    }

    /// Follows `/`-separated string keys through nested maps. A protein is
    /// searched through its ingests; an empty path names the map itself.
    pub fn path_get(&self, path: &str) -> Option<SlawRef<'a>> {
        let mut at = match self.protein() {
            Some(p) => p.ingests()?,
            None => *self,
        };
        at.list()?;
        for key in split_terms(path, "/") {
            at = at.list()?.get(key)?;
        }
        Some(at)
    }
}

impl Ord for SlawRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        ordering::compare(&V2, self.bytes, other.bytes).then_with(|| self.bytes.cmp(other.bytes))
    }
}

impl PartialOrd for SlawRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for SlawRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            SlawKind::Nil => f.write_str("nil"),
            SlawKind::Boolean(b) => write!(f, "{b}"),
            SlawKind::String(s) => write!(f, "{s:?}"),
            SlawKind::Numeric(n) => {
                write!(f, "{}", n.personality())?;
                if let Some(b) = n.breadth() {
                    write!(f, "[{b}]")?;
                }
                f.debug_list().entries(n.components()).finish()
            }
            SlawKind::Cons(car, cdr) => f.debug_tuple("cons").field(&car).field(&cdr).finish(),
            SlawKind::List(l) => f.debug_list().entries(l.iter()).finish(),
            SlawKind::Map(m) => f
                .debug_map()
                .entries(m.iter().filter_map(|e| e.cons()))
                .finish(),
            SlawKind::Protein(p) => fmt::Debug::fmt(&p, f),
        }
    }
}

impl<'a> ListRef<'a> {
    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// True when this was encoded as a map.
    pub fn is_map(&self) -> bool {
        self.is_map
    }

    pub fn iter(&self) -> impl Iterator<Item = SlawRef<'a>> + 'a {
        Children::new(&V2, self.body).filter_map(|c| c.ok()).map(SlawRef::new)
    }

    /// Element at `index`; negative indices count back from the end.
    pub fn nth(&self, index: i64) -> Option<SlawRef<'a>> {
        let len = self.count as i64;
        let i = if index < 0 { len + index } else { index };
        if i < 0 || i >= len {
            return None;
        }
        self.iter().nth(i as usize)
    }

    /// Index of the first element byte-equal to `needle`.
    pub fn find<'b>(&self, needle: impl Into<SlawRef<'b>>) -> Option<usize> {
        let needle = needle.into();
        self.iter().position(|e| e.bytes == needle.bytes)
    }

    /// Index at which all of `needle`'s elements appear back to back. An
    /// empty needle matches at 0.
    pub fn contig_search(&self, needle: &ListRef<'_>) -> Option<usize> {
        let wanted: Vec<&[u8]> = needle.iter().map(|e| e.bytes).collect();
        if wanted.is_empty() {
            return Some(0);
        }
        let hay: Vec<&[u8]> = self.iter().map(|e| e.bytes).collect();
        hay.windows(wanted.len()).position(|w| w == wanted.as_slice())
    }

    /// Index of the first match when all of `needle`'s elements appear in
    /// order, possibly with gaps between them. An empty needle matches at 0.
    pub fn gap_search(&self, needle: &ListRef<'_>) -> Option<usize> {
        let mut wanted = needle.iter().peekable();
        if wanted.peek().is_none() {
            return Some(0);
        }
        let mut first = None;
        for (i, e) in self.iter().enumerate() {
            let Some(w) = wanted.peek() else { break };
            if e.bytes == w.bytes {
                first.get_or_insert(i);
                wanted.next();
            }
        }
        if wanted.peek().is_none() { first } else { None }
    }

    /// Value of the last cons whose car equals `key`.
    pub fn map_find<'b>(&self, key: impl Into<SlawRef<'b>>) -> Option<SlawRef<'a>> {
        let key = key.into();
        self.iter()
            .filter_map(|e| e.cons())
            .filter(|(car, _)| ordering::compare(&V2, car.bytes, key.bytes) == Ordering::Equal)
            .last()
            .map(|(_, cdr)| cdr)
    }

    /// Value for a string key.
    pub fn get(&self, key: &str) -> Option<SlawRef<'a>> {
        self.iter()
            .filter_map(|e| e.cons())
            .filter(|(car, _)| car.string() == Some(key))
            .last()
            .map(|(_, cdr)| cdr)
    }
}

impl fmt::Debug for ListRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListRef")
            .field("is_map", &self.is_map)
            .field("len", &self.count)
            .finish()
    }
}
