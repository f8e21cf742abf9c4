//! Human-readable overview of a slaw.
//!
//! One line per value, children indented two spaces under their container:
//!
//! ```text
//! protein
//!   descrips:
//!     list (2 entries)
//!       "hand"
//!       "pointing"
//!   ingests:
//!     map (1 entry)
//!       cons
//!         "pos"
//!         v3float64 (1, 2.5, -3)
//!   rude data: 4 bytes
//! ```
//!
//! Long numeric arrays show their first [`ARRAY_PREVIEW`] units.

use std::fmt::Write as _;

use crate::codec::V2;
use crate::error::Result;
use crate::model::{NumericClass, Personality, Shape, SlawRef};
use crate::walk::{walk, SlawHandler};

/// Units of a numeric array printed before the rest are summarized.
pub const ARRAY_PREVIEW: u64 = 16;

/// Renders `s` as an indented multi-line overview ending in a newline.
pub fn overview(s: SlawRef<'_>) -> String {
    let mut spew = Spew::default();
    if let Err(e) = walk(&V2, s.as_bytes(), &mut spew) {
        spew.groups.clear();
        spew.line(&format!("<{e}>"));
    }
    spew.out
}

#[derive(Debug)]
enum GroupKind {
    Array { personality: Personality, breadth: u64 },
    Vector,
    Multivector,
    Complex,
}

#[derive(Debug)]
struct Group {
    kind: GroupKind,
    items: Vec<String>,
}

/// Writes the overview as walk events arrive.
#[derive(Debug, Default)]
pub struct Spew {
    out: String,
    depth: usize,
    groups: Vec<Group>,
    // personality of a numeric singleton, pieced together from its events
    prim: Option<(NumericClass, u8)>,
    shape: Option<Shape>,
    complex: bool,
}

impl Spew {
    pub fn new() -> Self {
        Self::default()
    }

    /// The text written so far.
    pub fn into_string(self) -> String {
        self.out
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn in_array(&self) -> bool {
        self.groups.iter().any(|g| matches!(g.kind, GroupKind::Array { .. }))
    }

    /// Appends a finished number or unit to the enclosing group, or prints
    /// it when it is a whole singleton.
    fn emit(&mut self, text: String) {
        match self.groups.last_mut() {
            Some(Group { kind: GroupKind::Array { .. }, items }) => {
                if (items.len() as u64) < ARRAY_PREVIEW {
                    items.push(text);
                }
            }
            Some(group) => group.items.push(text),
            None => {
                let label = self
                    .prim
                    .and_then(|(class, bits)| {
                        Personality::new(class, bits, self.shape.unwrap_or(Shape::Scalar), self.complex).ok()
                    })
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "numeric".to_string());
                self.reset_numeric();
                self.line(&format!("{label} {text}"));
            }
        }
    }

    fn number(&mut self, class: NumericClass, bits: u8, text: String) -> Result<()> {
        if !self.in_array() {
            self.prim.get_or_insert((class, bits));
        }
        self.emit(text);
        Ok(())
    }

    fn open(&mut self, kind: GroupKind) {
        self.groups.push(Group { kind, items: Vec::new() });
    }

    fn close(&mut self) {
        let Some(group) = self.groups.pop() else {
            return;
        };
        let text = match group.kind {
            GroupKind::Vector | GroupKind::Multivector => format!("({})", group.items.join(", ")),
            GroupKind::Complex => match group.items.as_slice() {
                [re, im] if im.starts_with('-') => format!("{re}{im}i"),
                [re, im] => format!("{re}+{im}i"),
                other => other.join(" "),
            },
            GroupKind::Array { personality, breadth } => {
                let mut text = format!("{personality} array[{breadth}]:");
                for item in &group.items {
                    let _ = write!(text, " {item}");
                }
                if breadth > ARRAY_PREVIEW {
                    let _ = write!(text, " ... ({} more)", breadth - ARRAY_PREVIEW);
                }
                self.reset_numeric();
                self.line(&text);
                return;
            }
        };
        self.emit(text);
    }

    fn reset_numeric(&mut self) {
        self.prim = None;
        self.shape = None;
        self.complex = false;
    }

    fn open_container(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close_container(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

fn entries(n: u64) -> String {
    if n == 1 { "1 entry".to_string() } else { format!("{n} entries") }
}

impl SlawHandler for Spew {
    fn handle_nil(&mut self) -> Result<()> {
        self.line("nil");
        Ok(())
    }

    fn handle_boolean(&mut self, value: bool) -> Result<()> {
        self.line(if value { "true" } else { "false" });
        Ok(())
    }

    fn handle_string(&mut self, value: &str) -> Result<()> {
        self.line(&format!("{value:?}"));
        Ok(())
    }

    fn handle_int(&mut self, value: i64, bits: u8) -> Result<()> {
        self.number(NumericClass::Int, bits, value.to_string())
    }

    fn handle_unt(&mut self, value: u64, bits: u8) -> Result<()> {
        self.number(NumericClass::Unt, bits, value.to_string())
    }

    fn handle_float(&mut self, value: f64, bits: u8) -> Result<()> {
        let text = if bits == 32 { (value as f32).to_string() } else { value.to_string() };
        self.number(NumericClass::Float, bits, text)
    }

    fn handle_empty_array(&mut self, personality: Personality) -> Result<()> {
        self.line(&format!("{personality} array[0]"));
        Ok(())
    }

    fn begin_cons(&mut self) -> Result<()> {
        self.open_container("cons");
        Ok(())
    }

    fn end_cons(&mut self) -> Result<()> {
        self.close_container();
        Ok(())
    }

    fn begin_list(&mut self, len: u64) -> Result<()> {
        self.open_container(&format!("list ({})", entries(len)));
        Ok(())
    }

    fn end_list(&mut self) -> Result<()> {
        self.close_container();
        Ok(())
    }

    fn begin_map(&mut self, len: u64) -> Result<()> {
        self.open_container(&format!("map ({})", entries(len)));
        Ok(())
    }

    fn end_map(&mut self) -> Result<()> {
        self.close_container();
        Ok(())
    }

    fn begin_array(&mut self, personality: Personality, breadth: u64) -> Result<()> {
        self.open(GroupKind::Array { personality, breadth });
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        self.close();
        Ok(())
    }

    fn begin_vector(&mut self, dims: u8) -> Result<()> {
        if !self.in_array() {
            self.shape = Some(Shape::Vector(dims));
        }
        self.open(GroupKind::Vector);
        Ok(())
    }

    fn end_vector(&mut self) -> Result<()> {
        self.close();
        Ok(())
    }

    fn begin_multivector(&mut self, dims: u8) -> Result<()> {
        if !self.in_array() {
            self.shape = Some(Shape::Multivector(dims));
        }
        self.open(GroupKind::Multivector);
        Ok(())
    }

    fn end_multivector(&mut self) -> Result<()> {
        self.close();
        Ok(())
    }

    fn begin_complex(&mut self) -> Result<()> {
        if !self.in_array() {
            self.complex = true;
        }
        self.open(GroupKind::Complex);
        Ok(())
    }

    fn end_complex(&mut self) -> Result<()> {
        self.close();
        Ok(())
    }

    fn begin_protein(&mut self) -> Result<()> {
        self.open_container("protein");
        Ok(())
    }

    fn end_protein(&mut self) -> Result<()> {
        self.close_container();
        Ok(())
    }

    fn begin_descrips(&mut self) -> Result<()> {
        self.open_container("descrips:");
        Ok(())
    }

    fn end_descrips(&mut self) -> Result<()> {
        self.close_container();
        Ok(())
    }

    fn begin_ingests(&mut self) -> Result<()> {
        self.open_container("ingests:");
        Ok(())
    }

    fn end_ingests(&mut self) -> Result<()> {
        self.close_container();
        Ok(())
    }

    fn handle_rude_data(&mut self, rude: &[u8]) -> Result<()> {
        let unit = if rude.len() == 1 { "byte" } else { "bytes" };
        self.line(&format!("rude data: {} {unit}", rude.len()));
        Ok(())
    }

    fn handle_nonstd_protein(&mut self, raw: &[u8]) -> Result<()> {
        self.line(&format!("nonstandard protein ({} bytes)", raw.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Slaw;

    fn s(v: &str) -> Slaw {
        Slaw::string(v).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(overview(Slaw::nil().unwrap().view()), "nil\n");
        assert_eq!(overview(Slaw::boolean(true).unwrap().view()), "true\n");
        assert_eq!(overview(s("a \"q\"").view()), "\"a \\\"q\\\"\"\n");
        assert_eq!(overview(Slaw::scalar(-7i32).unwrap().view()), "int32 -7\n");
        assert_eq!(overview(Slaw::scalar(0.5f32).unwrap().view()), "float32 0.5\n");
    }

    #[test]
    fn test_shaped_numerics() {
        let v = Slaw::vector(&[1.0f64, 2.5, -3.0]).unwrap();
        assert_eq!(overview(v.view()), "v3float64 (1, 2.5, -3)\n");
        let c = Slaw::complex(2i8, -3).unwrap();
        assert_eq!(overview(c.view()), "int8c 2-3i\n");
        let cv = Slaw::complex_vector(&[(1u16, 2), (3, 4)]).unwrap();
        assert_eq!(overview(cv.view()), "v2unt16c (1+2i, 3+4i)\n");
        let m = Slaw::multivector(&[0u8; 4]).unwrap();
        assert_eq!(overview(m.view()), "m2unt8 (0, 0, 0, 0)\n");
    }

    #[test]
    fn test_arrays() {
        let a = Slaw::array(&[1u32, 2, 3]).unwrap();
        assert_eq!(overview(a.view()), "unt32 array[3]: 1 2 3\n");
        let long: Vec<i64> = (0..20).collect();
        let text = overview(Slaw::array(&long).unwrap().view());
        assert!(text.starts_with("int64 array[20]: 0 1 2"));
        assert!(text.ends_with(" 15 ... (4 more)\n"));
        let va = Slaw::vector_array(&[[1i8, 2], [3, 4]]).unwrap();
        assert_eq!(overview(va.view()), "v2int8 array[2]: (1, 2) (3, 4)\n");
        let empty = Slaw::empty_array(Personality::of::<f64>()).unwrap();
        assert_eq!(overview(empty.view()), "float64 array[0]\n");
    }

    #[test]
    fn test_nested() {
        let pos = Slaw::vector(&[1.0f64, 2.5, -3.0]).unwrap();
        let ingests = Slaw::map([(&s("pos"), &pos)]).unwrap();
        let descrips = Slaw::list([&s("hand"), &s("pointing")]).unwrap();
        let p = Slaw::protein(Some(&descrips), Some(&ingests), &[0; 4]).unwrap();
        let expected = "\
protein
  descrips:
    list (2 entries)
      \"hand\"
      \"pointing\"
  ingests:
    map (1 entry)
      cons
        \"pos\"
        v3float64 (1, 2.5, -3)
  rude data: 4 bytes
";
        assert_eq!(overview(p.view()), expected);
        assert_eq!(p.to_string(), expected.trim_end());
    }

    #[test]
    fn test_numerics_reset_between_values() {
        let l = Slaw::list([&Slaw::complex(1.0f32, 1.0).unwrap(), &Slaw::scalar(5u64).unwrap()]).unwrap();
        assert_eq!(overview(l.view()), "list (2 entries)\n  float32c 1+1i\n  unt64 5\n");
    }
}
