//! Building slawx from traversal events.
//!
//! [`Fabricator`] is the inverse of [`walk`](crate::walk::walk): it keeps a
//! stack of partially built containers, and each `end_*` event finishes the
//! top one with the target codec's encoders and hands the result to the
//! container below it. Walking with one codec and fabricating with another
//! transcodes between wire versions.

use crate::codec::SlawCodec;
use crate::error::{Result, SlawError};
use crate::model::{write_float, write_int, write_unt, NumericClass, Personality, Shape};
use crate::walk::{walk, SlawHandler};

/// Rebuilds the slaw at the start of `s` (encoded with `source`) in the
/// `target` layout.
pub fn fabricate(source: &dyn SlawCodec, s: &[u8], target: &dyn SlawCodec) -> Result<Vec<u8>> {
    let mut fab = Fabricator::new(target);
    walk(source, s, &mut fab)?;
    fab.finish()
}

/// Event handler that encodes what it is told into `target`'s layout.
pub struct Fabricator<'c> {
    target: &'c dyn SlawCodec,
    stack: Vec<Frame>,
    result: Option<Vec<u8>>,
}

enum Frame {
    Cons(Vec<Vec<u8>>),
    List(Vec<Vec<u8>>),
    Map(Vec<Vec<u8>>),
    Protein(ProteinFrame),
    Numeric(NumericFrame),
}

#[derive(Default)]
struct ProteinFrame {
    slot: Slot,
    descrips: Option<Vec<u8>>,
    ingests: Option<Vec<u8>>,
    rude: Vec<u8>,
}

#[derive(Default, Clone, Copy, PartialEq, Eq)]
enum Slot {
    #[default]
    None,
    Descrips,
    Ingests,
}

/// Open numeric shape contexts, innermost last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Array,
    Vector(u8),
    Multivector(u8),
    Complex,
}

/// Accumulates one numeric value.
#[derive(Default)]
struct NumericFrame {
    ctx: Vec<Ctx>,
    /// Personality announced by `begin_array`.
    declared: Option<Personality>,
    prim: Option<(NumericClass, u8)>,
    shape: Option<Shape>,
    complex: bool,
    is_array: bool,
    data: Vec<u8>,
}

impl NumericFrame {
    fn enter(&mut self, ctx: Ctx) -> Result<()> {
        let allowed = match (ctx, self.ctx.last()) {
            (Ctx::Array, None) => self.data.is_empty() && !self.is_array,
            (Ctx::Vector(_) | Ctx::Multivector(_), None | Some(Ctx::Array)) => true,
            (Ctx::Complex, None | Some(Ctx::Array) | Some(Ctx::Vector(_))) => true,
            _ => false,
        };
        if !allowed {
            return Err(SlawError::badness("numeric shape opened inside an incompatible shape"));
        }
        let shape = match ctx {
            Ctx::Vector(n) => Some(Shape::Vector(n)),
            Ctx::Multivector(n) => Some(Shape::Multivector(n)),
            _ => None,
        };
        if let Some(shape) = shape {
            if self.shape.is_some_and(|s| s != shape) {
                return Err(SlawError::badness("array units disagree in shape"));
            }
            self.shape = Some(shape);
        }
        match ctx {
            Ctx::Array => self.is_array = true,
            Ctx::Complex => self.complex = true,
            _ => {}
        }
        self.ctx.push(ctx);
        Ok(())
    }

    fn leave(&mut self, want: fn(Ctx) -> bool) -> Result<()> {
        match self.ctx.pop() {
            Some(c) if want(c) => Ok(()),
            _ => Err(SlawError::badness("numeric shape closed out of order")),
        }
    }

    fn push_prim(&mut self, class: NumericClass, bits: u8) -> Result<()> {
        match self.prim {
            Some(p) if p != (class, bits) => Err(SlawError::badness("numeric primitives disagree in class or width")),
            _ => {
                self.prim = Some((class, bits));
                Ok(())
            }
        }
    }

    fn finish(self, target: &dyn SlawCodec) -> Result<Vec<u8>> {
        let personality = match (self.declared, self.prim) {
            (Some(p), Some((class, bits))) if p.class() != class || p.bits() != bits => {
                return Err(SlawError::badness("array primitives disagree with its personality"));
            }
            (Some(p), _) => p,
            (None, Some((class, bits))) => {
                Personality::new(class, bits, self.shape.unwrap_or(Shape::Scalar), self.complex)
                    .map_err(|_| SlawError::badness("numeric events describe no valid personality"))?
            }
            (None, None) => return Err(SlawError::badness("numeric value without primitives")),
        };
        let unit = personality.unit_bytes();
        if self.data.len() % unit != 0 || (!self.is_array && self.data.len() != unit) {
            return Err(SlawError::badness("numeric primitives do not fill whole units"));
        }
        let breadth = self.is_array.then_some((self.data.len() / unit) as u64);
        target.encode_numeric(personality, breadth, &self.data)
    }
}

impl<'c> Fabricator<'c> {
    pub fn new(target: &'c dyn SlawCodec) -> Self {
        Self { target, stack: Vec::new(), result: None }
    }

    /// The finished slaw. Fails if events were left unbalanced.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(SlawError::badness("fabrication ended with open containers"));
        }
        self.result.ok_or(SlawError::badness("fabrication produced nothing"))
    }

    /// Hands a finished child to the container on top, or keeps it as the
    /// result.
    fn add(&mut self, bytes: Vec<u8>) -> Result<()> {
        match self.stack.last_mut() {
            None if self.result.is_none() => {
                self.result = Some(bytes);
                Ok(())
            }
            None => Err(SlawError::badness("second top-level value")),
            Some(Frame::Cons(items)) if items.len() < 2 => {
                items.push(bytes);
                Ok(())
            }
            Some(Frame::Cons(_)) => Err(SlawError::badness("cons with more than two parts")),
            Some(Frame::List(items) | Frame::Map(items)) => {
                items.push(bytes);
                Ok(())
            }
            Some(Frame::Protein(p)) => {
                let dest = match p.slot {
                    Slot::Descrips => &mut p.descrips,
                    Slot::Ingests => &mut p.ingests,
                    Slot::None => return Err(SlawError::badness("protein part outside descrips or ingests")),
                };
                if dest.is_some() {
                    return Err(SlawError::badness("protein part given twice"));
                }
                *dest = Some(bytes);
                Ok(())
            }
            Some(Frame::Numeric(_)) => Err(SlawError::badness("value inside a numeric")),
        }
    }

    /// The numeric frame on top, opening one if needed.
    fn numeric(&mut self) -> Result<&mut NumericFrame> {
        if !matches!(self.stack.last(), Some(Frame::Numeric(_))) {
            self.stack.push(Frame::Numeric(NumericFrame::default()));
        }
        match self.stack.last_mut() {
            Some(Frame::Numeric(n)) => Ok(n),
            _ => Err(SlawError::badness("numeric frame missing")),
        }
    }

    /// Finishes the numeric on top once all of its shapes are closed.
    fn settle_numeric(&mut self) -> Result<()> {
        let done = matches!(self.stack.last(), Some(Frame::Numeric(n)) if n.ctx.is_empty());
        if !done {
            return Ok(());
        }
        let Some(Frame::Numeric(n)) = self.stack.pop() else {
            return Ok(());
        };
        let bytes = n.finish(self.target)?;
        self.add(bytes)
    }

    fn open_numeric(&mut self, ctx: Ctx) -> Result<()> {
        self.numeric()?.enter(ctx)
    }

    fn close_numeric(&mut self, want: fn(Ctx) -> bool) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Numeric(n)) => n.leave(want)?,
            _ => return Err(SlawError::badness("numeric shape closed with no numeric open")),
        }
        self.settle_numeric()
    }

    fn prim(&mut self, class: NumericClass, bits: u8, write: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> Result<()> {
        let n = self.numeric()?;
        n.push_prim(class, bits)?;
        write(&mut n.data)?;
        self.settle_numeric()
    }

    fn close_seq(&mut self, want: fn(&Frame) -> bool) -> Result<Frame> {
        match self.stack.pop() {
            Some(f) if want(&f) => Ok(f),
            _ => Err(SlawError::badness("container closed out of order")),
        }
    }

    fn protein_frame(&mut self) -> Result<&mut ProteinFrame> {
        match self.stack.last_mut() {
            Some(Frame::Protein(p)) => Ok(p),
            _ => Err(SlawError::badness("protein part with no protein open")),
        }
    }

    fn set_slot(&mut self, from: Slot, to: Slot) -> Result<()> {
        let p = self.protein_frame()?;
        if p.slot != from {
            return Err(SlawError::badness("protein parts opened out of order"));
        }
        p.slot = to;
        Ok(())
    }
}

impl SlawHandler for Fabricator<'_> {
    fn handle_nil(&mut self) -> Result<()> {
        let bytes = self.target.encode_nil()?;
        self.add(bytes)
    }

    fn handle_boolean(&mut self, value: bool) -> Result<()> {
        let bytes = self.target.encode_boolean(value)?;
        self.add(bytes)
    }

    fn handle_string(&mut self, value: &str) -> Result<()> {
        let bytes = self.target.encode_string(value.as_bytes())?;
        self.add(bytes)
    }

    fn handle_int(&mut self, value: i64, bits: u8) -> Result<()> {
        self.prim(NumericClass::Int, bits, |out| write_int(value, bits, out))
    }

    fn handle_unt(&mut self, value: u64, bits: u8) -> Result<()> {
        self.prim(NumericClass::Unt, bits, |out| write_unt(value, bits, out))
    }

    fn handle_float(&mut self, value: f64, bits: u8) -> Result<()> {
        self.prim(NumericClass::Float, bits, |out| write_float(value, bits, out))
    }

    fn handle_empty_array(&mut self, personality: Personality) -> Result<()> {
        if matches!(self.stack.last(), Some(Frame::Numeric(_))) {
            return Err(SlawError::badness("empty array inside a numeric"));
        }
        let bytes = self.target.encode_numeric(personality, Some(0), &[])?;
        self.add(bytes)
    }

    fn begin_cons(&mut self) -> Result<()> {
        self.stack.push(Frame::Cons(Vec::with_capacity(2)));
        Ok(())
    }

    fn end_cons(&mut self) -> Result<()> {
        let Frame::Cons(items) = self.close_seq(|f| matches!(f, Frame::Cons(_)))? else {
            return Err(SlawError::badness("container closed out of order"));
        };
        let [car, cdr] = items.as_slice() else {
            return Err(SlawError::badness("cons needs exactly two parts"));
        };
        let bytes = self.target.encode_cons(car, cdr)?;
        self.add(bytes)
    }

    fn begin_list(&mut self, len: u64) -> Result<()> {
        self.stack.push(Frame::List(Vec::with_capacity(len.min(1024) as usize)));
        Ok(())
    }

    fn end_list(&mut self) -> Result<()> {
        let Frame::List(items) = self.close_seq(|f| matches!(f, Frame::List(_)))? else {
            return Err(SlawError::badness("container closed out of order"));
        };
        let refs: Vec<&[u8]> = items.iter().map(Vec::as_slice).collect();
        let bytes = self.target.encode_list(&refs, false)?;
        self.add(bytes)
    }

    fn begin_map(&mut self, len: u64) -> Result<()> {
        self.stack.push(Frame::Map(Vec::with_capacity(len.min(1024) as usize)));
        Ok(())
    }

    fn end_map(&mut self) -> Result<()> {
        let Frame::Map(items) = self.close_seq(|f| matches!(f, Frame::Map(_)))? else {
            return Err(SlawError::badness("container closed out of order"));
        };
        let refs: Vec<&[u8]> = items.iter().map(Vec::as_slice).collect();
        let bytes = self.target.encode_list(&refs, true)?;
        self.add(bytes)
    }

    fn begin_array(&mut self, personality: Personality, _breadth: u64) -> Result<()> {
        if matches!(self.stack.last(), Some(Frame::Numeric(_))) {
            return Err(SlawError::badness("array inside a numeric"));
        }
        let n = self.numeric()?;
        n.enter(Ctx::Array)?;
        n.declared = Some(personality);
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        self.close_numeric(|c| c == Ctx::Array)
    }

    fn begin_vector(&mut self, dims: u8) -> Result<()> {
        self.open_numeric(Ctx::Vector(dims))
    }

    fn end_vector(&mut self) -> Result<()> {
        self.close_numeric(|c| matches!(c, Ctx::Vector(_)))
    }

    fn begin_multivector(&mut self, dims: u8) -> Result<()> {
        self.open_numeric(Ctx::Multivector(dims))
    }

    fn end_multivector(&mut self) -> Result<()> {
        self.close_numeric(|c| matches!(c, Ctx::Multivector(_)))
    }

    fn begin_complex(&mut self) -> Result<()> {
        self.open_numeric(Ctx::Complex)
    }

    fn end_complex(&mut self) -> Result<()> {
        self.close_numeric(|c| c == Ctx::Complex)
    }

    fn begin_protein(&mut self) -> Result<()> {
        self.stack.push(Frame::Protein(ProteinFrame::default()));
        Ok(())
    }

    fn end_protein(&mut self) -> Result<()> {
        let Frame::Protein(p) = self.close_seq(|f| matches!(f, Frame::Protein(p) if p.slot == Slot::None))? else {
            return Err(SlawError::badness("container closed out of order"));
        };
        let bytes = self
            .target
            .encode_protein(p.descrips.as_deref(), p.ingests.as_deref(), &p.rude)?;
        self.add(bytes)
    }

    fn begin_descrips(&mut self) -> Result<()> {
        self.set_slot(Slot::None, Slot::Descrips)
    }

    fn end_descrips(&mut self) -> Result<()> {
        self.set_slot(Slot::Descrips, Slot::None)
    }

    fn begin_ingests(&mut self) -> Result<()> {
        self.set_slot(Slot::None, Slot::Ingests)
    }

    fn end_ingests(&mut self) -> Result<()> {
        self.set_slot(Slot::Ingests, Slot::None)
    }

    fn handle_rude_data(&mut self, rude: &[u8]) -> Result<()> {
        let p = self.protein_frame()?;
        if !p.rude.is_empty() {
            return Err(SlawError::badness("rude data given twice"));
        }
        p.rude.extend_from_slice(rude);
        Ok(())
    }

    fn handle_nonstd_protein(&mut self, raw: &[u8]) -> Result<()> {
        let declared = self.target.byte_len(raw).ok();
        if !self.target.is_protein(raw) || declared != Some(raw.len()) {
            tracing::warn!(
                version = self.target.version(),
                declared = ?declared,
                actual = raw.len(),
                "nonstandard protein length does not match its buffer"
            );
            return Err(SlawError::CorruptProtein { context: "nonstandard protein cannot be carried into this layout" });
        }
        self.add(raw.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{V1, V2};
    use crate::error::ErrorCode;
    use crate::model::Slaw;

    fn through_v1(s: &Slaw) -> Slaw {
        let v1 = fabricate(&V2, s.as_bytes(), &V1).unwrap();
        let v2 = fabricate(&V1, &v1, &V2).unwrap();
        Slaw::from_bytes(v2).unwrap()
    }

    #[test]
    fn test_copy_same_layout_is_identical() {
        let s = Slaw::map([(&Slaw::string("k").unwrap(), &Slaw::vector(&[1.5f32, 2.5]).unwrap())]).unwrap();
        assert_eq!(fabricate(&V2, s.as_bytes(), &V2).unwrap(), s.as_bytes());
    }

    #[test]
    fn test_numeric_shapes_through_v1() {
        let samples = [
            Slaw::scalar(42u64).unwrap(),
            Slaw::complex(1.0f64, -1.0).unwrap(),
            Slaw::vector(&[1i8, 2, 3, 4]).unwrap(),
            Slaw::complex_vector(&[(1i32, 2), (3, 4), (5, 6)]).unwrap(),
            Slaw::multivector(&[7u16; 32]).unwrap(),
            Slaw::array(&[1.0f32, 2.0, 3.0]).unwrap(),
            Slaw::vector_array(&[[1i64, 2], [3, 4]]).unwrap(),
            Slaw::empty_array(Personality::of::<f64>().with_shape(Shape::Vector(3)).unwrap()).unwrap(),
        ];
        for s in &samples {
            assert_eq!(&through_v1(s), s);
        }
    }

    #[test]
    fn test_protein_through_v1() {
        let ingests = Slaw::map([(&Slaw::string("k").unwrap(), &Slaw::string("v").unwrap())]).unwrap();
        let descrips = Slaw::list(Vec::<&Slaw>::new()).unwrap();
        let p = Slaw::protein(Some(&descrips), Some(&ingests), &[1, 2, 3]).unwrap();
        let back = through_v1(&p);
        assert_eq!(back, p);
        assert_eq!(back.view().protein().unwrap().rude(), &[1, 2, 3]);
    }

    #[test]
    fn test_unbalanced_events() {
        let mut fab = Fabricator::new(&V2);
        fab.begin_list(1).unwrap();
        fab.handle_nil().unwrap();
        assert_eq!(fab.finish().unwrap_err().code(), ErrorCode::FabricatorBadness);

        let mut fab = Fabricator::new(&V2);
        fab.begin_cons().unwrap();
        fab.handle_nil().unwrap();
        assert_eq!(fab.end_cons().unwrap_err().code(), ErrorCode::FabricatorBadness);

        let mut fab = Fabricator::new(&V2);
        fab.begin_list(0).unwrap();
        assert!(fab.end_map().is_err());

        let mut fab = Fabricator::new(&V2);
        assert!(fab.end_vector().is_err());
        assert!(fab.begin_descrips().is_err());
    }

    #[test]
    fn test_mixed_primitives_rejected() {
        let mut fab = Fabricator::new(&V2);
        fab.begin_vector(2).unwrap();
        fab.handle_int(1, 32).unwrap();
        fab.handle_float(2.0, 32).unwrap_err();
    }

    #[test]
    fn test_hand_driven_numeric() {
        let mut fab = Fabricator::new(&V2);
        fab.begin_list(2).unwrap();
        fab.begin_vector(2).unwrap();
        fab.handle_unt(3, 8).unwrap();
        fab.handle_unt(4, 8).unwrap();
        fab.end_vector().unwrap();
        fab.handle_float(0.5, 64).unwrap();
        fab.end_list().unwrap();
        let got = Slaw::from_bytes(fab.finish().unwrap()).unwrap();
        let want = Slaw::list([&Slaw::vector(&[3u8, 4]).unwrap(), &Slaw::scalar(0.5f64).unwrap()]).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn test_nonstandard_protein_passes_within_layout() {
        let mut bytes = Slaw::protein(None, None, &[5; 9]).unwrap().into_bytes();
        bytes[8..16].copy_from_slice(&(1u64 << 63).to_ne_bytes());
        let p = Slaw::nonstandard_protein(bytes).unwrap();
        assert_eq!(fabricate(&V2, p.as_bytes(), &V2).unwrap(), p.as_bytes());
        let err = fabricate(&V2, p.as_bytes(), &V1).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CorruptProtein);
    }
}
