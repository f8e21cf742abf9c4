//! Proteins: descrips, ingests and rude data in one record.

use std::fmt;

use crate::codec::{ProteinParts, SlawCodec, SwapDirection, V2};
use crate::error::{Result, SlawError};
use crate::model::{Slaw, SlawRef};

/// Borrowed view of a protein.
///
/// Nonstandard proteins are opaque: their parts read as absent and only
/// [`raw_bytes`](ProteinRef::raw_bytes) is meaningful.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProteinRef<'a> {
    bytes: &'a [u8],
    parts: ProteinParts<'a>,
}

impl<'a> ProteinRef<'a> {
    pub(crate) fn new(bytes: &'a [u8], parts: ProteinParts<'a>) -> Self {
        Self { bytes, parts }
    }

    pub fn descrips(&self) -> Option<SlawRef<'a>> {
        self.parts.descrips.map(SlawRef::new)
    }

    pub fn ingests(&self) -> Option<SlawRef<'a>> {
        self.parts.ingests.map(SlawRef::new)
    }

    /// Rude data, exactly as long as it was built; empty when absent.
    pub fn rude(&self) -> &'a [u8] {
        self.parts.rude
    }

    pub fn is_nonstandard(&self) -> bool {
        self.parts.nonstandard
    }

    /// True for a standard protein with no descrips, ingests or rude data.
    pub fn is_empty(&self) -> bool {
        !self.parts.nonstandard
            && self.parts.descrips.is_none()
            && self.parts.ingests.is_none()
            && self.parts.rude.is_empty()
    }

    /// The whole encoded protein.
    pub fn raw_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Matches `needle` against the descrips.
    ///
    /// A list needle matches when its elements appear in the descrips list
    /// in order, gaps allowed; any other needle matches an equal element.
    /// Descrips that are not a list match only a needle equal to them.
    /// Returns the index of the first matching descrip.
    pub fn search<'b>(&self, needle: impl Into<SlawRef<'b>>) -> Option<usize> {
        self.search_with(needle.into(), false)
    }

    /// Like [`search`](ProteinRef::search), but a list needle must appear
    /// without gaps.
    pub fn search_contig<'b>(&self, needle: impl Into<SlawRef<'b>>) -> Option<usize> {
        self.search_with(needle.into(), true)
    }

    fn search_with(&self, needle: SlawRef<'_>, contiguous: bool) -> Option<usize> {
        let descrips = self.descrips()?;
        let Some(list) = descrips.list() else {
            return (descrips.as_bytes() == needle.as_bytes()).then_some(0);
        };
        match needle.list() {
            Some(n) if contiguous => list.contig_search(&n),
            Some(n) => list.gap_search(&n),
            None => list.find(needle),
        }
    }
}

impl fmt::Debug for ProteinRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.nonstandard {
            return write!(f, "nonstandard protein ({} bytes)", self.bytes.len());
        }
        f.debug_struct("protein")
            .field("descrips", &self.descrips())
            .field("ingests", &self.ingests())
            .field("rude", &self.parts.rude.len())
            .finish()
    }
}

impl Slaw {
    /// Builds a standard protein. Empty `rude` means no rude data.
    pub fn protein(descrips: Option<&Slaw>, ingests: Option<&Slaw>, rude: &[u8]) -> Result<Slaw> {
        let bytes = V2.encode_protein(
            descrips.map(|d| d.as_bytes()),
            ingests.map(|i| i.as_bytes()),
            rude,
        )?;
        Ok(Slaw::from_trusted(bytes))
    }

    /// Accepts an already-encoded nonstandard protein.
    ///
    /// The buffer must carry a native v2 protein header with the nonstandard
    /// flag set, and its declared length must match the buffer exactly.
    pub fn nonstandard_protein(bytes: Vec<u8>) -> Result<Slaw> {
        if !V2.is_protein(&bytes) {
            return Err(SlawError::CorruptProtein { context: "not a native-endian protein" });
        }
        if V2.byte_len(&bytes)? != bytes.len() {
            return Err(SlawError::CorruptProtein { context: "declared protein length disagrees with buffer" });
        }
        if !V2.protein_parts(&bytes)?.nonstandard {
            return Err(SlawError::CorruptProtein { context: "protein is not flagged nonstandard" });
        }
        Slaw::from_bytes(bytes)
    }
}

/// Makes a v2 protein of unknown byte order native, in place.
pub fn fix_endian(buffer: &mut [u8]) -> Result<()> {
    V2.fix_endian(buffer)
}

/// Byte-swaps a v2 protein known to come from an opposite-endian machine.
pub fn swap_endian(buffer: &mut [u8]) -> Result<()> {
    if !V2.is_swapped_protein(buffer) {
        return Err(SlawError::CorruptProtein { context: "buffer is not an opposite-endian protein" });
    }
    V2.swap(buffer, SwapDirection::ToNative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn s(v: &str) -> Slaw {
        Slaw::string(v).unwrap()
    }

    fn sample() -> Slaw {
        let descrips = Slaw::list([&s("hand"), &s("pointing"), &s("left")]).unwrap();
        let ingests = Slaw::map([(&s("x"), &Slaw::scalar(3.5f64).unwrap())]).unwrap();
        Slaw::protein(Some(&descrips), Some(&ingests), b"rude bytes!").unwrap()
    }

    #[test]
    fn test_accessors() {
        let p = sample();
        let p = p.view().protein().unwrap();
        assert!(!p.is_nonstandard());
        assert!(!p.is_empty());
        assert_eq!(p.rude(), b"rude bytes!");
        assert_eq!(p.descrips().unwrap().list().unwrap().len(), 3);
        let x = p.ingests().unwrap().list().unwrap().get("x").unwrap();
        assert_eq!(x.numeric().unwrap().get::<f64>(0), Some(3.5));

        let empty = Slaw::protein(None, None, &[]).unwrap();
        assert!(empty.view().protein().unwrap().is_empty());
    }

    #[test]
    fn test_search() {
        let p = sample();
        let p = p.view().protein().unwrap();
        assert_eq!(p.search(&s("pointing")), Some(1));
        assert_eq!(p.search(&s("right")), None);

        let gapped = Slaw::list([&s("hand"), &s("left")]).unwrap();
        assert_eq!(p.search(&gapped), Some(0));
        assert_eq!(p.search_contig(&gapped), None);

        let run = Slaw::list([&s("pointing"), &s("left")]).unwrap();
        assert_eq!(p.search_contig(&run), Some(1));
    }

    #[test]
    fn test_search_scalar_descrips() {
        let p = Slaw::protein(Some(&s("solo")), None, &[]).unwrap();
        let p = p.view().protein().unwrap();
        assert_eq!(p.search(&s("solo")), Some(0));
        assert_eq!(p.search(&s("other")), None);
    }

    #[test]
    fn test_nonstandard_protein() {
        let mut bytes = Slaw::protein(None, None, &[9; 20]).unwrap().into_bytes();
        bytes[8..16].copy_from_slice(&(1u64 << 63).to_ne_bytes());
        let p = Slaw::nonstandard_protein(bytes.clone()).unwrap();
        let view = p.view().protein().unwrap();
        assert!(view.is_nonstandard());
        assert!(view.descrips().is_none());
        assert_eq!(view.raw_bytes(), &bytes[..]);

        let standard = sample().into_bytes();
        assert_eq!(
            Slaw::nonstandard_protein(standard).unwrap_err().code(),
            ErrorCode::CorruptProtein
        );
        bytes.truncate(bytes.len() - 8);
        assert!(Slaw::nonstandard_protein(bytes).is_err());
    }

    #[test]
    fn test_fix_and_swap_endian() {
        let native = sample().into_bytes();
        let mut foreign = native.clone();
        V2.swap(&mut foreign, SwapDirection::ToForeign).unwrap();
        assert_ne!(foreign, native);

        let mut fixed = foreign.clone();
        fix_endian(&mut fixed).unwrap();
        assert_eq!(fixed, native);

        let mut swapped = foreign;
        swap_endian(&mut swapped).unwrap();
        assert_eq!(swapped, native);

        // already native: fix is a no-op, swap refuses
        let mut again = native.clone();
        fix_endian(&mut again).unwrap();
        assert_eq!(again, native);
        assert!(swap_endian(&mut again).is_err());

        let mut not_protein = Slaw::nil().unwrap().into_bytes();
        assert_eq!(fix_endian(&mut not_protein).unwrap_err().code(), ErrorCode::CorruptProtein);
    }
}
