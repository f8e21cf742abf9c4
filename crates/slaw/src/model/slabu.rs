//! Mutable builder for lists, maps and proteins.
//!
//! A [`Slabu`] owns every entry it holds. It may or may not satisfy the map
//! invariant (only conses, no two with equal cars); every structural change
//! marks it unchecked and [`Slabu::map_conform`] restores it.
//!
//! # Example
//!
//! ```rust
//! use slaw::{Slabu, Slaw};
//!
//! let mut sb = Slabu::new();
//! sb.map_put(Slaw::string("k").unwrap(), Slaw::scalar(1i32).unwrap()).unwrap();
//! sb.map_put(Slaw::string("k").unwrap(), Slaw::scalar(2i32).unwrap()).unwrap();
//! let map = sb.into_map().unwrap();
//! assert_eq!(map.view().list().unwrap().len(), 1);
//! ```

use std::cmp::Ordering;

use rustc_hash::FxHashSet;

use crate::codec::{SlawCodec, V2};
use crate::error::{Result, SlawError};
use crate::model::{ListRef, Slaw, SlawRef, SlawType};
use crate::ordering;

/// Ordered, owned builder entries.
#[derive(Debug, Clone)]
pub struct Slabu {
    entries: Vec<Slaw>,
    /// Known to satisfy the map invariant.
    map_clean: bool,
}

impl Slabu {
    pub fn new() -> Self {
        Self { entries: Vec::new(), map_clean: true }
    }

    /// Copies the elements of a list or map.
    pub fn from_list(list: &ListRef<'_>) -> Self {
        Self {
            entries: list.iter().map(Slaw::from).collect(),
            map_clean: false,
        }
    }

    /// One string entry per piece of `text` between occurrences of `sep`.
    /// A trailing separator adds no empty piece, and an empty `text` gives
    /// an empty builder.
    pub fn from_split(text: &str, sep: &str) -> Result<Self> {
        let mut sb = Self::new();
        for piece in split_terms(text, sep) {
            sb.push(Slaw::string(piece)?);
        }
        Ok(sb)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slaw> {
        self.entries.iter()
    }

    /// Entry at `index`; negative indices count back from the end.
    pub fn nth(&self, index: i64) -> Option<&Slaw> {
        self.resolve(index).ok().map(|i| &self.entries[i])
    }

    /// Appends and returns the new entry's index.
    pub fn push(&mut self, s: Slaw) -> usize {
        self.entries.push(s);
        self.map_clean = false;
        self.entries.len() - 1
    }

    /// Inserts before `index`, or appends when `index` is -1.
    pub fn insert(&mut self, index: i64, s: Slaw) -> Result<usize> {
        let at = match index {
            -1 => self.entries.len(),
            i if i >= 0 && i as usize <= self.entries.len() => i as usize,
            _ => return Err(self.bad_index(index)),
        };
        self.entries.insert(at, s);
        self.map_clean = false;
        Ok(at)
    }

    /// Replaces the entry at `index`; -1 names the last entry.
    pub fn replace(&mut self, index: i64, s: Slaw) -> Result<Slaw> {
        let at = match index {
            -1 if !self.entries.is_empty() => self.entries.len() - 1,
            i if i >= 0 && (i as usize) < self.entries.len() => i as usize,
            _ => return Err(self.bad_index(index)),
        };
        self.map_clean = false;
        Ok(std::mem::replace(&mut self.entries[at], s))
    }

    /// Removes the entry at `index`; negative indices count back from the end.
    pub fn remove_nth(&mut self, index: i64) -> Result<Slaw> {
        let at = self.resolve(index)?;
        self.map_clean = false;
        Ok(self.entries.remove(at))
    }

    /// Removes the first entry byte-equal to `s` and returns its index.
    pub fn remove<'a>(&mut self, s: impl Into<SlawRef<'a>>) -> Result<usize> {
        let at = self.find(s).ok_or(SlawError::NotFound)?;
        self.entries.remove(at);
        self.map_clean = false;
        Ok(at)
    }

    /// Index of the first entry byte-equal to `s`.
    pub fn find<'a>(&self, s: impl Into<SlawRef<'a>>) -> Option<usize> {
        let needle = s.into();
        self.entries.iter().position(|e| e.as_bytes() == needle.as_bytes())
    }

    // === Maps ===

    /// Sets `key` to `value`, replacing an existing entry in place or
    /// appending. Returns the entry's index.
    pub fn map_put(&mut self, key: Slaw, value: Slaw) -> Result<usize> {
        self.map_conform();
        let entry = Slaw::cons(&key, &value)?;
        let existing = self
            .entries
            .iter()
            .position(|e| car(e).is_some_and(|k| ordering::compare(&V2, k, key.as_bytes()) == Ordering::Equal));
        match existing {
            Some(at) => {
                self.entries[at] = entry;
                Ok(at)
            }
            None => {
                self.entries.push(entry);
                Ok(self.entries.len() - 1)
            }
        }
    }

    /// Value stored under `key`, after restoring the map invariant.
    pub fn map_find<'a>(&mut self, key: impl Into<SlawRef<'a>>) -> Option<SlawRef<'_>> {
        self.map_conform();
        let key = key.into();
        self.entries
            .iter()
            .filter_map(|e| e.view().cons())
            .find(|(k, _)| ordering::compare(&V2, k.as_bytes(), key.as_bytes()) == Ordering::Equal)
            .map(|(_, v)| v)
    }

    /// Removes the entry stored under `key` and returns it.
    pub fn map_remove<'a>(&mut self, key: impl Into<SlawRef<'a>>) -> Result<Slaw> {
        self.map_conform();
        let key = key.into();
        let at = self
            .entries
            .iter()
            .position(|e| car(e).is_some_and(|k| ordering::compare(&V2, k, key.as_bytes()) == Ordering::Equal))
            .ok_or(SlawError::NotFound)?;
        Ok(self.entries.remove(at))
    }

    /// True when every entry is a cons and no two cars are equal.
    pub fn is_map(&self) -> bool {
        if self.map_clean {
            return true;
        }
        let Some(cars) = self.entries.iter().map(car).collect::<Option<Vec<_>>>() else {
            return false;
        };
        // string keys compare by their text, so hashing it is exact
        if let Some(texts) = cars.iter().map(|&k| V2.string_bytes(k).ok()).collect::<Option<Vec<_>>>() {
            let mut seen = FxHashSet::with_capacity_and_hasher(texts.len(), Default::default());
            return texts.into_iter().all(|t| seen.insert(t));
        }
        let mut sorted = cars;
        sorted.sort_by(|a, b| ordering::compare(&V2, a, b));
        sorted
            .windows(2)
            .all(|w| ordering::compare(&V2, w[0], w[1]) != Ordering::Equal)
    }

    /// Restores the map invariant: drops non-cons entries and collapses
    /// entries with equal keys into the last value, kept at the position of
    /// the first. Returns whether anything changed.
    pub fn map_conform(&mut self) -> bool {
        if self.map_clean {
            return false;
        }
        let before = self.entries.len();
        let mut tagged: Vec<(usize, Slaw)> = std::mem::take(&mut self.entries)
            .into_iter()
            .enumerate()
            .filter(|(_, e)| e.slaw_type() == SlawType::Cons)
            .collect();
        let mut changed = tagged.len() != before;

        // equal keys become adjacent, in insertion order
        tagged.sort_by(|(ia, a), (ib, b)| key_cmp(a, b).then(ia.cmp(ib)));

        let mut survivors: Vec<(usize, Slaw)> = Vec::with_capacity(tagged.len());
        for (idx, e) in tagged {
            match survivors.last_mut() {
                Some((_, kept)) if key_cmp(kept, &e) == Ordering::Equal => {
                    *kept = e;
                    changed = true;
                }
                _ => survivors.push((idx, e)),
            }
        }
        survivors.sort_by_key(|(idx, _)| *idx);

        self.entries = survivors.into_iter().map(|(_, e)| e).collect();
        self.map_clean = true;
        changed
    }

    // === Finishing ===

    pub fn into_list(self) -> Result<Slaw> {
        let items: Vec<&[u8]> = self.entries.iter().map(Slaw::as_bytes).collect();
        Ok(Slaw::from_trusted(V2.encode_list(&items, false)?))
    }

    /// Restores the map invariant and builds a map.
    pub fn into_map(mut self) -> Result<Slaw> {
        self.map_conform();
        let items: Vec<&[u8]> = self.entries.iter().map(Slaw::as_bytes).collect();
        Ok(Slaw::from_trusted(V2.encode_list(&items, true)?))
    }

    /// Builds a protein whose descrips are this builder's entries as a list
    /// and whose ingests, when given, are `ingests` as a map.
    pub fn into_protein(self, ingests: Option<Slabu>, rude: &[u8]) -> Result<Slaw> {
        let descrips = self.into_list()?;
        let ingests = ingests.map(Slabu::into_map).transpose()?;
        Slaw::protein(Some(&descrips), ingests.as_ref(), rude)
    }

    fn resolve(&self, index: i64) -> Result<usize> {
        let len = self.entries.len() as i64;
        let i = if index < 0 { len + index } else { index };
        if i < 0 || i >= len {
            return Err(self.bad_index(index));
        }
        Ok(i as usize)
    }

    fn bad_index(&self, index: i64) -> SlawError {
        SlawError::BadIndex { index, len: self.entries.len() }
    }
}

impl Default for Slabu {
    fn default() -> Self {
        Self::new()
    }
}

/// Pieces of `text` between occurrences of `sep`, without a trailing empty
/// piece. An empty `sep` never splits.
pub(crate) fn split_terms<'t>(text: &'t str, sep: &str) -> Vec<&'t str> {
    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(sep).filter(|_| !sep.is_empty()) {
            Some(at) => {
                out.push(&rest[..at]);
                rest = &rest[at + sep.len()..];
            }
            None => {
                out.push(rest);
                break;
            }
        }
    }
    out
}

fn car(s: &Slaw) -> Option<&[u8]> {
    V2.cons_parts(s.as_bytes()).ok().map(|(car, _)| car)
}

fn key_cmp(a: &Slaw, b: &Slaw) -> Ordering {
    match (car(a), car(b)) {
        (Some(ka), Some(kb)) => ordering::compare(&V2, ka, kb),
        _ => a.cmp(b),
    }
}
