/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Typed positions for instructions and traps, half-open instruction ranges,
//! and vectors indexed by those positions.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::slice::Iter;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

//=============================================================================
// Index types.  Instructions are identified by their ordinal position in the
// method body, traps by their position in the declared trap list (which is
// also their priority).

macro_rules! generate_boilerplate {
  ($TypeIx:ident, $PrintingPrefix:expr) => {
    #[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
    #[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
    pub struct $TypeIx(u32);

    impl $TypeIx {
      #[inline(always)]
      pub fn new(n: u32) -> Self {
        Self(n)
      }
      #[inline(always)]
      pub fn get(self) -> u32 {
        self.0
      }
      #[inline(always)]
      pub fn index(self) -> usize {
        self.0 as usize
      }
      pub fn plus(self, delta: u32) -> Self {
        Self(self.0 + delta)
      }
      pub fn minus(self, delta: u32) -> Self {
        Self(self.0 - delta)
      }
    }

    impl fmt::Debug for $TypeIx {
      fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}{}", $PrintingPrefix, self.0)
      }
    }

    impl From<$TypeIx> for u32 {
      fn from(ix: $TypeIx) -> u32 {
        ix.0
      }
    }
  };
}

generate_boilerplate!(InstIx, "i");

generate_boilerplate!(TrapIx, "t");

impl InstIx {
  /// The half-open range `[self, last_plus1)`.
  pub fn dotdot(self, last_plus1: InstIx) -> InstRange {
    InstRange::new(self, last_plus1)
  }
}

//=============================================================================
// Half-open instruction ranges.

/// The instructions `[first, last_plus1)`.  Empty ranges are representable
/// but never appear in a finished trap table.
#[derive(Copy, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct InstRange {
  pub first: InstIx,
  pub last_plus1: InstIx,
}

impl InstRange {
  pub fn new(first: InstIx, last_plus1: InstIx) -> Self {
    Self { first, last_plus1 }
  }

  pub fn len(&self) -> u32 {
    self.last_plus1.get().saturating_sub(self.first.get())
  }

  pub fn is_empty(&self) -> bool {
    self.first >= self.last_plus1
  }

  pub fn contains(&self, at: InstIx) -> bool {
    self.first <= at && at < self.last_plus1
  }

  pub fn iter(&self) -> impl Iterator<Item = InstIx> {
    (self.first.get()..self.last_plus1.get()).map(InstIx::new)
  }
}

impl fmt::Debug for InstRange {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    write!(fmt, "[{}, {})", self.first.get(), self.last_plus1.get())
  }
}

//=============================================================================
// Vectors where both the index and element types can be specified.  Used for
// per-instruction results (one element per instruction of the body).

pub struct TypedIxVec<TyIx, Ty> {
  vek: Vec<Ty>,
  ty_ix: PhantomData<TyIx>,
}

impl<TyIx, Ty> TypedIxVec<TyIx, Ty>
where
  Ty: Clone,
{
  pub fn new() -> Self {
    Self { vek: Vec::new(), ty_ix: PhantomData::<TyIx> }
  }
  pub fn from_vec(vek: Vec<Ty>) -> Self {
    Self { vek, ty_ix: PhantomData::<TyIx> }
  }
  pub fn filled(len: u32, value: Ty) -> Self {
    Self::from_vec(vec![value; len as usize])
  }
  pub fn iter(&self) -> Iter<Ty> {
    self.vek.iter()
  }
  pub fn len(&self) -> u32 {
    self.vek.len() as u32
  }
  pub fn is_empty(&self) -> bool {
    self.vek.is_empty()
  }
  pub fn push(&mut self, item: Ty) {
    self.vek.push(item);
  }
}

impl<TyIx, Ty> Index<TyIx> for TypedIxVec<TyIx, Ty>
where
  TyIx: Into<u32>,
{
  type Output = Ty;
  fn index(&self, ix: TyIx) -> &Ty {
    &self.vek[ix.into() as usize]
  }
}

impl<TyIx, Ty> IndexMut<TyIx> for TypedIxVec<TyIx, Ty>
where
  TyIx: Into<u32>,
{
  fn index_mut(&mut self, ix: TyIx) -> &mut Ty {
    &mut self.vek[ix.into() as usize]
  }
}

impl<TyIx, Ty> Clone for TypedIxVec<TyIx, Ty>
where
  Ty: Clone,
{
  fn clone(&self) -> Self {
    Self { vek: self.vek.clone(), ty_ix: PhantomData::<TyIx> }
  }
}

impl<TyIx, Ty: fmt::Debug> fmt::Debug for TypedIxVec<TyIx, Ty> {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    self.vek.fmt(fmt)
  }
}

/// Per-instruction vector.
pub type InstMap<Ty> = TypedIxVec<InstIx, Ty>;

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_inst_range() {
    let r = InstIx::new(2).dotdot(InstIx::new(5));
    assert_eq!(r.len(), 3);
    assert!(!r.is_empty());
    assert!(r.contains(InstIx::new(2)));
    assert!(r.contains(InstIx::new(4)));
    assert!(!r.contains(InstIx::new(5)));
    assert_eq!(
      r.iter().collect::<Vec<_>>(),
      vec![InstIx::new(2), InstIx::new(3), InstIx::new(4)]
    );
    assert_eq!(format!("{:?}", r), "[2, 5)");

    let empty = InstIx::new(3).dotdot(InstIx::new(3));
    assert!(empty.is_empty());
    assert_eq!(empty.len(), 0);
  }

  #[test]
  fn test_typed_ix_vec() {
    let mut v = InstMap::filled(3, 0u32);
    v[InstIx::new(1)] = 7;
    v.push(9);
    assert_eq!(v.len(), 4);
    assert_eq!(v.iter().cloned().collect::<Vec<_>>(), vec![0, 7, 0, 9]);
    assert_eq!(format!("{:?}", InstIx::new(3)), "i3");
    assert_eq!(format!("{:?}", TrapIx::new(0)), "t0");
  }
}
