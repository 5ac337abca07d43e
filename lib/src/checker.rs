/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Checker: verifies that a rewritten trap list dispatches exactly like the
//! original one, and that a trap table has the shape the encoder expects.
//!
//! Equivalence is checked pointwise.  For every instruction we resolve the
//! dispatch list under both trap lists (first declared trap wins, one entry per
//! exception type) and require the two lists to be equal, order included.
//! Nothing else about the trap lists needs to agree: they may differ in
//! length, in how ranges are cut, or in shadowed traps that never apply.
//!
//! The structural checks are the invariants of a finished `TrapTable`:
//!
//!   - ranges are non-empty, inside the body, sorted and pairwise disjoint;
//!   - each range has at least one handler and no exception type twice;
//!   - no range begins or ends at a position the boundary rules forbid;
//!   - no two touching ranges have equal handler lists.
//!
//! All problems found are reported, not just the first.

use log::debug;
use thiserror::Error;

use std::fmt;

use crate::events::validate_traps;
use crate::inst_index::{InstIx, InstRange, TrapIx};
use crate::interface::{
  is_illegal_split, BoundaryRules, ExceptionType, HandlerList, MethodBody,
  Trap, TrapTable,
};
use crate::resolver::resolve_all;

/// Which of the two compared trap lists a problem was found in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
  Before,
  After,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CheckerError<T: fmt::Debug> {
  /// The two bodies don't have the same number of instructions, so there is
  /// nothing to compare pointwise.
  #[error("bodies differ in length: {before} instructions before, {after} after")]
  Precompare { before: u32, after: u32 },

  #[error("{side:?}: trap {trap:?} is malformed")]
  MalformedTrap { side: Side, trap: TrapIx },

  #[error("at {at:?}: expected handlers {expected:?}, found {actual:?}")]
  Mismatch { at: InstIx, expected: HandlerList<T>, actual: HandlerList<T> },

  #[error("trap range {range:?} is empty")]
  EmptyRange { range: InstRange },

  #[error("trap range {range:?} runs past the end of the body ({num_insts} instructions)")]
  OutOfBounds { range: InstRange, num_insts: u32 },

  #[error("trap range {range:?} has no handlers")]
  NoHandlers { range: InstRange },

  #[error("trap range {range:?} lists {exception:?} more than once")]
  DuplicateException { range: InstRange, exception: T },

  #[error("trap ranges {first:?} and {second:?} overlap or are out of order")]
  Overlap { first: InstRange, second: InstRange },

  #[error("trap range boundary at illegal position {at:?}")]
  IllegalBoundary { at: InstIx },

  #[error("trap ranges {first:?} and {second:?} touch and have equal handlers")]
  NotCoalesced { first: InstRange, second: InstRange },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckerErrors<T: fmt::Debug> {
  pub errors: Vec<CheckerError<T>>,
}

impl<T: fmt::Debug> fmt::Display for CheckerErrors<T> {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    write!(fmt, "{} error(s)", self.errors.len())?;
    for e in &self.errors {
      write!(fmt, "\n  {}", e)?;
    }
    Ok(())
  }
}

impl<T: fmt::Debug> std::error::Error for CheckerErrors<T> {}

impl<T: fmt::Debug> CheckerErrors<T> {
  fn new() -> Self {
    Self { errors: Vec::new() }
  }

  fn into_result(self) -> Result<(), Self> {
    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(self)
    }
  }
}

fn check_well_formed<T: ExceptionType>(
  side: Side, num_insts: u32, traps: &[Trap<T>], errors: &mut CheckerErrors<T>,
) {
  // Report every malformed trap, not only the first one validation stops at.
  for (ix, t) in traps.iter().enumerate() {
    if validate_traps(num_insts, std::slice::from_ref(t)).is_err() {
      errors.errors.push(CheckerError::MalformedTrap {
        side,
        trap: TrapIx::new(ix as u32),
      });
    }
  }
}

/// Checks that `after` dispatches every instruction exactly like `before`.
///
/// The bodies must have the same length.  If `before` has no traps at all the
/// check passes trivially.
pub fn check_equivalence<T: ExceptionType>(
  num_insts_before: u32, before: &[Trap<T>], num_insts_after: u32,
  after: &[Trap<T>],
) -> Result<(), CheckerErrors<T>> {
  let mut errors = CheckerErrors::new();
  if num_insts_before != num_insts_after {
    errors.errors.push(CheckerError::Precompare {
      before: num_insts_before,
      after: num_insts_after,
    });
    return errors.into_result();
  }
  if before.is_empty() {
    return Ok(());
  }

  let num_insts = num_insts_before;
  check_well_formed(Side::Before, num_insts, before, &mut errors);
  check_well_formed(Side::After, num_insts, after, &mut errors);
  if !errors.errors.is_empty() {
    return errors.into_result();
  }

  let expected = resolve_all(num_insts, before);
  let actual = resolve_all(num_insts, after);
  for n in 0..num_insts {
    let at = InstIx::new(n);
    if expected[at] != actual[at] {
      errors.errors.push(CheckerError::Mismatch {
        at,
        expected: expected[at].clone(),
        actual: actual[at].clone(),
      });
    }
  }

  debug!(
    "check_equivalence: {} insts, {} vs {} traps, {} mismatches",
    num_insts,
    before.len(),
    after.len(),
    errors.errors.len()
  );
  errors.into_result()
}

/// `check_equivalence` over two method bodies.
pub fn check_bodies<F, G>(
  before: &F, after: &G,
) -> Result<(), CheckerErrors<F::Exception>>
where
  F: MethodBody,
  G: MethodBody<Exception = F::Exception>,
{
  check_equivalence(
    before.num_insts(),
    before.traps(),
    after.num_insts(),
    after.traps(),
  )
}

fn collect_structure_errors<T, R>(
  table: &TrapTable<T>, rules: &R, errors: &mut CheckerErrors<T>,
) where
  T: ExceptionType,
  R: BoundaryRules + ?Sized,
{
  let num_insts = table.num_insts;
  let mut last_illegal: Option<InstIx> = None;

  for (ix, r) in table.ranges.iter().enumerate() {
    let range = r.range;
    if range.is_empty() {
      errors.errors.push(CheckerError::EmptyRange { range });
    }
    if range.last_plus1.get() > num_insts {
      errors.errors.push(CheckerError::OutOfBounds { range, num_insts });
    }
    if r.handlers.is_empty() {
      errors.errors.push(CheckerError::NoHandlers { range });
    }
    for (i, h) in r.handlers.iter().enumerate() {
      if r.handlers[..i].iter().any(|prev| prev.exception == h.exception) {
        errors.errors.push(CheckerError::DuplicateException {
          range,
          exception: h.exception,
        });
      }
    }

    for &at in &[range.first, range.last_plus1] {
      if last_illegal != Some(at) && is_illegal_split(rules, num_insts, at) {
        errors.errors.push(CheckerError::IllegalBoundary { at });
        last_illegal = Some(at);
      }
    }

    if ix > 0 {
      let prev = &table.ranges[ix - 1];
      if prev.range.last_plus1 > range.first {
        errors.errors.push(CheckerError::Overlap {
          first: prev.range,
          second: range,
        });
      } else if prev.range.last_plus1 == range.first
        && prev.handlers == r.handlers
      {
        errors.errors.push(CheckerError::NotCoalesced {
          first: prev.range,
          second: range,
        });
      }
    }
  }
}

/// Checks the structural invariants of a trap table.
pub fn check_structure<T, R>(
  table: &TrapTable<T>, rules: &R,
) -> Result<(), CheckerErrors<T>>
where
  T: ExceptionType,
  R: BoundaryRules + ?Sized,
{
  let mut errors = CheckerErrors::new();
  collect_structure_errors(table, rules, &mut errors);
  errors.into_result()
}

/// Full check of a pass result: structure, plus equivalence of every
/// instruction's dispatch list with the one `traps` gives it.  Unlike
/// `check_equivalence` this doesn't let an empty `traps` off the hook.
pub fn check_table<T, R>(
  num_insts: u32, traps: &[Trap<T>], table: &TrapTable<T>, rules: &R,
) -> Result<(), CheckerErrors<T>>
where
  T: ExceptionType,
  R: BoundaryRules + ?Sized,
{
  let mut errors = CheckerErrors::new();
  if num_insts != table.num_insts {
    errors.errors.push(CheckerError::Precompare {
      before: num_insts,
      after: table.num_insts,
    });
    return errors.into_result();
  }

  check_well_formed(Side::Before, num_insts, traps, &mut errors);
  collect_structure_errors(table, rules, &mut errors);
  if !errors.errors.is_empty() {
    return errors.into_result();
  }

  let expected = resolve_all(num_insts, traps);
  for n in 0..num_insts {
    let at = InstIx::new(n);
    let actual = table.handlers_at(at);
    if expected[at].as_slice() != actual {
      errors.errors.push(CheckerError::Mismatch {
        at,
        expected: expected[at].clone(),
        actual: HandlerList::from_slice(actual),
      });
    }
  }
  errors.into_result()
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::interface::{AnyBoundary, Handler, TrapRange};

  fn trap(begin: u32, end: u32, exception: char, handler: u32) -> Trap<char> {
    Trap::new(
      InstIx::new(begin),
      InstIx::new(end),
      exception,
      InstIx::new(handler),
    )
  }

  fn range(first: u32, last_plus1: u32, handlers: &[(char, u32)]) -> TrapRange<char> {
    TrapRange::new(
      InstIx::new(first).dotdot(InstIx::new(last_plus1)),
      handlers
        .iter()
        .map(|&(exception, target)| Handler { exception, target: InstIx::new(target) })
        .collect(),
    )
  }

  #[test]
  fn test_precompare() {
    let traps = vec![trap(0, 2, 'A', 3)];
    let errs = check_equivalence(4, &traps, 5, &traps).unwrap_err();
    assert_eq!(errs.errors, vec![CheckerError::Precompare { before: 4, after: 5 }]);
  }

  #[test]
  fn test_no_original_traps_is_trivially_equivalent() {
    assert!(check_equivalence::<char>(4, &[], 4, &[]).is_ok());
    assert!(check_equivalence(4, &[], 4, &[trap(0, 1, 'A', 2)]).is_ok());
    // Still needs equal lengths.
    assert!(check_equivalence::<char>(4, &[], 3, &[]).is_err());
  }

  #[test]
  fn test_equivalent_rewrites() {
    let before = vec![trap(0, 4, 'A', 7), trap(2, 6, 'A', 8), trap(1, 5, 'B', 9)];
    // Cut differently, with the shadowed part of the second trap dropped and
    // a trap added that is shadowed everywhere it applies.
    let after = vec![
      trap(0, 1, 'A', 7),
      trap(1, 4, 'A', 7),
      trap(1, 4, 'B', 9),
      trap(4, 5, 'A', 8),
      trap(4, 5, 'B', 9),
      trap(5, 6, 'A', 8),
      trap(2, 3, 'A', 6),
    ];
    check_equivalence(10, &before, 10, &after).unwrap();
  }

  #[test]
  fn test_mismatches_are_all_reported() {
    let before = vec![trap(0, 4, 'A', 7), trap(0, 4, 'B', 8)];
    let after = vec![trap(0, 2, 'A', 7), trap(0, 4, 'B', 8), trap(2, 4, 'A', 7)];
    let errs = check_equivalence(10, &before, 10, &after).unwrap_err();
    let positions: Vec<u32> = errs
      .errors
      .iter()
      .map(|e| match e {
        CheckerError::Mismatch { at, expected, actual } => {
          assert_eq!(expected[0].exception, 'A');
          assert_eq!(actual[0].exception, 'B');
          at.get()
        }
        other => panic!("unexpected {:?}", other),
      })
      .collect();
    assert_eq!(positions, vec![2, 3]);
    assert!(errs.to_string().starts_with("2 error(s)"));
  }

  #[test]
  fn test_malformed_input() {
    let errs = check_equivalence(4, &[trap(0, 5, 'A', 0)], 4, &[trap(1, 1, 'A', 0)])
      .unwrap_err();
    assert_eq!(
      errs.errors,
      vec![
        CheckerError::MalformedTrap { side: Side::Before, trap: TrapIx::new(0) },
        CheckerError::MalformedTrap { side: Side::After, trap: TrapIx::new(0) },
      ]
    );
  }

  #[test]
  fn test_structure_ok() {
    let table = TrapTable {
      num_insts: 10,
      ranges: vec![range(0, 2, &[('A', 9)]), range(2, 4, &[('B', 9)]), range(5, 6, &[('A', 9)])],
    };
    check_structure(&table, &AnyBoundary).unwrap();
  }

  #[test]
  fn test_structure_errors() {
    let table = TrapTable {
      num_insts: 10,
      ranges: vec![
        range(0, 2, &[('A', 9), ('A', 8)]),
        range(1, 3, &[('B', 9)]),
        range(3, 3, &[('B', 9)]),
        range(4, 6, &[]),
        range(6, 8, &[('C', 1)]),
        range(8, 11, &[('C', 1)]),
      ],
    };
    let rules = |at: InstIx| at.get() == 6;
    let errs = check_structure(&table, &rules).unwrap_err();
    let r = |a: u32, b: u32| InstIx::new(a).dotdot(InstIx::new(b));
    assert_eq!(
      errs.errors,
      vec![
        CheckerError::DuplicateException { range: r(0, 2), exception: 'A' },
        CheckerError::Overlap { first: r(0, 2), second: r(1, 3) },
        CheckerError::EmptyRange { range: r(3, 3) },
        CheckerError::NotCoalesced { first: r(1, 3), second: r(3, 3) },
        CheckerError::NoHandlers { range: r(4, 6) },
        // Reported once, though two ranges meet there.
        CheckerError::IllegalBoundary { at: InstIx::new(6) },
        CheckerError::OutOfBounds { range: r(8, 11), num_insts: 10 },
        CheckerError::NotCoalesced { first: r(6, 8), second: r(8, 11) },
      ]
    );
  }

  #[test]
  fn test_check_table() {
    let traps = vec![trap(0, 4, 'A', 7), trap(2, 6, 'A', 8)];
    let good = TrapTable {
      num_insts: 10,
      ranges: vec![range(0, 4, &[('A', 7)]), range(4, 6, &[('A', 8)])],
    };
    check_table(10, &traps, &good, &AnyBoundary).unwrap();

    let bad = TrapTable { num_insts: 10, ranges: vec![range(0, 6, &[('A', 7)])] };
    let errs = check_table(10, &traps, &bad, &AnyBoundary).unwrap_err();
    assert_eq!(errs.errors.len(), 2);

    // An empty trap list must map to an empty table.
    let errs = check_table(10, &[], &good, &AnyBoundary).unwrap_err();
    assert_eq!(errs.errors.len(), 6);
  }
}
