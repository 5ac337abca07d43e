/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! A slow and simple trap splitter, to compare the sweep against.
//!
//! Resolves the dispatch list of every instruction separately, then emits one
//! trap range per maximal run of equal, non-empty lists.  Any position where
//! the list changes and the boundary rules forbid a split is an error; it is
//! reported for the lowest such position, with the same lists the sweep
//! would report.

use log::{debug, info};

use crate::events::validate_traps;
use crate::inst_index::InstIx;
use crate::interface::{
  is_illegal_split, BoundaryRules, ExceptionType, Trap, TrapRange,
  TrapSplitError, TrapTable,
};
use crate::resolver::resolve_all;

pub fn split<T, R>(
  num_insts: u32, traps: &[Trap<T>], rules: &R,
) -> Result<TrapTable<T>, TrapSplitError<T>>
where
  T: ExceptionType,
  R: BoundaryRules + ?Sized,
{
  info!("reference::split: begin");
  validate_traps(num_insts, traps)?;

  let lists = resolve_all(num_insts, traps);

  for n in 1..num_insts {
    let at = InstIx::new(n);
    let prev = at.minus(1);
    if lists[prev] != lists[at] && is_illegal_split(rules, num_insts, at) {
      return Err(TrapSplitError::IllegalSplit {
        at,
        before: lists[prev].clone(),
        after: lists[at].clone(),
      });
    }
  }

  let mut ranges: Vec<TrapRange<T>> = Vec::new();
  for n in 0..num_insts {
    let at = InstIx::new(n);
    if lists[at].is_empty() {
      continue;
    }
    match ranges.last_mut() {
      Some(last) if last.range.last_plus1 == at && last.handlers == lists[at] => {
        last.range.last_plus1 = at.plus(1);
      }
      _ => {
        ranges.push(TrapRange::new(at.dotdot(at.plus(1)), lists[at].clone()));
      }
    }
  }

  debug!("reference::split: {} ranges", ranges.len());
  info!("reference::split: end");
  Ok(TrapTable { num_insts, ranges })
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::interface::AnyBoundary;

  fn trap(begin: u32, end: u32, exception: char, handler: u32) -> Trap<char> {
    Trap::new(
      InstIx::new(begin),
      InstIx::new(end),
      exception,
      InstIx::new(handler),
    )
  }

  fn shape(table: &TrapTable<char>) -> Vec<(u32, u32, Vec<(char, u32)>)> {
    table
      .ranges
      .iter()
      .map(|r| {
        (
          r.range.first.get(),
          r.range.last_plus1.get(),
          r.handlers.iter().map(|h| (h.exception, h.target.get())).collect(),
        )
      })
      .collect()
  }

  #[test]
  fn test_runs_and_gaps() {
    let traps = vec![
      trap(0, 4, 'A', 10),
      trap(2, 6, 'A', 11),
      trap(8, 9, 'B', 10),
      trap(9, 10, 'B', 10),
    ];
    let table = split(12, &traps, &AnyBoundary).unwrap();
    assert_eq!(
      shape(&table),
      vec![
        (0, 4, vec![('A', 10)]),
        (4, 6, vec![('A', 11)]),
        (8, 10, vec![('B', 10)]),
      ]
    );
  }

  #[test]
  fn test_forbidden_position_without_a_change() {
    let traps = vec![trap(0, 2, 'A', 5), trap(2, 4, 'A', 5)];
    let rules = |at: InstIx| at.get() == 2;
    let table = split(6, &traps, &rules).unwrap();
    assert_eq!(shape(&table), vec![(0, 4, vec![('A', 5)])]);
  }

  #[test]
  fn test_lowest_illegal_change_is_reported() {
    let traps = vec![trap(1, 3, 'A', 7), trap(3, 5, 'B', 7)];
    let rules = |at: InstIx| at.get() == 3 || at.get() == 5;
    match split(8, &traps, &rules) {
      Err(TrapSplitError::IllegalSplit { at, before, after }) => {
        assert_eq!(at, InstIx::new(3));
        assert_eq!(before[0].exception, 'A');
        assert_eq!(after[0].exception, 'B');
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_no_traps() {
    let table = split::<char, _>(3, &[], &AnyBoundary).unwrap();
    assert!(table.is_empty());
  }
}
