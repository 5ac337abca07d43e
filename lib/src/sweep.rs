/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Range sweep: cut the body at every trap boundary and compute one dispatch
//! list per piece.
//!
//! Between two consecutive boundaries the set of covering traps is constant,
//! so is the dispatch list.  We walk the boundaries left to right, keeping
//! the covering traps in a set ordered by declaration index, and feed that
//! set to the first-match rule once per piece.  Pieces no trap covers become
//! gaps.  Adjacent pieces may end up with equal lists; merging them is left
//! to the legalizer and the coalescer.

use log::{debug, trace};

use std::collections::BTreeSet;

use crate::events::TrapEvents;
use crate::inst_index::TrapIx;
use crate::interface::{ExceptionType, Trap, TrapRange};
use crate::resolver::first_match;

pub fn sweep<T: ExceptionType>(
  traps: &[Trap<T>], events: &TrapEvents,
) -> Vec<TrapRange<T>> {
  let mut active = BTreeSet::<TrapIx>::new();
  let mut cursor_opens = 0;
  let mut cursor_closes = 0;
  let mut candidates = Vec::new();

  for window in events.boundaries.windows(2) {
    let (first, last_plus1) = (window[0], window[1]);

    // Bring the covering set up to date for `first`.
    while cursor_closes < events.closes.len()
      && events.closes[cursor_closes].0 <= first
    {
      active.remove(&events.closes[cursor_closes].1);
      cursor_closes += 1;
    }
    while cursor_opens < events.opens.len()
      && events.opens[cursor_opens].0 <= first
    {
      active.insert(events.opens[cursor_opens].1);
      cursor_opens += 1;
    }

    if active.is_empty() {
      trace!("sweep: gap {:?}", first.dotdot(last_plus1));
      continue;
    }

    let handlers = first_match(active.iter().map(|tix| &traps[tix.index()]));
    debug_assert!(!handlers.is_empty());
    trace!("sweep: {:?} -> {:?}", first.dotdot(last_plus1), handlers);
    candidates.push(TrapRange::new(first.dotdot(last_plus1), handlers));
  }

  debug!("sweep: {} candidate ranges", candidates.len());
  candidates
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::events::build_events;
  use crate::inst_index::InstIx;
  use crate::resolver::HandlerListResolver;

  fn trap(begin: u32, end: u32, exception: char, handler: u32) -> Trap<char> {
    Trap::new(
      InstIx::new(begin),
      InstIx::new(end),
      exception,
      InstIx::new(handler),
    )
  }

  fn run(num_insts: u32, traps: &[Trap<char>]) -> Vec<TrapRange<char>> {
    let events = build_events(num_insts, traps).unwrap();
    sweep(traps, &events)
  }

  fn shape(ranges: &[TrapRange<char>]) -> Vec<(u32, u32, Vec<(char, u32)>)> {
    ranges
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
  fn test_overlapping_same_type() {
    // Every boundary makes a piece, even where the list doesn't change.
    let traps = vec![trap(0, 4, 'A', 10), trap(2, 6, 'A', 11)];
    assert_eq!(
      shape(&run(12, &traps)),
      vec![
        (0, 2, vec![('A', 10)]),
        (2, 4, vec![('A', 10)]),
        (4, 6, vec![('A', 11)]),
      ]
    );
  }

  #[test]
  fn test_gaps_are_skipped() {
    let traps = vec![trap(1, 3, 'A', 9), trap(5, 6, 'B', 9)];
    assert_eq!(
      shape(&run(10, &traps)),
      vec![(1, 3, vec![('A', 9)]), (5, 6, vec![('B', 9)])]
    );
  }

  #[test]
  fn test_nested_and_shadowed() {
    let traps = vec![
      trap(2, 4, 'A', 20),
      trap(0, 8, 'A', 21),
      trap(0, 8, 'B', 22),
      trap(3, 6, 'B', 23),
    ];
    assert_eq!(
      shape(&run(24, &traps)),
      vec![
        (0, 2, vec![('A', 21), ('B', 22)]),
        (2, 3, vec![('A', 20), ('B', 22)]),
        (3, 4, vec![('A', 20), ('B', 22)]),
        (4, 6, vec![('A', 21), ('B', 22)]),
        (6, 8, vec![('A', 21), ('B', 22)]),
      ]
    );
  }

  #[test]
  fn test_matches_per_instruction_resolution() {
    let traps = vec![
      trap(3, 9, 'C', 1),
      trap(0, 5, 'A', 2),
      trap(4, 12, 'A', 3),
      trap(7, 8, 'B', 4),
      trap(0, 12, 'B', 5),
      trap(10, 11, 'C', 6),
    ];
    let resolver = HandlerListResolver::new(&traps);
    let ranges = run(12, &traps);
    for r in &ranges {
      for at in r.range.iter() {
        assert_eq!(r.handlers, resolver.resolve(at), "at {:?}", at);
      }
    }
    // Everything is covered by the last-but-one trap, so no gaps.
    let covered: u32 = ranges.iter().map(|r| r.range.len()).sum();
    assert_eq!(covered, 12);
  }
}
