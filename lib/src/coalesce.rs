/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Merging of touching ranges with equal dispatch lists.

use log::{debug, trace};

use crate::interface::{ExceptionType, TrapRange};

/// Merges `[a, b)` and `[b, c)` into `[a, c)` wherever their dispatch lists
/// are equal.  Input must be sorted and disjoint.
///
/// Merging into the last output range reaches the fixed point in one pass:
/// a merged range keeps the list of both halves, so whatever follows it can
/// only merge if it would have merged with the right half.
pub fn coalesce<T: ExceptionType>(ranges: Vec<TrapRange<T>>) -> Vec<TrapRange<T>> {
  let num_in = ranges.len();
  let mut out: Vec<TrapRange<T>> = Vec::with_capacity(num_in);

  for r in ranges {
    if let Some(prev) = out.last_mut() {
      if prev.range.last_plus1 == r.range.first && prev.handlers == r.handlers {
        trace!("coalesce: {:?} + {:?}", prev.range, r.range);
        prev.range.last_plus1 = r.range.last_plus1;
        continue;
      }
    }
    out.push(r);
  }

  debug_assert!(is_coalesced(&out));
  debug!("coalesce: {} ranges -> {}", num_in, out.len());
  out
}

/// True if no two touching ranges have equal dispatch lists.
pub fn is_coalesced<T: ExceptionType>(ranges: &[TrapRange<T>]) -> bool {
  ranges.windows(2).all(|w| {
    w[0].range.last_plus1 != w[1].range.first || w[0].handlers != w[1].handlers
  })
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::inst_index::InstIx;
  use crate::interface::Handler;

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
  fn test_merges_runs() {
    let ranges = vec![
      range(0, 2, &[('A', 9)]),
      range(2, 4, &[('A', 9)]),
      range(4, 5, &[('A', 9)]),
      range(5, 6, &[('B', 9)]),
      range(6, 8, &[('B', 9)]),
    ];
    assert!(!is_coalesced(&ranges));
    let out = coalesce(ranges);
    assert_eq!(out, vec![range(0, 5, &[('A', 9)]), range(5, 8, &[('B', 9)])]);
    assert!(is_coalesced(&out));
  }

  #[test]
  fn test_gaps_and_order_matter() {
    let ranges = vec![
      range(0, 2, &[('A', 9)]),
      // Not touching.
      range(3, 4, &[('A', 9)]),
      // Same handlers, different order.
      range(4, 5, &[('A', 9), ('B', 8)]),
      range(5, 6, &[('B', 8), ('A', 9)]),
    ];
    let out = coalesce(ranges.clone());
    assert_eq!(out, ranges);
  }

  #[test]
  fn test_idempotent() {
    let ranges = vec![range(0, 2, &[('A', 9)]), range(2, 3, &[('A', 9)]), range(7, 8, &[('C', 1)])];
    let once = coalesce(ranges);
    assert_eq!(coalesce(once.clone()), once);
  }
}
