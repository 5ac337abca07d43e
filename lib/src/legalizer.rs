/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Boundary legalization.
//!
//! The target format may forbid a try block from beginning or ending between
//! two particular instructions (for instance between an invoke and the
//! move-result that picks up its value).  The sweep knows nothing about that
//! and cuts at every trap boundary, so some candidate ranges start on an
//! illegal position.
//!
//! Such a boundary is moved back onto the nearest earlier legal boundary,
//! which means the range starting there absorbs the instructions in between.
//! Moving a boundary is only allowed when it doesn't change what any
//! instruction sees: the absorbing range and the absorbed one must have the
//! same dispatch list.  A boundary next to a gap can't move at all, since the
//! instructions on either side of it see different lists (one of them empty).
//! In both cases the split is reported as illegal, rather than handing the
//! encoder a range that changes exception semantics.

use log::{debug, trace};

use crate::inst_index::InstIx;
use crate::interface::{
  is_illegal_split, BoundaryRules, ExceptionType, Handler, HandlerList,
  TrapRange, TrapSplitError,
};

fn check_boundary<T, R>(
  rules: &R, num_insts: u32, at: InstIx, before: &[Handler<T>],
  after: &[Handler<T>],
) -> Result<(), TrapSplitError<T>>
where
  T: ExceptionType,
  R: BoundaryRules + ?Sized,
{
  if is_illegal_split(rules, num_insts, at) {
    return Err(TrapSplitError::IllegalSplit {
      at,
      before: HandlerList::from_slice(before),
      after: HandlerList::from_slice(after),
    });
  }
  Ok(())
}

/// Takes the sweep's candidate ranges (sorted, disjoint) and returns ranges
/// none of whose boundaries is illegal under `rules`.
pub fn legalize<T, R>(
  num_insts: u32, candidates: Vec<TrapRange<T>>, rules: &R,
) -> Result<Vec<TrapRange<T>>, TrapSplitError<T>>
where
  T: ExceptionType,
  R: BoundaryRules + ?Sized,
{
  let mut legal: Vec<TrapRange<T>> = Vec::with_capacity(candidates.len());
  let mut num_absorbed = 0;

  for cand in candidates {
    let at = cand.range.first;
    match legal.last_mut() {
      Some(prev) if prev.range.last_plus1 == at => {
        if is_illegal_split(rules, num_insts, at) {
          if prev.handlers != cand.handlers {
            return Err(TrapSplitError::IllegalSplit {
              at,
              before: prev.handlers.clone(),
              after: cand.handlers,
            });
          }
          trace!(
            "legalize: {:?} absorbs {:?}, no split allowed at {:?}",
            prev.range,
            cand.range,
            at
          );
          prev.range.last_plus1 = cand.range.last_plus1;
          num_absorbed += 1;
          continue;
        }
      }
      Some(prev) => {
        // A gap lies between `prev` and `cand`: both of its edges are real
        // changes of the dispatch list.
        check_boundary(rules, num_insts, prev.range.last_plus1, &prev.handlers, &[])?;
        check_boundary(rules, num_insts, at, &[], &cand.handlers)?;
      }
      None => {
        check_boundary(rules, num_insts, at, &[], &cand.handlers)?;
      }
    }
    legal.push(cand);
  }

  if let Some(last) = legal.last() {
    check_boundary(rules, num_insts, last.range.last_plus1, &last.handlers, &[])?;
  }

  debug!(
    "legalize: {} legal ranges, {} absorbed",
    legal.len(),
    num_absorbed
  );
  Ok(legal)
}
