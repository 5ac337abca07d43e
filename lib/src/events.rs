/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Trap events: the positions where some trap opens or closes.  The dispatch
//! list of an instruction can only differ from its predecessor's at one of
//! these positions, so they are the only candidate split points.

use log::debug;

use crate::interface::{ExceptionType, Trap, TrapSplitError};
use crate::inst_index::{InstIx, TrapIx};

/// Boundary positions plus, for each of them, which traps open and close.
#[derive(Clone, Debug)]
pub struct TrapEvents {
  /// Every `begin` and `end` of every trap, sorted, without duplicates.
  pub boundaries: Vec<InstIx>,
  /// `(begin, trap)`, sorted by position, then by declaration order.
  pub opens: Vec<(InstIx, TrapIx)>,
  /// `(end, trap)`, sorted by position, then by declaration order.
  pub closes: Vec<(InstIx, TrapIx)>,
}

impl TrapEvents {
  pub fn is_empty(&self) -> bool {
    self.boundaries.is_empty()
  }
}

/// Rejects traps that are empty, reversed, or point outside the body.  Run
/// before any other work so that malformed input fails fast.
pub fn validate_traps<T: ExceptionType>(
  num_insts: u32, traps: &[Trap<T>],
) -> Result<(), TrapSplitError<T>> {
  for (ix, t) in traps.iter().enumerate() {
    if t.begin >= t.end || t.end.get() > num_insts || t.handler.get() >= num_insts {
      return Err(TrapSplitError::MalformedTrap {
        trap: TrapIx::new(ix as u32),
        begin: t.begin,
        end: t.end,
        handler: t.handler,
        num_insts,
      });
    }
  }
  Ok(())
}

pub fn build_events<T: ExceptionType>(
  num_insts: u32, traps: &[Trap<T>],
) -> Result<TrapEvents, TrapSplitError<T>> {
  validate_traps(num_insts, traps)?;

  let mut opens = Vec::with_capacity(traps.len());
  let mut closes = Vec::with_capacity(traps.len());
  for (ix, t) in traps.iter().enumerate() {
    let tix = TrapIx::new(ix as u32);
    opens.push((t.begin, tix));
    closes.push((t.end, tix));
  }

  // Tuples order by position first and declaration index second, which makes
  // the order total and the result reproducible.
  opens.sort_unstable();
  closes.sort_unstable();

  let mut boundaries: Vec<InstIx> = opens
    .iter()
    .map(|&(at, _)| at)
    .chain(closes.iter().map(|&(at, _)| at))
    .collect();
  boundaries.sort_unstable();
  boundaries.dedup();

  debug!(
    "build_events: {} traps, {} distinct boundaries",
    traps.len(),
    boundaries.len()
  );

  Ok(TrapEvents { boundaries, opens, closes })
}
