/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Effective dispatch lists.
//!
//! The dispatch list of an instruction is what the pass must preserve: walk
//! the traps in declaration order, and for each one covering the instruction
//! record `(exception, handler)` unless that exception type was already
//! recorded by an earlier trap.  The first declared trap wins, as in a
//! stack-machine exception table.

use crate::inst_index::{InstIx, InstMap};
use crate::interface::{ExceptionType, Handler, HandlerList, Trap};

/// Appends `trap`'s handler unless its type is already caught.
#[inline]
fn add_first_match<T: ExceptionType>(list: &mut HandlerList<T>, trap: &Trap<T>) {
  if !list.iter().any(|h| h.exception == trap.exception) {
    list.push(Handler { exception: trap.exception, target: trap.handler });
  }
}

/// Applies the first-match rule to traps that are already known to cover the
/// instruction in question, given in declaration order.
pub fn first_match<'t, T, I>(covering: I) -> HandlerList<T>
where
  T: ExceptionType + 't,
  I: IntoIterator<Item = &'t Trap<T>>,
{
  let mut list = HandlerList::new();
  for trap in covering {
    add_first_match(&mut list, trap);
  }
  list
}

/// Resolves dispatch lists by scanning the whole trap list.
pub struct HandlerListResolver<'a, T> {
  traps: &'a [Trap<T>],
}

impl<'a, T: ExceptionType> HandlerListResolver<'a, T> {
  pub fn new(traps: &'a [Trap<T>]) -> Self {
    Self { traps }
  }

  /// The dispatch list of the instruction at `at`.
  pub fn resolve(&self, at: InstIx) -> HandlerList<T> {
    first_match(self.traps.iter().filter(|t| t.covers(at)))
  }
}

/// The dispatch list of every instruction in `0 .. num_insts`.  Traps must
/// already be validated against `num_insts`.
///
/// Visits each trap once, over the instructions it covers, instead of asking
/// every instruction about every trap.
pub fn resolve_all<T: ExceptionType>(
  num_insts: u32, traps: &[Trap<T>],
) -> InstMap<HandlerList<T>> {
  let mut lists = InstMap::filled(num_insts, HandlerList::new());
  for trap in traps {
    for at in trap.range().iter() {
      add_first_match(&mut lists[at], trap);
    }
  }
  lists
}
