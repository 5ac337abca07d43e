/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! This is the top level interface for the trapsplit library.

use log::{debug, info};
use smallvec::SmallVec;
use thiserror::Error;

use std::fmt;
use std::hash::Hash;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

use crate::checker::{self, CheckerErrors};
use crate::coalesce::coalesce;
use crate::events::build_events;
use crate::legalizer::legalize;
use crate::reference;
use crate::sweep::sweep;

pub use crate::inst_index::{InstIx, InstMap, InstRange, TrapIx, TypedIxVec};

//=============================================================================
// Exception types, traps and handlers

/// An exception type as seen by the pass: an identity that can be copied and
/// compared, nothing more.  A client would typically use an interned class
/// reference here.
pub trait ExceptionType: Copy + Eq + Hash + fmt::Debug {}

impl<T: Copy + Eq + Hash + fmt::Debug> ExceptionType for T {}

/// A declared exception-handler range.  Exceptions of type `exception` thrown
/// by an instruction in `[begin, end)` transfer control to `handler`, unless an
/// earlier-declared trap covering the same instruction already catches that
/// type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Trap<T> {
  pub begin: InstIx,
  /// Exclusive.
  pub end: InstIx,
  pub exception: T,
  pub handler: InstIx,
}

impl<T> Trap<T> {
  pub fn new(begin: InstIx, end: InstIx, exception: T, handler: InstIx) -> Self {
    Self { begin, end, exception, handler }
  }

  pub fn range(&self) -> InstRange {
    InstRange::new(self.begin, self.end)
  }

  pub fn covers(&self, at: InstIx) -> bool {
    self.begin <= at && at < self.end
  }
}

/// One entry of a try block's dispatch list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Handler<T> {
  pub exception: T,
  pub target: InstIx,
}

/// The effective dispatch list of an instruction or of a trap range: ordered
/// by priority, at most one entry per exception type.
pub type HandlerList<T> = SmallVec<[Handler<T>; 4]>;

/// A try block of the output: a range of instructions that all share the same
/// dispatch list.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct TrapRange<T> {
  pub range: InstRange,
  pub handlers: HandlerList<T>,
}

impl<T> TrapRange<T> {
  pub fn new(range: InstRange, handlers: HandlerList<T>) -> Self {
    Self { range, handlers }
  }
}

//=============================================================================
// What the client provides

/// A trait defined by the client to provide access to its method-body
/// representation.
pub trait MethodBody {
  type Exception: ExceptionType;

  /// Number of instructions; instruction positions are `0 .. num_insts()`.
  fn num_insts(&self) -> u32;

  /// The declared traps, in priority order.
  fn traps(&self) -> &[Trap<Self::Exception>];
}

/// The target format's constraints on where a try block may start or end.
pub trait BoundaryRules {
  /// True if no try block may begin or end at `at`, i.e. if the instructions
  /// at `at - 1` and `at` must stay in the same block.
  ///
  /// Only asked about interior positions; the start and the end of the body
  /// are always legal.
  fn is_illegal_boundary(&self, at: InstIx) -> bool;
}

impl<F> BoundaryRules for F
where
  F: Fn(InstIx) -> bool,
{
  fn is_illegal_boundary(&self, at: InstIx) -> bool {
    self(at)
  }
}

/// Rules for a target that can split anywhere.
#[derive(Copy, Clone, Debug, Default)]
pub struct AnyBoundary;

impl BoundaryRules for AnyBoundary {
  fn is_illegal_boundary(&self, _at: InstIx) -> bool {
    false
  }
}

pub(crate) fn is_illegal_split<R: BoundaryRules + ?Sized>(
  rules: &R, num_insts: u32, at: InstIx,
) -> bool {
  at.get() > 0 && at.get() < num_insts && rules.is_illegal_boundary(at)
}

//=============================================================================
// What the pass returns

/// The replacement trap list of a method body: disjoint trap ranges sorted by
/// start, with gaps wherever no handler applies.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct TrapTable<T> {
  pub num_insts: u32,
  pub ranges: Vec<TrapRange<T>>,
}

impl<T: ExceptionType> TrapTable<T> {
  pub fn empty(num_insts: u32) -> Self {
    Self { num_insts, ranges: Vec::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.ranges.is_empty()
  }

  pub fn len(&self) -> usize {
    self.ranges.len()
  }

  /// The trap range containing `at`, if any.
  pub fn range_containing(&self, at: InstIx) -> Option<&TrapRange<T>> {
    let ix = self.ranges.partition_point(|r| r.range.last_plus1 <= at);
    self.ranges.get(ix).filter(|r| r.range.contains(at))
  }

  /// The dispatch list in effect at `at`; empty in gaps.
  pub fn handlers_at(&self, at: InstIx) -> &[Handler<T>] {
    match self.range_containing(at) {
      Some(r) => &r.handlers,
      None => &[],
    }
  }

  /// Flattens the table back into a plain trap list, one trap per handler,
  /// in the order an exception table encoder would emit them.
  pub fn to_traps(&self) -> Vec<Trap<T>> {
    let mut traps = Vec::new();
    for r in &self.ranges {
      for h in &r.handlers {
        traps.push(Trap::new(
          r.range.first,
          r.range.last_plus1,
          h.exception,
          h.target,
        ));
      }
    }
    traps
  }
}

//=============================================================================
// Errors

/// Why trap splitting failed.  All of these are fatal for the method body:
/// the pass is deterministic, so retrying cannot help.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TrapSplitError<T: fmt::Debug> {
  /// A trap is empty, reversed, or refers to positions outside the body.
  #[error(
    "trap {trap:?} is malformed: [{begin:?}, {end:?}) -> {handler:?} in a body of {num_insts} instructions"
  )]
  MalformedTrap {
    trap: TrapIx,
    begin: InstIx,
    end: InstIx,
    handler: InstIx,
    num_insts: u32,
  },

  /// The dispatch list changes at a position where the target format does not
  /// allow a try block to begin or end.
  #[error(
    "cannot split trap ranges at {at:?}: handlers {before:?} before it, {after:?} from it on"
  )]
  IllegalSplit { at: InstIx, before: HandlerList<T>, after: HandlerList<T> },

  /// The checker rejected the result.  Only produced when
  /// `Options::run_checker` is set.
  #[error("checker failed: {0}")]
  Checker(CheckerErrors<T>),
}

//=============================================================================
// Options and entry points

/// Which implementation computes the trap table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Algorithm {
  /// Boundary sweep, legalization and coalescing.
  Sweep,
  /// Resolves every instruction separately and groups runs of equal dispatch
  /// lists.  Slower; kept as an independent implementation to compare
  /// against.
  Reference,
}

impl Default for Algorithm {
  fn default() -> Self {
    Algorithm::Sweep
  }
}

#[derive(Clone, Debug, Default)]
pub struct Options {
  /// Check the result against the input traps before returning it.
  pub run_checker: bool,
  pub algorithm: Algorithm,
}

/// Splits the traps of `body` into disjoint trap ranges, with default
/// options.
pub fn split_traps<F, R>(
  body: &F, rules: &R,
) -> Result<TrapTable<F::Exception>, TrapSplitError<F::Exception>>
where
  F: MethodBody,
  R: BoundaryRules + ?Sized,
{
  split_traps_with_opts(body, rules, &Options::default())
}

/// Splits the traps of `body` into disjoint trap ranges such that every
/// instruction keeps its dispatch list, no range boundary lands on a position
/// `rules` forbids, and no two adjacent ranges share a dispatch list.
///
/// The body is not modified; the caller replaces its trap list with the
/// returned table.
pub fn split_traps_with_opts<F, R>(
  body: &F, rules: &R, opts: &Options,
) -> Result<TrapTable<F::Exception>, TrapSplitError<F::Exception>>
where
  F: MethodBody,
  R: BoundaryRules + ?Sized,
{
  let num_insts = body.num_insts();
  let traps = body.traps();
  info!(
    "split_traps: begin ({} insts, {} traps, {:?})",
    num_insts,
    traps.len(),
    opts.algorithm
  );

  let table = match opts.algorithm {
    Algorithm::Sweep => run_sweep(num_insts, traps, rules)?,
    Algorithm::Reference => reference::split(num_insts, traps, rules)?,
  };

  if opts.run_checker {
    checker::check_table(num_insts, traps, &table, rules)
      .map_err(TrapSplitError::Checker)?;
    debug!("split_traps: checker ok");
  }

  info!("split_traps: end ({} ranges)", table.len());
  Ok(table)
}

fn run_sweep<T: ExceptionType, R: BoundaryRules + ?Sized>(
  num_insts: u32, traps: &[Trap<T>], rules: &R,
) -> Result<TrapTable<T>, TrapSplitError<T>> {
  let events = build_events(num_insts, traps)?;
  if events.is_empty() {
    return Ok(TrapTable::empty(num_insts));
  }
  let candidates = sweep(traps, &events);
  let legal = legalize(num_insts, candidates, rules)?;
  let ranges = coalesce(legal);
  Ok(TrapTable { num_insts, ranges })
}
