/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Main file / top-level module for the trapsplit library.
//!
//! Turns a method body's overlapping, prioritized exception-handler ranges
//! ("traps") into disjoint trap ranges, each carrying the dispatch list every
//! instruction inside it sees, ready for a try-block encoder.

// Make the pass stages public for fuzzing.
#[cfg(feature = "fuzzing")]
pub mod coalesce;
#[cfg(not(feature = "fuzzing"))]
mod coalesce;

#[cfg(feature = "fuzzing")]
pub mod events;
#[cfg(not(feature = "fuzzing"))]
mod events;

#[cfg(feature = "fuzzing")]
pub mod legalizer;
#[cfg(not(feature = "fuzzing"))]
mod legalizer;

#[cfg(feature = "fuzzing")]
pub mod resolver;
#[cfg(not(feature = "fuzzing"))]
mod resolver;

#[cfg(feature = "fuzzing")]
pub mod sweep;
#[cfg(not(feature = "fuzzing"))]
mod sweep;

mod checker;
mod inst_index;
mod interface;
mod reference;

pub use crate::checker::{
  check_bodies, check_equivalence, check_structure, CheckerError,
  CheckerErrors, Side,
};
pub use crate::interface::*;
pub use crate::resolver::{resolve_all, HandlerListResolver};
