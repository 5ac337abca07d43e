/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! A tiny method-body IR, just enough to drive the trap splitter: a flat list
//! of instructions, a list of interned exception types and the declared
//! traps.  Instructions have no operands apart from branch targets; what
//! matters is where invokes and their move-results sit.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use std::fmt;

use trapsplit::{
  BoundaryRules, InstIx, MethodBody, Trap, TrapTable, TypedIxVec,
};

//=============================================================================
// Exception types

/// An interned exception type; the name lives in `Body::exn_names`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExnType(pub u32);

impl fmt::Debug for ExnType {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    write!(fmt, "E{}", self.0)
  }
}

//=============================================================================
// Instructions

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inst {
  Nop,
  /// A call.  Its result, if used, is picked up by a `MoveResult` that must
  /// immediately follow it.
  Invoke,
  MoveResult,
  /// First instruction of a typical handler.
  MoveException,
  Throw,
  Goto { target: InstIx },
  Return,
}

impl Inst {
  pub fn is_terminator(&self) -> bool {
    match self {
      Inst::Throw | Inst::Goto { .. } | Inst::Return => true,
      _ => false,
    }
  }

  pub fn mnemonic(&self) -> &'static str {
    match self {
      Inst::Nop => "nop",
      Inst::Invoke => "invoke",
      Inst::MoveResult => "move-result",
      Inst::MoveException => "move-exception",
      Inst::Throw => "throw",
      Inst::Goto { .. } => "goto",
      Inst::Return => "return",
    }
  }
}

pub fn i_nop() -> Inst {
  Inst::Nop
}
pub fn i_invoke() -> Inst {
  Inst::Invoke
}
pub fn i_move_result() -> Inst {
  Inst::MoveResult
}
pub fn i_move_exception() -> Inst {
  Inst::MoveException
}
pub fn i_throw() -> Inst {
  Inst::Throw
}
pub fn i_goto(target: u32) -> Inst {
  Inst::Goto { target: InstIx::new(target) }
}
pub fn i_return() -> Inst {
  Inst::Return
}

//=============================================================================
// Method bodies

#[derive(Clone)]
pub struct Body {
  pub name: String,
  pub insts: TypedIxVec<InstIx, Inst>,
  /// Indexed by `ExnType`.
  pub exn_names: Vec<String>,
  exn_ids: FxHashMap<String, ExnType>,
  /// In priority order.
  pub traps: Vec<Trap<ExnType>>,
}

impl Body {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      insts: TypedIxVec::new(),
      exn_names: Vec::new(),
      exn_ids: FxHashMap::default(),
      traps: Vec::new(),
    }
  }

  /// Interns an exception type name.
  pub fn exn(&mut self, name: &str) -> ExnType {
    if let Some(exn) = self.exn_ids.get(name) {
      return *exn;
    }
    let exn = ExnType(self.exn_names.len() as u32);
    self.exn_names.push(name.to_string());
    self.exn_ids.insert(name.to_string(), exn);
    exn
  }

  pub fn lookup_exn(&self, name: &str) -> Option<ExnType> {
    self.exn_ids.get(name).cloned()
  }

  pub fn exn_name(&self, exn: ExnType) -> &str {
    match self.exn_names.get(exn.0 as usize) {
      Some(name) => name,
      None => "<unknown>",
    }
  }

  pub fn push(&mut self, inst: Inst) -> InstIx {
    let ix = InstIx::new(self.insts.len());
    self.insts.push(inst);
    ix
  }

  pub fn push_all(&mut self, insts: Vec<Inst>) {
    for inst in insts {
      self.push(inst);
    }
  }

  /// Declares a trap with the lowest priority so far.
  pub fn trap(&mut self, begin: u32, end: u32, exn: ExnType, handler: u32) {
    self.traps.push(Trap::new(
      InstIx::new(begin),
      InstIx::new(end),
      exn,
      InstIx::new(handler),
    ));
  }

  /// Replaces the declared traps with the flattened form of `table`.
  pub fn update_from_split(&mut self, table: &TrapTable<ExnType>) {
    assert_eq!(table.num_insts, self.insts.len());
    self.traps = table.to_traps();
  }

  /// Renders the body in the format `parser::parse_content` reads.
  pub fn render(&self, who: &str, out: &mut dyn fmt::Write) -> fmt::Result {
    writeln!(out, "; {}: {}", who, self.name)?;
    for name in &self.exn_names {
      writeln!(out, "exception {}", name)?;
    }
    for (n, inst) in self.insts.iter().enumerate() {
      match inst {
        Inst::Goto { target } => {
          writeln!(out, "  goto {:<16}; i{}", target.get(), n)?
        }
        _ => writeln!(out, "  {:<21}; i{}", inst.mnemonic(), n)?,
      }
    }
    for t in &self.traps {
      writeln!(
        out,
        "trap {} {} {} {}",
        t.begin.get(),
        t.end.get(),
        self.exn_name(t.exception),
        t.handler.get()
      )?;
    }
    Ok(())
  }

  pub fn print(&self, who: &str) {
    let mut rendered = String::new();
    if self.render(who, &mut rendered).is_ok() {
      println!("");
      print!("{}", rendered);
    }
  }
}

impl fmt::Debug for Body {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    self.render("body", fmt)
  }
}

impl MethodBody for Body {
  type Exception = ExnType;

  fn num_insts(&self) -> u32 {
    self.insts.len()
  }

  fn traps(&self) -> &[Trap<ExnType>] {
    &self.traps
  }
}

/// An invoke and the move-result picking up its value must stay in the same
/// try block.
impl BoundaryRules for Body {
  fn is_illegal_boundary(&self, at: InstIx) -> bool {
    if at.get() == 0 || at.get() >= self.insts.len() {
      return false;
    }
    self.insts[at] == Inst::MoveResult && self.insts[at.minus(1)] == Inst::Invoke
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_move_result_after_invoke_is_illegal() {
    let mut body = Body::new("b");
    body.push_all(vec![
      i_invoke(),
      i_move_result(),
      i_nop(),
      i_move_result(),
      i_return(),
    ]);
    let illegal: Vec<u32> = (0..=5)
      .filter(|&n| body.is_illegal_boundary(InstIx::new(n)))
      .collect();
    assert_eq!(illegal, vec![1]);
  }

  #[test]
  fn test_exns_are_interned() {
    let mut body = Body::new("b");
    let a = body.exn("java.io.IOException");
    let b = body.exn("java.lang.Throwable");
    assert_eq!(body.exn("java.io.IOException"), a);
    assert_ne!(a, b);
    assert_eq!(body.exn_name(b), "java.lang.Throwable");
    assert_eq!(body.lookup_exn("Nope"), None);
  }
}
