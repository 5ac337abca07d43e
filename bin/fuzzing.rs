//! Implements fuzzing primitives for method bodies.

use arbitrary::{Arbitrary, Result, Unstructured};

use crate::test_framework::*;

pub const MAX_INSTS: u32 = 48;
pub const MAX_TRAPS: u32 = 10;
const NUM_EXN_TYPES: u32 = 4;

struct FuzzingEnv {
  num_insts: u32,
  exns: Vec<ExnType>,
}

impl FuzzingEnv {
  fn position(&self, u: &mut Unstructured) -> Result<u32> {
    u.int_in_range(0..=self.num_insts - 1)
  }

  fn inst(&self, u: &mut Unstructured) -> Result<Inst> {
    Ok(match u.int_in_range(0..=5u8)? {
      0 | 1 => i_invoke(),
      2 => i_move_exception(),
      3 => i_goto(self.position(u)?),
      4 => i_throw(),
      _ => i_nop(),
    })
  }

  fn trap(&self, u: &mut Unstructured, body: &mut Body) -> Result<()> {
    let begin = self.position(u)?;
    let end = u.int_in_range(begin + 1..=self.num_insts)?;
    let last = self.exns.len() as u32 - 1;
    let exn = self.exns[u.int_in_range(0..=last)? as usize];
    let handler = self.position(u)?;
    body.trap(begin, end, exn, handler);
    Ok(())
  }
}

impl<'a> Arbitrary<'a> for Body {
  fn arbitrary(u: &mut Unstructured<'a>) -> Result<Body> {
    let num_insts = u.int_in_range(2..=MAX_INSTS)?;
    let mut body = Body::new("fuzz");

    let num_exns = u.int_in_range(1..=NUM_EXN_TYPES)?;
    let exns: Vec<ExnType> =
      (0..num_exns).map(|n| body.exn(&format!("E{}", n))).collect();
    let env = FuzzingEnv { num_insts, exns };

    // Invokes are followed by a move-result half of the time, which is what
    // gives the boundary rules something to forbid.
    while body.insts.len() < num_insts - 1 {
      let inst = env.inst(u)?;
      let is_invoke = inst == Inst::Invoke;
      body.push(inst);
      if is_invoke && body.insts.len() < num_insts - 1 && bool::arbitrary(u)? {
        body.push(i_move_result());
      }
    }
    body.push(i_return());
    debug_assert_eq!(body.insts.len(), num_insts);

    let num_traps = u.int_in_range(0..=MAX_TRAPS)?;
    for _ in 0..num_traps {
      env.trap(u, &mut body)?;
    }
    Ok(body)
  }
}
