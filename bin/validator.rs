use log::{error, info};

use trapsplit::{
  check_bodies, split_traps_with_opts, Algorithm, InstIx, Options,
  TrapSplitError, TrapTable,
};

use std::path::{Path, PathBuf};

use crate::parser;
use crate::test_framework::*;

/// Checks that `body` is something the splitter can be fed: a non-empty
/// instruction list ending in a terminator, branch targets inside the body,
/// move-results right after invokes, and well-formed traps.
pub fn validate(body: &Body) -> Result<(), String> {
  let num_insts = body.insts.len();
  if num_insts == 0 {
    return Err(format!("body {} is empty", body.name));
  }

  let last = &body.insts[InstIx::new(num_insts - 1)];
  if !last.is_terminator() {
    return Err(format!("final inst {:?} must be a terminator", last));
  }

  for (n, inst) in body.insts.iter().enumerate() {
    match inst {
      Inst::Goto { target } if target.get() >= num_insts => {
        return Err(format!("goto at i{} jumps outside the body", n));
      }
      Inst::MoveResult => {
        if n == 0 || body.insts[InstIx::new(n as u32 - 1)] != Inst::Invoke {
          return Err(format!("move-result at i{} doesn't follow an invoke", n));
        }
      }
      _ => {}
    }
  }

  for (n, t) in body.traps.iter().enumerate() {
    if t.begin >= t.end || t.end.get() > num_insts {
      return Err(format!(
        "trap {} covers invalid range [{}, {})",
        n,
        t.begin.get(),
        t.end.get()
      ));
    }
    if t.handler.get() >= num_insts {
      return Err(format!("trap {} has its handler outside the body", n));
    }
    if t.exception.0 as usize >= body.exn_names.len() {
      return Err(format!("trap {} has an undeclared exception type", n));
    }
  }

  Ok(())
}

/// Panics unless `after` dispatches every instruction like `before`.
pub fn check_results(before: &Body, after: &Body) {
  if let Err(errs) = check_bodies(before, after) {
    panic!(
      "Different dispatch before/after splitting of {}: {}",
      before.name, errs
    );
  }
}

/// Runs the sweep and the reference splitter over `body` and compares them.
///
/// Both run with the checker on, so each table is also checked for shape
/// (sorted, disjoint, legal boundaries, coalesced).  Agreement means equal
/// tables, both of them equivalent to the declared traps, or the very same
/// error.  Returns the table in the first case and `None` in the second;
/// disagreement is an `Err`.
pub fn run_differential(body: &Body) -> Result<Option<TrapTable<ExnType>>, String> {
  let sweep_opts = Options { run_checker: true, algorithm: Algorithm::Sweep };
  let ref_opts = Options { run_checker: true, algorithm: Algorithm::Reference };
  let sweep = split_traps_with_opts(body, body, &sweep_opts);
  let reference = split_traps_with_opts(body, body, &ref_opts);

  match (sweep, reference) {
    (Ok(sweep), Ok(reference)) => {
      if sweep != reference {
        return Err(format!(
          "tables differ:\n  sweep:     {:?}\n  reference: {:?}",
          sweep.ranges, reference.ranges
        ));
      }
      for (who, table) in &[("sweep", &sweep), ("reference", &reference)] {
        let mut after = body.clone();
        after.update_from_split(table);
        check_bodies(body, &after)
          .map_err(|errs| format!("{} result is not equivalent: {}", who, errs))?;
      }
      Ok(Some(sweep))
    }
    (Err(sweep), Err(reference)) => {
      if sweep != reference {
        return Err(format!(
          "errors differ:\n  sweep:     {}\n  reference: {}",
          sweep, reference
        ));
      }
      Ok(None)
    }
    (Ok(_), Err(err)) => Err(format!("only the reference failed: {}", err)),
    (Err(err), Ok(_)) => Err(format!("only the sweep failed: {}", err)),
  }
}

/// What a batch run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
  pub num_split: usize,
  pub num_skipped: usize,
  pub num_ranges: usize,
}

/// Splits every `.trap` body in `dir`, in file name order, and checks each
/// result against the body's declared traps.
///
/// Bodies that don't parse, don't validate or can't be split are logged and
/// skipped; nothing is produced for them.  A result that dispatches
/// differently from its input stops the run with an `Err`, and so does a
/// disagreement between the two algorithms when `differential` is set.
pub fn run_batch(
  dir: &Path, opts: &Options, differential: bool,
) -> Result<BatchSummary, String> {
  let entries = dir
    .read_dir()
    .map_err(|err| format!("can't read {}: {}", dir.display(), err))?;
  let mut paths: Vec<PathBuf> = entries
    .flatten()
    .map(|entry| entry.path())
    .filter(|path| path.extension().map_or(false, |ext| ext == "trap"))
    .collect();
  paths.sort();

  let mut summary = BatchSummary::default();
  for path in paths {
    let body = match parser::parse_file(path.clone()) {
      Ok(body) => body,
      Err(err) => {
        error!("{}: can't parse: {:?}", path.display(), err);
        summary.num_skipped += 1;
        continue;
      }
    };
    if let Err(msg) = validate(&body) {
      error!("{}: invalid body: {}", path.display(), msg);
      summary.num_skipped += 1;
      continue;
    }

    if differential {
      run_differential(&body).map_err(|msg| format!("{}: {}", path.display(), msg))?;
    }

    let table = match split_traps_with_opts(&body, &body, opts) {
      Ok(table) => table,
      Err(TrapSplitError::Checker(errs)) => {
        return Err(format!("{}: checker failed: {}", path.display(), errs));
      }
      Err(err) => {
        error!("{}: {}", path.display(), err);
        summary.num_skipped += 1;
        continue;
      }
    };

    let mut after = body.clone();
    after.update_from_split(&table);
    check_bodies(&body, &after).map_err(|errs| {
      format!("{}: different dispatch after splitting: {}", path.display(), errs)
    })?;

    info!("{}: {} trap ranges", path.display(), table.len());
    summary.num_split += 1;
    summary.num_ranges += table.len();
  }
  Ok(summary)
}

#[cfg(test)]
mod test {
  use super::*;

  fn body(insts: Vec<Inst>) -> Body {
    let mut body = Body::new("v");
    body.push_all(insts);
    body
  }

  #[test]
  fn test_validate() {
    assert!(validate(&body(vec![])).is_err());
    assert!(validate(&body(vec![i_nop()])).is_err());
    assert!(validate(&body(vec![i_goto(1)])).is_err());
    assert!(validate(&body(vec![i_nop(), i_move_result(), i_return()])).is_err());
    assert!(validate(&body(vec![i_invoke(), i_move_result(), i_goto(0)])).is_ok());

    let mut b = body(vec![i_nop(), i_return()]);
    let a = b.exn("A");
    b.trap(0, 2, a, 1);
    assert!(validate(&b).is_ok());
    b.trap(1, 1, a, 1);
    assert!(validate(&b).is_err());
  }

  #[test]
  fn test_differential_agrees_on_errors() {
    let mut b = body(vec![i_invoke(), i_move_result(), i_return()]);
    let a = b.exn("A");
    b.trap(0, 1, a, 2);
    assert_eq!(run_differential(&b), Ok(None));
  }

  #[test]
  fn test_batch_needs_a_directory() {
    let opts = Options::default();
    assert!(run_batch(Path::new("no such directory"), &opts, false).is_err());
  }
}
