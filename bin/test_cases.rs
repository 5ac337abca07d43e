/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

/// Test cases.  The list of them is right at the bottom, function |find_body|.
/// Add new ones there, or drop a `.trap` file into the `tests` directory.
use crate::parser;
use crate::test_framework::*;

use std::path::{Path, PathBuf};

/// One trap over the first five instructions.
fn test_single() -> Body {
  let mut body = Body::new("single");
  let a = body.exn("TypeA");
  body.push_all(vec![
    i_nop(),
    i_invoke(),
    i_move_result(),
    i_nop(),
    i_invoke(),
    i_return(),
    i_nop(),
    i_nop(),
    i_nop(),
    i_move_exception(), // 9
    i_throw(),
  ]);
  body.trap(0, 5, a, 9);
  body
}

/// Two overlapping traps for the same type: the first one keeps [2, 4).  The
/// sweep cuts at 2, right before a move-result, so that cut gets absorbed.
fn test_overlap_same_type() -> Body {
  let mut body = Body::new("overlap_same_type");
  let a = body.exn("TypeA");
  body.push_all(vec![
    i_nop(),
    i_invoke(),
    i_move_result(),
    i_nop(),
    i_invoke(),
    i_nop(),
    i_return(),
    i_nop(),
    i_move_exception(), // 8
    i_throw(),
    i_move_exception(), // 10
    i_throw(),
  ]);
  body.trap(0, 4, a, 8);
  body.trap(2, 6, a, 10);
  body
}

/// The only illegal position lies strictly inside the trap.
fn test_illegal_inside() -> Body {
  let mut body = Body::new("illegal_inside");
  let a = body.exn("TypeA");
  body.push_all(vec![
    i_nop(),
    i_invoke(),
    i_move_result(),
    i_return(),
    i_move_exception(), // 4
    i_throw(),
  ]);
  body.trap(1, 3, a, 4);
  body
}

fn test_no_traps() -> Body {
  let mut body = Body::new("no_traps");
  body.push_all(vec![i_invoke(), i_move_result(), i_return()]);
  body
}

/// try { try { .. } catch (IOException) { .. } } catch (Throwable) { .. }
fn test_nested() -> Body {
  let mut body = Body::new("nested");
  let io = body.exn("java.io.IOException");
  let any = body.exn("java.lang.Throwable");
  body.push_all(vec![
    i_nop(),
    i_invoke(),
    i_move_result(),
    i_invoke(),
    i_move_result(),
    i_nop(),
    i_goto(11),
    i_move_exception(), // 7
    i_goto(11),
    i_move_exception(), // 9
    i_throw(),
    i_return(),
  ]);
  body.trap(1, 5, io, 7);
  body.trap(0, 7, any, 9);
  body
}

/// try { .. } catch (IOException) { .. } finally { .. }: the catch block is
/// protected by the finally handler too.
fn test_finally() -> Body {
  let mut body = Body::new("finally");
  let io = body.exn("java.io.IOException");
  let any = body.exn("java.lang.Throwable");
  body.push_all(vec![
    i_invoke(),
    i_move_result(),
    i_invoke(),
    i_goto(11),
    i_nop(),
    i_nop(),
    i_move_exception(), // 6
    i_invoke(),
    i_goto(11),
    i_move_exception(), // 9
    i_throw(),
    i_return(),
  ]);
  body.trap(0, 3, io, 6);
  body.trap(0, 3, any, 9);
  body.trap(6, 8, any, 9);
  body
}

/// An inner trap that never applies, and a second type next to it.
fn test_shadowed() -> Body {
  let mut body = Body::new("shadowed");
  let a = body.exn("TypeA");
  let b = body.exn("TypeB");
  body.push_all(vec![
    i_nop(),
    i_invoke(),
    i_nop(),
    i_nop(),
    i_invoke(),
    i_nop(),
    i_return(),
    i_move_exception(), // 7
    i_throw(),
    i_move_exception(), // 9
    i_throw(),
  ]);
  body.trap(0, 6, a, 7);
  body.trap(2, 4, a, 9);
  body.trap(2, 4, b, 9);
  body
}

/// Four overlapping traps of three types.
fn test_multi_type() -> Body {
  let mut body = Body::new("multi_type");
  let a = body.exn("TypeA");
  let b = body.exn("TypeB");
  let c = body.exn("TypeC");
  body.push_all(vec![
    i_invoke(),
    i_move_result(),
    i_nop(),
    i_invoke(),
    i_nop(),
    i_nop(),
    i_invoke(),
    i_move_result(),
    i_nop(),
    i_return(),
    i_move_exception(), // 10
    i_throw(),
    i_move_exception(), // 12
    i_throw(),
    i_move_exception(), // 14
    i_throw(),
  ]);
  body.trap(0, 6, a, 10);
  body.trap(2, 8, b, 12);
  body.trap(4, 10, a, 14);
  body.trap(4, 10, c, 10);
  body
}

fn invoke_then_move_result() -> Vec<Inst> {
  vec![
    i_nop(),
    i_invoke(),
    i_move_result(),
    i_nop(),
    i_return(),
    i_nop(),
    i_move_exception(), // 6
    i_throw(),
  ]
}

/// Traps meet between an invoke and its move-result, but agree.
fn test_split_at_move_result() -> Body {
  let mut body = Body::new("split_at_move_result");
  let a = body.exn("TypeA");
  body.push_all(invoke_then_move_result());
  body.trap(0, 2, a, 6);
  body.trap(2, 4, a, 6);
  body
}

/// Traps meet between an invoke and its move-result, and disagree.
fn test_illegal_split() -> Body {
  let mut body = Body::new("illegal_split");
  let a = body.exn("TypeA");
  let b = body.exn("TypeB");
  body.push_all(invoke_then_move_result());
  body.trap(0, 2, a, 6);
  body.trap(2, 4, b, 6);
  body
}

/// A trap ending between an invoke and its move-result.
fn test_illegal_gap() -> Body {
  let mut body = Body::new("illegal_gap");
  let a = body.exn("TypeA");
  body.push_all(invoke_then_move_result());
  body.trap(0, 2, a, 6);
  body
}

/// Returns the body named `name`, or the names of all known bodies.
pub fn find_body(name: &str) -> Result<Body, Vec<String>> {
  let all_bodies = vec![
    test_single(),            // one trap
    test_overlap_same_type(), // first declared wins
    test_illegal_inside(),    // illegal position inside a range
    test_no_traps(),
    test_nested(),
    test_finally(),
    test_shadowed(),
    test_multi_type(),
    test_split_at_move_result(),
    test_illegal_split(), // fails
    test_illegal_gap(),   // fails
  ];

  let mut all_names = Vec::new();
  for cand in &all_bodies {
    all_names.push(cand.name.clone());
  }

  for cand in all_bodies {
    if cand.name == *name {
      return Ok(cand);
    }
  }

  fn is_trap_file(path: &PathBuf) -> bool {
    path.extension().map_or(false, |ext| ext == "trap")
  }

  let test_dir = Path::new("tests");
  match test_dir.read_dir() {
    Err(err) => {
      println!("can't read test directory: {}", err);
    }
    Ok(entries) => {
      for entry in entries.flatten() {
        let path = entry.path();
        // Editor backups and anything else that isn't a body.
        if !is_trap_file(&path) {
          continue;
        }
        let basename = match path.file_stem().and_then(|stem| stem.to_str()) {
          Some(stem) => stem.to_string(),
          None => continue,
        };
        if basename == name {
          match parser::parse_file(path) {
            Ok(body) => return Ok(body),
            Err(err) => {
              println!("can't parse test file {}: {:?}", basename, err);
              break;
            }
          }
        } else {
          all_names.push(basename);
        }
      }
    }
  }

  all_names.sort();
  Err(all_names)
}
