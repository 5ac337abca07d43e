/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

mod fuzzing;
mod parser;
mod test_cases;
mod test_framework;
mod validator;

use trapsplit::{split_traps_with_opts, Algorithm, Options, TrapTable};

use test_framework::ExnType;

use clap;
use log::{error, info};
use pretty_env_logger;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;

//=============================================================================
// Top level

fn main() {
  pretty_env_logger::init();

  let app = clap::App::new("trapsplit-util")
    .about("a simple program to allow separate testing of trapsplit")
    .arg(
      clap::Arg::new("test")
        .short('t')
        .long("test")
        .takes_value(true)
        .required_unless_present_any(&["file", "dir"])
        .help("test case name"),
    )
    .arg(
      clap::Arg::new("file")
        .short('f')
        .long("file")
        .takes_value(true)
        .conflicts_with("test")
        .help("method body in text form"),
    )
    .arg(
      clap::Arg::new("dir")
        .short('D')
        .long("dir")
        .takes_value(true)
        .conflicts_with_all(&["test", "file", "output"])
        .help("split every .trap body in this directory"),
    )
    .arg(
      clap::Arg::new("algorithm")
        .short('a')
        .long("algorithm")
        .takes_value(true)
        .default_value("sweep")
        .possible_values(["sweep", "reference"])
        .help("algorithm name"),
    )
    .arg(
      clap::Arg::new("checker")
        .short('c')
        .long("checker")
        .help("check the result against the declared traps"),
    )
    .arg(
      clap::Arg::new("differential")
        .short('d')
        .long("differential")
        .help("also compare the sweep against the reference splitter"),
    )
    .arg(
      clap::Arg::new("output")
        .short('o')
        .long("output")
        .takes_value(true)
        .help("write the resulting trap table there, bincode-encoded"),
    );
  let matches = app.get_matches();

  let algorithm = match matches.value_of("algorithm") {
    Some("reference") => {
      info!("Using the reference splitter");
      Algorithm::Reference
    }
    _ => {
      info!("Using the sweep");
      Algorithm::Sweep
    }
  };
  let opts = Options { run_checker: matches.is_present("checker"), algorithm };

  if let Some(dir) = matches.value_of("dir") {
    let differential = matches.is_present("differential");
    match validator::run_batch(Path::new(dir), &opts, differential) {
      Ok(summary) => {
        println!(
          "{} bodies split into {} trap ranges, {} skipped",
          summary.num_split, summary.num_ranges, summary.num_skipped
        );
        return;
      }
      Err(msg) => {
        error!("batch run stopped: {}", msg);
        process::exit(1);
      }
    }
  }

  let body = if let Some(body_name) = matches.value_of("test") {
    match test_cases::find_body(body_name) {
      Ok(body) => body,
      Err(available_body_names) => {
        error!("can't find body with name '{}'", body_name);
        println!("available body names are:");
        for name in available_body_names {
          println!("     {}", name);
        }
        process::exit(1);
      }
    }
  } else if let Some(path) = matches.value_of("file") {
    match parser::parse_file(PathBuf::from(path)) {
      Ok(body) => body,
      Err(err) => {
        error!("can't parse {}: {:?}", path, err);
        process::exit(1);
      }
    }
  } else {
    unreachable!("clap requires -t, -f or -D")
  };

  if let Err(msg) = validator::validate(&body) {
    error!("invalid body: {}", msg);
    process::exit(1);
  }

  body.print("before splitting");

  if matches.is_present("differential") {
    match validator::run_differential(&body) {
      Ok(_) => println!("sweep and reference agree"),
      Err(msg) => {
        println!("differential check failed: {}", msg);
        process::exit(1);
      }
    }
  }

  let table = match split_traps_with_opts(&body, &body, &opts) {
    Err(e) => {
      println!("splitting failed: {}", e);
      process::exit(1);
    }
    Ok(table) => table,
  };

  if let Some(path) = matches.value_of("output") {
    if let Err(msg) = write_table(path, &table) {
      error!("can't write {}: {}", path, msg);
      process::exit(1);
    }
  }

  let mut after = body.clone();
  after.update_from_split(&table);
  after.print("after splitting");

  validator::check_results(&body, &after);
}

fn write_table(path: &str, table: &TrapTable<ExnType>) -> Result<(), String> {
  let file = File::create(path).map_err(|e| e.to_string())?;
  bincode::serialize_into(BufWriter::new(file), table).map_err(|e| e.to_string())
}

#[cfg(test)]
mod test_utils {
  use trapsplit::{AnyBoundary, InstIx, TrapSplitError};

  use super::*;

  /// Splits with both algorithms and the checker, compares the two, and
  /// checks the rewritten body against the original.
  pub fn check_split(body_name: &str) -> TrapTable<ExnType> {
    let _ = pretty_env_logger::try_init();
    let body = test_cases::find_body(body_name).unwrap();
    validator::validate(&body).unwrap();

    let mut tables = Vec::new();
    for &algorithm in &[Algorithm::Sweep, Algorithm::Reference] {
      let opts = Options { run_checker: true, algorithm };
      let table = split_traps_with_opts(&body, &body, &opts)
        .unwrap_or_else(|err| panic!("splitting failed: {}", err));
      tables.push(table);
    }
    assert_eq!(tables[0], tables[1]);

    let mut after = body.clone();
    after.update_from_split(&tables[0]);
    validator::check_results(&body, &after);

    // Splitting is idempotent.
    let again =
      split_traps_with_opts(&after, &AnyBoundary, &Options::default()).unwrap();
    assert_eq!(again, tables[0]);

    tables.pop().unwrap()
  }

  /// The table as `(first, last_plus1, [(type name, handler)])`.
  pub fn shape(
    body_name: &str, table: &TrapTable<ExnType>,
  ) -> Vec<(u32, u32, Vec<(String, u32)>)> {
    let body = test_cases::find_body(body_name).unwrap();
    table
      .ranges
      .iter()
      .map(|r| {
        let handlers = r
          .handlers
          .iter()
          .map(|h| (body.exn_name(h.exception).to_string(), h.target.get()))
          .collect();
        (r.range.first.get(), r.range.last_plus1.get(), handlers)
      })
      .collect()
  }

  pub fn check_shape(body_name: &str, expected: &[(u32, u32, &[(&str, u32)])]) {
    let table = check_split(body_name);
    let expected: Vec<(u32, u32, Vec<(String, u32)>)> = expected
      .iter()
      .map(|&(first, last_plus1, handlers)| {
        let handlers =
          handlers.iter().map(|&(name, target)| (name.to_string(), target)).collect();
        (first, last_plus1, handlers)
      })
      .collect();
    assert_eq!(shape(body_name, &table), expected);
  }

  /// Both algorithms must refuse to split at `at`.
  pub fn check_illegal_split(body_name: &str, at: u32) {
    let _ = pretty_env_logger::try_init();
    let body = test_cases::find_body(body_name).unwrap();
    validator::validate(&body).unwrap();
    for &algorithm in &[Algorithm::Sweep, Algorithm::Reference] {
      let opts = Options { run_checker: true, algorithm };
      match split_traps_with_opts(&body, &body, &opts) {
        Err(TrapSplitError::IllegalSplit { at: where_, .. }) => {
          assert_eq!(where_, InstIx::new(at));
        }
        other => panic!("expected an illegal split, got {:?}", other),
      }
    }
    assert_eq!(validator::run_differential(&body), Ok(None));
  }
}

#[test]
fn single() {
  test_utils::check_shape("single", &[(0, 5, &[("TypeA", 9)])]);
}

#[test]
fn overlap_same_type() {
  let table = test_utils::check_split("overlap_same_type");
  // Position 3 is covered by both traps; the first declared one wins.
  let at3 = table.handlers_at(trapsplit::InstIx::new(3));
  assert_eq!(at3.len(), 1);
  assert_eq!(at3[0].target.get(), 8);
  test_utils::check_shape(
    "overlap_same_type",
    &[(0, 4, &[("TypeA", 8)]), (4, 6, &[("TypeA", 10)])],
  );
}

#[test]
fn illegal_inside() {
  test_utils::check_shape("illegal_inside", &[(1, 3, &[("TypeA", 4)])]);
}

#[test]
fn no_traps() {
  let table = test_utils::check_split("no_traps");
  assert!(table.is_empty());
  assert_eq!(table.num_insts, 3);
}

#[test]
fn nested() {
  test_utils::check_shape(
    "nested",
    &[
      (0, 1, &[("java.lang.Throwable", 9)]),
      (1, 5, &[("java.io.IOException", 7), ("java.lang.Throwable", 9)]),
      (5, 7, &[("java.lang.Throwable", 9)]),
    ],
  );
}

#[test]
fn finally() {
  test_utils::check_shape(
    "finally",
    &[
      (0, 3, &[("java.io.IOException", 6), ("java.lang.Throwable", 9)]),
      (6, 8, &[("java.lang.Throwable", 9)]),
    ],
  );
}

#[test]
fn shadowed() {
  test_utils::check_shape(
    "shadowed",
    &[
      (0, 2, &[("TypeA", 7)]),
      (2, 4, &[("TypeA", 7), ("TypeB", 9)]),
      (4, 6, &[("TypeA", 7)]),
    ],
  );
}

#[test]
fn multi_type() {
  test_utils::check_shape(
    "multi_type",
    &[
      (0, 2, &[("TypeA", 10)]),
      (2, 4, &[("TypeA", 10), ("TypeB", 12)]),
      (4, 6, &[("TypeA", 10), ("TypeB", 12), ("TypeC", 10)]),
      (6, 8, &[("TypeB", 12), ("TypeA", 14), ("TypeC", 10)]),
      (8, 10, &[("TypeA", 14), ("TypeC", 10)]),
    ],
  );
}

#[test]
fn split_at_move_result() {
  test_utils::check_shape("split_at_move_result", &[(0, 4, &[("TypeA", 6)])]);
}

#[test]
fn illegal_split() {
  test_utils::check_illegal_split("illegal_split", 2);
}

#[test]
fn illegal_gap() {
  test_utils::check_illegal_split("illegal_gap", 2);
}

#[test]
fn catch_rethrow_from_file() {
  test_utils::check_shape(
    "catch_rethrow",
    &[
      (0, 1, &[("java.lang.Throwable", 9)]),
      (1, 6, &[("java.io.IOException", 6), ("java.lang.Throwable", 9)]),
      (6, 9, &[("java.lang.Throwable", 9)]),
    ],
  );
}

#[test]
fn unknown_body() {
  match test_cases::find_body("no such body") {
    Err(names) => assert!(names.iter().any(|name| name == "nested")),
    Ok(_) => panic!("found a body that doesn't exist"),
  }
}

#[test]
fn batch_over_test_directory() {
  let _ = pretty_env_logger::try_init();
  // catch_rethrow splits; move_result_outside can't be split and
  // unterminated_trap doesn't parse.  Both are skipped.
  let expected =
    validator::BatchSummary { num_split: 1, num_skipped: 2, num_ranges: 3 };
  for &algorithm in &[Algorithm::Sweep, Algorithm::Reference] {
    let opts = Options { run_checker: true, algorithm };
    let summary = validator::run_batch(Path::new("tests"), &opts, true).unwrap();
    assert_eq!(summary, expected);
  }
}

#[test]
fn move_result_outside_from_file() {
  test_utils::check_illegal_split("move_result_outside", 1);
}

#[cfg(test)]
mod generated {
  use super::*;
  use arbitrary::{Arbitrary, Unstructured};
  use proptest::collection::vec;
  use proptest::prelude::{any, proptest};
  use test_framework::Body;

  proptest! {
    #[test]
    fn differential_on_generated_bodies(bytes in vec(any::<u8>(), 16..512)) {
      let _ = pretty_env_logger::try_init();
      let mut u = Unstructured::new(&bytes);
      let body = match Body::arbitrary(&mut u) {
        Ok(body) => body,
        Err(_) => return Ok(()),
      };
      validator::validate(&body).unwrap();
      if let Err(msg) = validator::run_differential(&body) {
        body.print("disagreement");
        panic!("{}", msg);
      }
    }
  }
}
