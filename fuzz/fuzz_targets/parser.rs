#![no_main]
use libfuzzer_sys::fuzz_target;

use trapsplit_util::{parser, test_framework as ir};

fuzz_target!(|body: ir::Body| {
    let mut printed = String::new();
    body.render("body", &mut printed).expect("error when printing the first time");

    let parsed = parser::parse_content("fuzz", &printed).expect("parser error");
    assert_eq!(parsed.traps, body.traps);

    let mut reprinted = String::new();
    parsed.render("body", &mut reprinted).unwrap();

    let reparsed = parser::parse_content("fuzz", &reprinted).expect("shouldn't error on the second parse!");
    let mut rereprinted = String::new();
    reparsed.render("body", &mut rereprinted).unwrap();

    assert_eq!(printed, reprinted);
    assert_eq!(reprinted, rereprinted);
});
