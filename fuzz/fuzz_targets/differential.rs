#![no_main]
use libfuzzer_sys::fuzz_target;

use trapsplit_util::{test_framework as ir, validator};

fuzz_target!(|body: ir::Body| {
    let _ = pretty_env_logger::try_init();

    if let Err(msg) = validator::validate(&body) {
        panic!("generated an invalid body: {}", msg);
    }

    match validator::run_differential(&body) {
        Ok(Some(table)) => {
            let mut after = body.clone();
            after.update_from_split(&table);
            validator::check_results(&body, &after);
        }
        Ok(None) => {}
        Err(msg) => {
            body.print("disagreement");
            panic!("sweep and reference disagree: {}", msg);
        }
    }
});
