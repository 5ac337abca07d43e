#![no_main]
use libfuzzer_sys::fuzz_target;

use log::info;
use trapsplit::{sweep, check_structure, coalesce, events, legalizer, TrapTable};
use trapsplit_util::test_framework as ir;

// Runs the sweep stages one by one, checking what each of them promises.
fuzz_target!(|body: ir::Body| {
    let _ = pretty_env_logger::try_init();

    let num_insts = body.insts.len();
    let events = match events::build_events(num_insts, &body.traps) {
        Ok(events) => events,
        Err(err) => {
            info!("rejected: {}", err);
            return;
        }
    };
    let candidates = sweep::sweep(&body.traps, &events);
    for w in candidates.windows(2) {
        assert!(w[0].range.last_plus1 <= w[1].range.first);
    }

    let legal = match legalizer::legalize(num_insts, candidates, &body) {
        Ok(legal) => legal,
        Err(err) => {
            info!("rejected: {}", err);
            return;
        }
    };
    let ranges = coalesce::coalesce(legal);
    assert!(coalesce::is_coalesced(&ranges));

    let table = TrapTable { num_insts, ranges };
    if let Err(errs) = check_structure(&table, &body) {
        panic!("bad table: {}", errs);
    }
    let mut after = body.clone();
    after.update_from_split(&table);
    trapsplit_util::validator::check_results(&body, &after);
});
