#![no_main]

use libfuzzer_sys::fuzz_target;

const MAX_ITERATED: u64 = 100_000;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(plan) = volley::fuzzing::load_plan_input(input) else {
        return;
    };
    let _ = plan.info();
    if plan.total_count() > MAX_ITERATED {
        return;
    }
    let mut previous = 0u64;
    let mut seen = 0u64;
    for offset in plan.iter() {
        debug_assert!(offset >= previous);
        previous = offset;
        seen = seen.saturating_add(1);
    }
    debug_assert_eq!(seen, plan.total_count());
});
