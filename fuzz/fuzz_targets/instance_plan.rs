#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(plan) = volley::fuzzing::instance_plan_input(input) else {
        return;
    };
    let mut previous = None;
    for event in plan.iter().take(100_000) {
        if let Some((offset, concurrency)) = previous {
            debug_assert!(event.offset_ms >= offset);
            debug_assert!(event.concurrency > concurrency);
        }
        previous = Some((event.offset_ms, event.concurrency));
    }
});
