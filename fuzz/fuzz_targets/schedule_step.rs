#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(step) = volley::fuzzing::schedule_step_input(input) {
            // Display output must parse back to the same step.
            let rendered = step.to_string();
            debug_assert!(volley::fuzzing::schedule_step_input(&rendered).is_ok());
        }
    }
});
