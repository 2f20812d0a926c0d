#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(row) = volley::fuzzing::phout_line_input(input) {
            debug_assert!(!row.tag.contains('\t'));
        }
    }
});
