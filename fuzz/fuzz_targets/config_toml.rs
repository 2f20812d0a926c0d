#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok((aggregator, pipeline)) = volley::fuzzing::config_toml_input(input) {
            debug_assert!(aggregator.bucket_width_us > 0);
            debug_assert!(pipeline.queue_capacity > 0);
        }
    }
});
