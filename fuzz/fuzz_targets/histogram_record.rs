#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut values = Vec::new();
    for chunk in data.chunks_exact(8).take(256) {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(chunk);
        let value = i64::from_le_bytes(bytes);
        let (index, edges) = volley::fuzzing::histogram_bin_input(value % 2 == 0, value);
        debug_assert!(index < edges);
        values.push(value);
    }

    if let Ok(quantiles) = volley::fuzzing::quantiles_input(&values) {
        debug_assert!(quantiles.windows(2).all(|pair| pair[0] <= pair[1]));
    }
});
