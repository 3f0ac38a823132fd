#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    match salvo::fuzzing::parse_header_input(input) {
        Ok((key, value)) => {
            debug_assert!(!key.is_empty());
            debug_assert!(!key.contains(':'));
            debug_assert_eq!(value, value.trim());
        }
        Err(_) => debug_assert!(input.split_once(':').is_none_or(|(key, _)| key.trim().is_empty())),
    }
});
