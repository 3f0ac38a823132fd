#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(duration) = salvo::fuzzing::parse_duration_value_input(input) {
        debug_assert!(!duration.is_zero());
        let trimmed = input.trim();
        debug_assert!(trimmed.starts_with(|ch: char| ch.is_ascii_digit()));
    }
});
