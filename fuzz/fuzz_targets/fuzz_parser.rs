//! Fuzz the process and color-string parsers
//!
//! Malformed input must come back as an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = feyncore::parser::parse_process(input);
        if let Ok(cs) = feyncore::parser::parse_color_string(input) {
            let _ = feyncore::color::simplify(&cs);
        }
    }
});
