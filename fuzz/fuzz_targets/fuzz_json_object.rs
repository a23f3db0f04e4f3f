//! Fuzz target: JSON object iteration
//!
//! Walks every member of an arbitrary byte sequence parsed as an object and
//! decodes every string it meets.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Iteration stops after the first error
//! - A decoded string never exceeds its escaped source
//!
//! cargo fuzz run fuzz_json_object

#![no_main]

use ffs_provisionee::json::{JsonKind, parse_object};
use ffs_provisionee::stream::Stream;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(members) = parse_object(data) else {
        return;
    };

    let mut failed = false;
    for member in members {
        assert!(!failed, "iterator yielded after an error");
        let Ok(member) = member else {
            failed = true;
            continue;
        };
        for value in [member.key, member.value] {
            if value.kind != JsonKind::String {
                continue;
            }
            let mut buf = vec![0u8; value.raw.len()];
            let mut out = Stream::output(&mut buf);
            if value.decode_into(&mut out).is_ok() {
                assert!(out.data().len() <= value.raw.len());
            }
        }
    }
});
