#![no_main]

use annotex::BoundaryTable;
use annotex::typeset::{parse, render};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    if let Ok(nodes) = parse(&input, &BoundaryTable::default()) {
        assert_eq!(render(&nodes), input);
    }
});
