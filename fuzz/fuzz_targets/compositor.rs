#![no_main]

use annotex::{CompositorConfig, Document, Highlight, Node, compose, insert_markers};
use libfuzzer_sys::fuzz_target;
use uuid::Uuid;

// Arbitrary LaTeX with sentinels for three highlights sprinkled in. Errors are
// fine; panics are not.
fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let doc = Document::new(vec![Node::paragraph("abcd")]);
    let highlights: Vec<Highlight> = (0..3)
        .map(|i| Highlight::new(Uuid::from_u128(i as u128), i, i + 1))
        .collect();
    let Ok((_, markers)) = insert_markers(&doc, &highlights) else {
        return;
    };
    let config = CompositorConfig::default();
    let _ = compose(&input, &markers, &[], &config);
});
