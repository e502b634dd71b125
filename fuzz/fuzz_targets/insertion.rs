#![no_main]

use annotex::{Document, Highlight, Node, insert_markers};
use libfuzzer_sys::fuzz_target;
use uuid::Uuid;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let (bounds, text) = data.split_at(2);
    let text = String::from_utf8_lossy(text);
    let doc = Document::new(vec![Node::paragraph(text.as_ref()), Node::heading(1, "end")]);
    let len = doc.canonical_text().chars().count();
    let start = bounds[0] as usize % (len + 1);
    let end = bounds[1] as usize % (len + 1);
    let highlight = Highlight::new(Uuid::nil(), start.min(end), start.max(end));

    if let Ok((marked, _)) = insert_markers(&doc, &[highlight]) {
        assert_eq!(marked.strip_markers().canonical_text(), doc.canonical_text());
    }
});
