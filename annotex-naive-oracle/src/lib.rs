//! A naive, simple oracle implementation for differential testing.
use annotex::{Document, Highlight, Marker, MarkerId, Node, TagId};

enum Piece {
    Char(char),
    Break,
}

fn flatten(nodes: &[Node], out: &mut Vec<Piece>) {
    for node in nodes {
        match node {
            Node::Text(content) => out.extend(content.chars().map(Piece::Char)),
            Node::Inline { children, .. } => flatten(children, out),
            Node::Block { children, .. } => {
                out.push(Piece::Break);
                flatten(children, out);
                out.push(Piece::Break);
            }
            Node::Marker(_) => {}
        }
    }
}

/// Canonical text computed from a flat list of chars and block breaks.
pub fn canonical_text(doc: &Document) -> String {
    let mut pieces = Vec::new();
    flatten(&doc.children, &mut pieces);

    let mut out = String::new();
    let mut at_block_start = true;
    let mut pending_break = false;
    for piece in pieces {
        match piece {
            Piece::Break => {
                pending_break = true;
                at_block_start = true;
            }
            Piece::Char(ch) => {
                let ch = if ch.is_whitespace() {
                    if at_block_start || out.ends_with(' ') {
                        continue;
                    }
                    ' '
                } else {
                    ch
                };
                at_block_start = false;
                if pending_break {
                    pending_break = false;
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                out.push(ch);
            }
        }
    }
    out
}

/// Highlights paired with their marker ids: sorted by start offset, ties kept
/// in input order.
pub fn opening_order(highlights: &[Highlight]) -> Vec<(MarkerId, Highlight)> {
    let mut sorted: Vec<(usize, Highlight)> = highlights.iter().cloned().enumerate().collect();
    sorted.sort_by(|a, b| {
        a.1.start_char
            .cmp(&b.1.start_char)
            .then_with(|| a.0.cmp(&b.0))
    });
    sorted
        .into_iter()
        .enumerate()
        .map(|(rank, (_, highlight))| (MarkerId(rank as u32), highlight))
        .collect()
}

/// The canonical text of `doc` with marker sentinels written in front of the
/// char at their offset. At one offset: ends (latest opened first), then
/// starts, then annotations.
pub fn marked_text(doc: &Document, highlights: &[Highlight]) -> String {
    let text: Vec<char> = canonical_text(doc).chars().collect();
    let ordered = opening_order(highlights);

    let mut out = String::new();
    for offset in 0..=text.len() {
        let mut ends: Vec<MarkerId> = ordered
            .iter()
            .filter(|(_, h)| h.end_char == offset)
            .map(|(id, _)| *id)
            .collect();
        ends.reverse();
        for id in ends {
            out.push_str(&Marker::end(id).sentinel());
        }
        for (id, h) in &ordered {
            if h.start_char == offset {
                out.push_str(&Marker::start(*id).sentinel());
            }
        }
        for (id, h) in &ordered {
            if h.end_char == offset {
                out.push_str(&Marker::annotation(*id).sentinel());
            }
        }
        if let Some(ch) = text.get(offset) {
            out.push(*ch);
        }
    }
    out
}

/// For every canonical char, the tags of the highlights covering it in
/// opening order.
pub fn coverage(doc: &Document, highlights: &[Highlight]) -> Vec<(char, Vec<TagId>)> {
    let ordered = opening_order(highlights);
    canonical_text(doc)
        .chars()
        .enumerate()
        .map(|(offset, ch)| {
            let tags = ordered
                .iter()
                .filter(|(_, h)| h.start_char <= offset && offset < h.end_char)
                .map(|(_, h)| h.tag)
                .collect();
            (ch, tags)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotex::BlockKind;

    #[test]
    fn test_canonical_text_matches_simple_cases() {
        let doc = Document::new(vec![
            Node::paragraph("  a  b "),
            Node::block(BlockKind::BulletList, vec![Node::paragraph("c")]),
        ]);
        assert_eq!(canonical_text(&doc), "a b \nc");
    }

    #[test]
    fn test_marked_text_orders_coincident_markers() {
        let doc = Document::new(vec![Node::paragraph("abcd")]);
        let tag = TagId::nil();
        let first = Highlight::new(tag, 0, 2);
        let second = Highlight::new(tag, 2, 4);
        assert_eq!(
            marked_text(&doc, &[second, first]),
            "HLSTART0ENDHLabHLEND0ENDHLHLSTART1ENDHLANNMARKER0ENDMARKERcdHLEND1ENDHLANNMARKER1ENDMARKER"
        );
    }
}
