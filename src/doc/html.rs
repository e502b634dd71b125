//! HTML rendering of a (marked) document.
//!
//! This is the rich-content form handed to an out-of-process converter.
//! Markers are written as their literal sentinel text.

use super::{BlockKind, Document, InlineKind, Node};

pub fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    render_nodes(&doc.children, &mut out);
    out
}

fn render_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        render_node(node, out);
    }
}

fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(content) => escape_into(content, out),
        Node::Marker(marker) => out.push_str(&marker.sentinel()),
        Node::Inline { kind, children } => {
            let (open, close) = inline_tags(kind);
            out.push_str(&open);
            render_nodes(children, out);
            out.push_str(close);
        }
        Node::Block { kind, children } => {
            if let BlockKind::ThematicBreak = kind {
                out.push_str("<hr>");
                render_nodes(children, out);
                return;
            }
            let tag = block_tag(kind);
            out.push('<');
            out.push_str(tag);
            out.push('>');
            if let BlockKind::CodeBlock = kind {
                out.push_str("<code>");
                render_nodes(children, out);
                out.push_str("</code>");
            } else {
                render_nodes(children, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn inline_tags(kind: &InlineKind) -> (String, &'static str) {
    match kind {
        InlineKind::Bold => ("<strong>".into(), "</strong>"),
        InlineKind::Italic => ("<em>".into(), "</em>"),
        InlineKind::Underline => ("<u>".into(), "</u>"),
        InlineKind::Strikethrough => ("<s>".into(), "</s>"),
        InlineKind::Code => ("<code>".into(), "</code>"),
        InlineKind::Superscript => ("<sup>".into(), "</sup>"),
        InlineKind::Subscript => ("<sub>".into(), "</sub>"),
        InlineKind::Link { href } => {
            let mut open = String::from("<a href=\"");
            escape_into(href, &mut open);
            open.push_str("\">");
            (open, "</a>")
        }
        InlineKind::Span => ("<span>".into(), "</span>"),
    }
}

fn block_tag(kind: &BlockKind) -> &'static str {
    match kind {
        BlockKind::Paragraph => "p",
        BlockKind::Heading { level } => match level {
            0 | 1 => "h1",
            2 => "h2",
            3 => "h3",
            4 => "h4",
            5 => "h5",
            _ => "h6",
        },
        BlockKind::BlockQuote => "blockquote",
        BlockKind::BulletList => "ul",
        BlockKind::OrderedList => "ol",
        BlockKind::ListItem => "li",
        BlockKind::CodeBlock => "pre",
        BlockKind::Table => "table",
        BlockKind::TableRow => "tr",
        BlockKind::TableCell => "td",
        BlockKind::ThematicBreak => "hr",
        BlockKind::Division => "div",
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Highlight;
    use crate::doc::marker_ops::insert_markers;
    use uuid::Uuid;

    #[test]
    fn test_renders_structure_and_escapes() {
        let doc = Document::new(vec![
            Node::heading(2, "A & B"),
            Node::block(
                BlockKind::Paragraph,
                vec![
                    Node::text("x < y "),
                    Node::inline(
                        InlineKind::Link {
                            href: "https://e.com/?a=1&b=\"2\"".into(),
                        },
                        vec![Node::text("link")],
                    ),
                ],
            ),
            Node::block(BlockKind::ThematicBreak, vec![]),
        ]);
        assert_eq!(
            to_html(&doc),
            "<h2>A &amp; B</h2><p>x &lt; y <a href=\"https://e.com/?a=1&amp;b=&quot;2&quot;\">link</a></p><hr>"
        );
    }

    #[test]
    fn test_markers_survive_as_sentinels() {
        let doc = Document::new(vec![Node::paragraph("one two")]);
        let highlight = Highlight::new(Uuid::new_v4(), 4, 7);
        let (marked, _) = insert_markers(&doc, &[highlight]).unwrap();
        assert_eq!(
            to_html(marked.document()),
            "<p>one HLSTART0ENDHLtwoHLEND0ENDHLANNMARKER0ENDMARKER</p>"
        );
    }
}
