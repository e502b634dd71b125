//! Rich-to-typeset conversion.
//!
//! The pipeline only needs a [`TypesetConverter`]: something that turns a
//! marked document into LaTeX while keeping headings, lists and emphasis
//! structurally intact and leaving every marker sentinel as literal text.
//! [`LatexConverter`] is the in-process reference implementation; a wrapper
//! around an external tool fed with [`crate::doc::html::to_html`] fits the
//! same seam.

use crate::doc::{BlockKind, Document, InlineKind, Node};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error("conversion failed: {0}")]
    Failed(String),
    #[error("cannot convert {0}")]
    Unsupported(String),
}

pub trait TypesetConverter {
    fn convert(&self, doc: &Document) -> Result<String, ConvertError>;
}

impl<F> TypesetConverter for F
where
    F: Fn(&Document) -> Result<String, ConvertError>,
{
    fn convert(&self, doc: &Document) -> Result<String, ConvertError> {
        self(doc)
    }
}

/// Pandoc-style LaTeX body output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexConverter;

impl LatexConverter {
    pub fn new() -> Self {
        Self
    }
}

impl TypesetConverter for LatexConverter {
    fn convert(&self, doc: &Document) -> Result<String, ConvertError> {
        let mut out = String::new();
        blocks(&doc.children, &mut out)?;
        let trimmed = out.trim_end_matches('\n').len();
        out.truncate(trimmed);
        out.push('\n');
        Ok(out)
    }
}

/// Escapes LaTeX special characters. Letters and digits are never touched, so
/// marker sentinels pass through unchanged.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' | '}' | '$' | '&' | '%' | '#' | '_' => {
                out.push('\\');
                out.push(ch);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '[' => out.push_str("{[}"),
            ']' => out.push_str("{]}"),
            other => out.push(other),
        }
    }
    out
}

fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        match ch {
            '\\' | '{' | '}' | '%' | '#' => {
                out.push('\\');
                out.push(ch);
            }
            other => out.push(other),
        }
    }
    out
}

fn blocks(nodes: &[Node], out: &mut String) -> Result<(), ConvertError> {
    let mut inline_run = Vec::new();
    for node in nodes {
        if let Node::Block { kind, children } = node {
            paragraph(&inline_run, out)?;
            inline_run.clear();
            block(kind, children, out)?;
        } else {
            inline_run.push(node.clone());
        }
    }
    paragraph(&inline_run, out)
}

/// Loose inline content between blocks becomes its own paragraph.
fn paragraph(nodes: &[Node], out: &mut String) -> Result<(), ConvertError> {
    if nodes.is_empty() {
        return Ok(());
    }
    inlines(nodes, out)?;
    out.push_str("\n\n");
    Ok(())
}

fn block(kind: &BlockKind, children: &[Node], out: &mut String) -> Result<(), ConvertError> {
    match kind {
        BlockKind::Paragraph => {
            flat(children, out)?;
            out.push_str("\n\n");
        }
        BlockKind::Heading { level } => {
            let command = match level {
                0 | 1 => "section",
                2 => "subsection",
                3 => "subsubsection",
                4 => "paragraph",
                _ => "subparagraph",
            };
            out.push('\\');
            out.push_str(command);
            out.push('{');
            flat(children, out)?;
            out.push_str("}\n\n");
        }
        BlockKind::BlockQuote => environment("quote", children, out)?,
        BlockKind::BulletList => environment("itemize", children, out)?,
        BlockKind::OrderedList => environment("enumerate", children, out)?,
        BlockKind::Division => blocks(children, out)?,
        BlockKind::ListItem => {
            let mut item = String::new();
            blocks(children, &mut item)?;
            out.push_str("\\item ");
            out.push_str(item.trim_end_matches('\n'));
            out.push('\n');
        }
        BlockKind::CodeBlock => {
            let mut body = String::new();
            verbatim(children, &mut body);
            if body.contains("\\end{verbatim}") {
                return Err(ConvertError::Unsupported(
                    "code block containing \\end{verbatim}".into(),
                ));
            }
            out.push_str("\\begin{verbatim}\n");
            out.push_str(&body);
            if !body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("\\end{verbatim}\n\n");
        }
        BlockKind::Table => table(children, out)?,
        BlockKind::TableRow | BlockKind::TableCell => {
            flat(children, out)?;
            out.push_str("\n\n");
        }
        BlockKind::ThematicBreak => {
            out.push_str("\\begin{center}\\rule{0.5\\linewidth}{0.5pt}\\end{center}\n\n");
            if !children.is_empty() {
                flat(children, out)?;
                out.push_str("\n\n");
            }
        }
    }
    Ok(())
}

fn environment(name: &str, children: &[Node], out: &mut String) -> Result<(), ConvertError> {
    out.push_str("\\begin{");
    out.push_str(name);
    out.push_str("}\n");
    let mut body = String::new();
    blocks(children, &mut body)?;
    out.push_str(body.trim_end_matches('\n'));
    if !body.is_empty() {
        out.push('\n');
    }
    out.push_str("\\end{");
    out.push_str(name);
    out.push_str("}\n\n");
    Ok(())
}

fn table(rows: &[Node], out: &mut String) -> Result<(), ConvertError> {
    let columns = rows
        .iter()
        .map(|row| {
            row.children()
                .iter()
                .filter(|cell| is_block(cell, &BlockKind::TableCell))
                .count()
        })
        .max()
        .unwrap_or(0)
        .max(1);
    out.push_str("\\begin{tabular}{");
    out.push_str(&"l".repeat(columns));
    out.push_str("}\n");
    for row in rows {
        let cells: &[Node] = if is_block(row, &BlockKind::TableRow) {
            row.children()
        } else {
            std::slice::from_ref(row)
        };
        for (index, cell) in cells.iter().enumerate() {
            if index > 0 {
                out.push_str(" & ");
            }
            match cell {
                Node::Block { children, .. } => flat(children, out)?,
                other => flat(std::slice::from_ref(other), out)?,
            }
        }
        out.push_str(" \\\\\n");
    }
    out.push_str("\\end{tabular}\n\n");
    Ok(())
}

fn is_block(node: &Node, expected: &BlockKind) -> bool {
    matches!(node, Node::Block { kind, .. } if kind == expected)
}

/// Inline rendering of content that may contain nested blocks (headings,
/// table cells). Nested blocks are joined with a space.
fn flat(nodes: &[Node], out: &mut String) -> Result<(), ConvertError> {
    for (index, node) in nodes.iter().enumerate() {
        match node {
            Node::Block { children, .. } => {
                if index > 0 && !out.ends_with(' ') {
                    out.push(' ');
                }
                flat(children, out)?;
            }
            other => inlines(std::slice::from_ref(other), out)?,
        }
    }
    Ok(())
}

fn inlines(nodes: &[Node], out: &mut String) -> Result<(), ConvertError> {
    for node in nodes {
        match node {
            Node::Text(text) => text_run(text, out),
            Node::Marker(marker) => out.push_str(&marker.sentinel()),
            Node::Inline { kind, children } => inline(kind, children, out)?,
            Node::Block { children, .. } => flat(children, out)?,
        }
    }
    Ok(())
}

fn inline(kind: &InlineKind, children: &[Node], out: &mut String) -> Result<(), ConvertError> {
    let command = match kind {
        InlineKind::Bold => "textbf",
        InlineKind::Italic => "emph",
        InlineKind::Underline => "underline",
        InlineKind::Strikethrough => "sout",
        InlineKind::Code => "texttt",
        InlineKind::Superscript => "textsuperscript",
        InlineKind::Subscript => "textsubscript",
        InlineKind::Link { href } => {
            out.push_str("\\href{");
            out.push_str(&escape_url(href));
            out.push_str("}{");
            inlines(children, out)?;
            out.push('}');
            return Ok(());
        }
        InlineKind::Span => return inlines(children, out),
    };
    out.push('\\');
    out.push_str(command);
    out.push('{');
    inlines(children, out)?;
    out.push('}');
    Ok(())
}

/// Whitespace runs collapse to one space so source newlines never become
/// paragraph breaks.
fn text_run(text: &str, out: &mut String) {
    let mut previous_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !previous_space {
                out.push(' ');
            }
            previous_space = true;
        } else {
            previous_space = false;
            let mut buf = [0; 4];
            out.push_str(&escape_latex(ch.encode_utf8(&mut buf)));
        }
    }
}

fn verbatim(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Marker(marker) => out.push_str(&marker.sentinel()),
            Node::Inline { children, .. } | Node::Block { children, .. } => {
                verbatim(children, out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MarkerId;
    use crate::core::marker::Marker;

    fn convert(doc: &Document) -> String {
        LatexConverter::new().convert(doc).unwrap()
    }

    #[test]
    fn test_escape_leaves_sentinels() {
        let sentinel = Marker::start(MarkerId(12)).sentinel();
        let text = format!("50% of {sentinel} & $5_x [y]");
        assert_eq!(
            escape_latex(&text),
            format!("50\\% of {sentinel} \\& \\$5\\_x {{[}}y{{]}}")
        );
        assert_eq!(escape_latex("a\\b~"), "a\\textbackslash{}b\\textasciitilde{}");
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let doc = Document::new(vec![
            Node::heading(1, "Intro"),
            Node::paragraph("First  line\n\nstill first."),
            Node::heading(3, "Deep"),
        ]);
        assert_eq!(
            convert(&doc),
            "\\section{Intro}\n\nFirst line still first.\n\n\\subsubsection{Deep}\n"
        );
    }

    #[test]
    fn test_lists_and_inline_styles() {
        let doc = Document::new(vec![Node::block(
            BlockKind::BulletList,
            vec![
                Node::block(
                    BlockKind::ListItem,
                    vec![Node::block(
                        BlockKind::Paragraph,
                        vec![
                            Node::inline(InlineKind::Bold, vec![Node::text("one")]),
                            Node::text(" and "),
                            Node::inline(
                                InlineKind::Link {
                                    href: "https://e.com/#x".into(),
                                },
                                vec![Node::text("link")],
                            ),
                        ],
                    )],
                ),
                Node::block(BlockKind::ListItem, vec![Node::paragraph("two")]),
            ],
        )]);
        assert_eq!(
            convert(&doc),
            "\\begin{itemize}\n\\item \\textbf{one} and \\href{https://e.com/\\#x}{link}\n\\item two\n\\end{itemize}\n"
        );
    }

    #[test]
    fn test_link_with_query_string() {
        let doc = Document::new(vec![Node::block(
            BlockKind::Paragraph,
            vec![Node::inline(
                InlineKind::Link {
                    href: "https://e.com/?q=a_b&price=$5%20#top".into(),
                },
                vec![Node::text("buy")],
            )],
        )]);
        assert_eq!(
            convert(&doc),
            "\\href{https://e.com/?q=a_b&price=$5\\%20\\#top}{buy}\n"
        );
    }

    #[test]
    fn test_code_block_is_verbatim() {
        let doc = Document::new(vec![Node::block(
            BlockKind::CodeBlock,
            vec![Node::text("let x = {1};")],
        )]);
        assert_eq!(
            convert(&doc),
            "\\begin{verbatim}\nlet x = {1};\n\\end{verbatim}\n"
        );

        let hostile = Document::new(vec![Node::block(
            BlockKind::CodeBlock,
            vec![Node::text("\\end{verbatim}")],
        )]);
        assert!(matches!(
            LatexConverter.convert(&hostile),
            Err(ConvertError::Unsupported(_))
        ));
    }

    #[test]
    fn test_table_rows() {
        let doc = Document::new(vec![Node::block(
            BlockKind::Table,
            vec![
                Node::block(
                    BlockKind::TableRow,
                    vec![
                        Node::block(BlockKind::TableCell, vec![Node::text("a")]),
                        Node::block(BlockKind::TableCell, vec![Node::paragraph("b")]),
                    ],
                ),
                Node::block(
                    BlockKind::TableRow,
                    vec![Node::block(BlockKind::TableCell, vec![Node::text("c")])],
                ),
            ],
        )]);
        assert_eq!(
            convert(&doc),
            "\\begin{tabular}{ll}\na & b \\\\\nc \\\\\n\\end{tabular}\n"
        );
    }

    #[test]
    fn test_closure_converter() {
        let converter = |_: &Document| -> Result<String, ConvertError> {
            Err(ConvertError::Failed("exit status 1".into()))
        };
        assert_eq!(
            converter.convert(&Document::default()),
            Err(ConvertError::Failed("exit status 1".into()))
        );
    }
}
