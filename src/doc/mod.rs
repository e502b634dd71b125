//! Rich document model.
//!
//! A [`Document`] is an ordered tree of [`Node`]s handed to the pipeline as an
//! immutable snapshot. Highlights address it through the canonical text
//! produced by [`walker`]; [`marker_ops`] splices marker leaves into a copy of
//! it and [`html`] renders it as rich content for an external converter.

use crate::core::marker::Marker;
use serde::{Deserialize, Serialize};

pub mod html;
pub mod marker_ops;
pub mod walker;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Text(String),
    Inline {
        kind: InlineKind,
        children: Vec<Node>,
    },
    Block {
        kind: BlockKind,
        children: Vec<Node>,
    },
    /// Zero-width leaf. Only present in marked documents.
    Marker(Marker),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Superscript,
    Subscript,
    Link { href: String },
    Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    BlockQuote,
    BulletList,
    OrderedList,
    ListItem,
    CodeBlock,
    Table,
    TableRow,
    TableCell,
    ThematicBreak,
    Division,
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    pub fn inline(kind: InlineKind, children: Vec<Node>) -> Self {
        Node::Inline { kind, children }
    }

    pub fn block(kind: BlockKind, children: Vec<Node>) -> Self {
        Node::Block { kind, children }
    }

    pub fn paragraph(content: impl Into<String>) -> Self {
        Node::block(BlockKind::Paragraph, vec![Node::text(content)])
    }

    pub fn heading(level: u8, content: impl Into<String>) -> Self {
        Node::block(BlockKind::Heading { level }, vec![Node::text(content)])
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Inline { children, .. } | Node::Block { children, .. } => children,
            Node::Text(_) | Node::Marker(_) => &[],
        }
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// The authoritative linearization highlight offsets refer to.
    pub fn canonical_text(&self) -> String {
        walker::CanonicalText::of(self).into_string()
    }

    /// Canonical text with every marker written out as its sentinel.
    pub fn marked_text(&self) -> String {
        walker::marked_text(self)
    }

    /// Markers in document order.
    pub fn markers(&self) -> Vec<Marker> {
        let mut out = Vec::new();
        collect_markers(&self.children, &mut out);
        out
    }

    pub fn has_markers(&self) -> bool {
        self.children.iter().any(node_has_marker)
    }

    /// Copy of the document with all marker leaves removed.
    pub fn strip_markers(&self) -> Document {
        Document {
            children: strip_nodes(&self.children),
        }
    }
}

fn collect_markers(nodes: &[Node], out: &mut Vec<Marker>) {
    for node in nodes {
        match node {
            Node::Marker(marker) => out.push(*marker),
            Node::Inline { children, .. } | Node::Block { children, .. } => {
                collect_markers(children, out)
            }
            Node::Text(_) => {}
        }
    }
}

fn node_has_marker(node: &Node) -> bool {
    match node {
        Node::Marker(_) => true,
        Node::Text(_) => false,
        Node::Inline { children, .. } | Node::Block { children, .. } => {
            children.iter().any(node_has_marker)
        }
    }
}

fn strip_nodes(nodes: &[Node]) -> Vec<Node> {
    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Marker(_) => None,
            Node::Text(content) => Some(Node::Text(content.clone())),
            Node::Inline { kind, children } => Some(Node::Inline {
                kind: kind.clone(),
                children: strip_nodes(children),
            }),
            Node::Block { kind, children } => Some(Node::Block {
                kind: kind.clone(),
                children: strip_nodes(children),
            }),
        })
        .collect()
}
