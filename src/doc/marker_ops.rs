//! Marker insertion.
//!
//! Converts highlight offsets into zero-width [`Node::Marker`] leaves. The
//! first pass resolves every boundary through the canonical text walker; the
//! second rebuilds the tree, splitting only text leaves so inline and block
//! structure is preserved.

use super::walker::{CanonicalText, LeafPath, TextPosition};
use super::{Document, InlineKind, Node};
use crate::core::marker::{Marker, MarkerKind, contains_sentinel};
use crate::core::{Highlight, HighlightId, MarkerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    #[error("highlight {highlight}: offset {offset} outside canonical text of length {len}")]
    OffsetOutOfRange {
        highlight: HighlightId,
        offset: usize,
        len: usize,
    },
    #[error("highlight {highlight}: empty or inverted range {start}..{end}")]
    InvalidRange {
        highlight: HighlightId,
        start: usize,
        end: usize,
    },
    #[error("document text already contains marker sentinel text")]
    SentinelCollision,
    #[error("document already contains marker leaves")]
    AlreadyMarked,
    #[error("highlight {highlight}: offset {offset} splits a grapheme cluster")]
    InvalidGraphemeBoundary {
        highlight: HighlightId,
        offset: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertConfig {
    /// Reject highlight boundaries that fall inside a grapheme cluster.
    pub validate_grapheme_boundaries: bool,
}

/// A document with marker leaves spliced in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedDocument {
    document: Document,
}

impl MarkedDocument {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn strip_markers(&self) -> Document {
        self.document.strip_markers()
    }
}

/// Marker ids and the highlights they stand for, in opening order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkerTable {
    entries: Vec<(MarkerId, Highlight)>,
}

impl MarkerTable {
    pub fn get(&self, id: MarkerId) -> Option<&Highlight> {
        self.entries
            .get(id.0 as usize)
            .filter(|(entry_id, _)| *entry_id == id)
            .map(|(_, highlight)| highlight)
    }

    pub fn marker_for(&self, highlight: HighlightId) -> Option<MarkerId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.id == highlight)
            .map(|(id, _)| *id)
    }

    pub fn entries(&self) -> &[(MarkerId, Highlight)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &(MarkerId, Highlight)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn insert_markers(
    doc: &Document,
    highlights: &[Highlight],
) -> Result<(MarkedDocument, MarkerTable), InsertError> {
    insert_markers_with_config(doc, highlights, &InsertConfig::default())
}

pub fn insert_markers_with_config(
    doc: &Document,
    highlights: &[Highlight],
    config: &InsertConfig,
) -> Result<(MarkedDocument, MarkerTable), InsertError> {
    if doc.has_markers() {
        return Err(InsertError::AlreadyMarked);
    }
    let canonical = CanonicalText::of(doc);
    if contains_sentinel(canonical.as_str()) || href_has_sentinel(&doc.children) {
        return Err(InsertError::SentinelCollision);
    }

    let table = opening_order(highlights);
    for (_, highlight) in &table.entries {
        validate(highlight, &canonical, config)?;
    }

    let points = ordered_points(&table);

    // Pass 1: resolve every point to a leaf position.
    let mut by_leaf: BTreeMap<LeafPath, Vec<(usize, Marker)>> = BTreeMap::new();
    let mut at_end = Vec::new();
    let mut cached: Option<(usize, TextPosition)> = None;
    for point in &points {
        let position = match cached.as_ref() {
            Some((offset, position)) if *offset == point.offset => position.clone(),
            _ => canonical.locate(point.offset).map_err(|err| {
                InsertError::OffsetOutOfRange {
                    highlight: point.highlight,
                    offset: err.offset,
                    len: err.len,
                }
            })?,
        };
        cached = Some((point.offset, position.clone()));
        match position {
            TextPosition::Leaf { path, byte } => {
                by_leaf.entry(path).or_default().push((byte, point.marker));
            }
            TextPosition::DocumentEnd => at_end.push(point.marker),
        }
    }

    // Pass 2: split leaves and splice marker nodes.
    let mut children = splice(&doc.children, &mut Vec::new(), &by_leaf);
    children.extend(at_end.into_iter().map(Node::Marker));

    tracing::debug!(
        highlights = table.len(),
        markers = points.len(),
        leaves = by_leaf.len(),
        "inserted markers"
    );

    Ok((
        MarkedDocument {
            document: Document { children },
        },
        table,
    ))
}

fn opening_order(highlights: &[Highlight]) -> MarkerTable {
    let mut order: Vec<usize> = (0..highlights.len()).collect();
    order.sort_by_key(|&index| (highlights[index].start_char, index));
    MarkerTable {
        entries: order
            .into_iter()
            .enumerate()
            .map(|(rank, index)| (MarkerId(rank as u32), highlights[index].clone()))
            .collect(),
    }
}

fn validate(
    highlight: &Highlight,
    canonical: &CanonicalText,
    config: &InsertConfig,
) -> Result<(), InsertError> {
    let len = canonical.char_len();
    for offset in [highlight.start_char, highlight.end_char] {
        if offset > len {
            return Err(InsertError::OffsetOutOfRange {
                highlight: highlight.id,
                offset,
                len,
            });
        }
    }
    if highlight.start_char >= highlight.end_char {
        return Err(InsertError::InvalidRange {
            highlight: highlight.id,
            start: highlight.start_char,
            end: highlight.end_char,
        });
    }
    if config.validate_grapheme_boundaries {
        for offset in [highlight.start_char, highlight.end_char] {
            if !canonical.is_grapheme_boundary(offset) {
                return Err(InsertError::InvalidGraphemeBoundary {
                    highlight: highlight.id,
                    offset,
                });
            }
        }
    }
    Ok(())
}

/// Link targets reach the converter output too, so they must not look like
/// markers either.
fn href_has_sentinel(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Inline {
            kind: InlineKind::Link { href },
            children,
        } => contains_sentinel(href) || href_has_sentinel(children),
        Node::Inline { children, .. } | Node::Block { children, .. } => {
            href_has_sentinel(children)
        }
        Node::Text(_) | Node::Marker(_) => false,
    })
}

struct Point {
    offset: usize,
    marker: Marker,
    highlight: HighlightId,
}

/// All marker points sorted by offset; at one offset ends come first (latest
/// opened first), then starts and annotations in opening order.
fn ordered_points(table: &MarkerTable) -> Vec<Point> {
    let mut points = Vec::with_capacity(table.len() * 3);
    for (id, highlight) in table.iter() {
        points.push(Point {
            offset: highlight.start_char,
            marker: Marker::start(*id),
            highlight: highlight.id,
        });
        points.push(Point {
            offset: highlight.end_char,
            marker: Marker::end(*id),
            highlight: highlight.id,
        });
        points.push(Point {
            offset: highlight.end_char,
            marker: Marker::annotation(*id),
            highlight: highlight.id,
        });
    }
    points.sort_by_key(|point| {
        let rank = match point.marker.kind {
            MarkerKind::HighlightEnd => u32::MAX - point.marker.id.0,
            MarkerKind::HighlightStart | MarkerKind::Annotation => point.marker.id.0,
        };
        (point.offset, point.marker.kind, rank)
    });
    points
}

fn splice(
    nodes: &[Node],
    path: &mut LeafPath,
    by_leaf: &BTreeMap<LeafPath, Vec<(usize, Marker)>>,
) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        path.push(index);
        match node {
            Node::Text(content) => match by_leaf.get(path.as_slice()) {
                Some(points) => split_leaf(content, points, &mut out),
                None => out.push(Node::Text(content.clone())),
            },
            Node::Inline { kind, children } => out.push(Node::Inline {
                kind: kind.clone(),
                children: splice(children, path, by_leaf),
            }),
            Node::Block { kind, children } => out.push(Node::Block {
                kind: kind.clone(),
                children: splice(children, path, by_leaf),
            }),
            Node::Marker(marker) => out.push(Node::Marker(*marker)),
        }
        path.pop();
    }
    out
}

/// `points` are in marker order and their byte offsets never decrease.
fn split_leaf(content: &str, points: &[(usize, Marker)], out: &mut Vec<Node>) {
    let mut cursor = 0;
    for (byte, marker) in points {
        if *byte > cursor {
            out.push(Node::Text(content[cursor..*byte].to_string()));
            cursor = *byte;
        }
        out.push(Node::Marker(*marker));
    }
    if cursor < content.len() {
        out.push(Node::Text(content[cursor..].to_string()));
    }
}
