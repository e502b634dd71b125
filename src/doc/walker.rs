//! Canonical text walker.
//!
//! Every highlight offset in the system is an index into the text produced
//! here, so there is exactly one linearization and both directions of the
//! mapping (tree to text, offset to tree position) are built from the same
//! walk:
//!
//! 1. Text leaves are visited depth-first in document order. Marker leaves are
//!    zero width.
//! 2. Each whitespace character becomes a single `' '`, and is dropped when the
//!    previous canonical character is whitespace or when nothing has been
//!    emitted since the last block boundary.
//! 3. Entering or leaving a block schedules one `'\n'`, written just before the
//!    next emitted character if the text is non-empty and does not already
//!    end in `'\n'`.
//!
//! Offsets count `char`s.

use super::{Document, Node};
use unicode_segmentation::UnicodeSegmentation;

/// Child indices from the document root down to a text leaf.
pub type LeafPath = Vec<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharSource {
    Leaf { leaf: usize, byte: usize, len: usize },
    Separator,
}

/// A split point in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TextPosition {
    /// Byte offset inside the text leaf at `path`.
    Leaf { path: LeafPath, byte: usize },
    /// End of the root node list. Only used when the canonical text is empty.
    DocumentEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("offset {offset} outside canonical text of length {len}")]
pub struct OffsetOutOfRange {
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalText {
    text: String,
    sources: Vec<CharSource>,
    leaves: Vec<LeafPath>,
}

impl CanonicalText {
    pub fn of(doc: &Document) -> Self {
        let mut walker = Walker::new(false);
        walker.walk(&doc.children, &mut Vec::new());
        CanonicalText {
            text: walker.text,
            sources: walker.sources,
            leaves: walker.leaves,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Length in chars.
    pub fn char_len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Maps a canonical offset to the tree position a marker for it belongs
    /// at. An offset is placed before the char it indexes when that char
    /// comes from a leaf; at a block separator or at the end of the text it is
    /// placed after the preceding char.
    pub fn locate(&self, offset: usize) -> Result<TextPosition, OffsetOutOfRange> {
        let len = self.char_len();
        if offset > len {
            return Err(OffsetOutOfRange { offset, len });
        }

        if let Some(CharSource::Leaf { leaf, byte, .. }) = self.sources.get(offset) {
            return Ok(TextPosition::Leaf {
                path: self.leaves[*leaf].clone(),
                byte: *byte,
            });
        }

        let previous = self.sources[..offset]
            .iter()
            .rev()
            .find_map(|source| match source {
                CharSource::Leaf { leaf, byte, len } => Some((*leaf, byte + len)),
                CharSource::Separator => None,
            });
        Ok(match previous {
            Some((leaf, byte)) => TextPosition::Leaf {
                path: self.leaves[leaf].clone(),
                byte,
            },
            None => TextPosition::DocumentEnd,
        })
    }

    /// True if `offset` does not fall inside an extended grapheme cluster of
    /// the canonical text.
    pub fn is_grapheme_boundary(&self, offset: usize) -> bool {
        let Some((byte, _)) = self.text.char_indices().nth(offset) else {
            return true;
        };
        if byte == 0 {
            return true;
        }
        self.text
            .grapheme_indices(true)
            .any(|(index, _)| index == byte)
    }
}

pub fn canonical_text(doc: &Document) -> String {
    CanonicalText::of(doc).into_string()
}

/// Canonical text with marker sentinels rendered where the marker leaves sit.
/// Markers do not change whitespace or separator state. A marker reached while
/// a block separator is pending is written after that separator.
pub fn marked_text(doc: &Document) -> String {
    let mut walker = Walker::new(true);
    walker.walk(&doc.children, &mut Vec::new());
    let mut marked = walker.marked;
    marked.push_str(&walker.held_markers);
    marked
}

struct Walker {
    text: String,
    sources: Vec<CharSource>,
    leaves: Vec<LeafPath>,
    drop_whitespace: bool,
    break_pending: bool,
    render_markers: bool,
    marked: String,
    held_markers: String,
}

impl Walker {
    fn new(render_markers: bool) -> Self {
        Self {
            text: String::new(),
            sources: Vec::new(),
            leaves: Vec::new(),
            drop_whitespace: true,
            break_pending: false,
            render_markers,
            marked: String::new(),
            held_markers: String::new(),
        }
    }

    fn walk(&mut self, nodes: &[Node], path: &mut LeafPath) {
        for (index, node) in nodes.iter().enumerate() {
            path.push(index);
            match node {
                Node::Text(content) => self.visit_text(content, path),
                Node::Inline { children, .. } => self.walk(children, path),
                Node::Block { children, .. } => {
                    self.boundary();
                    self.walk(children, path);
                    self.boundary();
                }
                Node::Marker(marker) if self.render_markers => {
                    let target = if self.break_pending {
                        &mut self.held_markers
                    } else {
                        &mut self.marked
                    };
                    target.push_str(&marker.sentinel());
                }
                Node::Marker(_) => {}
            }
            path.pop();
        }
    }

    fn boundary(&mut self) {
        self.break_pending = true;
        self.drop_whitespace = true;
    }

    fn visit_text(&mut self, content: &str, path: &LeafPath) {
        let mut leaf = None;
        for (byte, ch) in content.char_indices() {
            let source_len = ch.len_utf8();
            let emitted = if ch.is_whitespace() {
                if self.drop_whitespace {
                    continue;
                }
                self.drop_whitespace = true;
                ' '
            } else {
                self.drop_whitespace = false;
                ch
            };

            if self.break_pending {
                self.break_pending = false;
                if !self.text.is_empty() && !self.text.ends_with('\n') {
                    self.push(CharSource::Separator, '\n');
                }
                if !self.held_markers.is_empty() {
                    let held = std::mem::take(&mut self.held_markers);
                    self.marked.push_str(&held);
                }
            }

            let leaf_index = *leaf.get_or_insert_with(|| {
                self.leaves.push(path.clone());
                self.leaves.len() - 1
            });
            self.push(
                CharSource::Leaf {
                    leaf: leaf_index,
                    byte,
                    len: source_len,
                },
                emitted,
            );
        }
    }

    fn push(&mut self, source: CharSource, ch: char) {
        self.text.push(ch);
        self.sources.push(source);
        if self.render_markers {
            self.marked.push(ch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{BlockKind, InlineKind};

    fn two_paragraphs() -> Document {
        Document::new(vec![Node::paragraph("ab"), Node::paragraph("cd")])
    }

    #[test]
    fn test_blocks_are_separated_once() {
        let doc = Document::new(vec![
            Node::paragraph("ab"),
            Node::block(
                BlockKind::BulletList,
                vec![Node::block(
                    BlockKind::ListItem,
                    vec![Node::paragraph("cd")],
                )],
            ),
            Node::paragraph(""),
        ]);
        assert_eq!(canonical_text(&doc), "ab\ncd");
    }

    #[test]
    fn test_whitespace_collapses_across_leaves() {
        let doc = Document::new(vec![Node::block(
            BlockKind::Paragraph,
            vec![
                Node::text("  one \t"),
                Node::inline(InlineKind::Bold, vec![Node::text("  two")]),
                Node::text("\n\nthree "),
            ],
        )]);
        assert_eq!(canonical_text(&doc), "one two three ");
    }

    #[test]
    fn test_locate_inside_leaf() {
        let doc = Document::new(vec![Node::paragraph("a  b")]);
        let canonical = CanonicalText::of(&doc);
        assert_eq!(canonical.as_str(), "a b");
        assert_eq!(
            canonical.locate(2),
            Ok(TextPosition::Leaf {
                path: vec![0, 0],
                byte: 3
            })
        );
    }

    #[test]
    fn test_locate_at_separator_binds_left() {
        let canonical = CanonicalText::of(&two_paragraphs());
        assert_eq!(canonical.as_str(), "ab\ncd");
        assert_eq!(
            canonical.locate(2),
            Ok(TextPosition::Leaf {
                path: vec![0, 0],
                byte: 2
            })
        );
        assert_eq!(
            canonical.locate(3),
            Ok(TextPosition::Leaf {
                path: vec![1, 0],
                byte: 0
            })
        );
    }

    #[test]
    fn test_locate_document_end() {
        let canonical = CanonicalText::of(&two_paragraphs());
        assert_eq!(
            canonical.locate(5),
            Ok(TextPosition::Leaf {
                path: vec![1, 0],
                byte: 2
            })
        );
        assert_eq!(
            canonical.locate(6),
            Err(OffsetOutOfRange { offset: 6, len: 5 })
        );
    }

    #[test]
    fn test_locate_empty_document() {
        let canonical = CanonicalText::of(&Document::new(vec![Node::paragraph("   ")]));
        assert!(canonical.is_empty());
        assert_eq!(canonical.locate(0), Ok(TextPosition::DocumentEnd));
        assert!(canonical.locate(1).is_err());
    }

    #[test]
    fn test_multibyte_offsets_count_chars() {
        let doc = Document::new(vec![Node::paragraph("né ü")]);
        let canonical = CanonicalText::of(&doc);
        assert_eq!(canonical.char_len(), 4);
        assert_eq!(
            canonical.locate(3),
            Ok(TextPosition::Leaf {
                path: vec![0, 0],
                byte: 4
            })
        );
    }

    #[test]
    fn test_grapheme_boundaries() {
        let doc = Document::new(vec![Node::paragraph("a\u{1F1FA}\u{1F1F8}b")]);
        let canonical = CanonicalText::of(&doc);
        assert!(canonical.is_grapheme_boundary(0));
        assert!(canonical.is_grapheme_boundary(1));
        assert!(!canonical.is_grapheme_boundary(2));
        assert!(canonical.is_grapheme_boundary(3));
        assert!(canonical.is_grapheme_boundary(4));
    }

    #[test]
    fn test_marked_text_ignores_marker_state() {
        use crate::core::MarkerId;
        use crate::core::marker::Marker;

        let doc = Document::new(vec![Node::block(
            BlockKind::Paragraph,
            vec![
                Node::text("a "),
                Node::Marker(Marker::start(MarkerId(0))),
                Node::text(" b"),
            ],
        )]);
        assert_eq!(marked_text(&doc), "a HLSTART0ENDHLb");
        assert_eq!(canonical_text(&doc), "a b");
    }

    #[test]
    fn test_marked_text_writes_block_start_markers_after_separator() {
        use crate::core::MarkerId;
        use crate::core::marker::Marker;

        let doc = Document::new(vec![
            Node::paragraph("ab"),
            Node::block(
                BlockKind::Paragraph,
                vec![Node::Marker(Marker::start(MarkerId(0))), Node::text("cd")],
            ),
            Node::block(
                BlockKind::Paragraph,
                vec![Node::Marker(Marker::end(MarkerId(0)))],
            ),
        ]);
        assert_eq!(marked_text(&doc), "ab\nHLSTART0ENDHLcdHLEND0ENDHL");
    }
}
