#![allow(dead_code)]

use annotex::{BlockKind, CanonicalText, Document, Highlight, InlineKind, Node};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;
use uuid::Uuid;

fn leaf_text() -> impl Strategy<Value = String> {
    "[a-cé \t\n]{0,6}"
}

fn inline_node() -> impl Strategy<Value = Node> {
    leaf_text()
        .prop_map(Node::Text)
        .prop_recursive(2, 8, 3, |inner| {
            (
                prop_oneof![
                    Just(InlineKind::Bold),
                    Just(InlineKind::Italic),
                    Just(InlineKind::Span),
                ],
                vec(inner, 0..3),
            )
                .prop_map(|(kind, children)| Node::inline(kind, children))
        })
}

fn block_node() -> impl Strategy<Value = Node> {
    let leaf_block = (
        prop_oneof![
            Just(BlockKind::Paragraph),
            (1u8..4).prop_map(|level| BlockKind::Heading { level }),
            Just(BlockKind::TableCell),
        ],
        vec(inline_node(), 0..4),
    )
        .prop_map(|(kind, children)| Node::block(kind, children));

    leaf_block.prop_recursive(2, 12, 3, |inner| {
        (
            prop_oneof![
                Just(BlockKind::BulletList),
                Just(BlockKind::ListItem),
                Just(BlockKind::BlockQuote),
                Just(BlockKind::Division),
            ],
            vec(inner, 0..3),
        )
            .prop_map(|(kind, children)| Node::block(kind, children))
    })
}

/// Arbitrary nesting, whitespace runs, empty blocks and loose inline content.
pub fn rich_documents() -> impl Strategy<Value = Document> {
    vec(prop_oneof![3 => block_node(), 1 => inline_node()], 0..5).prop_map(Document::new)
}

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

fn span() -> impl Strategy<Value = Node> {
    prop_oneof![
        3 => word().prop_map(Node::Text),
        1 => word().prop_map(|word| Node::inline(InlineKind::Bold, vec![Node::text(word)])),
        1 => word().prop_map(|word| Node::inline(InlineKind::Italic, vec![Node::text(word)])),
    ]
}

fn sentence() -> impl Strategy<Value = Vec<Node>> {
    vec(span(), 1..5).prop_map(|spans| {
        let mut children = Vec::with_capacity(spans.len() * 2);
        for (index, span) in spans.into_iter().enumerate() {
            if index > 0 {
                children.push(Node::text(" "));
            }
            children.push(span);
        }
        children
    })
}

fn word_block() -> impl Strategy<Value = Node> {
    prop_oneof![
        3 => sentence().prop_map(|children| Node::block(BlockKind::Paragraph, children)),
        1 => (1u8..4, vec(word(), 1..4))
            .prop_map(|(level, words)| Node::heading(level, words.join(" "))),
        1 => vec(sentence(), 1..4).prop_map(|items| {
            Node::block(
                BlockKind::BulletList,
                items
                    .into_iter()
                    .map(|children| {
                        Node::block(
                            BlockKind::ListItem,
                            vec![Node::block(BlockKind::Paragraph, children)],
                        )
                    })
                    .collect(),
            )
        }),
    ]
}

/// Paragraphs, headings and bullet lists of lowercase words with bold and
/// italic spans.
pub fn word_documents() -> impl Strategy<Value = Document> {
    vec(word_block(), 1..6).prop_map(Document::new)
}

pub fn picks() -> impl Strategy<Value = Vec<(Index, Index)>> {
    vec((any::<Index>(), any::<Index>()), 0..6)
}

pub fn tag(index: usize) -> Uuid {
    Uuid::from_u128(0xa000 + index as u128)
}

/// Valid highlights over `doc`, one distinct tag each. `full` adds one
/// covering `0..len`.
pub fn highlights(doc: &Document, picks: &[(Index, Index)], full: bool) -> Vec<Highlight> {
    let len = CanonicalText::of(doc).char_len();
    if len == 0 {
        return Vec::new();
    }
    let mut ranges: Vec<(usize, usize)> = picks
        .iter()
        .map(|(a, b)| {
            let (a, b) = (a.index(len + 1), b.index(len + 1));
            (a.min(b), a.max(b))
        })
        .filter(|(start, end)| start < end)
        .collect();
    if full {
        ranges.push((0, len));
    }
    ranges
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| Highlight::new(tag(index), start, end))
        .collect()
}
