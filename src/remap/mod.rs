//! Identity remapping for duplicated highlight state.
//!
//! When a document is cloned its highlights and tags get fresh ids. The
//! caller supplies the old-to-new table; [`remap`] applies it to every place
//! an id can appear. Ids the table does not mention pass through unchanged.

use crate::core::{Comment, Highlight, HighlightId, TagId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityMap {
    ids: BTreeMap<Uuid, Uuid>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self {
            ids: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, old: Uuid, new: Uuid) -> Option<Uuid> {
        self.ids.insert(old, new)
    }

    pub fn get(&self, old: &Uuid) -> Option<Uuid> {
        self.ids.get(old).copied()
    }

    /// Mapped id, or `id` itself when unmapped.
    pub fn apply(&self, id: Uuid) -> Uuid {
        self.get(&id).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<(Uuid, Uuid)> for IdentityMap {
    fn from_iter<I: IntoIterator<Item = (Uuid, Uuid)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Highlight order within one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOrder {
    pub tag: TagId,
    pub highlights: Vec<HighlightId>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightState {
    pub highlights: Vec<Highlight>,
    pub comments: Vec<Comment>,
    pub tag_order: Vec<TagOrder>,
}

/// Returns a copy of `state` with every highlight id and tag id passed
/// through `map`. Order and multiplicity of every list are kept.
pub fn remap(state: &HighlightState, map: &IdentityMap) -> HighlightState {
    let highlights = state
        .highlights
        .iter()
        .map(|highlight| Highlight {
            id: map.apply(highlight.id),
            tag: map.apply(highlight.tag),
            ..highlight.clone()
        })
        .collect();
    let comments = state
        .comments
        .iter()
        .map(|comment| Comment {
            highlight_id: map.apply(comment.highlight_id),
            ..comment.clone()
        })
        .collect();
    let tag_order = state
        .tag_order
        .iter()
        .map(|order| TagOrder {
            tag: map.apply(order.tag),
            highlights: order.highlights.iter().map(|id| map.apply(*id)).collect(),
        })
        .collect();

    tracing::debug!(
        highlights = state.highlights.len(),
        comments = state.comments.len(),
        mapped_ids = map.len(),
        "remapped highlight state"
    );

    HighlightState {
        highlights,
        comments,
        tag_order,
    }
}
