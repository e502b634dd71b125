//! Core annotation types shared by every pipeline stage.
//!
//! This module provides the identifiers and value types the rest of the crate
//! is written against:
//!
//! - [`Highlight`] - A tagged character range over canonical text
//! - [`Comment`] - A note attached to a highlight
//! - [`MarkerId`] - Compact per-invocation id carried by marker sentinels
//! - [`HighlightStack`] - Open highlights during a compositor walk
//! - [`marker`] - Marker kinds and their sentinel encoding

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod marker;

pub type HighlightId = Uuid;
pub type TagId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Highlight {
    pub id: HighlightId,
    pub tag: TagId,
    pub start_char: usize,
    pub end_char: usize,
}

impl Highlight {
    pub fn new(tag: TagId, start_char: usize, end_char: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag,
            start_char,
            end_char,
        }
    }

    pub fn len(&self) -> usize {
        self.end_char.saturating_sub(self.start_char)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub highlight_id: HighlightId,
    pub author: String,
    pub text: String,
    pub timestamp: String,
}

/// Id carried inside a marker sentinel. Assigned by marker insertion in
/// opening order and only meaningful for one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u32);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered set of currently open highlights.
///
/// Position encodes nesting: index 0 is the outermost wrap and the last entry
/// is the innermost one, which also renders on top.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HighlightStack {
    open: Vec<MarkerId>,
}

impl HighlightStack {
    pub fn new() -> Self {
        Self { open: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn push(&mut self, id: MarkerId) {
        self.open.push(id);
    }

    /// Removes `id` from the stack, returning the ids that were above it in
    /// their original order. Those are the highlights that have to be closed
    /// and reopened around the removal. Returns `None` if `id` is not open.
    pub fn remove(&mut self, id: MarkerId) -> Option<Vec<MarkerId>> {
        let position = self.open.iter().position(|open| *open == id)?;
        let above = self.open[position + 1..].to_vec();
        self.open.remove(position);
        Some(above)
    }

    /// Outermost first.
    pub fn iter(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.open.iter().copied()
    }
}
