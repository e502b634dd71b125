//! One export: marker insertion, conversion, composition.

use crate::core::{Comment, Highlight};
use crate::doc::Document;
use crate::doc::marker_ops::{InsertConfig, InsertError, insert_markers_with_config};
use crate::typeset::CompositeError;
use crate::typeset::compositor::{Composition, CompositorConfig, compose};
use crate::typeset::convert::{ConvertError, TypesetConverter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub insert: InsertConfig,
    pub compositor: CompositorConfig,
}

impl ExportConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Insert(#[from] InsertError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Composite(#[from] CompositeError),
}

/// Everything one export reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub document: Document,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl ExportBundle {
    pub fn export(
        &self,
        converter: &impl TypesetConverter,
        config: &ExportConfig,
    ) -> Result<Composition, ExportError> {
        export(
            &self.document,
            &self.highlights,
            &self.comments,
            converter,
            config,
        )
    }
}

pub fn export(
    doc: &Document,
    highlights: &[Highlight],
    comments: &[Comment],
    converter: &impl TypesetConverter,
    config: &ExportConfig,
) -> Result<Composition, ExportError> {
    let span = tracing::info_span!(
        "export",
        highlights = highlights.len(),
        comments = comments.len()
    );
    let _enter = span.enter();

    let known: BTreeSet<_> = highlights.iter().map(|highlight| highlight.id).collect();
    for comment in comments {
        if !known.contains(&comment.highlight_id) {
            tracing::warn!(
                highlight = %comment.highlight_id,
                "comment refers to a highlight that is not exported"
            );
        }
    }

    let (marked, markers) = insert_markers_with_config(doc, highlights, &config.insert)?;
    let typeset = converter.convert(marked.document())?;
    tracing::debug!(bytes = typeset.len(), "converted marked document");
    let composition = compose(&typeset, &markers, comments, &config.compositor)?;
    Ok(composition)
}
