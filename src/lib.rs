//! annotex: render character-offset highlights and comments into LaTeX.
//!
//! Highlights are stored as character offsets over one canonical plain-text
//! view of a rich document. Exporting them runs four stages, strictly forward:
//!
//! - **Canonical text** - One linearization of the document, shared by
//!   everything that produces or consumes offsets
//! - **Marker insertion** - Offsets become zero-width sentinel leaves in a copy
//!   of the document
//! - **Conversion** - Any [`TypesetConverter`] turns the marked document into
//!   LaTeX, keeping sentinels as literal text
//! - **Composition** - Sentinels become highlight wraps and annotation
//!   commands that never cross a structural boundary
//!
//! [`remap`] rewrites highlight and tag ids when highlight state is duplicated.
//!
//! # Quick Start
//!
//! ```rust
//! use annotex::{Document, ExportConfig, Highlight, LatexConverter, Node, export};
//! use uuid::Uuid;
//!
//! let doc = Document::new(vec![Node::paragraph("Hello world")]);
//! let highlight = Highlight::new(Uuid::new_v4(), 6, 11);
//!
//! let composition = export(
//!     &doc,
//!     &[highlight],
//!     &[],
//!     &LatexConverter::new(),
//!     &ExportConfig::default(),
//! )
//! .unwrap();
//! assert!(composition.output.starts_with("Hello \\highLight["));
//! ```

// Shared annotation types and marker sentinels
pub mod core;

// Rich document model, canonical text, marker insertion
pub mod doc;

// LaTeX conversion, parsing, and composition
pub mod typeset;

// Id remapping for duplicated state
pub mod remap;

pub mod pipeline;

// Re-export core types
pub use crate::core::marker::{Marker, MarkerKind};
pub use crate::core::{Comment, Highlight, HighlightId, HighlightStack, MarkerId, TagId};

// Re-export doc types
pub use doc::marker_ops::{
    InsertConfig, InsertError, MarkedDocument, MarkerTable, insert_markers,
    insert_markers_with_config,
};
pub use doc::walker::{CanonicalText, OffsetOutOfRange, TextPosition, canonical_text};
pub use doc::{BlockKind, Document, InlineKind, Node};

// Re-export typeset types
pub use typeset::compositor::{Composition, CompositionStats, CompositorConfig, compose};
pub use typeset::convert::{ConvertError, LatexConverter, TypesetConverter, escape_latex};
pub use typeset::table::{
    ArgMode, BoundaryTable, CommandClass, CommandSpec, EnvironmentClass, EnvironmentSpec,
};
pub use typeset::{CompositeError, TexNode};

// Re-export remap types
pub use remap::{HighlightState, IdentityMap, TagOrder, remap};

// Re-export pipeline entry point
pub use pipeline::{ExportBundle, ExportConfig, ExportError, export};
