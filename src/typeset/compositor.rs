//! Structural-safe highlight compositor.
//!
//! Walks the parsed converter output once, replacing marker sentinels with
//! highlight wraps and annotation commands so that
//!
//! - a wrap never contains a structural boundary: text is buffered and each
//!   buffered run is wrapped on its own, so a highlight crossing a boundary
//!   becomes several wrap regions;
//! - wraps nest in opening order, outermost first;
//! - annotation commands are never emitted inside a wrap, a raw argument or a
//!   restricted (moving) argument. Inside the latter two they are deferred
//!   until the enclosing construct is closed.
//!
//! Closing a highlight that is not the innermost one is corrected by closing
//! the region at that point and reopening the remaining highlights for the
//! next region.

use super::convert::escape_latex;
use super::table::{ArgMode, BoundaryTable, CommandSpec, EnvironmentSpec};
use super::{
    Arg, ArgKind, Command, CompositeError, Environment, EnvironmentBody, Math, TexNode, parse,
    render,
};
use crate::core::marker::{Marker, MarkerKind, Segment, contains_sentinel, split_sentinels};
use crate::core::{Comment, HighlightId, HighlightStack, MarkerId};
use crate::doc::marker_ops::MarkerTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// `\<wrap_command>[<color>]{...}`
    pub wrap_command: String,
    /// `\<annotation_command>{<color>}{<comments>}`
    pub annotation_command: String,
    /// `\<comment_command>{<author>}{<timestamp>}{<text>}`
    pub comment_command: String,
    /// Prepended to the tag id to form the color name.
    pub color_prefix: String,
    /// Added to (or overriding) the default boundary table.
    pub commands: BTreeMap<String, CommandSpec>,
    pub environments: BTreeMap<String, EnvironmentSpec>,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            wrap_command: "highLight".to_string(),
            annotation_command: "annot".to_string(),
            comment_command: "annotcomment".to_string(),
            color_prefix: "tag-".to_string(),
            commands: BTreeMap::new(),
            environments: BTreeMap::new(),
        }
    }
}

impl CompositorConfig {
    /// Default table, configured extras, and the commands the compositor
    /// itself emits, so the output parses with the same table.
    pub fn boundary_table(&self) -> BoundaryTable {
        use ArgMode::{Content, Raw};

        let mut table = BoundaryTable::default();
        for (name, spec) in &self.commands {
            table.insert_command(name.clone(), spec.clone());
        }
        for (name, spec) in &self.environments {
            table.insert_environment(name.clone(), spec.clone());
        }
        table.insert_command(
            self.wrap_command.clone(),
            CommandSpec::inline(true, &[Content]),
        );
        table.insert_command(
            self.annotation_command.clone(),
            CommandSpec::inline(false, &[Raw, Content]),
        );
        table.insert_command(
            self.comment_command.clone(),
            CommandSpec::inline(false, &[Raw, Raw, Content]),
        );
        table
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionStats {
    /// Buffered runs emitted inside at least one wrap.
    pub wrap_regions: usize,
    pub annotations: usize,
    /// Highlights closed while not innermost.
    pub reordered_closes: usize,
    /// Annotations moved out of a raw or restricted context.
    pub deferred_annotations: usize,
    /// Structural boundaries crossed while a highlight was open.
    pub boundary_splits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    pub output: String,
    pub stats: CompositionStats,
}

/// Rewrites converter output, replacing marker sentinels with highlight wraps
/// and annotation commands. `markers` is the table produced by marker
/// insertion for the same invocation. Highlights without comments get no
/// annotation command.
pub fn compose(
    source: &str,
    markers: &MarkerTable,
    comments: &[Comment],
    config: &CompositorConfig,
) -> Result<Composition, CompositeError> {
    let table = config.boundary_table();
    let nodes = parse(source, &table)?;

    let mut by_highlight: BTreeMap<HighlightId, Vec<&Comment>> = BTreeMap::new();
    for comment in comments {
        by_highlight
            .entry(comment.highlight_id)
            .or_default()
            .push(comment);
    }

    let mut compositor = Compositor {
        table: &table,
        markers,
        comments: by_highlight,
        config,
        out: String::with_capacity(source.len() + source.len() / 4),
        buffer: String::new(),
        stack: HighlightStack::new(),
        opened: BTreeSet::new(),
        wrapped: BTreeSet::new(),
        annotated: BTreeSet::new(),
        deferred: Vec::new(),
        restricted_depth: 0,
        stats: CompositionStats::default(),
    };
    compositor.nodes(&nodes)?;
    let composition = compositor.finish();

    tracing::debug!(
        wrap_regions = composition.stats.wrap_regions,
        annotations = composition.stats.annotations,
        reordered_closes = composition.stats.reordered_closes,
        deferred_annotations = composition.stats.deferred_annotations,
        "composed highlights"
    );
    Ok(composition)
}

struct Compositor<'a> {
    table: &'a BoundaryTable,
    markers: &'a MarkerTable,
    comments: BTreeMap<HighlightId, Vec<&'a Comment>>,
    config: &'a CompositorConfig,
    out: String,
    /// Inline content since the last flush.
    buffer: String,
    stack: HighlightStack,
    opened: BTreeSet<MarkerId>,
    /// Highlights that have covered at least one wrapped run.
    wrapped: BTreeSet<MarkerId>,
    annotated: BTreeSet<MarkerId>,
    deferred: Vec<MarkerId>,
    restricted_depth: usize,
    stats: CompositionStats,
}

impl<'a> Compositor<'a> {
    fn nodes(&mut self, nodes: &[TexNode]) -> Result<(), CompositeError> {
        for node in nodes {
            self.node(node)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &TexNode) -> Result<(), CompositeError> {
        match node {
            TexNode::Text(text) => self.text(text)?,
            TexNode::ParBreak(raw) => {
                self.boundary();
                self.out.push_str(raw);
            }
            TexNode::Comment(raw) => {
                self.boundary();
                self.raw(raw)?;
                if !raw.ends_with('\n') && !self.deferred.is_empty() {
                    self.out.push('\n');
                }
                self.release_deferred();
            }
            TexNode::Alignment => {
                self.boundary();
                self.out.push('&');
            }
            TexNode::Group(children) => {
                if self.is_opaque(node) {
                    node.render_into(&mut self.buffer);
                } else {
                    self.flush();
                    self.out.push('{');
                    self.nodes(children)?;
                    self.flush();
                    self.out.push('}');
                }
            }
            TexNode::Command(command) => self.command(command, node)?,
            TexNode::Environment(env) => self.environment(env)?,
            TexNode::Math(math) => self.math(math, node)?,
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), CompositeError> {
        for segment in split_sentinels(text) {
            match segment {
                Segment::Text(run) => self.buffer.push_str(run),
                Segment::Marker(marker) => {
                    self.flush();
                    self.marker(marker, false)?;
                }
            }
        }
        Ok(())
    }

    /// Copies `text` to the output unwrapped, applying and removing markers.
    fn raw(&mut self, text: &str) -> Result<(), CompositeError> {
        for segment in split_sentinels(text) {
            match segment {
                Segment::Text(run) => self.out.push_str(run),
                Segment::Marker(marker) => self.marker(marker, true)?,
            }
        }
        Ok(())
    }

    fn marker(&mut self, marker: Marker, in_raw: bool) -> Result<(), CompositeError> {
        let id = marker.id;
        if self.markers.get(id).is_none() {
            return Err(CompositeError::UnknownMarker { id });
        }
        match marker.kind {
            MarkerKind::HighlightStart => {
                if !self.opened.insert(id) {
                    return Err(CompositeError::UnbalancedMarker { marker });
                }
                self.stack.push(id);
            }
            MarkerKind::HighlightEnd => match self.stack.remove(id) {
                None => return Err(CompositeError::UnbalancedMarker { marker }),
                Some(_) if in_raw && !self.wrapped.contains(&id) => {
                    return Err(CompositeError::HighlightInRawContext { marker });
                }
                Some(above) if !above.is_empty() => {
                    self.stats.reordered_closes += 1;
                    tracing::debug!(
                        marker = %id,
                        reopened = ?above,
                        "closed highlight below the innermost one"
                    );
                }
                Some(_) => {}
            },
            MarkerKind::Annotation => {
                if !self.opened.contains(&id) || !self.annotated.insert(id) {
                    return Err(CompositeError::UnbalancedMarker { marker });
                }
                if !self.has_comments(id) {
                    return Ok(());
                }
                if in_raw || self.restricted_depth > 0 {
                    self.deferred.push(id);
                    self.stats.deferred_annotations += 1;
                } else {
                    self.annotation(id);
                }
            }
        }
        Ok(())
    }

    fn has_comments(&self, id: MarkerId) -> bool {
        self.markers
            .get(id)
            .is_some_and(|highlight| self.comments.contains_key(&highlight.id))
    }

    fn color(&self, id: MarkerId) -> String {
        match self.markers.get(id) {
            Some(highlight) => format!("{}{}", self.config.color_prefix, highlight.tag),
            None => format!("{}{}", self.config.color_prefix, id),
        }
    }

    /// Emits the buffered run, wrapped by every open highlight.
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let run = std::mem::take(&mut self.buffer);
        if self.stack.is_empty() || run.trim().is_empty() {
            self.out.push_str(&run);
            return;
        }
        self.wrapped.extend(self.stack.iter());
        let opens: Vec<String> = self
            .stack
            .iter()
            .map(|id| format!("\\{}[{}]{{", self.config.wrap_command, self.color(id)))
            .collect();
        for open in &opens {
            self.out.push_str(open);
        }
        self.out.push_str(&run);
        for _ in &opens {
            self.out.push('}');
        }
        self.stats.wrap_regions += 1;
    }

    fn boundary(&mut self) {
        self.flush();
        if !self.stack.is_empty() {
            self.stats.boundary_splits += 1;
        }
    }

    fn annotation(&mut self, id: MarkerId) {
        let markers = self.markers;
        let Some(highlight) = markers.get(id) else {
            return;
        };
        let Some(comments) = self.comments.get(&highlight.id) else {
            return;
        };
        let mut rendered = format!(
            "\\{}{{{}}}{{",
            self.config.annotation_command,
            self.color(id)
        );
        for comment in comments {
            rendered.push_str(&format!(
                "\\{}{{{}}}{{{}}}{{{}}}",
                self.config.comment_command,
                comment_field(&comment.author),
                comment_field(&comment.timestamp),
                comment_field(&comment.text)
            ));
        }
        rendered.push('}');
        self.out.push_str(&rendered);
        self.stats.annotations += 1;
    }

    fn release_deferred(&mut self) {
        if self.restricted_depth > 0 || self.deferred.is_empty() {
            return;
        }
        for id in std::mem::take(&mut self.deferred) {
            self.annotation(id);
        }
    }

    fn command(&mut self, command: &Command, node: &TexNode) -> Result<(), CompositeError> {
        let table = self.table;
        let spec = table.command(&command.name);
        let boundary = spec.is_some_and(CommandSpec::is_boundary);
        if !boundary && self.is_opaque(node) {
            node.render_into(&mut self.buffer);
            return Ok(());
        }

        if boundary {
            self.boundary();
        } else {
            self.flush();
        }
        self.out.push('\\');
        self.out.push_str(&command.name);
        let mut required = 0;
        for arg in &command.args {
            let mode = match arg.kind {
                ArgKind::Optional => ArgMode::Raw,
                ArgKind::Required => {
                    let mode = spec
                        .and_then(|spec| spec.args.get(required))
                        .copied()
                        .unwrap_or(ArgMode::Content);
                    required += 1;
                    mode
                }
            };
            self.argument(arg, mode)?;
        }
        self.release_deferred();
        Ok(())
    }

    fn argument(&mut self, arg: &Arg, mode: ArgMode) -> Result<(), CompositeError> {
        let (open, close) = arg.kind.delimiters();
        self.out.push(open);
        match mode {
            ArgMode::Raw => self.raw(&render(&arg.nodes))?,
            ArgMode::Content => {
                self.nodes(&arg.nodes)?;
                self.flush();
            }
            ArgMode::Restricted => {
                self.restricted_depth += 1;
                let walked = self.nodes(&arg.nodes);
                self.flush();
                self.restricted_depth -= 1;
                walked?;
            }
        }
        self.out.push(close);
        Ok(())
    }

    fn environment(&mut self, env: &Environment) -> Result<(), CompositeError> {
        self.boundary();
        self.out.push_str("\\begin{");
        self.out.push_str(&env.name);
        self.out.push('}');
        for arg in &env.args {
            self.argument(arg, ArgMode::Raw)?;
        }
        match &env.body {
            EnvironmentBody::Nodes(children) => {
                self.nodes(children)?;
                self.boundary();
            }
            EnvironmentBody::Raw(raw) => self.raw(raw)?,
        }
        self.out.push_str("\\end{");
        self.out.push_str(&env.name);
        self.out.push('}');
        self.release_deferred();
        Ok(())
    }

    fn math(&mut self, math: &Math, node: &TexNode) -> Result<(), CompositeError> {
        if self.is_opaque(node) {
            node.render_into(&mut self.buffer);
            return Ok(());
        }
        if math.delimiter.is_display() {
            self.boundary();
        } else {
            self.flush();
        }
        self.out.push_str(math.delimiter.open());
        self.raw(&math.body)?;
        self.out.push_str(math.delimiter.close());
        self.release_deferred();
        Ok(())
    }

    /// True if `node` can go into a wrap as is: no markers and no boundaries
    /// anywhere inside it.
    fn is_opaque(&self, node: &TexNode) -> bool {
        match node {
            TexNode::Text(text) => !contains_sentinel(text),
            TexNode::ParBreak(_)
            | TexNode::Comment(_)
            | TexNode::Alignment
            | TexNode::Environment(_) => false,
            TexNode::Group(children) => children.iter().all(|child| self.is_opaque(child)),
            TexNode::Command(command) => {
                !self
                    .table
                    .command(&command.name)
                    .is_some_and(CommandSpec::is_boundary)
                    && command
                        .args
                        .iter()
                        .all(|arg| arg.nodes.iter().all(|child| self.is_opaque(child)))
            }
            TexNode::Math(math) => !math.delimiter.is_display() && !contains_sentinel(&math.body),
        }
    }

    fn finish(mut self) -> Composition {
        self.flush();
        if !self.stack.is_empty() {
            tracing::debug!(
                open = self.stack.len(),
                "highlights still open at end of input"
            );
        }
        self.release_deferred();
        Composition {
            output: self.out,
            stats: self.stats,
        }
    }
}

/// Escapes one comment field. Whitespace runs containing a line break collapse
/// to one space: annotation arguments cannot hold a paragraph break.
fn comment_field(text: &str) -> String {
    let mut flat = String::with_capacity(text.len());
    let mut run = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            run.push(ch);
            continue;
        }
        flush_whitespace(&mut run, &mut flat);
        flat.push(ch);
    }
    flush_whitespace(&mut run, &mut flat);
    escape_latex(&flat)
}

fn flush_whitespace(run: &mut String, out: &mut String) {
    if run.contains(['\n', '\r']) {
        out.push(' ');
    } else {
        out.push_str(run);
    }
    run.clear();
}
