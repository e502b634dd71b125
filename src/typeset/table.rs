//! Known-boundary table.
//!
//! Classifies LaTeX commands and environments for the parser (how many
//! arguments to take) and for the compositor (what may sit inside a wrap).
//! Unknown commands are inline pass-through; unknown environments are a
//! defect in the table and fail the composition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the compositor treats a required argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgMode {
    /// Ordinary content. Wraps and annotations may appear inside.
    Content,
    /// Moving argument. Wraps may appear inside, annotations are deferred
    /// until after the outermost restricted command.
    Restricted,
    /// Emitted as is. Markers inside only change the open highlight set.
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandClass {
    /// Ends the current run of inline content (sectioning, list items, line
    /// breaks, rules).
    Boundary,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub class: CommandClass,
    /// Accepts one leading `[...]` argument.
    #[serde(default)]
    pub optional: bool,
    /// Required `{...}` arguments, in order.
    #[serde(default)]
    pub args: Vec<ArgMode>,
}

impl CommandSpec {
    pub fn boundary(optional: bool, args: &[ArgMode]) -> Self {
        Self {
            class: CommandClass::Boundary,
            optional,
            args: args.to_vec(),
        }
    }

    pub fn inline(optional: bool, args: &[ArgMode]) -> Self {
        Self {
            class: CommandClass::Inline,
            optional,
            args: args.to_vec(),
        }
    }

    pub fn is_boundary(&self) -> bool {
        self.class == CommandClass::Boundary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentClass {
    /// Body is ordinary content.
    Block,
    /// Body is taken verbatim up to the matching `\end`.
    Verbatim,
    /// Display math; body is taken verbatim up to the matching `\end`.
    Math,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub class: EnvironmentClass,
    #[serde(default)]
    pub optional: bool,
    /// Number of raw `{...}` arguments after `\begin{name}`.
    #[serde(default)]
    pub args: usize,
}

impl EnvironmentSpec {
    pub fn new(class: EnvironmentClass, optional: bool, args: usize) -> Self {
        Self {
            class,
            optional,
            args,
        }
    }

    pub fn has_raw_body(&self) -> bool {
        matches!(
            self.class,
            EnvironmentClass::Verbatim | EnvironmentClass::Math
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryTable {
    commands: BTreeMap<String, CommandSpec>,
    environments: BTreeMap<String, EnvironmentSpec>,
}

const SECTIONING: &[&str] = &[
    "part",
    "chapter",
    "section",
    "subsection",
    "subsubsection",
    "paragraph",
    "subparagraph",
];

const BREAKS: &[&str] = &[
    "par",
    "newline",
    "linebreak",
    "newpage",
    "clearpage",
    "pagebreak",
    "maketitle",
    "tableofcontents",
    "centering",
    "hline",
    "toprule",
    "midrule",
    "bottomrule",
    "bigskip",
    "medskip",
    "smallskip",
];

const STYLES: &[&str] = &[
    "textbf",
    "textit",
    "emph",
    "underline",
    "sout",
    "texttt",
    "textsc",
    "textsf",
    "textrm",
    "textup",
    "textmd",
    "textsuperscript",
    "textsubscript",
    "mbox",
    "text",
];

const BLOCK_ENVIRONMENTS: &[&str] = &[
    "document",
    "itemize",
    "enumerate",
    "description",
    "quote",
    "quotation",
    "verse",
    "center",
    "flushleft",
    "flushright",
    "abstract",
];

const MATH_ENVIRONMENTS: &[&str] = &[
    "equation",
    "equation*",
    "align",
    "align*",
    "gather",
    "gather*",
    "multline",
    "multline*",
    "displaymath",
    "eqnarray",
];

impl Default for BoundaryTable {
    fn default() -> Self {
        use ArgMode::{Content, Raw, Restricted};

        let mut table = BoundaryTable::empty();
        for name in SECTIONING {
            table.insert_command(*name, CommandSpec::boundary(true, &[Restricted]));
        }
        for name in BREAKS {
            table.insert_command(*name, CommandSpec::boundary(false, &[]));
        }
        table.insert_command("\\", CommandSpec::boundary(true, &[]));
        table.insert_command("item", CommandSpec::boundary(true, &[]));
        table.insert_command("caption", CommandSpec::boundary(true, &[Restricted]));
        for name in ["title", "author", "date"] {
            table.insert_command(name, CommandSpec::boundary(true, &[Restricted]));
        }
        for name in ["documentclass", "usepackage"] {
            table.insert_command(name, CommandSpec::boundary(true, &[Raw]));
        }
        for name in ["vspace", "addvspace"] {
            table.insert_command(name, CommandSpec::boundary(false, &[Raw]));
        }

        for name in STYLES {
            table.insert_command(*name, CommandSpec::inline(false, &[Content]));
        }
        table.insert_command("footnote", CommandSpec::inline(true, &[Content]));
        table.insert_command("href", CommandSpec::inline(false, &[Raw, Content]));
        for name in ["textcolor", "colorbox"] {
            table.insert_command(name, CommandSpec::inline(true, &[Raw, Content]));
        }
        for name in ["url", "label", "ref", "pageref", "eqref", "hspace"] {
            table.insert_command(name, CommandSpec::inline(false, &[Raw]));
        }
        for name in ["cite", "includegraphics"] {
            table.insert_command(name, CommandSpec::inline(true, &[Raw]));
        }
        table.insert_command("rule", CommandSpec::inline(true, &[Raw, Raw]));

        for name in BLOCK_ENVIRONMENTS {
            table.insert_environment(
                *name,
                EnvironmentSpec::new(EnvironmentClass::Block, false, 0),
            );
        }
        for name in ["figure", "table"] {
            table.insert_environment(name, EnvironmentSpec::new(EnvironmentClass::Block, true, 0));
        }
        for name in ["tabular", "longtable", "minipage"] {
            table.insert_environment(name, EnvironmentSpec::new(EnvironmentClass::Block, true, 1));
        }
        for name in ["verbatim", "comment"] {
            table.insert_environment(
                name,
                EnvironmentSpec::new(EnvironmentClass::Verbatim, false, 0),
            );
        }
        table.insert_environment(
            "lstlisting",
            EnvironmentSpec::new(EnvironmentClass::Verbatim, true, 0),
        );
        for name in MATH_ENVIRONMENTS {
            table.insert_environment(*name, EnvironmentSpec::new(EnvironmentClass::Math, false, 0));
        }
        table
    }
}

impl BoundaryTable {
    pub fn empty() -> Self {
        Self {
            commands: BTreeMap::new(),
            environments: BTreeMap::new(),
        }
    }

    /// Looks up `name` (without the backslash). A starred name falls back to
    /// its unstarred entry.
    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name).or_else(|| {
            name.strip_suffix('*')
                .and_then(|base| self.commands.get(base))
        })
    }

    pub fn environment(&self, name: &str) -> Option<&EnvironmentSpec> {
        self.environments.get(name)
    }

    pub fn insert_command(&mut self, name: impl Into<String>, spec: CommandSpec) {
        self.commands.insert(name.into(), spec);
    }

    pub fn insert_environment(&mut self, name: impl Into<String>, spec: EnvironmentSpec) {
        self.environments.insert(name.into(), spec);
    }
}
