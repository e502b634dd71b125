//! Typeset (LaTeX) side of the pipeline.
//!
//! The converter seam lives in [`convert`]. Its output is parsed here into a
//! lossless syntax tree (`render(parse(s)) == s` for every accepted `s`),
//! which [`compositor`] walks to replace marker sentinels with highlight and
//! annotation commands. [`table`] decides which constructs are structural
//! boundaries.

use crate::core::MarkerId;
use crate::core::marker::Marker;
use lexer::{Spanned, Token};
use table::{ArgMode, BoundaryTable};

pub mod compositor;
pub mod convert;
pub mod lexer;
pub mod table;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositeError {
    #[error("unparsable typeset input at byte {offset}: {message}")]
    UpstreamParseFailure { offset: usize, message: String },
    #[error("unknown boundary kind `{name}`")]
    UnknownBoundaryKind { name: String },
    #[error("marker id {id} is not in the marker table")]
    UnknownMarker { id: MarkerId },
    #[error("marker {marker} does not match the open highlights")]
    UnbalancedMarker { marker: Marker },
    #[error("highlight ended by {marker} covers only raw content and cannot be shown")]
    HighlightInRawContext { marker: Marker },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TexNode {
    /// Plain text, including single newlines and stray brackets.
    Text(String),
    /// Blank-line run, stored as written.
    ParBreak(String),
    /// `%` comment including its newline.
    Comment(String),
    /// `&`
    Alignment,
    Group(Vec<TexNode>),
    Command(Command),
    Environment(Environment),
    Math(Math),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Name without the leading backslash. Starred forms keep the `*`.
    pub name: String,
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Optional,
    Required,
}

impl ArgKind {
    pub fn delimiters(self) -> (char, char) {
        match self {
            ArgKind::Optional => ('[', ']'),
            ArgKind::Required => ('{', '}'),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub kind: ArgKind,
    pub nodes: Vec<TexNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    pub args: Vec<Arg>,
    pub body: EnvironmentBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentBody {
    Nodes(Vec<TexNode>),
    /// Verbatim and math bodies, up to the matching `\end`.
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathDelimiter {
    /// `$...$`
    Dollar,
    /// `$$...$$`
    DoubleDollar,
    /// `\(...\)`
    Paren,
    /// `\[...\]`
    Bracket,
}

impl MathDelimiter {
    pub fn open(self) -> &'static str {
        match self {
            MathDelimiter::Dollar => "$",
            MathDelimiter::DoubleDollar => "$$",
            MathDelimiter::Paren => "\\(",
            MathDelimiter::Bracket => "\\[",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            MathDelimiter::Dollar => "$",
            MathDelimiter::DoubleDollar => "$$",
            MathDelimiter::Paren => "\\)",
            MathDelimiter::Bracket => "\\]",
        }
    }

    pub fn is_display(self) -> bool {
        matches!(self, MathDelimiter::DoubleDollar | MathDelimiter::Bracket)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Math {
    pub delimiter: MathDelimiter,
    pub body: String,
}

impl TexNode {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    pub fn render_into(&self, out: &mut String) {
        match self {
            TexNode::Text(text) | TexNode::ParBreak(text) | TexNode::Comment(text) => {
                out.push_str(text)
            }
            TexNode::Alignment => out.push('&'),
            TexNode::Group(children) => {
                out.push('{');
                render_into(children, out);
                out.push('}');
            }
            TexNode::Command(command) => {
                out.push('\\');
                out.push_str(&command.name);
                render_args(&command.args, out);
            }
            TexNode::Environment(env) => {
                out.push_str("\\begin{");
                out.push_str(&env.name);
                out.push('}');
                render_args(&env.args, out);
                match &env.body {
                    EnvironmentBody::Nodes(children) => render_into(children, out),
                    EnvironmentBody::Raw(raw) => out.push_str(raw),
                }
                out.push_str("\\end{");
                out.push_str(&env.name);
                out.push('}');
            }
            TexNode::Math(math) => {
                out.push_str(math.delimiter.open());
                out.push_str(&math.body);
                out.push_str(math.delimiter.close());
            }
        }
    }
}

fn render_args(args: &[Arg], out: &mut String) {
    for arg in args {
        let (open, close) = arg.kind.delimiters();
        out.push(open);
        render_into(&arg.nodes, out);
        out.push(close);
    }
}

pub fn render(nodes: &[TexNode]) -> String {
    let mut out = String::new();
    render_into(nodes, &mut out);
    out
}

pub fn render_into(nodes: &[TexNode], out: &mut String) {
    for node in nodes {
        node.render_into(out);
    }
}

/// Parses `source`, using `table` to decide argument counts and which
/// environments have raw bodies.
pub fn parse(source: &str, table: &BoundaryTable) -> Result<Vec<TexNode>, CompositeError> {
    let mut parser = Parser {
        source,
        table,
        tokens: lexer::tokenize(source)?,
        pos: 0,
        raw_depth: 0,
    };
    parser.nodes(Stop::Eof)
}

#[derive(Debug, Clone, Copy)]
enum Stop<'n> {
    Eof,
    Brace,
    Bracket,
    End(&'n str),
}

struct Parser<'a> {
    source: &'a str,
    table: &'a BoundaryTable,
    tokens: Vec<Spanned>,
    pos: usize,
    /// Inside a raw argument math shifts and `&` are plain text.
    raw_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    /// Byte offset of the next token.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |(_, span)| span.start)
    }

    fn bump(&mut self) -> Option<(Token, &'a str)> {
        let (token, span) = self.tokens.get(self.pos)?.clone();
        self.pos += 1;
        Some((token, &self.source[span]))
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn nodes(&mut self, stop: Stop<'_>) -> Result<Vec<TexNode>, CompositeError> {
        let mut out = Vec::new();
        loop {
            let offset = self.offset();
            let Some((token, slice)) = self.bump() else {
                return match stop {
                    Stop::Eof => Ok(out),
                    Stop::Brace => Err(failure(offset, "unclosed `{`")),
                    Stop::Bracket => Err(failure(offset, "unclosed `[`")),
                    Stop::End(name) => Err(failure(offset, format!("missing \\end{{{name}}}"))),
                };
            };
            let raw = self.raw_depth > 0;
            match token {
                Token::Text | Token::Newline | Token::OpenBracket => push_text(&mut out, slice),
                Token::Dollar | Token::DisplayDollar | Token::Ampersand if raw => {
                    push_text(&mut out, slice)
                }
                Token::ControlSymbol
                    if raw && matches!(slice, "\\(" | "\\)" | "\\[" | "\\]") =>
                {
                    push_text(&mut out, slice)
                }
                Token::CloseBracket => {
                    if let Stop::Bracket = stop {
                        return Ok(out);
                    }
                    push_text(&mut out, slice);
                }
                Token::CloseBrace => {
                    if let Stop::Brace = stop {
                        return Ok(out);
                    }
                    return Err(failure(offset, "unbalanced `}`"));
                }
                Token::OpenBrace => out.push(TexNode::Group(self.nodes(Stop::Brace)?)),
                Token::ParBreak => out.push(TexNode::ParBreak(slice.to_string())),
                Token::Comment => out.push(TexNode::Comment(slice.to_string())),
                Token::Ampersand => out.push(TexNode::Alignment),
                Token::Dollar => {
                    out.push(TexNode::Math(self.math(MathDelimiter::Dollar, offset)?))
                }
                Token::DisplayDollar => {
                    out.push(TexNode::Math(self.math(MathDelimiter::DoubleDollar, offset)?))
                }
                Token::ControlSymbol => match slice {
                    "\\(" => out.push(TexNode::Math(self.math(MathDelimiter::Paren, offset)?)),
                    "\\[" => out.push(TexNode::Math(self.math(MathDelimiter::Bracket, offset)?)),
                    "\\)" | "\\]" => {
                        return Err(failure(offset, format!("unexpected `{slice}`")));
                    }
                    _ => out.push(TexNode::Command(self.command(&slice[1..], false)?)),
                },
                Token::ControlWord => match &slice[1..] {
                    "begin" => out.push(TexNode::Environment(self.environment(offset)?)),
                    "end" => {
                        let closing = self.name_group(offset)?;
                        return match stop {
                            Stop::End(name) if name == closing => Ok(out),
                            _ => Err(failure(offset, format!("unexpected \\end{{{closing}}}"))),
                        };
                    }
                    name => out.push(TexNode::Command(self.command(name, true)?)),
                },
            }
        }
    }

    /// Known commands take exactly their table arguments. Unknown control
    /// words take every `{...}` group that immediately follows.
    fn command(&mut self, name: &str, greedy: bool) -> Result<Command, CompositeError> {
        let table = self.table;
        let mut args = Vec::new();
        match table.command(name) {
            Some(spec) => {
                if spec.optional && self.eat(Token::OpenBracket) {
                    args.push(Arg {
                        kind: ArgKind::Optional,
                        nodes: self.nodes(Stop::Bracket)?,
                    });
                }
                for mode in &spec.args {
                    args.push(if *mode == ArgMode::Raw {
                        self.raw_required(name)?
                    } else {
                        self.required(name)?
                    });
                }
            }
            None if greedy => {
                while self.eat(Token::OpenBrace) {
                    args.push(Arg {
                        kind: ArgKind::Required,
                        nodes: self.nodes(Stop::Brace)?,
                    });
                }
            }
            None => {}
        }
        Ok(Command {
            name: name.to_string(),
            args,
        })
    }

    fn required(&mut self, owner: &str) -> Result<Arg, CompositeError> {
        let offset = self.offset();
        if !self.eat(Token::OpenBrace) {
            return Err(failure(offset, format!("missing argument for \\{owner}")));
        }
        Ok(Arg {
            kind: ArgKind::Required,
            nodes: self.nodes(Stop::Brace)?,
        })
    }

    fn raw_required(&mut self, owner: &str) -> Result<Arg, CompositeError> {
        self.raw_depth += 1;
        let arg = self.required(owner);
        self.raw_depth -= 1;
        arg
    }

    fn environment(&mut self, begin: usize) -> Result<Environment, CompositeError> {
        let name = self.name_group(begin)?;
        let table = self.table;
        let spec = table
            .environment(&name)
            .ok_or_else(|| CompositeError::UnknownBoundaryKind { name: name.clone() })?;

        let mut args = Vec::new();
        if spec.optional && self.eat(Token::OpenBracket) {
            args.push(Arg {
                kind: ArgKind::Optional,
                nodes: self.nodes(Stop::Bracket)?,
            });
        }
        for _ in 0..spec.args {
            args.push(self.required(&name)?);
        }

        let body = if spec.has_raw_body() {
            EnvironmentBody::Raw(self.raw_body(&name, begin)?)
        } else {
            EnvironmentBody::Nodes(self.nodes(Stop::End(&name))?)
        };
        Ok(Environment { name, args, body })
    }

    /// Takes the source up to `\end{name}` as is and resumes lexing after it.
    fn raw_body(&mut self, name: &str, begin: usize) -> Result<String, CompositeError> {
        let start = self.offset();
        let end_tag = format!("\\end{{{name}}}");
        let Some(len) = self.source[start..].find(&end_tag) else {
            return Err(failure(begin, format!("missing {end_tag}")));
        };
        self.tokens = lexer::tokenize_from(self.source, start + len + end_tag.len())?;
        self.pos = 0;
        Ok(self.source[start..start + len].to_string())
    }

    /// `{name}` after `\begin` or `\end`.
    fn name_group(&mut self, offset: usize) -> Result<String, CompositeError> {
        if !self.eat(Token::OpenBrace) {
            return Err(failure(offset, "expected `{` after \\begin or \\end"));
        }
        let name = match self.bump() {
            Some((Token::Text, name)) => name.to_string(),
            _ => return Err(failure(offset, "expected environment name")),
        };
        if !self.eat(Token::CloseBrace) {
            return Err(failure(offset, "unclosed environment name"));
        }
        Ok(name)
    }

    fn math(&mut self, delimiter: MathDelimiter, open: usize) -> Result<Math, CompositeError> {
        let start = self.offset();
        loop {
            let offset = self.offset();
            let Some((token, slice)) = self.bump() else {
                return Err(failure(open, "unterminated math"));
            };
            let closes = match delimiter {
                MathDelimiter::Dollar => token == Token::Dollar,
                MathDelimiter::DoubleDollar => token == Token::DisplayDollar,
                MathDelimiter::Paren => token == Token::ControlSymbol && slice == "\\)",
                MathDelimiter::Bracket => token == Token::ControlSymbol && slice == "\\]",
            };
            if closes {
                return Ok(Math {
                    delimiter,
                    body: self.source[start..offset].to_string(),
                });
            }
        }
    }
}

fn push_text(out: &mut Vec<TexNode>, slice: &str) {
    if let Some(TexNode::Text(text)) = out.last_mut() {
        text.push_str(slice);
    } else {
        out.push(TexNode::Text(slice.to_string()));
    }
}

fn failure(offset: usize, message: impl Into<String>) -> CompositeError {
    CompositeError::UpstreamParseFailure {
        offset,
        message: message.into(),
    }
}
