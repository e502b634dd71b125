//! Token definitions for the LaTeX subset the compositor reads.
//!
//! Tokens are produced with the logos derive macro. The token set is lossless:
//! concatenating the slices of all tokens reproduces the source.
use super::CompositeError;
use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    // Control sequences
    #[regex(r"\\[a-zA-Z@]+\*?")]
    ControlWord,
    #[regex(r"\\[^a-zA-Z@]")]
    ControlSymbol,

    // Grouping
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,

    // Math shifts
    #[token("$$")]
    DisplayDollar,
    #[token("$")]
    Dollar,

    #[token("&")]
    Ampersand,

    // Comment runs to the end of the line, newline included
    #[regex(r"%[^\n]*\n?")]
    Comment,

    // Blank line(s)
    #[regex(r"\n([ \t]*\n)+")]
    ParBreak,
    #[token("\n")]
    Newline,

    // Everything else
    #[regex(r"[^\\{}\[\]$&%\n]+")]
    Text,
}

pub type Spanned = (Token, Range<usize>);

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, CompositeError> {
    tokenize_from(source, 0)
}

/// Tokenizes `source[base..]`. Spans are byte ranges into the full `source`.
pub fn tokenize_from(source: &str, base: usize) -> Result<Vec<Spanned>, CompositeError> {
    let mut lexer = Token::lexer(&source[base..]);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let span = span.start + base..span.end + base;
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(CompositeError::UpstreamParseFailure {
                    offset: span.start,
                    message: format!("unrecognised input {:?}", lexer.slice()),
                });
            }
        }
    }
    Ok(tokens)
}
