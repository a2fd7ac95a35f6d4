//! A [`SpannedError`] is the error type returned by [`crate::Parser::parse_str`].

use std::fmt::Display;

use annotate_snippets::*;
use itertools::Itertools;
use lalr_gen::{GrammarError, ParseError};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("the parser table is invalid: {0}")]
    Grammar(#[from] GrammarError),
    #[error("{0}")]
    Parse(#[from] ParseError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpannedError<'s> {
    inner: Error,
    source: &'s str,
}

impl<'s> SpannedError<'s> {
    pub(crate) fn new(inner: Error, source: &'s str) -> Self {
        Self { inner, source }
    }

    pub fn error(&self) -> &Error {
        &self.inner
    }

    pub fn into_owned(self) -> Error {
        self.inner
    }
}

impl std::error::Error for SpannedError<'_> {}

impl Display for SpannedError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = self.source;
        let renderer = Renderer::styled();
        match &self.inner {
            Error::Parse(ParseError::UnexpectedToken {
                found,
                expected,
                span,
            }) => {
                let title = format!("unexpected token `{found}`");
                let annot = format!("expected {}", expected.iter().format(", "));
                let message = Level::Error.title(&title).snippet(
                    Snippet::source(source)
                        .fold(true)
                        .annotation(Level::Error.span(span.range()).label(&annot)),
                );
                let rendered = renderer.render(message);
                write!(f, "{rendered}")
            }
            Error::Parse(ParseError::UnexpectedEof { expected, span }) => {
                let annot = format!("expected {}", expected.iter().format(", "));
                let message = Level::Error.title("unexpected end of file").snippet(
                    Snippet::source(source)
                        .fold(true)
                        .annotation(Level::Error.span(span.range()).label(&annot)),
                );
                let rendered = renderer.render(message);
                write!(f, "{rendered}")
            }
            err => {
                let title = err.to_string();
                let message = Level::Error.title(&title);
                let rendered = renderer.render(message);
                write!(f, "{rendered}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_kind_of_error() {
        let source = "uniform float x";
        let eof = ParseError::UnexpectedEof {
            expected: vec!["`;`".to_string()],
            span: lalr_gen::Span::empty_at(15),
        };
        let rendered = SpannedError::new(eof.into(), source).to_string();
        assert!(rendered.contains("unexpected end of file"));
        assert!(rendered.contains("expected `;`"));

        let token = ParseError::UnexpectedToken {
            found: "x".to_string(),
            expected: vec!["IDENTIFIER".to_string()],
            span: lalr_gen::Span::new(14..15),
        };
        let rendered = SpannedError::new(token.into(), source).to_string();
        assert!(rendered.contains("unexpected token `x`"));
        assert!(rendered.contains("uniform float x"));

        let grammar = GrammarError::DuplicateSymbol("x".to_string());
        let rendered = SpannedError::new(grammar.into(), source).to_string();
        assert!(rendered.contains("the parser table is invalid"));
    }
}
