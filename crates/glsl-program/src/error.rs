use std::fmt::Display;

use lalr_gen::{GrammarError, ParseError, Span};

use crate::{ResolveError, Resource};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PreprocessError {
    #[error("the preprocessor table is invalid: {0}")]
    Grammar(#[from] GrammarError),
    #[error("{0}")]
    Syntax(#[from] ParseError),
    #[error("includes are nested more than {0} levels deep")]
    IncludeDepth(usize),
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    ResolveError(#[from] ResolveError),
    #[error("{0}")]
    PreprocessError(#[from] PreprocessError),
    #[error("{0}")]
    ParseError(#[from] glsl_parse::Error),
    #[error("{0}")]
    Error(#[from] Diagnostic<Error>),
}

/// An error with the source text and file it occurred in, rendered with a snippet.
#[derive(Clone, Debug)]
pub struct Diagnostic<E: std::error::Error> {
    pub error: Box<E>,
    pub source: Option<String>,
    pub file: Option<Resource>,
    pub span: Option<Span>,
}

impl From<PreprocessError> for Diagnostic<Error> {
    fn from(error: PreprocessError) -> Self {
        let span = match &error {
            PreprocessError::Syntax(e) => e.span().cloned(),
            _ => None,
        };
        let mut res = Self::new(error.into());
        res.span = span;
        res
    }
}

impl From<glsl_parse::Error> for Diagnostic<Error> {
    fn from(error: glsl_parse::Error) -> Self {
        let span = match &error {
            glsl_parse::Error::Parse(e) => e.span().cloned(),
            _ => None,
        };
        let mut res = Self::new(error.into());
        res.span = span;
        res
    }
}

impl From<ResolveError> for Diagnostic<Error> {
    fn from(error: ResolveError) -> Self {
        Self::new(error.into())
    }
}

impl From<Error> for Diagnostic<Error> {
    fn from(error: Error) -> Self {
        match error {
            Error::ResolveError(e) => e.into(),
            Error::PreprocessError(e) => e.into(),
            Error::ParseError(e) => e.into(),
            Error::Error(e) => e,
        }
    }
}

impl<E: std::error::Error> Diagnostic<E> {
    fn new(error: E) -> Diagnostic<E> {
        Self {
            error: Box::new(error),
            source: None,
            file: None,
            span: None,
        }
    }
    pub fn with_source(mut self, source: String) -> Self {
        self.source = Some(source);
        self
    }
    pub fn with_file(mut self, file: Resource) -> Self {
        self.file = Some(file);
        self
    }
}

impl<E: std::error::Error> std::error::Error for Diagnostic<E> {}

impl<E: std::error::Error> Display for Diagnostic<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use annotate_snippets::*;
        let title = format!("{}", self.error);
        let mut msg = Level::Error.title(&title);

        let orig = self.file.as_ref().map(|file| file.to_string());

        if let Some(span) = &self.span {
            if let Some(source) = self.source.as_deref() {
                if span.range().end <= source.len() {
                    let annot = Level::Error.span(span.range()).label(&title);
                    let mut snip = Snippet::source(source).fold(true).annotation(annot);
                    if let Some(file) = orig.as_ref() {
                        snip = snip.origin(file);
                    }
                    msg = msg.snippet(snip);
                } else {
                    msg = msg.footer(
                        Level::Note.title("cannot display snippet: invalid source location"),
                    )
                }
            } else {
                msg = msg.footer(Level::Note.title("cannot display snippet: missing source file"))
            }
        }

        let renderer = Renderer::styled();
        let rendered = renderer.render(msg);
        write!(f, "{rendered}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_keeps_span() {
        let error = glsl_parse::Error::Parse(ParseError::UnexpectedToken {
            found: "$".to_string(),
            expected: vec!["`;`".to_string()],
            span: Span::new(16..17),
        });
        let diagnostic = Diagnostic::from(Error::from(error))
            .with_source("uniform float x $;".to_string())
            .with_file(Resource::new("shader.frag").unwrap());
        assert_eq!(diagnostic.span, Some(Span::new(16..17)));
        let rendered = diagnostic.to_string();
        assert!(rendered.contains("shader.frag"));
        assert!(diagnostic.error.to_string().ends_with("expected `;`"));
    }

    #[test]
    fn diagnostic_without_source() {
        let error = PreprocessError::Syntax(ParseError::UnexpectedEof {
            expected: vec!["newline".to_string()],
            span: Span::new(3..3),
        });
        let rendered = Diagnostic::from(error).to_string();
        assert!(rendered.contains("missing source file"));
    }
}
