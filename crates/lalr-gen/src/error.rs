use itertools::Itertools;
use thiserror::Error;

use crate::{span::Span, Conflict, ProductionId, StateId, SymbolId, SymbolRole};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GrammarError {
    #[error("symbol `{0}` is already defined")]
    DuplicateSymbol(String),
    #[error("terminal id {1} of `{0}` is already used by `{2}`")]
    DuplicateId(String, SymbolId, String),
    #[error("only one symbol can have the {0} role")]
    DuplicateRole(SymbolRole),
    #[error("production `{0} ::= {1}` is already defined")]
    DuplicateProduction(String, String),
    #[error("terminal `{0}` cannot be the head of a production")]
    TerminalHead(String),
    #[error("`{0}` is not a terminal")]
    NotATerminal(String),
    #[error("nonterminal `{0}` has no production")]
    UndefinedNonterminal(String),
    #[error("the grammar has no start production")]
    MissingStart,
    #[error("production `{0}` got id {1}, expected {2}")]
    UnexpectedProductionId(String, ProductionId, ProductionId),
    #[error("{} conflict(s) in parser table:\n{}", .0.len(), .0.iter().format("\n"))]
    Conflicts(Vec<Conflict>),
}

/// Errors returned by [`crate::Parser::parse`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected token `{found}`, expected {}", expected.iter().format(", "))]
    UnexpectedToken {
        found: String,
        expected: Vec<String>,
        span: Span,
    },
    #[error("unexpected end of input, expected {}", expected.iter().format(", "))]
    UnexpectedEof { expected: Vec<String>, span: Span },
    #[error("reduction by production {production} expected `{expected}` on the stack, found `{found}`")]
    StackMismatch {
        production: ProductionId,
        expected: String,
        found: String,
    },
    #[error("unknown production {0}")]
    UnknownProduction(ProductionId),
    #[error("no goto entry in state {0} for `{1}`")]
    MissingGoto(StateId, String),
    #[error("{0}")]
    Semantic(String),
}

impl ParseError {
    pub fn span(&self) -> Option<&Span> {
        match self {
            ParseError::UnexpectedToken { span, .. } | ParseError::UnexpectedEof { span, .. } => {
                Some(span)
            }
            _ => None,
        }
    }
}
