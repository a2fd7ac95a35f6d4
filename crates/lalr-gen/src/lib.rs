//! LR(1) and LALR(1) parser generation.
//!
//! Build a [`Grammar`] with a [`GrammarBuilder`], turn it into a [`ParserTable`] with
//! [`Grammar::create_parser_table`], then parse token streams with a [`Parser`] and your own
//! [`SemanticActions`].
//!
//! Three state constructions are available, see [`Construction`]. The canonical LR(1)
//! collection is exact but large; the merged and unioned collections yield LALR(1) tables.

pub mod engine;
pub mod error;
pub mod grammar;
pub mod item;
pub mod production;
pub mod span;
pub mod symbol;
pub mod table;

pub use engine::{
    BodyCursor, Matched, MatchedValue, Parser, ParserTables, SemanticActions, Token,
};
pub use error::{GrammarError, ParseError};
pub use grammar::{Construction, Grammar, GrammarBuilder};
pub use item::{Item, ItemSet, ItemSetCollection, Kernel};
pub use production::{Production, ProductionId};
pub use span::Span;
pub use symbol::{Symbol, SymbolId, SymbolKind, SymbolRole};
pub use table::{Action, Conflict, ConflictKind, ParserTable};

/// Index of a state in an [`ItemSetCollection`] and in a [`ParserTable`].
pub type StateId = u32;
