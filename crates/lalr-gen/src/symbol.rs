use std::fmt::Display;

use derive_more::derive::Display;

use crate::ProductionId;

pub type SymbolId = u32;

pub const START_NAME: &str = "$START$";
pub const END_NAME: &str = "$END$";
pub const EMPTY_NAME: &str = "$EMPTY$";

/// Special meaning of a symbol inside its grammar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display)]
pub enum SymbolRole {
    #[default]
    #[display("common")]
    Common,
    #[display("start")]
    Start,
    #[display("empty")]
    Empty,
    #[display("end")]
    End,
    /// a terminal that stands in for any token the current state has no action for.
    #[display("wildcard")]
    Wildcard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub(crate) id: SymbolId,
    pub(crate) name: String,
    pub(crate) role: SymbolRole,
    pub(crate) kind: SymbolKind,
    pub(crate) productions: Vec<ProductionId>,
}

impl Symbol {
    pub fn id(&self) -> SymbolId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn role(&self) -> SymbolRole {
        self.role
    }
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }
    pub fn is_terminal(&self) -> bool {
        self.kind == SymbolKind::Terminal
    }
    /// The alternatives of a nonterminal, in registration order. Empty for terminals.
    pub fn productions(&self) -> &[ProductionId] {
        &self.productions
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            SymbolKind::Terminal => f.write_str(&self.name),
            SymbolKind::Nonterminal => write!(f, "[{}]", self.name),
        }
    }
}
