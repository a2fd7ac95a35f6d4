use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use derive_more::derive::Display;

use crate::{
    engine::ParserTables, Grammar, Production, ProductionId, StateId, Symbol, SymbolId,
};

/// A cell of the action table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display)]
pub enum Action {
    /// shift the lookahead and go to the state.
    #[display("shift {_0}")]
    Transition(StateId),
    #[display("reduce {_0}")]
    Reduce(ProductionId),
    #[display("accept")]
    Accept,
    #[default]
    #[display("error")]
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum ConflictKind {
    #[display("shift/reduce")]
    ShiftReduce,
    #[display("reduce/reduce")]
    ReduceReduce,
    #[display("accept")]
    Accept,
}

/// Two different actions for the same state and lookahead.
#[derive(Clone, Debug, PartialEq)]
pub struct Conflict {
    pub state: StateId,
    pub symbol: SymbolId,
    pub name: String,
    /// the action kept in the table.
    pub existing: Action,
    pub rejected: Action,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match (self.existing, self.rejected) {
            (Action::Reduce(_), Action::Reduce(_)) => ConflictKind::ReduceReduce,
            (Action::Accept, _) | (_, Action::Accept) => ConflictKind::Accept,
            _ => ConflictKind::ShiftReduce,
        }
    }
}

impl Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "state {}, on `{}`: {} conflict, kept `{}` over `{}`",
            self.state,
            self.name,
            self.kind(),
            self.existing,
            self.rejected
        )
    }
}

/// Action and goto tables of an LR automaton. The table is self-contained: it keeps a copy of
/// the productions and symbol names it needs, so it can outlive its grammar.
#[derive(Clone, Debug)]
pub struct ParserTable {
    actions: Vec<BTreeMap<SymbolId, Action>>,
    gotos: Vec<BTreeMap<SymbolId, StateId>>,
    productions: Vec<Production>,
    symbols: Vec<Option<Symbol>>,
    end: SymbolId,
    wildcard: Option<SymbolId>,
    wildcard_exclusions: BTreeSet<SymbolId>,
    conflicts: Vec<Conflict>,
}

impl ParserTable {
    pub(crate) fn new(grammar: &Grammar, num_states: usize) -> Self {
        Self {
            actions: vec![BTreeMap::new(); num_states],
            gotos: vec![BTreeMap::new(); num_states],
            productions: grammar.productions().to_vec(),
            symbols: grammar.symbol_slots().to_vec(),
            end: grammar.end_symbol(),
            wildcard: grammar.wildcard(),
            wildcard_exclusions: grammar.wildcard_exclusions().clone(),
            conflicts: Vec::new(),
        }
    }

    /// Sets a cell of the action table. If the cell already holds a different action, the
    /// existing action is kept and the conflict is recorded.
    pub(crate) fn register_action(&mut self, state: StateId, symbol: SymbolId, action: Action) {
        let name = self.name(symbol).into_owned();
        let row = &mut self.actions[state as usize];
        match row.get(&symbol) {
            None => {
                row.insert(symbol, action);
            }
            Some(existing) if *existing == action => {}
            Some(existing) => {
                let conflict = Conflict {
                    state,
                    symbol,
                    name,
                    existing: *existing,
                    rejected: action,
                };
                log::debug!("{conflict}");
                self.conflicts.push(conflict);
            }
        }
    }

    pub(crate) fn set_goto(&mut self, state: StateId, symbol: SymbolId, target: StateId) {
        self.gotos[state as usize].insert(symbol, target);
    }

    pub(crate) fn take_conflicts(&mut self) -> Vec<Conflict> {
        std::mem::take(&mut self.conflicts)
    }

    pub fn num_states(&self) -> usize {
        self.actions.len()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id as usize).and_then(Option::as_ref)
    }

    fn name(&self, id: SymbolId) -> Cow<'_, str> {
        match self.symbol(id) {
            Some(sym) => Cow::Borrowed(sym.name()),
            None => Cow::Owned(format!("#{id}")),
        }
    }

    fn excluded_from_wildcard(&self, symbol: SymbolId) -> bool {
        symbol == self.end || self.wildcard_exclusions.contains(&symbol)
    }
}

impl ParserTables for ParserTable {
    fn action(&self, state: StateId, symbol: SymbolId) -> Action {
        let Some(row) = self.actions.get(state as usize) else {
            return Action::Error;
        };
        if let Some(action) = row.get(&symbol) {
            return *action;
        }
        match self.wildcard {
            Some(wildcard) if !self.excluded_from_wildcard(symbol) => {
                row.get(&wildcard).copied().unwrap_or_default()
            }
            _ => Action::Error,
        }
    }

    fn goto_state(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        self.gotos.get(state as usize)?.get(&symbol).copied()
    }

    fn production(&self, id: ProductionId) -> Option<&Production> {
        self.productions.get(id as usize)
    }

    fn symbol_name(&self, id: SymbolId) -> Cow<'_, str> {
        self.name(id)
    }

    fn end_symbol(&self) -> SymbolId {
        self.end
    }

    fn expected_symbols(&self, state: StateId) -> Vec<SymbolId> {
        self.actions
            .get(state as usize)
            .map(|row| row.keys().copied().collect())
            .unwrap_or_default()
    }

    fn is_proxy_symbol(&self, expected: SymbolId, actual: SymbolId) -> bool {
        self.wildcard == Some(expected) && !self.excluded_from_wildcard(actual)
    }
}

impl Display for ParserTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (state, (actions, gotos)) in self.actions.iter().zip(&self.gotos).enumerate() {
            writeln!(f, "state {state}:")?;
            for (symbol, action) in actions {
                writeln!(f, "    {} => {action}", self.name(*symbol))?;
            }
            for (symbol, target) in gotos {
                writeln!(f, "    [{}] => goto {target}", self.name(*symbol))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Construction, GrammarBuilder, SymbolRole};

    const ID: SymbolId = 1;
    const SEMI: SymbolId = 2;
    const ANY: SymbolId = 3;
    const OTHER: SymbolId = 4;

    // a statement list where anything but `;` can fill a statement.
    fn wildcard_table() -> ParserTable {
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("id", ID, SymbolRole::Common).unwrap();
        builder.add_terminal(";", SEMI, SymbolRole::Common).unwrap();
        builder.add_terminal("ANY", ANY, SymbolRole::Wildcard).unwrap();
        builder.add_terminal("other", OTHER, SymbolRole::Common).unwrap();
        builder.exclude_from_wildcard(";").unwrap();
        builder.add_production("$START$", "list").unwrap();
        builder.add_production("list", "").unwrap();
        builder.add_production("list", "list stmt ;").unwrap();
        builder.add_production("stmt", "id").unwrap();
        builder.add_production("stmt", "ANY").unwrap();
        let grammar = builder.build().unwrap();
        grammar.create_parser_table(Construction::Unioned).unwrap()
    }

    #[test]
    fn wildcard_stands_in_for_unknown_terminals() {
        let table = wildcard_table();
        // state 0 reduces the empty list, then the list state expects a statement.
        let Action::Reduce(_) = table.action(0, ID) else {
            panic!("expected a reduction in the initial state");
        };
        let list_state = table
            .goto_state(0, table.productions[1].head())
            .expect("goto on list");

        let shift_id = table.action(list_state, ID);
        let shift_other = table.action(list_state, OTHER);
        let shift_any = table.action(list_state, ANY);
        assert!(matches!(shift_id, Action::Transition(_)));
        assert!(matches!(shift_other, Action::Transition(_)));
        assert_eq!(shift_other, shift_any);
        assert_ne!(shift_other, shift_id);
        assert_eq!(table.action(list_state, SEMI), Action::Error);
    }

    #[test]
    fn proxy_symbols() {
        let table = wildcard_table();
        assert!(table.is_proxy_symbol(ANY, OTHER));
        assert!(table.is_proxy_symbol(ANY, ID));
        assert!(!table.is_proxy_symbol(ANY, SEMI));
        assert!(!table.is_proxy_symbol(ID, OTHER));
        assert!(!table.is_proxy_symbol(ANY, table.end_symbol()));
    }

    #[test]
    fn conflict_kinds() {
        let conflict = Conflict {
            state: 3,
            symbol: 1,
            name: "else".to_string(),
            existing: Action::Transition(4),
            rejected: Action::Reduce(2),
        };
        assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
        assert_eq!(
            conflict.to_string(),
            "state 3, on `else`: shift/reduce conflict, kept `shift 4` over `reduce 2`"
        );
        let conflict = Conflict {
            existing: Action::Reduce(1),
            ..conflict
        };
        assert_eq!(conflict.kind(), ConflictKind::ReduceReduce);
    }

    #[test]
    fn dump_lists_every_state() {
        let table = wildcard_table();
        let dump = table.to_string();
        assert_eq!(dump.matches("state ").count(), table.num_states());
        assert!(dump.contains("accept"));
    }
}
