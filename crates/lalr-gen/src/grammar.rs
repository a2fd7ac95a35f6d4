//! Grammar construction, FIRST sets and the LR(1) item-set machinery.
//!
//! A grammar is assembled with a [`GrammarBuilder`] and frozen with [`GrammarBuilder::build`].
//! The frozen [`Grammar`] owns every symbol and production; items and tables refer to them by id.
//!
//! ```rust
//! use lalr_gen::{Construction, GrammarBuilder, SymbolRole};
//!
//! let mut builder = GrammarBuilder::new();
//! builder.add_terminal("(", 1, SymbolRole::Common).unwrap();
//! builder.add_terminal(")", 2, SymbolRole::Common).unwrap();
//! builder.add_production("$START$", "S").unwrap();
//! builder.add_production("S", "( S )").unwrap();
//! builder.add_production("S", "").unwrap();
//! let grammar = builder.build().unwrap();
//! let table = grammar.create_parser_table(Construction::Unioned).unwrap();
//! assert!(table.num_states() > 0);
//! ```

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    fmt::Display,
};

use itertools::Itertools;

use crate::{
    error::GrammarError,
    item::{Item, ItemSet, ItemSetCollection, Kernel},
    symbol::{EMPTY_NAME, END_NAME, START_NAME},
    Action, ParserTable, Production, ProductionId, StateId, Symbol, SymbolId, SymbolKind,
    SymbolRole,
};

/// How the collection of parser states is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Construction {
    /// the exact LR(1) collection. Largest, never merges states.
    Canonical,
    /// the canonical collection, then states with equal kernels are merged.
    Merged,
    /// states with equal kernels are merged as soon as they are discovered.
    #[default]
    Unioned,
}

#[derive(Clone, Debug)]
struct PendingSymbol {
    name: String,
    role: SymbolRole,
    terminal: Option<SymbolId>,
    productions: Vec<ProductionId>,
}

/// Collects terminals and productions. Nonterminal ids, as well as the end and empty symbols
/// when they are not registered explicitly, are allocated by [`GrammarBuilder::build`] from
/// the ids left free by the terminals.
#[derive(Clone, Debug)]
pub struct GrammarBuilder {
    symbols: Vec<PendingSymbol>,
    by_name: HashMap<String, usize>,
    terminal_ids: HashMap<SymbolId, usize>,
    productions: Vec<(usize, Vec<usize>)>,
    wildcard_exclusions: BTreeSet<usize>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        let start = PendingSymbol {
            name: START_NAME.to_string(),
            role: SymbolRole::Start,
            terminal: None,
            productions: Vec::new(),
        };
        Self {
            symbols: vec![start],
            by_name: HashMap::from([(START_NAME.to_string(), 0)]),
            terminal_ids: HashMap::new(),
            productions: Vec::new(),
            wildcard_exclusions: BTreeSet::new(),
        }
    }

    /// Registers a terminal with the id its lexer gives it.
    pub fn add_terminal(
        &mut self,
        name: &str,
        id: SymbolId,
        role: SymbolRole,
    ) -> Result<(), GrammarError> {
        if self.by_name.contains_key(name) {
            return Err(GrammarError::DuplicateSymbol(name.to_string()));
        }
        if let Some(&other) = self.terminal_ids.get(&id) {
            return Err(GrammarError::DuplicateId(
                name.to_string(),
                id,
                self.symbols[other].name.clone(),
            ));
        }
        if role != SymbolRole::Common && self.symbols.iter().any(|sym| sym.role == role) {
            return Err(GrammarError::DuplicateRole(role));
        }

        let index = self.symbols.len();
        self.symbols.push(PendingSymbol {
            name: name.to_string(),
            role,
            terminal: Some(id),
            productions: Vec::new(),
        });
        self.by_name.insert(name.to_string(), index);
        self.terminal_ids.insert(id, index);
        Ok(())
    }

    /// The wildcard terminal will not stand in for this terminal.
    pub fn exclude_from_wildcard(&mut self, name: &str) -> Result<(), GrammarError> {
        match self.by_name.get(name) {
            Some(&index) if self.symbols[index].terminal.is_some() => {
                self.wildcard_exclusions.insert(index);
                Ok(())
            }
            _ => Err(GrammarError::NotATerminal(name.to_string())),
        }
    }

    /// Adds an alternative `head ::= body`. The body is a space-separated list of symbol names;
    /// an empty body (or `$EMPTY$`) derives the empty string.
    pub fn add_production(&mut self, head: &str, body: &str) -> Result<ProductionId, GrammarError> {
        let body = body.split_whitespace().collect_vec();
        self.add_production_symbols(head, &body)
    }

    pub fn add_production_symbols(
        &mut self,
        head: &str,
        body: &[&str],
    ) -> Result<ProductionId, GrammarError> {
        let head_index = self.intern(head);
        if self.symbols[head_index].terminal.is_some() {
            return Err(GrammarError::TerminalHead(head.to_string()));
        }

        let interned = body
            .iter()
            .filter(|name| **name != EMPTY_NAME)
            .map(|name| self.intern(name))
            .collect_vec();
        let body_indices = interned
            .into_iter()
            .filter(|index| self.symbols[*index].role != SymbolRole::Empty)
            .collect_vec();

        let duplicate = self.symbols[head_index]
            .productions
            .iter()
            .any(|id| self.productions[*id as usize].1 == body_indices);
        if duplicate {
            return Err(GrammarError::DuplicateProduction(
                head.to_string(),
                body.join(" "),
            ));
        }

        let id = self.productions.len() as ProductionId;
        self.productions.push((head_index, body_indices));
        self.symbols[head_index].productions.push(id);
        Ok(id)
    }

    /// Adds a table of `(rule, head, body)` productions. The production id of each rule is its
    /// index in the table, so semantic actions can map a reduced production id back to the rule.
    pub fn add_rules<R>(&mut self, rules: &[(R, &str, &str)]) -> Result<(), GrammarError> {
        for (index, (_, head, body)) in rules.iter().enumerate() {
            let id = self.add_production(head, body)?;
            if id as usize != index {
                return Err(GrammarError::UnexpectedProductionId(
                    format!("{head} ::= {body}"),
                    id,
                    index as ProductionId,
                ));
            }
        }
        Ok(())
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }
        let index = self.symbols.len();
        self.symbols.push(PendingSymbol {
            name: name.to_string(),
            role: SymbolRole::Common,
            terminal: None,
            productions: Vec::new(),
        });
        self.by_name.insert(name.to_string(), index);
        index
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        if self.symbols[0].productions.is_empty() {
            return Err(GrammarError::MissingStart);
        }
        if let Some(sym) = self
            .symbols
            .iter()
            .find(|sym| sym.terminal.is_none() && sym.productions.is_empty())
        {
            return Err(GrammarError::UndefinedNonterminal(sym.name.clone()));
        }

        let mut used: BTreeSet<SymbolId> = self.terminal_ids.keys().copied().collect();
        let mut next_free: SymbolId = 0;
        let mut fresh_id = |used: &mut BTreeSet<SymbolId>| {
            while used.contains(&next_free) {
                next_free += 1;
            }
            used.insert(next_free);
            next_free
        };

        let ids = self
            .symbols
            .iter()
            .map(|sym| match sym.terminal {
                Some(id) => id,
                None => fresh_id(&mut used),
            })
            .collect_vec();

        let mut symbols = self
            .symbols
            .iter()
            .zip(&ids)
            .map(|(sym, id)| Symbol {
                id: *id,
                name: sym.name.clone(),
                role: sym.role,
                kind: match sym.terminal {
                    Some(_) => SymbolKind::Terminal,
                    None => SymbolKind::Nonterminal,
                },
                productions: sym.productions.clone(),
            })
            .collect_vec();

        let mut special = |role: SymbolRole, name: &str, symbols: &mut Vec<Symbol>| {
            if let Some(sym) = symbols.iter().find(|sym| sym.role == role) {
                return sym.id;
            }
            let id = fresh_id(&mut used);
            symbols.push(Symbol {
                id,
                name: name.to_string(),
                role,
                kind: SymbolKind::Terminal,
                productions: Vec::new(),
            });
            id
        };
        let end = special(SymbolRole::End, END_NAME, &mut symbols);
        let empty = special(SymbolRole::Empty, EMPTY_NAME, &mut symbols);

        let productions = self
            .productions
            .iter()
            .enumerate()
            .map(|(id, (head, body))| {
                Production::new(
                    id as ProductionId,
                    ids[*head],
                    body.iter().map(|index| ids[*index]).collect(),
                )
            })
            .collect_vec();

        let wildcard = symbols
            .iter()
            .find(|sym| sym.role == SymbolRole::Wildcard)
            .map(Symbol::id);
        let wildcard_exclusions = self
            .wildcard_exclusions
            .iter()
            .map(|index| ids[*index])
            .collect();

        let len = symbols.iter().map(|sym| sym.id as usize + 1).max().unwrap_or(0);
        let mut arena = vec![None; len];
        for sym in symbols {
            let index = sym.id as usize;
            arena[index] = Some(sym);
        }

        let mut grammar = Grammar {
            symbols: arena,
            productions,
            start: ids[0],
            end,
            empty,
            wildcard,
            wildcard_exclusions,
            first_sets: Vec::new(),
        };
        grammar.compute_first_sets();
        log::debug!(
            "grammar has {} symbols and {} productions",
            grammar.symbols().count(),
            grammar.productions.len()
        );
        Ok(grammar)
    }
}

/// An immutable context-free grammar.
#[derive(Clone, Debug)]
pub struct Grammar {
    /// indexed by symbol id.
    symbols: Vec<Option<Symbol>>,
    /// indexed by production id.
    productions: Vec<Production>,
    start: SymbolId,
    end: SymbolId,
    empty: SymbolId,
    wildcard: Option<SymbolId>,
    wildcard_exclusions: BTreeSet<SymbolId>,
    /// indexed by symbol id, computed once when the grammar is built.
    first_sets: Vec<BTreeSet<SymbolId>>,
}

impl Grammar {
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id as usize).and_then(Option::as_ref)
    }

    pub fn symbol_by_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols().find(|sym| sym.name() == name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().flatten()
    }

    pub(crate) fn symbol_slots(&self) -> &[Option<Symbol>] {
        &self.symbols
    }

    pub fn production(&self, id: ProductionId) -> Option<&Production> {
        self.productions.get(id as usize)
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn start_symbol(&self) -> SymbolId {
        self.start
    }

    pub fn end_symbol(&self) -> SymbolId {
        self.end
    }

    pub fn empty_symbol(&self) -> SymbolId {
        self.empty
    }

    pub fn wildcard(&self) -> Option<SymbolId> {
        self.wildcard
    }

    pub fn wildcard_exclusions(&self) -> &BTreeSet<SymbolId> {
        &self.wildcard_exclusions
    }

    pub fn is_terminal(&self, id: SymbolId) -> bool {
        self.symbol(id).is_some_and(Symbol::is_terminal)
    }

    pub fn symbol_name(&self, id: SymbolId) -> String {
        self.symbol(id)
            .map_or_else(|| format!("#{id}"), |sym| sym.name().to_string())
    }

    fn compute_first_sets(&mut self) {
        let mut first = vec![BTreeSet::new(); self.symbols.len()];
        for sym in self.symbols.iter().flatten() {
            if sym.is_terminal() {
                first[sym.id as usize].insert(sym.id);
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for prod in &self.productions {
                let set = first_of_sequence(&first, &prod.body, self.empty);
                let target = &mut first[prod.head as usize];
                let before = target.len();
                target.extend(set);
                changed |= target.len() != before;
            }
        }

        self.first_sets = first;
    }

    /// FIRST set of a symbol sequence. Contains the empty symbol iff every symbol of the
    /// sequence can derive the empty string (in particular for an empty sequence).
    pub fn first(&self, symbols: &[SymbolId]) -> BTreeSet<SymbolId> {
        first_of_sequence(&self.first_sets, symbols, self.empty)
    }

    pub fn first_of_production(&self, id: ProductionId) -> BTreeSet<SymbolId> {
        self.production(id)
            .map(|prod| self.first(prod.body()))
            .unwrap_or_default()
    }

    pub fn is_nullable(&self, id: SymbolId) -> bool {
        self.first_sets
            .get(id as usize)
            .is_some_and(|set| set.contains(&self.empty))
    }

    /// The symbol right after the dot.
    pub fn next_symbol(&self, item: &Item) -> Option<SymbolId> {
        self.production(item.production)?
            .symbol_at(item.dot as usize)
    }

    /// The symbol right before the dot.
    pub fn previous_symbol(&self, item: &Item) -> Option<SymbolId> {
        let dot = item.dot.checked_sub(1)?;
        self.production(item.production)?.symbol_at(dot as usize)
    }

    pub fn is_kernel_item(&self, item: &Item) -> bool {
        item.dot > 0
            || self
                .production(item.production)
                .is_some_and(|prod| prod.head == self.start)
    }

    pub fn kernel(&self, set: &ItemSet) -> Kernel {
        set.kernel(|item| self.is_kernel_item(item))
    }

    pub fn closure(&self, set: &ItemSet) -> ItemSet {
        let mut result = set.clone();
        let mut pending = set.iter().copied().collect_vec();

        while let Some(item) = pending.pop() {
            let Some(prod) = self.production(item.production) else {
                continue;
            };
            let Some(next) = prod.symbol_at(item.dot as usize) else {
                continue;
            };
            let Some(sym) = self.symbol(next).filter(|sym| !sym.is_terminal()) else {
                continue;
            };

            let mut rest = prod.suffix(item.dot as usize + 1).to_vec();
            rest.push(item.lookahead);
            let lookaheads = self.first(&rest);

            for &alternative in sym.productions() {
                for &lookahead in &lookaheads {
                    if lookahead == self.empty {
                        continue;
                    }
                    let new_item = Item::new(alternative, 0, lookahead);
                    if result.insert(new_item) {
                        pending.push(new_item);
                    }
                }
            }
        }

        result
    }

    pub fn goto_next(&self, set: &ItemSet, symbol: SymbolId) -> ItemSet {
        let advanced = set
            .iter()
            .filter(|item| self.next_symbol(item) == Some(symbol))
            .map(Item::advanced)
            .collect();
        self.closure(&advanced)
    }

    /// Symbols that appear right after a dot in the set.
    pub fn next_symbols(&self, set: &ItemSet) -> BTreeSet<SymbolId> {
        set.iter()
            .filter_map(|item| self.next_symbol(item))
            .collect()
    }

    /// Closure of the start productions with the end of input as lookahead.
    pub fn initial_item_set(&self) -> ItemSet {
        let start = self
            .symbol(self.start)
            .map(|sym| sym.productions().to_vec())
            .unwrap_or_default();
        let init = start
            .into_iter()
            .map(|prod| Item::new(prod, 0, self.end))
            .collect();
        self.closure(&init)
    }

    pub fn create_canonical_item_sets(&self) -> ItemSetCollection {
        let init = self.initial_item_set();
        let mut index = HashMap::from([(init.clone(), 0 as StateId)]);
        let mut collection = ItemSetCollection {
            states: vec![init],
            transitions: vec![BTreeMap::new()],
        };

        let mut current = 0;
        while current < collection.states.len() {
            let set = collection.states[current].clone();
            for symbol in self.next_symbols(&set) {
                let target = self.goto_next(&set, symbol);
                if target.is_empty() {
                    continue;
                }
                let id = match index.get(&target) {
                    Some(&id) => id,
                    None => {
                        let id = collection.states.len() as StateId;
                        index.insert(target.clone(), id);
                        collection.states.push(target);
                        collection.transitions.push(BTreeMap::new());
                        id
                    }
                };
                collection.transitions[current].insert(symbol, id);
            }
            current += 1;
        }

        log::debug!("canonical collection has {} states", collection.len());
        collection
    }

    pub fn create_unioned_item_sets(&self) -> ItemSetCollection {
        let init = self.initial_item_set();
        let mut kernels = HashMap::from([(self.kernel(&init), 0 as StateId)]);
        let mut collection = ItemSetCollection {
            states: vec![init],
            transitions: vec![BTreeMap::new()],
        };
        let mut queue = VecDeque::from([0 as StateId]);
        let mut queued = vec![true];

        while let Some(current) = queue.pop_front() {
            queued[current as usize] = false;
            let set = collection.states[current as usize].clone();

            for symbol in self.next_symbols(&set) {
                let target = self.goto_next(&set, symbol);
                if target.is_empty() {
                    continue;
                }
                let kernel = self.kernel(&target);
                let id = match kernels.get(&kernel) {
                    Some(&id) => {
                        let existing = &collection.states[id as usize];
                        if !existing.contains_all(&target) {
                            // new lookaheads: replace the state and explore it again.
                            collection.states[id as usize] = existing.union(&target);
                            if !queued[id as usize] {
                                queued[id as usize] = true;
                                queue.push_back(id);
                            }
                        }
                        id
                    }
                    None => {
                        let id = collection.states.len() as StateId;
                        kernels.insert(kernel, id);
                        collection.states.push(target);
                        collection.transitions.push(BTreeMap::new());
                        queued.push(true);
                        queue.push_back(id);
                        id
                    }
                };
                collection.transitions[current as usize].insert(symbol, id);
            }
        }

        log::debug!("unioned collection has {} states", collection.len());
        collection
    }

    /// Merges the states of a canonical collection that have equal kernels.
    pub fn union_item_sets(&self, canonical: &ItemSetCollection) -> ItemSetCollection {
        let mut kernels: HashMap<Kernel, StateId> = HashMap::new();
        let mut remap = Vec::with_capacity(canonical.len());
        let mut merged = ItemSetCollection::default();

        for set in &canonical.states {
            let kernel = self.kernel(set);
            let id = match kernels.get(&kernel) {
                Some(&id) => {
                    merged.states[id as usize] = merged.states[id as usize].union(set);
                    id
                }
                None => {
                    let id = merged.states.len() as StateId;
                    kernels.insert(kernel, id);
                    merged.states.push(set.clone());
                    merged.transitions.push(BTreeMap::new());
                    id
                }
            };
            remap.push(id);
        }

        for (state, transitions) in canonical.transitions.iter().enumerate() {
            let from = remap[state] as usize;
            for (symbol, target) in transitions {
                merged.transitions[from].insert(*symbol, remap[*target as usize]);
            }
        }

        log::debug!(
            "merged {} canonical states into {}",
            canonical.len(),
            merged.len()
        );
        merged
    }

    pub fn item_sets(&self, construction: Construction) -> ItemSetCollection {
        match construction {
            Construction::Canonical => self.create_canonical_item_sets(),
            Construction::Merged => self.union_item_sets(&self.create_canonical_item_sets()),
            Construction::Unioned => self.create_unioned_item_sets(),
        }
    }

    /// Synthesizes the parser table. Conflicting actions are recorded in
    /// [`ParserTable::conflicts`], the first registered action of a cell is kept.
    pub fn build_table(&self, construction: Construction) -> ParserTable {
        let collection = self.item_sets(construction);
        let mut table = ParserTable::new(self, collection.len());

        for (state, set) in collection.states.iter().enumerate() {
            let state = state as StateId;
            let transitions = &collection.transitions[state as usize];

            for item in set {
                let Some(prod) = self.production(item.production) else {
                    continue;
                };
                match prod.symbol_at(item.dot as usize) {
                    Some(next) => {
                        let Some(&target) = transitions.get(&next) else {
                            continue;
                        };
                        if self.is_terminal(next) {
                            table.register_action(state, next, Action::Transition(target));
                        } else {
                            table.set_goto(state, next, target);
                        }
                    }
                    None if prod.head == self.start && item.lookahead == self.end => {
                        table.register_action(state, self.end, Action::Accept);
                    }
                    None => {
                        table.register_action(state, item.lookahead, Action::Reduce(prod.id));
                    }
                }
            }
        }

        if !table.conflicts().is_empty() {
            log::warn!(
                "parser table has {} conflict(s)",
                table.conflicts().len()
            );
        }
        table
    }

    /// Like [`Grammar::build_table`], but a table with conflicts is an error.
    pub fn create_parser_table(
        &self,
        construction: Construction,
    ) -> Result<ParserTable, GrammarError> {
        let mut table = self.build_table(construction);
        if table.conflicts().is_empty() {
            Ok(table)
        } else {
            Err(GrammarError::Conflicts(table.take_conflicts()))
        }
    }

    pub fn display_item(&self, item: Item) -> DisplayItem<'_> {
        DisplayItem {
            grammar: self,
            item,
        }
    }

    fn display_symbol(&self, id: SymbolId) -> String {
        self.symbol(id)
            .map_or_else(|| format!("#{id}"), |sym| sym.to_string())
    }
}

fn first_of_sequence(
    first: &[BTreeSet<SymbolId>],
    symbols: &[SymbolId],
    empty: SymbolId,
) -> BTreeSet<SymbolId> {
    let mut result = BTreeSet::new();
    for sym in symbols {
        let Some(set) = first.get(*sym as usize) else {
            return result;
        };
        result.extend(set.iter().copied().filter(|s| *s != empty));
        if !set.contains(&empty) {
            return result;
        }
    }
    result.insert(empty);
    result
}

impl Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for prod in &self.productions {
            let body = if prod.is_empty() {
                EMPTY_NAME.to_string()
            } else {
                prod.body
                    .iter()
                    .map(|id| self.display_symbol(*id))
                    .join(" ")
            };
            writeln!(
                f,
                "{:>4}: {} ::= {body}",
                prod.id,
                self.display_symbol(prod.head)
            )?;
        }
        Ok(())
    }
}

/// Displays an item as `[head] ::= a . b , lookahead`.
pub struct DisplayItem<'g> {
    grammar: &'g Grammar,
    item: Item,
}

impl Display for DisplayItem<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let grammar = self.grammar;
        let Some(prod) = grammar.production(self.item.production) else {
            return write!(f, "<unknown production {}>", self.item.production);
        };
        let dot = self.item.dot as usize;
        let before = prod.prefix(dot).iter().map(|id| grammar.display_symbol(*id));
        let after = prod.suffix(dot).iter().map(|id| grammar.display_symbol(*id));
        let body = before.chain(std::iter::once(".".to_string())).chain(after);
        write!(
            f,
            "{} ::= {} , {}",
            grammar.display_symbol(prod.head),
            body.format(" "),
            grammar.display_symbol(self.item.lookahead)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUM: SymbolId = 1;
    const PLUS: SymbolId = 2;
    const STAR: SymbolId = 3;
    const LPAREN: SymbolId = 4;
    const RPAREN: SymbolId = 5;

    fn expression_grammar() -> Grammar {
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("num", NUM, SymbolRole::Common).unwrap();
        builder.add_terminal("+", PLUS, SymbolRole::Common).unwrap();
        builder.add_terminal("*", STAR, SymbolRole::Common).unwrap();
        builder.add_terminal("(", LPAREN, SymbolRole::Common).unwrap();
        builder.add_terminal(")", RPAREN, SymbolRole::Common).unwrap();
        builder.add_production("$START$", "expr").unwrap();
        builder.add_production("expr", "expr + term").unwrap();
        builder.add_production("expr", "term").unwrap();
        builder.add_production("term", "term * factor").unwrap();
        builder.add_production("term", "factor").unwrap();
        builder.add_production("factor", "( expr )").unwrap();
        builder.add_production("factor", "num").unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn first_of_nullable_symbol_contains_empty() {
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("c", 1, SymbolRole::Common).unwrap();
        builder.add_terminal("b", 2, SymbolRole::Common).unwrap();
        builder.add_production("$START$", "A").unwrap();
        builder.add_production("A", "").unwrap();
        builder.add_production("A", "c").unwrap();
        let grammar = builder.build().unwrap();

        let a = grammar.symbol_by_name("A").unwrap().id();
        let first = grammar.first(&[a]);
        assert!(first.contains(&grammar.empty_symbol()));
        assert!(first.contains(&1));
        assert!(grammar.is_nullable(a));
    }

    #[test]
    fn first_stops_at_non_nullable_symbol() {
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("b", 1, SymbolRole::Common).unwrap();
        builder.add_terminal("c", 2, SymbolRole::Common).unwrap();
        builder.add_production("$START$", "A").unwrap();
        builder.add_production("A", "B c").unwrap();
        builder.add_production("B", "b").unwrap();
        let grammar = builder.build().unwrap();

        let a = grammar.symbol_by_name("A").unwrap().id();
        let b = grammar.symbol_by_name("B").unwrap().id();
        assert_eq!(grammar.first(&[a]), grammar.first(&[b]));
        assert_eq!(grammar.first(&[a]), BTreeSet::from([1]));
    }

    #[test]
    fn first_terminates_on_left_recursion() {
        let grammar = expression_grammar();
        let expr = grammar.symbol_by_name("expr").unwrap().id();
        assert_eq!(grammar.first(&[expr]), BTreeSet::from([NUM, LPAREN]));
    }

    #[test]
    fn first_through_nullable_prefix() {
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("x", 1, SymbolRole::Common).unwrap();
        builder.add_terminal("y", 2, SymbolRole::Common).unwrap();
        builder.add_production("$START$", "A").unwrap();
        builder.add_production("A", "B y").unwrap();
        builder.add_production("B", "A x").unwrap();
        builder.add_production("B", "").unwrap();
        let grammar = builder.build().unwrap();

        let b = grammar.symbol_by_name("B").unwrap().id();
        let first = grammar.first(&[b]);
        assert!(first.contains(&2));
        assert!(first.contains(&grammar.empty_symbol()));
    }

    #[test]
    fn duplicate_production_is_rejected() {
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("a", 1, SymbolRole::Common).unwrap();
        builder.add_production("$START$", "A").unwrap();
        builder.add_production("A", "a").unwrap();
        assert!(matches!(
            builder.add_production("A", "a"),
            Err(GrammarError::DuplicateProduction(..))
        ));
        let grammar = builder.build().unwrap();
        assert_eq!(grammar.productions().len(), 2);
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("a", 1, SymbolRole::Common).unwrap();
        assert!(matches!(
            builder.add_terminal("a", 2, SymbolRole::Common),
            Err(GrammarError::DuplicateSymbol(_))
        ));
        assert!(matches!(
            builder.add_terminal("b", 1, SymbolRole::Common),
            Err(GrammarError::DuplicateId(..))
        ));
        assert!(matches!(
            builder.add_production("a", "a"),
            Err(GrammarError::TerminalHead(_))
        ));
    }

    #[test]
    fn undefined_nonterminal_fails_build() {
        let mut builder = GrammarBuilder::new();
        builder.add_production("$START$", "A").unwrap();
        builder.add_production("A", "typo").unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            GrammarError::UndefinedNonterminal("typo".to_string())
        );
    }

    #[test]
    fn nonterminal_ids_avoid_terminal_ids() {
        let grammar = expression_grammar();
        let ids = grammar.symbols().map(Symbol::id).collect_vec();
        assert_eq!(ids.len(), ids.iter().unique().count());
        assert!(grammar.is_terminal(grammar.end_symbol()));
        assert!(!grammar.is_terminal(grammar.start_symbol()));
    }

    #[test]
    fn closure_is_idempotent() {
        let grammar = expression_grammar();
        let init = grammar.initial_item_set();
        assert_eq!(grammar.closure(&init), init);

        for symbol in grammar.next_symbols(&init) {
            let next = grammar.goto_next(&init, symbol);
            assert_eq!(grammar.closure(&next), next);
        }
    }

    #[test]
    fn closure_adds_lookaheads_from_first() {
        let grammar = expression_grammar();
        let init = grammar.initial_item_set();
        let term = grammar.symbol_by_name("term").unwrap();
        // term ::= . term * factor is needed with lookaheads +, * and end of input.
        let lookaheads: BTreeSet<_> = init
            .iter()
            .filter(|item| item.production == term.productions()[0] && item.dot == 0)
            .map(|item| item.lookahead)
            .collect();
        assert_eq!(
            lookaheads,
            BTreeSet::from([PLUS, STAR, grammar.end_symbol()])
        );
    }

    #[test]
    fn goto_advances_the_dot() {
        let grammar = expression_grammar();
        let init = grammar.initial_item_set();
        let next = grammar.goto_next(&init, LPAREN);
        assert!(next
            .iter()
            .any(|item| item.dot == 1 && grammar.previous_symbol(item) == Some(LPAREN)));
        assert!(grammar.goto_next(&init, RPAREN).is_empty());
    }

    #[test]
    fn unioned_and_merged_collections_agree() {
        let grammar = expression_grammar();
        let canonical = grammar.create_canonical_item_sets();
        let merged = grammar.union_item_sets(&canonical);
        let unioned = grammar.create_unioned_item_sets();

        assert!(canonical.len() >= unioned.len());
        assert_eq!(merged.len(), unioned.len());
        let kernels = |c: &ItemSetCollection| {
            c.states
                .iter()
                .map(|set| grammar.kernel(set))
                .collect::<BTreeSet<_>>()
        };
        assert_eq!(kernels(&merged), kernels(&unioned));
    }

    #[test]
    fn expression_grammar_is_conflict_free() {
        let grammar = expression_grammar();
        for construction in [
            Construction::Canonical,
            Construction::Merged,
            Construction::Unioned,
        ] {
            assert!(grammar.create_parser_table(construction).is_ok());
        }
    }

    #[test]
    fn dangling_else_reports_conflict() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("if", 1, SymbolRole::Common).unwrap();
        builder.add_terminal("else", 2, SymbolRole::Common).unwrap();
        builder.add_terminal("cond", 3, SymbolRole::Common).unwrap();
        builder.add_terminal("other", 4, SymbolRole::Common).unwrap();
        builder.add_production("$START$", "stmt").unwrap();
        builder.add_production("stmt", "if cond stmt").unwrap();
        builder.add_production("stmt", "if cond stmt else stmt").unwrap();
        builder.add_production("stmt", "other").unwrap();
        let grammar = builder.build().unwrap();

        let table = grammar.build_table(Construction::Unioned);
        assert!(table
            .conflicts()
            .iter()
            .any(|c| c.symbol == 2 && c.kind() == crate::ConflictKind::ShiftReduce));

        match grammar.create_parser_table(Construction::Canonical) {
            Err(GrammarError::Conflicts(conflicts)) => assert!(!conflicts.is_empty()),
            other => panic!("expected conflicts, got {other:?}"),
        }
    }

    #[test]
    fn merging_kernels_can_introduce_conflicts() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut builder = GrammarBuilder::new();
        for (id, name) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
            builder
                .add_terminal(name, id as SymbolId + 1, SymbolRole::Common)
                .unwrap();
        }
        builder.add_production("$START$", "S").unwrap();
        builder.add_production("S", "a A d").unwrap();
        builder.add_production("S", "b B d").unwrap();
        builder.add_production("S", "a B e").unwrap();
        builder.add_production("S", "b A e").unwrap();
        builder.add_production("A", "c").unwrap();
        builder.add_production("B", "c").unwrap();
        let grammar = builder.build().unwrap();

        let canonical = grammar.build_table(Construction::Canonical);
        assert!(canonical.conflicts().is_empty());
        assert!(grammar.create_parser_table(Construction::Canonical).is_ok());

        for construction in [Construction::Merged, Construction::Unioned] {
            let table = grammar.build_table(construction);
            assert!(table.num_states() < canonical.num_states());
            let conflicts = table.conflicts();
            assert_eq!(conflicts.len(), 2);
            assert!(conflicts
                .iter()
                .all(|c| c.kind() == crate::ConflictKind::ReduceReduce));
            let symbols = conflicts.iter().map(|c| c.symbol).collect::<BTreeSet<_>>();
            assert_eq!(symbols, BTreeSet::from([4, 5]));
            assert!(matches!(
                grammar.create_parser_table(construction),
                Err(GrammarError::Conflicts(c)) if c.len() == 2
            ));
        }
    }

    #[test]
    fn item_display() {
        let grammar = expression_grammar();
        let item = Item::new(1, 1, PLUS);
        assert_eq!(
            grammar.display_item(item).to_string(),
            "[expr] ::= [expr] . + [term] , +"
        );
    }
}
