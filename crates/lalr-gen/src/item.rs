use std::collections::BTreeSet;

use derive_more::derive::{Deref, From};

use crate::{ProductionId, StateId, SymbolId};

/// An LR(1) item: a production, the dot position in its body and one lookahead terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item {
    pub production: ProductionId,
    pub dot: u32,
    pub lookahead: SymbolId,
}

impl Item {
    pub fn new(production: ProductionId, dot: u32, lookahead: SymbolId) -> Self {
        Self {
            production,
            dot,
            lookahead,
        }
    }

    /// The item without its lookahead.
    pub fn core(&self) -> (ProductionId, u32) {
        (self.production, self.dot)
    }

    pub fn advanced(&self) -> Self {
        Self {
            dot: self.dot + 1,
            ..*self
        }
    }
}

/// Kernel of an item set: the cores of its dot-bearing items (and of the start items).
/// Two item sets may be merged iff their kernels are equal.
pub type Kernel = BTreeSet<(ProductionId, u32)>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deref, From)]
pub struct ItemSet(BTreeSet<Item>);

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the item was not present yet.
    pub fn insert(&mut self, item: Item) -> bool {
        self.0.insert(item)
    }

    /// A new set holding the items of both sets. Neither operand is modified.
    pub fn union(&self, other: &ItemSet) -> ItemSet {
        Self(self.0.union(&other.0).copied().collect())
    }

    pub fn contains_all(&self, other: &ItemSet) -> bool {
        self.0.is_superset(&other.0)
    }

    pub fn kernel(&self, is_kernel_item: impl Fn(&Item) -> bool) -> Kernel {
        self.0
            .iter()
            .filter(|item| is_kernel_item(item))
            .map(Item::core)
            .collect()
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ItemSet {
    type Item = &'a Item;
    type IntoIter = std::collections::btree_set::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The states of an LR automaton and the transitions between them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemSetCollection {
    pub states: Vec<ItemSet>,
    /// per state, the target state for each symbol that can follow the dot.
    pub transitions: Vec<std::collections::BTreeMap<SymbolId, StateId>>,
}

impl ItemSetCollection {
    pub fn len(&self) -> usize {
        self.states.len()
    }
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_functional() {
        let a: ItemSet = [Item::new(0, 1, 5)].into_iter().collect();
        let b: ItemSet = [Item::new(0, 1, 6)].into_iter().collect();
        let c = a.union(&b);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(c.len(), 2);
        assert!(c.contains_all(&a) && c.contains_all(&b));
    }

    #[test]
    fn kernel_ignores_lookahead() {
        let a: ItemSet = [Item::new(0, 1, 5), Item::new(2, 0, 5)].into_iter().collect();
        let b: ItemSet = [Item::new(0, 1, 6), Item::new(2, 0, 7)].into_iter().collect();
        let dotted = |item: &Item| item.dot > 0;
        assert_eq!(a.kernel(dotted), b.kernel(dotted));
        assert_ne!(a, b);
    }
}
