use crate::SymbolId;

pub type ProductionId = u32;

/// One rewrite rule `head ::= body`. An empty body derives the empty string.
///
/// Equality is structural: two productions are equal when they have the same head and the
/// same body symbols in the same order, whatever their ids.
#[derive(Clone, Debug, Eq)]
pub struct Production {
    pub(crate) id: ProductionId,
    pub(crate) head: SymbolId,
    pub(crate) body: Vec<SymbolId>,
}

impl PartialEq for Production {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.body == other.body
    }
}

impl Production {
    pub fn new(id: ProductionId, head: SymbolId, body: Vec<SymbolId>) -> Self {
        Self { id, head, body }
    }
    pub fn id(&self) -> ProductionId {
        self.id
    }
    pub fn head(&self) -> SymbolId {
        self.head
    }
    pub fn body(&self) -> &[SymbolId] {
        &self.body
    }
    pub fn len(&self) -> usize {
        self.body.len()
    }
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
    /// The body symbol at position `dot`, i.e. the symbol right after a dot at that position.
    pub fn symbol_at(&self, dot: usize) -> Option<SymbolId> {
        self.body.get(dot).copied()
    }
    /// Body symbols before `dot`.
    pub fn prefix(&self, dot: usize) -> &[SymbolId] {
        &self.body[..dot.min(self.body.len())]
    }
    /// Body symbols from `dot` on.
    pub fn suffix(&self, dot: usize) -> &[SymbolId] {
        &self.body[dot.min(self.body.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_id() {
        let a = Production::new(0, 10, vec![1, 2, 3]);
        let b = Production::new(7, 10, vec![1, 2, 3]);
        let c = Production::new(0, 10, vec![1, 3, 2]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn slicing() {
        let p = Production::new(0, 10, vec![1, 2, 3]);
        assert_eq!(p.prefix(1), &[1]);
        assert_eq!(p.suffix(1), &[2, 3]);
        assert_eq!(p.suffix(3), &[] as &[SymbolId]);
        assert_eq!(p.symbol_at(2), Some(3));
        assert_eq!(p.symbol_at(3), None);
    }
}
