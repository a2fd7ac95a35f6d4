use std::ops::Range;

use derive_more::derive::{AsMut, AsRef, Deref, DerefMut, From};

/// Byte range of a token in its source text.
#[derive(Default, Clone, Debug, PartialEq, Eq, Hash, Deref, DerefMut, AsRef, AsMut, From)]
pub struct Span(Range<usize>);

impl Span {
    pub fn new(range: Range<usize>) -> Self {
        Self(range)
    }
    pub fn empty_at(pos: usize) -> Self {
        Self(pos..pos)
    }
    pub fn range(&self) -> Range<usize> {
        self.0.clone()
    }
    pub fn extend(&self, other: &Span) -> Self {
        Self(self.start..other.end)
    }
    pub fn shifted(&self, offset: usize) -> Self {
        Self(self.start + offset..self.end + offset)
    }
}
