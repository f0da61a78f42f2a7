//! Values paired with a "did anything change" flag.
//!
//! Every clone step returns a [`Dirty`] instead of flipping shared state. A
//! parent folds its children's flags with logical OR, so it only materializes
//! a copy of itself when something underneath genuinely changed.

/// A produced value and whether producing it changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dirty<T> {
    pub value: T,
    pub changed: bool,
}

impl<T> Dirty<T> {
    pub fn new(value: T, changed: bool) -> Self {
        Self { value, changed }
    }

    /// An unchanged value.
    pub fn clean(value: T) -> Self {
        Self::new(value, false)
    }

    /// A value that differs from its source.
    pub fn changed(value: T) -> Self {
        Self::new(value, true)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Dirty<U> {
        Dirty::new(f(self.value), self.changed)
    }

    /// Fold another result's flag into this one and hand back its value.
    pub fn absorb<U>(&mut self, other: Dirty<U>) -> U {
        self.changed |= other.changed;
        other.value
    }

    /// Force the changed flag on when `condition` holds.
    pub fn mark_if(&mut self, condition: bool) {
        self.changed |= condition;
    }
}
