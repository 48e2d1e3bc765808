use serde::{Deserialize, Serialize};

use crate::types::{self, TypeCode};

/// Tracks the quotation state while descending a term.
///
/// `level` counts the unmatched Quote wrappers above the current position;
/// `local_quote` is set for exactly one level below a LocalQuote. Variables
/// are bindable only while the state is unquoted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Quotation {
    level: i32,
    local_quote: bool,
}

impl Quotation {
    /// The initial state: unquoted, level 0.
    pub fn new() -> Quotation {
        Quotation::default()
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn is_locally_quoted(&self) -> bool {
        self.local_quote
    }

    pub fn is_quoted(&self) -> bool {
        self.local_quote || self.level > 0
    }

    /// Whether variables at the current depth are live.
    pub fn is_unquoted(&self) -> bool {
        !self.is_quoted()
    }

    /// Whether a wrapper of type `t` would be consumed in the current state.
    /// A Quote or LocalQuote below an active unquote is consumable; an
    /// Unquote below an active quote is consumable.
    pub fn consumable(&self, t: TypeCode) -> bool {
        (t == types::QUOTE && self.is_unquoted())
            || (t == types::LOCAL_QUOTE && self.is_unquoted())
            || (t == types::UNQUOTE && self.is_quoted())
    }

    /// Advances the state past a node of type `t`.
    pub fn update(&mut self, t: TypeCode) {
        if t == types::QUOTE {
            self.level += 1;
        } else if t == types::UNQUOTE {
            self.level -= 1;
        }
        // A local quote spans a single level; any other node clears it.
        self.local_quote = t == types::LOCAL_QUOTE && self.is_unquoted();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let q = Quotation::new();
        assert!(q.is_unquoted());
        assert_eq!(q.level(), 0);
        assert!(q.consumable(types::QUOTE));
        assert!(q.consumable(types::LOCAL_QUOTE));
        assert!(!q.consumable(types::UNQUOTE));
    }

    #[test]
    fn test_quote_then_unquote() {
        let mut q = Quotation::new();
        q.update(types::QUOTE);
        assert!(q.is_quoted());
        assert!(!q.consumable(types::QUOTE));
        assert!(q.consumable(types::UNQUOTE));
        q.update(types::UNQUOTE);
        assert!(q.is_unquoted());
        assert!(q.consumable(types::QUOTE));
    }

    #[test]
    fn test_nested_quotes() {
        let mut q = Quotation::new();
        q.update(types::QUOTE);
        q.update(types::QUOTE);
        assert_eq!(q.level(), 2);
        q.update(types::UNQUOTE);
        assert_eq!(q.level(), 1);
        assert!(q.is_quoted());
    }

    #[test]
    fn test_local_quote_spans_one_level() {
        let mut q = Quotation::new();
        q.update(types::LOCAL_QUOTE);
        assert!(q.is_locally_quoted());
        assert!(q.is_quoted());
        // Descending past any ordinary node clears the local flag.
        q.update(types::LIST);
        assert!(q.is_unquoted());
    }
}
