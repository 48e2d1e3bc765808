use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::lattice::TypeLattice;
use crate::types::{self, TypeCode};

/// An expression in the graph vocabulary: either a leaf node carrying a
/// payload, or a link over a sequence of child terms. Whether the children
/// of a link are positional or multiset-valued is a property of its type
/// (`is_a(type, UNORDERED)`), not of the representation.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Term {
    Node { type_code: TypeCode, name: String },
    Link { type_code: TypeCode, outgoing: Vec<Handle> },
}

/// A shared, immutable reference to a term.
///
/// Handles compare structurally; shared substructure makes the comparison
/// cheap in practice because `Arc` equality short-circuits on pointer
/// identity. Terms are never mutated in place: every rewrite builds new
/// handles around the unchanged children.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Handle(Arc<Term>);

impl Handle {
    pub fn node(type_code: TypeCode, name: impl Into<String>) -> Handle {
        Handle(Arc::new(Term::Node {
            type_code,
            name: name.into(),
        }))
    }

    pub fn link(type_code: TypeCode, outgoing: Vec<Handle>) -> Handle {
        Handle(Arc::new(Term::Link {
            type_code,
            outgoing,
        }))
    }

    /// A bindable variable node.
    pub fn variable(name: impl Into<String>) -> Handle {
        Handle::node(types::VARIABLE, name)
    }

    /// A TYPE node naming the given code, for use inside declarations.
    pub fn type_node(lattice: &dyn TypeLattice, code: TypeCode) -> Handle {
        Handle::node(types::TYPE, lattice.name_of(code))
    }

    /// The scope-aware link factory. Scope-shaped links carry their variable
    /// declaration as the first child; this constructor checks that shape.
    pub fn scope_link(type_code: TypeCode, outgoing: Vec<Handle>) -> Handle {
        debug_assert!(
            !outgoing.is_empty(),
            "scope link must carry a declaration child"
        );
        debug_assert!(
            matches!(
                outgoing[0].type_code(),
                types::VARIABLE | types::VARIABLE_LIST | types::TYPED_VARIABLE
            ),
            "scope link declaration has the wrong shape"
        );
        Handle::link(type_code, outgoing)
    }

    pub fn term(&self) -> &Term {
        &self.0
    }

    pub fn type_code(&self) -> TypeCode {
        match self.term() {
            Term::Node { type_code, .. } | Term::Link { type_code, .. } => *type_code,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self.term(), Term::Node { .. })
    }

    pub fn is_link(&self) -> bool {
        matches!(self.term(), Term::Link { .. })
    }

    /// Whether this is a variable node. The check is by exact code; subtypes
    /// of VARIABLE do not participate in binding.
    pub fn is_variable(&self) -> bool {
        self.type_code() == types::VARIABLE
    }

    /// The payload of a node. Panics on a link.
    pub fn name(&self) -> &str {
        match self.term() {
            Term::Node { name, .. } => name,
            Term::Link { .. } => panic!("name() called on a link"),
        }
    }

    /// The children of a link; empty for a node.
    pub fn outgoing(&self) -> &[Handle] {
        match self.term() {
            Term::Node { .. } => &[],
            Term::Link { outgoing, .. } => outgoing,
        }
    }

    pub fn arity(&self) -> usize {
        self.outgoing().len()
    }

    /// The i-th child. Panics when out of range; callers check arity first.
    pub fn child(&self, i: usize) -> &Handle {
        &self.outgoing()[i]
    }

    /// Whether this link's children carry multiset semantics.
    pub fn is_unordered(&self, lattice: &dyn TypeLattice) -> bool {
        lattice.is_a(self.type_code(), types::UNORDERED)
    }

    /// Whether this link binds variables through a leading declaration.
    pub fn is_scope(&self, lattice: &dyn TypeLattice) -> bool {
        lattice.is_a(self.type_code(), types::SCOPE)
    }

    /// Pointer identity, used by tests to confirm structural sharing.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::TypeHierarchy;

    #[test]
    fn test_structural_equality() {
        let a = Handle::node(types::CONCEPT, "a");
        let b = Handle::node(types::CONCEPT, "a");
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        let shared = a.clone();
        assert!(a.ptr_eq(&shared));

        let l1 = Handle::link(types::LIST, vec![a.clone(), b.clone()]);
        let l2 = Handle::link(types::LIST, vec![b.clone(), a.clone()]);
        assert_eq!(l1, l2);
        assert_ne!(l1, Handle::link(types::SET, vec![a, b]));
    }

    #[test]
    fn test_node_ordering_before_links() {
        let n = Handle::node(types::CONCEPT, "a");
        let l = Handle::link(types::LIST, vec![]);
        assert!(n < l);
    }

    #[test]
    fn test_accessors() {
        let x = Handle::variable("x");
        assert!(x.is_node());
        assert!(x.is_variable());
        assert_eq!(x.name(), "x");
        assert_eq!(x.arity(), 0);

        let link = Handle::link(types::LIST, vec![x.clone()]);
        assert!(link.is_link());
        assert_eq!(link.arity(), 1);
        assert_eq!(link.child(0), &x);
    }

    #[test]
    fn test_unordered_and_scope() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let and = Handle::link(types::AND, vec![x.clone()]);
        let list = Handle::link(types::LIST, vec![x.clone()]);
        assert!(and.is_unordered(&h));
        assert!(!list.is_unordered(&h));

        let decl = Handle::link(types::VARIABLE_LIST, vec![x.clone()]);
        let bind = Handle::scope_link(types::BIND, vec![decl, x.clone(), x]);
        assert!(bind.is_scope(&h));
    }
}
