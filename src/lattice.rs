use std::collections::{HashMap, HashSet};

use crate::types::{self, TypeCode};

/// The subtype oracle consumed by the unifier.
///
/// The engine itself never walks the hierarchy; everything it needs is the
/// reflexive, transitive `is_a` test plus name resolution for the TYPE
/// nodes that appear inside variable declarations.
pub trait TypeLattice {
    /// Returns whether `child` is a subtype of `parent`.
    /// Reflexive: `is_a(t, t)` is always true.
    fn is_a(&self, child: TypeCode, parent: TypeCode) -> bool;

    /// The canonical name of a registered code.
    fn name_of(&self, code: TypeCode) -> &str;

    /// Looks up a code by its canonical name.
    fn by_name(&self, name: &str) -> Option<TypeCode>;
}

/// A concrete type registry with precomputed ancestor sets.
///
/// `ancestors[code]` is the transitive closure of the code's parents, so
/// `is_a` is a single set lookup. New types extend the closure at
/// registration time; the hierarchy never changes shape after that.
#[derive(Clone, Debug)]
pub struct TypeHierarchy {
    /// names[code] is the canonical name for that code.
    names: Vec<String>,

    /// Maps a canonical name back to its code.
    by_name: HashMap<String, TypeCode>,

    /// ancestors[code] is every strict supertype of the code.
    ancestors: Vec<HashSet<TypeCode>>,
}

impl TypeHierarchy {
    /// Creates a hierarchy seeded with the distinguished codes.
    pub fn new() -> TypeHierarchy {
        let mut h = TypeHierarchy {
            names: vec![],
            by_name: HashMap::new(),
            ancestors: vec![],
        };

        // Seed order must match the constants in types.rs.
        let seeds: &[(&str, TypeCode, &[TypeCode])] = &[
            ("Atom", types::ATOM, &[]),
            ("Node", types::NODE, &[types::ATOM]),
            ("Link", types::LINK, &[types::ATOM]),
            ("Variable", types::VARIABLE, &[types::NODE]),
            ("Type", types::TYPE, &[types::NODE]),
            ("Concept", types::CONCEPT, &[types::NODE]),
            ("Number", types::NUMBER, &[types::NODE]),
            ("Predicate", types::PREDICATE, &[types::NODE]),
            ("VariableList", types::VARIABLE_LIST, &[types::LINK]),
            ("TypedVariable", types::TYPED_VARIABLE, &[types::LINK]),
            ("Quote", types::QUOTE, &[types::LINK]),
            ("Unquote", types::UNQUOTE, &[types::LINK]),
            ("LocalQuote", types::LOCAL_QUOTE, &[types::LINK]),
            ("Scope", types::SCOPE, &[types::LINK]),
            ("Bind", types::BIND, &[types::SCOPE]),
            ("Implication", types::IMPLICATION, &[types::LINK]),
            ("Unordered", types::UNORDERED, &[types::LINK]),
            ("And", types::AND, &[types::UNORDERED]),
            ("Or", types::OR, &[types::UNORDERED]),
            ("Not", types::NOT, &[types::LINK]),
            ("List", types::LIST, &[types::LINK]),
            ("Set", types::SET, &[types::UNORDERED]),
            ("Inheritance", types::INHERITANCE, &[types::LINK]),
        ];
        for (name, expected, parents) in seeds {
            let code = h.add_type(name, parents);
            debug_assert_eq!(code, *expected, "seed order drifted from types.rs");
        }
        h
    }

    /// Registers a new type under the given parents and returns its code.
    /// Panics if the name is already taken or a parent is unregistered.
    pub fn add_type(&mut self, name: &str, parents: &[TypeCode]) -> TypeCode {
        if self.by_name.contains_key(name) {
            panic!("type name already registered: {}", name);
        }
        let code = TypeCode::new(self.names.len() as u16);
        let mut ancestors = HashSet::new();
        for &parent in parents {
            if parent.as_u16() as usize >= self.names.len() {
                panic!("unregistered parent code: {}", parent);
            }
            ancestors.insert(parent);
            ancestors.extend(self.ancestors[parent.as_u16() as usize].iter().copied());
        }
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), code);
        self.ancestors.push(ancestors);
        code
    }

    /// The number of registered types.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for TypeHierarchy {
    fn default() -> TypeHierarchy {
        TypeHierarchy::new()
    }
}

impl TypeLattice for TypeHierarchy {
    fn is_a(&self, child: TypeCode, parent: TypeCode) -> bool {
        child == parent
            || self
                .ancestors
                .get(child.as_u16() as usize)
                .map_or(false, |a| a.contains(&parent))
    }

    fn name_of(&self, code: TypeCode) -> &str {
        match self.names.get(code.as_u16() as usize) {
            Some(name) => name,
            None => panic!("unregistered type code: {}", code),
        }
    }

    fn by_name(&self, name: &str) -> Option<TypeCode> {
        self.by_name.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_a_reflexive_and_transitive() {
        let h = TypeHierarchy::new();
        assert!(h.is_a(types::CONCEPT, types::CONCEPT));
        assert!(h.is_a(types::CONCEPT, types::NODE));
        assert!(h.is_a(types::CONCEPT, types::ATOM));
        assert!(!h.is_a(types::NODE, types::CONCEPT));
        assert!(!h.is_a(types::CONCEPT, types::NUMBER));
    }

    #[test]
    fn test_unordered_family() {
        let h = TypeHierarchy::new();
        assert!(h.is_a(types::AND, types::UNORDERED));
        assert!(h.is_a(types::OR, types::UNORDERED));
        assert!(h.is_a(types::SET, types::UNORDERED));
        assert!(!h.is_a(types::LIST, types::UNORDERED));
        assert!(h.is_a(types::BIND, types::SCOPE));
    }

    #[test]
    fn test_add_type() {
        let mut h = TypeHierarchy::new();
        let animal = h.add_type("Animal", &[types::CONCEPT]);
        assert_eq!(animal, types::FIRST_USER_CODE);
        assert!(h.is_a(animal, types::CONCEPT));
        assert!(h.is_a(animal, types::ATOM));
        assert_eq!(h.by_name("Animal"), Some(animal));
        assert_eq!(h.name_of(animal), "Animal");
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_name_panics() {
        let mut h = TypeHierarchy::new();
        h.add_type("Concept", &[types::NODE]);
    }
}
