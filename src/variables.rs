use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::lattice::TypeLattice;
use crate::quotation::Quotation;
use crate::term::Handle;
use crate::types::{self, TypeCode};

/// The declaration layer: which variables a term binds and which type
/// unions restrict their substitutions.
///
/// Built either from an explicit declaration term (a VARIABLE_LIST, a bare
/// VARIABLE, or a TYPED_VARIABLE pairing) or synthesized from a term's
/// free variables. Mis-shaped declarations are programmer errors and
/// panic; they must never be reachable from well-formed input.
#[derive(Clone, Debug, Default)]
pub struct Variables {
    /// Declaration order; drives positional value projection.
    varseq: Vec<Handle>,

    /// Membership index over varseq.
    varset: BTreeSet<Handle>,

    /// Declared type unions. Variables without an entry are unrestricted.
    typemap: HashMap<Handle, BTreeSet<TypeCode>>,
}

impl Variables {
    pub fn new() -> Variables {
        Variables::default()
    }

    /// Parses a declaration term.
    pub fn from_vardecl(lattice: &dyn TypeLattice, vardecl: &Handle) -> Variables {
        let mut vars = Variables::new();
        match vardecl.type_code() {
            types::VARIABLE => vars.add(vardecl.clone(), None),
            types::TYPED_VARIABLE => {
                let (var, union) = parse_typed_variable(lattice, vardecl);
                vars.add(var, Some(union));
            }
            types::VARIABLE_LIST => {
                for child in vardecl.outgoing() {
                    match child.type_code() {
                        types::VARIABLE => vars.add(child.clone(), None),
                        types::TYPED_VARIABLE => {
                            let (var, union) = parse_typed_variable(lattice, child);
                            vars.add(var, Some(union));
                        }
                        t => panic!("not a variable declaration member: type code {}", t),
                    }
                }
            }
            t => panic!("not a variable declaration: type code {}", t),
        }
        vars
    }

    /// The free variables of a term, as an untyped declaration.
    pub fn from_term(lattice: &dyn TypeLattice, term: &Handle) -> Variables {
        let mut vars = Variables::new();
        for var in free_variables(lattice, term) {
            vars.add(var, None);
        }
        vars
    }

    /// The declaration to use for a term: the explicit one when present,
    /// else the term's free variables.
    pub fn for_term(lattice: &dyn TypeLattice, term: &Handle, decl: Option<&Handle>) -> Variables {
        match decl {
            Some(d) => Variables::from_vardecl(lattice, d),
            None => Variables::from_term(lattice, term),
        }
    }

    /// First declaration wins; later mentions of the same variable are
    /// dropped along with their restriction.
    fn add(&mut self, var: Handle, union: Option<BTreeSet<TypeCode>>) {
        if self.varset.insert(var.clone()) {
            self.varseq.push(var.clone());
            if let Some(union) = union {
                self.typemap.insert(var, union);
            }
        }
    }

    pub fn vars(&self) -> &[Handle] {
        &self.varseq
    }

    pub fn len(&self) -> usize {
        self.varseq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.varseq.is_empty()
    }

    pub fn contains(&self, var: &Handle) -> bool {
        self.varset.contains(var)
    }

    /// The declared restriction of a variable, if any.
    pub fn union_type(&self, var: &Handle) -> Option<&BTreeSet<TypeCode>> {
        self.typemap.get(var)
    }

    /// Whether `value` satisfies `var`'s declared restriction. A variable
    /// outside the declaration admits nothing; a declared variable without
    /// a restriction admits anything.
    pub fn is_type(&self, lattice: &dyn TypeLattice, value: &Handle, var: &Handle) -> bool {
        if !self.varset.contains(var) {
            return false;
        }
        match self.typemap.get(var) {
            None => true,
            Some(union) => union.iter().any(|&t| lattice.is_a(value.type_code(), t)),
        }
    }

    /// Left-biased union: keeps this declaration's restriction when a
    /// variable appears on both sides.
    pub fn extend(&mut self, other: &Variables) {
        for var in &other.varseq {
            self.add(var.clone(), other.typemap.get(var).cloned());
        }
    }

    /// Rebuilds a declaration term.
    pub fn to_vardecl(&self, lattice: &dyn TypeLattice) -> Handle {
        let mut outgoing = Vec::with_capacity(self.varseq.len());
        for var in &self.varseq {
            match self.typemap.get(var) {
                None => outgoing.push(var.clone()),
                Some(union) => {
                    let restriction = if union.len() == 1 {
                        Handle::type_node(lattice, *union.iter().next().unwrap())
                    } else {
                        Handle::link(
                            types::OR,
                            union.iter().map(|&c| Handle::type_node(lattice, c)).collect(),
                        )
                    };
                    outgoing.push(Handle::link(
                        types::TYPED_VARIABLE,
                        vec![var.clone(), restriction],
                    ));
                }
            }
        }
        Handle::link(types::VARIABLE_LIST, outgoing)
    }

    /// Projects a variable-to-term map onto the declaration order.
    /// Unmapped variables project to themselves.
    pub fn make_values(&self, map: &BTreeMap<Handle, Handle>) -> Vec<Handle> {
        self.varseq
            .iter()
            .map(|var| map.get(var).unwrap_or(var).clone())
            .collect()
    }

    /// Substitutes positional values for this declaration's variables in a
    /// term. Descent is shadow-aware: a nested scope rebinding one of the
    /// variables hides it from substitution below that scope.
    pub fn substitute(&self, lattice: &dyn TypeLattice, term: &Handle, values: &[Handle]) -> Handle {
        assert_eq!(
            values.len(),
            self.varseq.len(),
            "positional value count does not match the declaration"
        );
        let map: BTreeMap<&Handle, &Handle> = self.varseq.iter().zip(values.iter()).collect();
        substitute_rec(lattice, term, &map)
    }
}

/// Splits a TYPED_VARIABLE into the declared variable and its type union.
/// The restriction is a single TYPE node or a link of TYPE nodes.
fn parse_typed_variable(
    lattice: &dyn TypeLattice,
    decl: &Handle,
) -> (Handle, BTreeSet<TypeCode>) {
    assert_eq!(
        decl.arity(),
        2,
        "a typed variable pairs a variable with its restriction"
    );
    let var = decl.child(0);
    assert!(
        var.is_variable(),
        "a typed variable must declare a variable node"
    );
    let restriction = decl.child(1);
    let mut union = BTreeSet::new();
    let members: &[Handle] = if restriction.is_node() {
        std::slice::from_ref(restriction)
    } else {
        restriction.outgoing()
    };
    for member in members {
        assert_eq!(
            member.type_code(),
            types::TYPE,
            "a type restriction is built from TYPE nodes"
        );
        match lattice.by_name(member.name()) {
            Some(code) => {
                union.insert(code);
            }
            None => panic!("unknown type name in declaration: {}", member.name()),
        }
    }
    (var.clone(), union)
}

fn substitute_rec(
    lattice: &dyn TypeLattice,
    term: &Handle,
    map: &BTreeMap<&Handle, &Handle>,
) -> Handle {
    if map.is_empty() {
        return term.clone();
    }
    if term.is_node() {
        return match map.get(term) {
            Some(value) => (*value).clone(),
            None => term.clone(),
        };
    }
    if term.is_scope(lattice) && term.arity() >= 1 {
        let local = Variables::from_vardecl(lattice, term.child(0));
        let reduced: BTreeMap<&Handle, &Handle> = map
            .iter()
            .filter_map(|(&var, &value)| {
                if local.contains(var) {
                    None
                } else {
                    Some((var, value))
                }
            })
            .collect();
        let mut outgoing = vec![term.child(0).clone()];
        for child in &term.outgoing()[1..] {
            outgoing.push(substitute_rec(lattice, child, &reduced));
        }
        return Handle::scope_link(term.type_code(), outgoing);
    }
    let outgoing = term
        .outgoing()
        .iter()
        .map(|child| substitute_rec(lattice, child, map))
        .collect();
    Handle::link(term.type_code(), outgoing)
}

/// The free variables of a term in order of first occurrence, honoring
/// quotation state and scope binders.
pub fn free_variables(lattice: &dyn TypeLattice, term: &Handle) -> Vec<Handle> {
    let mut acc = Vec::new();
    collect_free(lattice, term, Quotation::new(), &BTreeSet::new(), &mut acc);
    acc
}

fn collect_free(
    lattice: &dyn TypeLattice,
    term: &Handle,
    quotation: Quotation,
    bound: &BTreeSet<Handle>,
    acc: &mut Vec<Handle>,
) {
    if term.is_node() {
        if term.is_variable()
            && quotation.is_unquoted()
            && !bound.contains(term)
            && !acc.contains(term)
        {
            acc.push(term.clone());
        }
        return;
    }
    let mut q = quotation;
    q.update(term.type_code());
    if term.is_scope(lattice) && term.arity() >= 1 {
        let local = Variables::from_vardecl(lattice, term.child(0));
        let mut inner_bound = bound.clone();
        inner_bound.extend(local.vars().iter().cloned());
        for child in &term.outgoing()[1..] {
            collect_free(lattice, child, q, &inner_bound, acc);
        }
    } else {
        for child in term.outgoing() {
            collect_free(lattice, child, q, bound, acc);
        }
    }
}

/// Whether `var` occurs in `term` at a position where it is live: unquoted
/// and not captured by a nested scope.
pub fn is_unquoted_unscoped_in(lattice: &dyn TypeLattice, term: &Handle, var: &Handle) -> bool {
    free_variables(lattice, term).contains(var)
}

/// Synthesizes a declaration from a term's free variables.
pub fn gen_vardecl(lattice: &dyn TypeLattice, term: &Handle) -> Handle {
    Handle::link(types::VARIABLE_LIST, free_variables(lattice, term))
}

/// Merges two optional declarations. When both are present the result
/// starts from `rhs`'s entries and extends with `lhs`'s, so `rhs` keeps
/// its restriction on a collision.
pub fn merge_vardecl(
    lattice: &dyn TypeLattice,
    lhs: Option<&Handle>,
    rhs: Option<&Handle>,
) -> Option<Handle> {
    match (lhs, rhs) {
        (None, None) => None,
        (Some(l), None) => Some(l.clone()),
        (None, Some(r)) => Some(r.clone()),
        (Some(l), Some(r)) => {
            let mut vars = Variables::from_vardecl(lattice, r);
            vars.extend(&Variables::from_vardecl(lattice, l));
            Some(vars.to_vardecl(lattice))
        }
    }
}

/// The type union of `term` under a declaration: its declared restriction
/// when it is a restricted variable, else the universal singleton.
pub fn get_union_type(
    lattice: &dyn TypeLattice,
    term: &Handle,
    decl: Option<&Handle>,
) -> BTreeSet<TypeCode> {
    let vars = Variables::for_term(lattice, term, decl);
    match vars.union_type(term) {
        Some(union) if !union.is_empty() => simplify_type_union(union),
        _ => BTreeSet::from([types::ATOM]),
    }
}

/// Placeholder: returns the union unchanged.
/// TODO: drop members subsumed by another member of the union.
pub fn simplify_type_union(union: &BTreeSet<TypeCode>) -> BTreeSet<TypeCode> {
    union.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::TypeHierarchy;

    fn concept(name: &str) -> Handle {
        Handle::node(types::CONCEPT, name)
    }

    #[test]
    fn test_from_bare_variable() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let vars = Variables::from_vardecl(&h, &x);
        assert_eq!(vars.vars(), &[x.clone()]);
        assert!(vars.union_type(&x).is_none());
    }

    #[test]
    fn test_from_typed_variable() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let decl = Handle::link(
            types::TYPED_VARIABLE,
            vec![x.clone(), Handle::type_node(&h, types::NUMBER)],
        );
        let vars = Variables::from_vardecl(&h, &decl);
        assert_eq!(
            vars.union_type(&x),
            Some(&BTreeSet::from([types::NUMBER]))
        );
        assert!(vars.is_type(&h, &Handle::node(types::NUMBER, "1"), &x));
        assert!(!vars.is_type(&h, &concept("a"), &x));
    }

    #[test]
    fn test_is_type_outside_declaration() {
        let h = TypeHierarchy::new();
        let vars = Variables::from_vardecl(&h, &Handle::variable("x"));
        // An undeclared term admits nothing.
        assert!(!vars.is_type(&h, &concept("a"), &concept("b")));
        // A declared, unrestricted variable admits anything.
        assert!(vars.is_type(&h, &concept("a"), &Handle::variable("x")));
    }

    #[test]
    fn test_extend_is_left_biased() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let left_decl = Handle::link(
            types::TYPED_VARIABLE,
            vec![x.clone(), Handle::type_node(&h, types::NUMBER)],
        );
        let right_decl = Handle::link(
            types::TYPED_VARIABLE,
            vec![x.clone(), Handle::type_node(&h, types::CONCEPT)],
        );
        let mut vars = Variables::from_vardecl(&h, &left_decl);
        vars.extend(&Variables::from_vardecl(&h, &right_decl));
        assert_eq!(vars.len(), 1);
        assert_eq!(
            vars.union_type(&x),
            Some(&BTreeSet::from([types::NUMBER]))
        );
    }

    #[test]
    fn test_free_variables_order_and_dedup() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let y = Handle::variable("y");
        let term = Handle::link(
            types::LIST,
            vec![y.clone(), x.clone(), y.clone(), concept("a")],
        );
        assert_eq!(free_variables(&h, &term), vec![y, x]);
    }

    #[test]
    fn test_free_variables_respect_quotation() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let y = Handle::variable("y");
        let quoted = Handle::link(types::QUOTE, vec![x.clone()]);
        let requoted = Handle::link(
            types::QUOTE,
            vec![Handle::link(
                types::LIST,
                vec![Handle::link(types::UNQUOTE, vec![y.clone()])],
            )],
        );
        let term = Handle::link(types::LIST, vec![quoted, requoted]);
        // x is quoted away; y is live again below the unquote.
        assert_eq!(free_variables(&h, &term), vec![y]);
    }

    #[test]
    fn test_free_variables_respect_scope() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let y = Handle::variable("y");
        let decl = Handle::link(types::VARIABLE_LIST, vec![x.clone()]);
        let scope = Handle::scope_link(
            types::BIND,
            vec![decl, x.clone(), Handle::link(types::LIST, vec![x.clone(), y.clone()])],
        );
        assert_eq!(free_variables(&h, &scope), vec![y]);
    }

    #[test]
    fn test_make_values() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let y = Handle::variable("y");
        let decl = Handle::link(types::VARIABLE_LIST, vec![x.clone(), y.clone()]);
        let vars = Variables::from_vardecl(&h, &decl);
        let map = BTreeMap::from([(x.clone(), concept("a"))]);
        assert_eq!(vars.make_values(&map), vec![concept("a"), y]);
    }

    #[test]
    fn test_substitute_with_shadowing() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let decl = Handle::link(types::VARIABLE_LIST, vec![x.clone()]);
        let vars = Variables::from_vardecl(&h, &decl);

        let inner = Handle::scope_link(
            types::BIND,
            vec![decl.clone(), x.clone(), x.clone()],
        );
        let term = Handle::link(types::LIST, vec![x.clone(), inner.clone()]);
        let out = vars.substitute(&h, &term, &[concept("a")]);

        // The outer occurrence is replaced; the rebinding scope is not.
        assert_eq!(out.child(0), &concept("a"));
        assert_eq!(out.child(1), &inner);
    }

    #[test]
    fn test_merge_vardecl_right_bias() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let lhs = Handle::link(
            types::TYPED_VARIABLE,
            vec![x.clone(), Handle::type_node(&h, types::CONCEPT)],
        );
        let rhs = Handle::link(
            types::TYPED_VARIABLE,
            vec![x.clone(), Handle::type_node(&h, types::NUMBER)],
        );
        let merged = merge_vardecl(&h, Some(&lhs), Some(&rhs)).unwrap();
        let vars = Variables::from_vardecl(&h, &merged);
        assert_eq!(vars.union_type(&x), Some(&BTreeSet::from([types::NUMBER])));

        assert_eq!(merge_vardecl(&h, Some(&lhs), None), Some(lhs.clone()));
        assert_eq!(merge_vardecl(&h, None, None), None);
    }

    #[test]
    fn test_get_union_type() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let decl = Handle::link(
            types::TYPED_VARIABLE,
            vec![x.clone(), Handle::type_node(&h, types::NUMBER)],
        );
        assert_eq!(
            get_union_type(&h, &x, Some(&decl)),
            BTreeSet::from([types::NUMBER])
        );
        // Undeclared variables and plain terms sit at the top.
        assert_eq!(get_union_type(&h, &x, None), BTreeSet::from([types::ATOM]));
        assert_eq!(
            get_union_type(&h, &concept("a"), None),
            BTreeSet::from([types::ATOM])
        );
    }

    #[test]
    fn test_is_unquoted_unscoped_in() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let plain = Handle::link(types::LIST, vec![x.clone()]);
        let quoted = Handle::link(types::QUOTE, vec![x.clone()]);
        assert!(is_unquoted_unscoped_in(&h, &plain, &x));
        assert!(!is_unquoted_unscoped_in(&h, &quoted, &x));
    }

    #[test]
    #[should_panic(expected = "not a variable declaration")]
    fn test_bad_vardecl_panics() {
        let h = TypeHierarchy::new();
        Variables::from_vardecl(&h, &concept("a"));
    }
}
