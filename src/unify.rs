use std::collections::BTreeSet;

use crate::lattice::TypeLattice;
use crate::quotation::Quotation;
use crate::solution::{Block, Partition, SolutionSet};
use crate::term::Handle;
use crate::types::{self, TypeCode};
use crate::variables::{self, Variables};

/// Computes every assignment of variables to terms under which two
/// expressions become structurally equal.
///
/// The unifier is pure: it holds the injected type lattice and the two
/// optional variable declarations, and every call threads its own
/// quotation state. Nothing is memoized across calls.
pub struct Unifier<'a> {
    lattice: &'a dyn TypeLattice,
    lhs_vardecl: Option<Handle>,
    rhs_vardecl: Option<Handle>,
}

impl<'a> Unifier<'a> {
    pub fn new(lattice: &'a dyn TypeLattice) -> Unifier<'a> {
        Unifier {
            lattice,
            lhs_vardecl: None,
            rhs_vardecl: None,
        }
    }

    pub fn with_vardecls(
        lattice: &'a dyn TypeLattice,
        lhs_vardecl: Option<Handle>,
        rhs_vardecl: Option<Handle>,
    ) -> Unifier<'a> {
        Unifier {
            lattice,
            lhs_vardecl,
            rhs_vardecl,
        }
    }

    pub fn unify(&self, lhs: &Handle, rhs: &Handle) -> SolutionSet {
        self.unify_rec(lhs, rhs, Quotation::new(), Quotation::new())
    }

    fn unify_rec(
        &self,
        lhs: &Handle,
        rhs: &Handle,
        lhs_q: Quotation,
        rhs_q: Quotation,
    ) -> SolutionSet {
        let lhs_t = lhs.type_code();
        let rhs_t = rhs.type_code();

        // Leaf case. A live variable on either side produces a binding
        // block; otherwise a leaf only matches an identical term.
        if lhs.is_node() || rhs.is_node() {
            if (lhs_q.is_unquoted() && lhs_t == types::VARIABLE)
                || (rhs_q.is_unquoted() && rhs_t == types::VARIABLE)
            {
                return self.var_solution(lhs, rhs, lhs_q, rhs_q);
            }
            return SolutionSet::from_bool(lhs == rhs);
        }

        // Both sides are links. Strip paired or one-sided consumable
        // quotation wrappers before comparing structure.
        if lhs_q.consumable(lhs_t) && rhs_q.consumable(rhs_t) {
            let (mut lq, mut rq) = (lhs_q, rhs_q);
            lq.update(lhs_t);
            rq.update(rhs_t);
            return self.unify_rec(lhs.child(0), rhs.child(0), lq, rq);
        }
        if lhs_q.consumable(lhs_t) {
            let mut lq = lhs_q;
            lq.update(lhs_t);
            return self.unify_rec(lhs.child(0), rhs, lq, rhs_q);
        }
        if rhs_q.consumable(rhs_t) {
            let mut rq = rhs_q;
            rq.update(rhs_t);
            return self.unify_rec(lhs, rhs.child(0), lhs_q, rq);
        }

        let (mut lq, mut rq) = (lhs_q, rhs_q);
        lq.update(lhs_t);
        rq.update(rhs_t);

        if lhs_t != rhs_t {
            return SolutionSet::Unsatisfiable;
        }
        if lhs.arity() != rhs.arity() {
            return SolutionSet::Unsatisfiable;
        }

        // The right-hand side picks the branch. After the type equality
        // check above, both sides agree on orderedness anyway.
        if rhs.is_unordered(self.lattice) {
            self.unordered_unify(lhs.outgoing(), rhs.outgoing(), lq, rq)
        } else {
            self.ordered_unify(lhs.outgoing(), rhs.outgoing(), lq, rq)
        }
    }

    /// Index-wise unification of two equal-length child sequences,
    /// left-folded through join. Stops at the first unsatisfiable fold.
    fn ordered_unify(
        &self,
        lhs: &[Handle],
        rhs: &[Handle],
        lhs_q: Quotation,
        rhs_q: Quotation,
    ) -> SolutionSet {
        assert_eq!(lhs.len(), rhs.len(), "ordered arity mismatch");

        let mut solution = SolutionSet::empty();
        for (l, r) in lhs.iter().zip(rhs.iter()) {
            let rs = self.unify_rec(l, r, lhs_q, rhs_q);
            solution = solution.join(self.lattice, &rs);
            if !solution.is_satisfiable() {
                break;
            }
        }
        solution
    }

    /// Every satisfiable pairing of the two child multisets. The first
    /// right-hand child is matched against each left-hand child in turn
    /// and the tails recurse, so all bijections are explored; the
    /// resulting partitions are unioned and deduplicate by canonical
    /// partition equality. Factorial in arity; unordered links are
    /// expected to stay small.
    fn unordered_unify(
        &self,
        lhs: &[Handle],
        rhs: &[Handle],
        lhs_q: Quotation,
        rhs_q: Quotation,
    ) -> SolutionSet {
        assert_eq!(lhs.len(), rhs.len(), "unordered arity mismatch");

        if lhs.is_empty() {
            return SolutionSet::empty();
        }

        let mut solution = SolutionSet::Unsatisfiable;
        for i in 0..lhs.len() {
            let head = self.unify_rec(&lhs[i], &rhs[0], lhs_q, rhs_q);
            if !head.is_satisfiable() {
                continue;
            }
            let lhs_tail = without(lhs, i);
            let tail = self.unordered_unify(&lhs_tail, &rhs[1..], lhs_q, rhs_q);
            solution.union_with(head.join(self.lattice, &tail));
        }
        solution
    }

    /// The single-block solution for a variable meeting a term, or
    /// unsatisfiable when their types have no intersection.
    fn var_solution(
        &self,
        lhs: &Handle,
        rhs: &Handle,
        lhs_q: Quotation,
        rhs_q: Quotation,
    ) -> SolutionSet {
        let inter = type_intersection(
            self.lattice,
            lhs,
            rhs,
            self.lhs_vardecl.as_ref(),
            self.rhs_vardecl.as_ref(),
            lhs_q,
            rhs_q,
        );
        match inter {
            None => SolutionSet::Unsatisfiable,
            Some(ty) => {
                SolutionSet::single(Partition::singleton(Block::pair(
                    lhs.clone(),
                    rhs.clone(),
                    ty,
                )))
            }
        }
    }
}

/// One-shot entry point over a fresh unifier.
pub fn unify(
    lattice: &dyn TypeLattice,
    lhs: &Handle,
    rhs: &Handle,
    lhs_vardecl: Option<&Handle>,
    rhs_vardecl: Option<&Handle>,
) -> SolutionSet {
    Unifier::with_vardecls(lattice, lhs_vardecl.cloned(), rhs_vardecl.cloned()).unify(lhs, rhs)
}

fn without(children: &[Handle], i: usize) -> Vec<Handle> {
    let mut out = children.to_vec();
    out.remove(i);
    out
}

/// The coarse greatest-lower-bound: `lhs` when it inherits `rhs`, else
/// `rhs` when it inherits `lhs`, else undefined. One-way inheritance only;
/// a true lattice meet over structural types is out of reach here.
pub fn type_intersection(
    lattice: &dyn TypeLattice,
    lhs: &Handle,
    rhs: &Handle,
    lhs_vardecl: Option<&Handle>,
    rhs_vardecl: Option<&Handle>,
    lhs_q: Quotation,
    rhs_q: Quotation,
) -> Option<Handle> {
    if inherit(lattice, lhs, rhs, lhs_vardecl, rhs_vardecl, lhs_q, rhs_q) {
        Some(lhs.clone())
    } else if inherit(lattice, rhs, lhs, rhs_vardecl, lhs_vardecl, rhs_q, lhs_q) {
        Some(rhs.clone())
    } else {
        None
    }
}

/// Whether `lhs` is at least as specific as `rhs`, under the declarations
/// and quotation states of both sides. Consumable quotations are stripped
/// first; equal terms always relate; two live variables compare by their
/// declared unions; and a live right-hand side admits anything its
/// declaration allows.
pub fn inherit(
    lattice: &dyn TypeLattice,
    lhs: &Handle,
    rhs: &Handle,
    lhs_vardecl: Option<&Handle>,
    rhs_vardecl: Option<&Handle>,
    lhs_q: Quotation,
    rhs_q: Quotation,
) -> bool {
    let lhs_t = lhs.type_code();
    let rhs_t = rhs.type_code();

    if lhs_q.consumable(lhs_t) {
        let mut lq = lhs_q;
        lq.update(lhs_t);
        return inherit(lattice, lhs.child(0), rhs, lhs_vardecl, rhs_vardecl, lq, rhs_q);
    }
    if rhs_q.consumable(rhs_t) {
        let mut rq = rhs_q;
        rq.update(rhs_t);
        return inherit(lattice, lhs, rhs.child(0), lhs_vardecl, rhs_vardecl, lhs_q, rq);
    }

    if lhs == rhs {
        return true;
    }

    if lhs_q.is_unquoted()
        && lhs_t == types::VARIABLE
        && rhs_q.is_unquoted()
        && rhs_t == types::VARIABLE
    {
        return inherit_unions(
            lattice,
            &variables::get_union_type(lattice, lhs, lhs_vardecl),
            &variables::get_union_type(lattice, rhs, rhs_vardecl),
        );
    }

    if rhs_q.is_unquoted() {
        return Variables::for_term(lattice, rhs, rhs_vardecl).is_type(lattice, lhs, rhs);
    }

    false
}

/// Declaration-free inherit: everything inherits a variable; otherwise
/// only equal terms relate. This is the partial order behind
/// representative selection.
pub fn inherit_simple(lhs: &Handle, rhs: &Handle) -> bool {
    rhs.type_code() == types::VARIABLE || lhs == rhs
}

/// Whether `lhs` is a subtype of some member of the union.
pub fn inherit_code_union(
    lattice: &dyn TypeLattice,
    lhs: TypeCode,
    union: &BTreeSet<TypeCode>,
) -> bool {
    union.iter().any(|&t| lattice.is_a(lhs, t))
}

/// Whether every member of `lhs` is a subtype of some member of `rhs`.
pub fn inherit_unions(
    lattice: &dyn TypeLattice,
    lhs: &BTreeSet<TypeCode>,
    rhs: &BTreeSet<TypeCode>,
) -> bool {
    lhs.iter().all(|&t| inherit_code_union(lattice, t, rhs))
}
