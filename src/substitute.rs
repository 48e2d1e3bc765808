use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::lattice::TypeLattice;
use crate::quotation::Quotation;
use crate::solution::SolutionSet;
use crate::term::Handle;
use crate::types::{self, TypeCode};
use crate::unify::inherit_simple;
use crate::variables::{self, Variables};

/// A variable-to-term map projected from one partition, paired with the
/// merged declaration covering the remaining free variables.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct TypedSubstitution {
    pub map: BTreeMap<Handle, Handle>,
    pub vardecl: Option<Handle>,
}

pub type TypedSubstitutions = BTreeSet<TypedSubstitution>;

/// Projects a solution into one typed substitution per partition.
///
/// Each block contributes its least abstract member as the value for
/// every variable in the block. Variables qualify as values only when
/// they occur live in `pre`, the side the caller gives precedence to
/// (typically the pattern of a rewrite rule); without that, any concrete
/// member would always win and pattern-variable identity would be lost.
///
/// Panics on an unsatisfiable solution; callers check first.
pub fn typed_substitutions(
    lattice: &dyn TypeLattice,
    solution: &SolutionSet,
    pre: &Handle,
    lhs: &Handle,
    rhs: &Handle,
    lhs_vardecl: Option<&Handle>,
    rhs_vardecl: Option<&Handle>,
) -> TypedSubstitutions {
    let partitions = match solution {
        SolutionSet::Satisfiable(partitions) => partitions,
        SolutionSet::Unsatisfiable => {
            panic!("typed_substitutions called on an unsatisfiable solution")
        }
    };

    // Missing declarations are synthesized from the terms' free variables,
    // so the merged declaration always covers both sides.
    let lhs_vardecl = lhs_vardecl
        .cloned()
        .unwrap_or_else(|| variables::gen_vardecl(lattice, lhs));
    let rhs_vardecl = rhs_vardecl
        .cloned()
        .unwrap_or_else(|| variables::gen_vardecl(lattice, rhs));
    let vardecl = variables::merge_vardecl(lattice, Some(&rhs_vardecl), Some(&lhs_vardecl));

    let mut result = TypedSubstitutions::new();
    for partition in partitions {
        let mut map = BTreeMap::new();
        for block in partition.blocks() {
            let value = least_abstract(lattice, &block.members, pre);
            for member in &block.members {
                if member.is_variable() {
                    map.insert(member.clone(), value.clone());
                }
            }
        }
        result.insert(TypedSubstitution {
            map,
            vardecl: vardecl.clone(),
        });
    }
    result
}

/// The most specific member of a block under the declaration-free partial
/// order, seeded with a sentinel top so the first qualifying member always
/// replaces it. Ties resolve in member order.
fn least_abstract(lattice: &dyn TypeLattice, members: &BTreeSet<Handle>, pre: &Handle) -> Handle {
    let mut least = Handle::variable("__top__");
    for member in members {
        if inherit_simple(member, &least)
            && (!member.is_variable() || variables::is_unquoted_unscoped_in(lattice, pre, member))
        {
            least = member.clone();
        }
    }
    least
}

/// A pattern plus rewrite package: the consumer-facing shape of a BIND
/// link. The declaration is optional; rules without one bind the pattern's
/// free variables implicitly.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct RewriteRule {
    vardecl: Option<Handle>,
    pattern: Handle,
    rewrite: Handle,
}

/// The ways a term can fail to parse as a rewrite rule.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RuleError {
    // The term is not a BIND-shaped link.
    NotARule(TypeCode),

    // A BIND link carries (pattern, rewrite) or (vardecl, pattern, rewrite).
    WrongArity(usize),
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuleError::NotARule(t) => write!(f, "not a rewrite rule: type code {}", t),
            RuleError::WrongArity(n) => {
                write!(f, "a rewrite rule has 2 or 3 children, found {}", n)
            }
        }
    }
}

impl std::error::Error for RuleError {}

impl RewriteRule {
    pub fn new(vardecl: Option<Handle>, pattern: Handle, rewrite: Handle) -> RewriteRule {
        RewriteRule {
            vardecl,
            pattern,
            rewrite,
        }
    }

    /// Parses a BIND link into its rule shape.
    pub fn from_term(lattice: &dyn TypeLattice, term: &Handle) -> Result<RewriteRule, RuleError> {
        if !lattice.is_a(term.type_code(), types::BIND) {
            return Err(RuleError::NotARule(term.type_code()));
        }
        match term.outgoing() {
            [pattern, rewrite] => Ok(RewriteRule::new(None, pattern.clone(), rewrite.clone())),
            [vardecl, pattern, rewrite] => Ok(RewriteRule::new(
                Some(vardecl.clone()),
                pattern.clone(),
                rewrite.clone(),
            )),
            outgoing => Err(RuleError::WrongArity(outgoing.len())),
        }
    }

    pub fn vardecl(&self) -> Option<&Handle> {
        self.vardecl.as_ref()
    }

    pub fn pattern(&self) -> &Handle {
        &self.pattern
    }

    pub fn rewrite(&self) -> &Handle {
        &self.rewrite
    }

    /// Rebuilds the BIND term.
    pub fn to_term(&self) -> Handle {
        match &self.vardecl {
            Some(vardecl) => Handle::scope_link(
                types::BIND,
                vec![vardecl.clone(), self.pattern.clone(), self.rewrite.clone()],
            ),
            None => Handle::link(types::BIND, vec![self.pattern.clone(), self.rewrite.clone()]),
        }
    }

    /// The declared variables, or the pattern's free variables when the
    /// rule has no explicit declaration.
    pub fn variables(&self, lattice: &dyn TypeLattice) -> Variables {
        match &self.vardecl {
            Some(vardecl) => Variables::from_vardecl(lattice, vardecl),
            None => Variables::from_term(lattice, &self.pattern),
        }
    }

    /// Substitutes positional values for the rule's variables and installs
    /// the new declaration. Values that are not variables are fine; that
    /// is the whole point of applying a unification result.
    pub fn alpha_convert(
        &self,
        lattice: &dyn TypeLattice,
        values: &[Handle],
        vardecl: Option<Handle>,
    ) -> RewriteRule {
        let vars = self.variables(lattice);
        RewriteRule {
            vardecl,
            pattern: vars.substitute(lattice, &self.pattern, values),
            rewrite: vars.substitute(lattice, &self.rewrite, values),
        }
    }
}

/// Whether a rule lacks the declaration its quotations assume.
pub fn is_ill_quotation(rule: &RewriteRule) -> bool {
    rule.vardecl().is_none()
}

/// Whether a type code is a pattern connector. LOCAL_QUOTE wrappers exist
/// to shield these from evaluation, so quotation cleanup leaves both in
/// place.
pub fn is_connector_code(t: TypeCode) -> bool {
    t == types::AND || t == types::OR || t == types::NOT
}

pub fn is_connector(h: &Handle) -> bool {
    is_connector_code(h.type_code())
}

/// Applies one typed substitution to a rule: positional values are looked
/// up in the map (variables fall back to themselves), substituted in via
/// alpha-conversion, and the result is swept for quotations that the
/// substitution made inert.
pub fn substitute(
    lattice: &dyn TypeLattice,
    rule: &RewriteRule,
    ts: &TypedSubstitution,
) -> Handle {
    let values = rule.variables(lattice).make_values(&ts.map);
    let converted = rule.alpha_convert(lattice, &values, ts.vardecl.clone());
    consume_ill_quotations(lattice, &converted).to_term()
}

/// Removes QUOTE/UNQUOTE wrappers that no longer quote anything after
/// substitution. Two exceptions survive literally: a QUOTE protecting a
/// scope that still binds one of the rule's variables (and every UNQUOTE
/// below it), and LOCAL_QUOTE wrappers.
pub fn consume_ill_quotations(lattice: &dyn TypeLattice, rule: &RewriteRule) -> RewriteRule {
    let vars = rule.variables(lattice);
    RewriteRule {
        vardecl: rule.vardecl.clone(),
        pattern: consume_term(lattice, &vars, &rule.pattern, Quotation::new(), false),
        rewrite: consume_term(lattice, &vars, &rule.rewrite, Quotation::new(), false),
    }
}

fn consume_term(
    lattice: &dyn TypeLattice,
    vars: &Variables,
    term: &Handle,
    mut quotation: Quotation,
    mut escape: bool,
) -> Handle {
    if term.is_node() {
        return term.clone();
    }

    let t = term.type_code();
    if quotation.consumable(t) {
        if t == types::QUOTE {
            let inner = term.child(0);
            assert!(
                lattice.is_a(inner.type_code(), types::SCOPE),
                "quotation cleanup expects a scope below a consumable quote"
            );
            if scope_binds_any(lattice, vars, inner) {
                // The quote protects a binder the rule still owns. Keep it
                // and escape: unquotes below it stay literal too.
                escape = true;
            } else {
                quotation.update(t);
                return consume_term(lattice, vars, inner, quotation, escape);
            }
        } else if t == types::UNQUOTE {
            if !escape {
                quotation.update(t);
                return consume_term(lattice, vars, term.child(0), quotation, escape);
            }
        }
        // LOCAL_QUOTE falls through: preserved as-is.
    }

    quotation.update(t);
    let outgoing: Vec<Handle> = term
        .outgoing()
        .iter()
        .map(|child| consume_term(lattice, vars, child, quotation, escape))
        .collect();
    if lattice.is_a(t, types::SCOPE) {
        Handle::scope_link(t, outgoing)
    } else {
        Handle::link(t, outgoing)
    }
}

/// Whether the scope's own declaration binds any of the rule's variables.
fn scope_binds_any(lattice: &dyn TypeLattice, vars: &Variables, scope: &Handle) -> bool {
    let local = Variables::from_vardecl(lattice, scope.child(0));
    local.vars().iter().any(|v| vars.contains(v))
}
