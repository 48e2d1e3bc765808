pub mod display;
pub mod lattice;
pub mod quotation;
pub mod solution;
pub mod substitute;
pub mod term;
pub mod types;
pub mod unify;
pub mod variables;


pub use crate::display::{
    DisplayBlock, DisplayPartition, DisplayPartitions, DisplaySolutionSet, DisplayTerm,
    DisplayTypedSubstitution, DisplayTypedSubstitutions,
};
pub use crate::lattice::{TypeHierarchy, TypeLattice};
pub use crate::quotation::Quotation;
pub use crate::solution::{Block, Partition, Partitions, SolutionSet};
pub use crate::substitute::{
    consume_ill_quotations, is_connector, is_connector_code, is_ill_quotation, substitute,
    typed_substitutions, RewriteRule, RuleError, TypedSubstitution, TypedSubstitutions,
};
pub use crate::term::{Handle, Term};
pub use crate::types::TypeCode;
pub use crate::unify::{unify, Unifier};
pub use crate::variables::{free_variables, gen_vardecl, merge_vardecl, Variables};
