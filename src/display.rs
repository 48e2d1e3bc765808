use std::fmt;

use crate::lattice::TypeLattice;
use crate::solution::{Block, Partition, Partitions, SolutionSet};
use crate::substitute::{TypedSubstitution, TypedSubstitutions};
use crate::term::{Handle, Term};

/// Renders a term with type names resolved through the lattice.
/// Nodes print as `Type:payload`, links as `Type(child, ...)`.
pub struct DisplayTerm<'a> {
    pub term: &'a Handle,
    pub context: &'a dyn TypeLattice,
}

impl<'a> DisplayTerm<'a> {
    pub fn new(term: &'a Handle, context: &'a dyn TypeLattice) -> DisplayTerm<'a> {
        DisplayTerm { term, context }
    }
}

impl fmt::Display for DisplayTerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.term.term() {
            Term::Node { type_code, name } => {
                write!(f, "{}:{}", self.context.name_of(*type_code), name)
            }
            Term::Link { type_code, outgoing } => {
                write!(f, "{}(", self.context.name_of(*type_code))?;
                for (i, child) in outgoing.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", DisplayTerm::new(child, self.context))?;
                }
                write!(f, ")")
            }
        }
    }
}

pub struct DisplayBlock<'a> {
    pub block: &'a Block,
    pub context: &'a dyn TypeLattice,
}

impl<'a> DisplayBlock<'a> {
    pub fn new(block: &'a Block, context: &'a dyn TypeLattice) -> DisplayBlock<'a> {
        DisplayBlock { block, context }
    }
}

impl fmt::Display for DisplayBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, member) in self.block.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", DisplayTerm::new(member, self.context))?;
        }
        write!(f, "}}: {}", DisplayTerm::new(&self.block.ty, self.context))
    }
}

pub struct DisplayPartition<'a> {
    pub partition: &'a Partition,
    pub context: &'a dyn TypeLattice,
}

impl<'a> DisplayPartition<'a> {
    pub fn new(partition: &'a Partition, context: &'a dyn TypeLattice) -> DisplayPartition<'a> {
        DisplayPartition { partition, context }
    }
}

impl fmt::Display for DisplayPartition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "size = {}", self.partition.len())?;
        for (i, block) in self.partition.blocks().enumerate() {
            writeln!(f, "block[{}]: {}", i, DisplayBlock::new(&block, self.context))?;
        }
        Ok(())
    }
}

pub struct DisplayPartitions<'a> {
    pub partitions: &'a Partitions,
    pub context: &'a dyn TypeLattice,
}

impl<'a> DisplayPartitions<'a> {
    pub fn new(partitions: &'a Partitions, context: &'a dyn TypeLattice) -> DisplayPartitions<'a> {
        DisplayPartitions {
            partitions,
            context,
        }
    }
}

impl fmt::Display for DisplayPartitions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "size = {}", self.partitions.len())?;
        for (i, partition) in self.partitions.iter().enumerate() {
            writeln!(f, "partition[{}]:", i)?;
            write!(f, "{}", DisplayPartition::new(partition, self.context))?;
        }
        Ok(())
    }
}

pub struct DisplaySolutionSet<'a> {
    pub solution: &'a SolutionSet,
    pub context: &'a dyn TypeLattice,
}

impl<'a> DisplaySolutionSet<'a> {
    pub fn new(solution: &'a SolutionSet, context: &'a dyn TypeLattice) -> DisplaySolutionSet<'a> {
        DisplaySolutionSet { solution, context }
    }
}

impl fmt::Display for DisplaySolutionSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.solution {
            SolutionSet::Unsatisfiable => writeln!(f, "satisfiable: false"),
            SolutionSet::Satisfiable(partitions) => {
                writeln!(f, "satisfiable: true")?;
                write!(f, "partitions: {}", DisplayPartitions::new(partitions, self.context))
            }
        }
    }
}

pub struct DisplayTypedSubstitution<'a> {
    pub substitution: &'a TypedSubstitution,
    pub context: &'a dyn TypeLattice,
}

impl<'a> DisplayTypedSubstitution<'a> {
    pub fn new(
        substitution: &'a TypedSubstitution,
        context: &'a dyn TypeLattice,
    ) -> DisplayTypedSubstitution<'a> {
        DisplayTypedSubstitution {
            substitution,
            context,
        }
    }
}

impl fmt::Display for DisplayTypedSubstitution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "substitution: {{")?;
        for (i, (var, value)) in self.substitution.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{} -> {}",
                DisplayTerm::new(var, self.context),
                DisplayTerm::new(value, self.context)
            )?;
        }
        writeln!(f, "}}")?;
        match &self.substitution.vardecl {
            Some(vardecl) => writeln!(f, "vardecl: {}", DisplayTerm::new(vardecl, self.context)),
            None => writeln!(f, "vardecl: (none)"),
        }
    }
}

pub struct DisplayTypedSubstitutions<'a> {
    pub substitutions: &'a TypedSubstitutions,
    pub context: &'a dyn TypeLattice,
}

impl<'a> DisplayTypedSubstitutions<'a> {
    pub fn new(
        substitutions: &'a TypedSubstitutions,
        context: &'a dyn TypeLattice,
    ) -> DisplayTypedSubstitutions<'a> {
        DisplayTypedSubstitutions {
            substitutions,
            context,
        }
    }
}

impl fmt::Display for DisplayTypedSubstitutions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "size = {}", self.substitutions.len())?;
        for (i, substitution) in self.substitutions.iter().enumerate() {
            writeln!(f, "typed substitution[{}]:", i)?;
            write!(f, "{}", DisplayTypedSubstitution::new(substitution, self.context))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::TypeHierarchy;
    use crate::solution::Partition;
    use crate::types;
    use crate::unify::unify;
    use std::collections::BTreeSet;

    #[test]
    fn test_display_term() {
        let h = TypeHierarchy::new();
        let term = Handle::link(
            types::LIST,
            vec![Handle::variable("x"), Handle::node(types::CONCEPT, "a")],
        );
        assert_eq!(
            format!("{}", DisplayTerm::new(&term, &h)),
            "List(Variable:x, Concept:a)"
        );
    }

    #[test]
    fn test_display_block_and_partition() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let a = Handle::node(types::CONCEPT, "a");
        let block = Block::new(BTreeSet::from([x, a.clone()]), a);
        assert_eq!(
            format!("{}", DisplayBlock::new(&block, &h)),
            "{Variable:x, Concept:a}: Concept:a"
        );

        let partition = Partition::singleton(block);
        assert_eq!(
            format!("{}", DisplayPartition::new(&partition, &h)),
            "size = 1\nblock[0]: {Variable:x, Concept:a}: Concept:a\n"
        );
    }

    #[test]
    fn test_display_solution_set() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let a = Handle::node(types::CONCEPT, "a");
        let sol = unify(&h, &x, &a, None, None);
        let printed = format!("{}", DisplaySolutionSet::new(&sol, &h));
        assert!(printed.starts_with("satisfiable: true\n"));
        assert!(printed.contains("partition[0]:"));
        assert!(printed.contains("{Variable:x, Concept:a}: Concept:a"));

        assert_eq!(
            format!("{}", DisplaySolutionSet::new(&SolutionSet::Unsatisfiable, &h)),
            "satisfiable: false\n"
        );
    }

    #[test]
    fn test_display_typed_substitutions() {
        let h = TypeHierarchy::new();
        let x = Handle::variable("x");
        let a = Handle::node(types::CONCEPT, "a");
        let sol = unify(&h, &x, &a, None, None);
        let subs = crate::substitute::typed_substitutions(&h, &sol, &x, &x, &a, None, None);
        let printed = format!("{}", DisplayTypedSubstitutions::new(&subs, &h));
        assert!(printed.starts_with("size = 1\n"));
        assert!(printed.contains("substitution: {Variable:x -> Concept:a}"));
        assert!(printed.contains("vardecl: VariableList(Variable:x)"));
    }
}
