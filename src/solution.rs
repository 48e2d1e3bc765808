use std::collections::{BTreeMap, BTreeSet};

use crate::lattice::TypeLattice;
use crate::quotation::Quotation;
use crate::term::Handle;
use crate::unify::type_intersection;

/// A set of terms known to be mutually unified, together with the most
/// specific term type under which all of them are valid.
///
/// Blocks held by a partition are always satisfiable; an undefined type
/// intersection surfaces as `None` from `join` and never as a stored
/// block.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Block {
    pub members: BTreeSet<Handle>,
    pub ty: Handle,
}

impl Block {
    pub fn new(members: BTreeSet<Handle>, ty: Handle) -> Block {
        Block { members, ty }
    }

    /// The two-member block produced when a variable meets a term.
    pub fn pair(lhs: Handle, rhs: Handle, ty: Handle) -> Block {
        Block {
            members: BTreeSet::from([lhs, rhs]),
            ty,
        }
    }

    /// Unions the member sets and intersects the types. `None` when the
    /// intersection is undefined, which makes the containing partition
    /// unsatisfiable.
    pub fn join(&self, lattice: &dyn TypeLattice, other: &Block) -> Option<Block> {
        let ty = type_intersection(
            lattice,
            &self.ty,
            &other.ty,
            None,
            None,
            Quotation::new(),
            Quotation::new(),
        )?;
        let members = self.members.union(&other.members).cloned().collect();
        Some(Block::new(members, ty))
    }
}

/// One coherent equivalence-class assignment: blocks with pairwise
/// disjoint member sets. Keyed by member set, so partitions compare and
/// deduplicate canonically no matter the order blocks were produced in.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Partition {
    blocks: BTreeMap<BTreeSet<Handle>, Handle>,
}

impl Partition {
    pub fn new() -> Partition {
        Partition::default()
    }

    pub fn singleton(block: Block) -> Partition {
        let mut partition = Partition::new();
        partition.insert(block);
        partition
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn insert(&mut self, block: Block) {
        self.blocks.insert(block.members, block.ty);
    }

    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.blocks
            .iter()
            .map(|(members, ty)| Block::new(members.clone(), ty.clone()))
    }

    /// The block containing a term, if any. In a well-formed partition
    /// there is at most one.
    pub fn block_of(&self, term: &Handle) -> Option<Block> {
        self.blocks().find(|block| block.members.contains(term))
    }

    /// Joins two partitions into one whose blocks are again pairwise
    /// disjoint, or `None` when some merged block has an undefined type.
    pub fn join(&self, lattice: &dyn TypeLattice, other: &Partition) -> Option<Partition> {
        if self.is_empty() {
            return Some(other.clone());
        }
        if other.is_empty() {
            return Some(self.clone());
        }
        let mut result = self.clone();
        for block in other.blocks() {
            if !result.absorb(lattice, block) {
                return None;
            }
        }
        Some(result)
    }

    /// Folds one block in, merging every resident block that shares a
    /// member until the merged block is disjoint from the rest. Iterating
    /// to that fixed point is what keeps chains of repeated variables in a
    /// single equivalence class. Returns false when a merge is
    /// unsatisfiable.
    fn absorb(&mut self, lattice: &dyn TypeLattice, block: Block) -> bool {
        let mut merged = block;
        loop {
            let overlap = self
                .blocks
                .keys()
                .find(|members| !members.is_disjoint(&merged.members))
                .cloned();
            match overlap {
                Some(members) => {
                    let ty = self.blocks.remove(&members).unwrap();
                    match merged.join(lattice, &Block::new(members, ty)) {
                        Some(joined) => merged = joined,
                        None => return false,
                    }
                }
                None => {
                    self.insert(merged);
                    return true;
                }
            }
        }
    }
}

/// The distinct coherent assignments a solution admits.
pub type Partitions = BTreeSet<Partition>;

/// The result of unification.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SolutionSet {
    /// The single failure value; absorbing under join.
    Unsatisfiable,

    /// The set of alternative assignments. Empty means trivially true:
    /// the terms matched without constraining anything.
    Satisfiable(Partitions),
}

impl SolutionSet {
    /// The empty satisfiable solution, the identity of join.
    pub fn empty() -> SolutionSet {
        SolutionSet::Satisfiable(Partitions::new())
    }

    pub fn from_bool(satisfiable: bool) -> SolutionSet {
        if satisfiable {
            SolutionSet::empty()
        } else {
            SolutionSet::Unsatisfiable
        }
    }

    pub fn single(partition: Partition) -> SolutionSet {
        SolutionSet::Satisfiable(Partitions::from([partition]))
    }

    pub fn is_satisfiable(&self) -> bool {
        matches!(self, SolutionSet::Satisfiable(_))
    }

    pub fn partitions(&self) -> Option<&Partitions> {
        match self {
            SolutionSet::Satisfiable(partitions) => Some(partitions),
            SolutionSet::Unsatisfiable => None,
        }
    }

    /// Joins two solutions: unsatisfiable absorbs, empty is the identity,
    /// and otherwise every partition pair is cross-joined, dropping the
    /// pairs whose join fails. The result is unsatisfiable when no pair
    /// survives.
    pub fn join(&self, lattice: &dyn TypeLattice, other: &SolutionSet) -> SolutionSet {
        let (lhs, rhs) = match (self, other) {
            (SolutionSet::Unsatisfiable, _) | (_, SolutionSet::Unsatisfiable) => {
                return SolutionSet::Unsatisfiable;
            }
            (SolutionSet::Satisfiable(lhs), SolutionSet::Satisfiable(rhs)) => (lhs, rhs),
        };
        if rhs.is_empty() {
            return self.clone();
        }
        if lhs.is_empty() {
            return other.clone();
        }
        let mut result = Partitions::new();
        for rp in rhs {
            for lp in lhs {
                if let Some(joined) = lp.join(lattice, rp) {
                    result.insert(joined);
                }
            }
        }
        if result.is_empty() {
            SolutionSet::Unsatisfiable
        } else {
            SolutionSet::Satisfiable(result)
        }
    }

    /// Unions another alternative into this solution: one satisfiable
    /// branch makes the whole satisfiable, and its partitions accumulate.
    /// Used to merge the pairings explored by unordered unification.
    pub fn union_with(&mut self, other: SolutionSet) {
        let incoming = match other {
            SolutionSet::Unsatisfiable => return,
            SolutionSet::Satisfiable(partitions) => partitions,
        };
        match self {
            SolutionSet::Unsatisfiable => *self = SolutionSet::Satisfiable(incoming),
            SolutionSet::Satisfiable(partitions) => partitions.extend(incoming),
        }
    }
}
