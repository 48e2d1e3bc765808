use serde::{Deserialize, Serialize};
use std::fmt;

/// A type code that uniquely identifies an atom type in the hierarchy.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default,
)]
pub struct TypeCode(u16);

impl TypeCode {
    pub const fn new(id: u16) -> TypeCode {
        TypeCode(id)
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The distinguished codes. TypeHierarchy::new seeds these in this exact
// order, so the constants and the registry always agree.

/// The top of the lattice; every type inherits from it.
pub const ATOM: TypeCode = TypeCode::new(0);
pub const NODE: TypeCode = TypeCode::new(1);
pub const LINK: TypeCode = TypeCode::new(2);
/// The sort of bindable variables. Checked by exact code, not by `is_a`.
pub const VARIABLE: TypeCode = TypeCode::new(3);
/// A node whose payload names a type; used inside typed declarations.
pub const TYPE: TypeCode = TypeCode::new(4);
pub const CONCEPT: TypeCode = TypeCode::new(5);
pub const NUMBER: TypeCode = TypeCode::new(6);
pub const PREDICATE: TypeCode = TypeCode::new(7);
pub const VARIABLE_LIST: TypeCode = TypeCode::new(8);
pub const TYPED_VARIABLE: TypeCode = TypeCode::new(9);
pub const QUOTE: TypeCode = TypeCode::new(10);
pub const UNQUOTE: TypeCode = TypeCode::new(11);
pub const LOCAL_QUOTE: TypeCode = TypeCode::new(12);
/// Links whose first child declares variables bound in the remaining children.
pub const SCOPE: TypeCode = TypeCode::new(13);
pub const BIND: TypeCode = TypeCode::new(14);
pub const IMPLICATION: TypeCode = TypeCode::new(15);
/// Links whose children carry multiset rather than positional semantics.
pub const UNORDERED: TypeCode = TypeCode::new(16);
pub const AND: TypeCode = TypeCode::new(17);
pub const OR: TypeCode = TypeCode::new(18);
pub const NOT: TypeCode = TypeCode::new(19);
pub const LIST: TypeCode = TypeCode::new(20);
pub const SET: TypeCode = TypeCode::new(21);
pub const INHERITANCE: TypeCode = TypeCode::new(22);

/// Codes at or above this one are allocated by `TypeHierarchy::add_type`.
pub const FIRST_USER_CODE: TypeCode = TypeCode::new(23);
