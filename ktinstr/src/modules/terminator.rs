//! Control-flow terminators.
//!
//! Every well-formed basic block ends with exactly one terminator that decides
//! which block executes next, or leaves the function.
use auto_enums::auto_enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    modules::operand::{Label, Operand},
    types::Type,
};

/// Conditional branch instruction
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CBranch {
    /// The condition operand; should evaluate to an `i1`.
    pub cond: Operand,
    pub target_true: Label,
    pub target_false: Label,
}

/// Unconditional jump instruction
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Jump {
    pub target: Label,
}

/// Return from function instruction. Optionally returns a value.
///
/// If `value` is `None`, it indicates a `void` return.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ret {
    pub value: Option<(Type, Operand)>,
}

/// Marks a point that control flow never reaches.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Unreachable;

/// Control flow terminator instructions
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Terminator {
    CBranch(CBranch),
    Jump(Jump),
    Ret(Ret),
    Unreachable(Unreachable),
}

impl Terminator {
    #[auto_enum(Iterator)]
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        match self {
            Terminator::CBranch(cbranch) => std::iter::once(&cbranch.cond),
            Terminator::Jump(_) => std::iter::empty(),
            Terminator::Ret(ret) => ret.value.iter().map(|(_, op)| op),
            Terminator::Unreachable(_) => std::iter::empty(),
        }
    }

    #[auto_enum(Iterator)]
    pub fn targets(&self) -> impl Iterator<Item = Label> + '_ {
        match self {
            Terminator::CBranch(cbranch) => [cbranch.target_true, cbranch.target_false].into_iter(),
            Terminator::Jump(jump) => std::iter::once(jump.target),
            Terminator::Ret(_) => std::iter::empty(),
            Terminator::Unreachable(_) => std::iter::empty(),
        }
    }
}

macro_rules! define_terminator_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Terminator {
            fn from(inst: $typ) -> Self {
                Terminator::$variant(inst)
            }
        }
    };
}

define_terminator_from!(CBranch, CBranch);
define_terminator_from!(Jump, Jump);
define_terminator_from!(Ret, Ret);
define_terminator_from!(Unreachable, Unreachable);
