//! Shared operand types for instructions.
//!
//! An instruction operand can be a reference to another SSA value (`Reg`),
//! an immediate integer constant (`Imm`) or a reference to a global symbol
//! (`Func`, `Global`).
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::{
    modules::symbol::{FunctionRef, GlobalRef},
    types::primary::IType,
};

/// SSA value identifier used to name the destination or reference another
/// instruction's result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Name(pub u32);

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Represents a code label used as a target for control-flow terminators.
///
/// Labels never cross function boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Label(pub u32);

impl Label {
    /// Label reserved for the entry block of a function.
    pub const NIL: Label = Label(0);

    /// Returns true if this is the "nil" label (i.e., label 0).
    pub fn is_nil(&self) -> bool {
        self == &Label::NIL
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "label %bb{}", self.0)
        } else {
            write!(f, "%bb{}", self.0)
        }
    }
}

/// Integer immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IConst {
    pub ty: IType,
    pub value: i128,
}

impl From<i32> for IConst {
    fn from(value: i32) -> Self {
        Self {
            ty: IType::I32,
            value: value.into(),
        }
    }
}

impl From<i64> for IConst {
    fn from(value: i64) -> Self {
        Self {
            ty: IType::I64,
            value: value.into(),
        }
    }
}

impl From<bool> for IConst {
    fn from(value: bool) -> Self {
        Self {
            ty: IType::I1,
            value: value.into(),
        }
    }
}

/// Instruction operand.
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operand {
    /// Reference to a previously defined SSA value.
    Reg(Name),
    /// Immediate integer literal.
    Imm(IConst),
    /// Address of a function of the module.
    Func(FunctionRef),
    /// Address of a global variable of the module.
    Global(GlobalRef),
}

impl From<Name> for Operand {
    fn from(value: Name) -> Self {
        Operand::Reg(value)
    }
}

impl From<IConst> for Operand {
    fn from(value: IConst) -> Self {
        Operand::Imm(value)
    }
}

impl From<FunctionRef> for Operand {
    fn from(value: FunctionRef) -> Self {
        Operand::Func(value)
    }
}
