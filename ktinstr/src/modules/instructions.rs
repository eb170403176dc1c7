//! Instruction definitions.
//!
//! Each instruction is a small structure with public fields, wrapped by the
//! [`KtInstr`] tagged union so that basic blocks can store heterogeneous
//! instruction streams.
use auto_enums::auto_enum;
use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{EnumDiscriminants, EnumIs, EnumTryAs};

use crate::{
    modules::{
        CallingConvention,
        operand::{Name, Operand},
    },
    types::{Type, primary::IType},
};

bitflags! {
    /// Flags providing additional information about instructions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InstructionFlags: u32 {
        /// A "simple" instruction has no side-effect and can be duplicated or
        /// removed when its result is unused.
        const SIMPLE = 1 << 0;

        /// Integer arithmetic and integer comparisons.
        const ARITHMETIC = 1 << 1;

        /// The instruction *potentially* reads or writes memory. This regroups
        /// loads, stores and calls.
        const MEMORY = 1 << 2;

        /// The instruction may have effects that are invisible to the module
        /// (calls to opaque callees, volatile accesses). It can never be removed.
        const SIDE_EFFECT = 1 << 3;
    }
}

/// Common interface implemented by every instruction node.
pub trait Instruction {
    fn flags(&self) -> InstructionFlags;

    /// Iterate over all input operands for this instruction.
    fn operands(&self) -> impl Iterator<Item = &Operand>;

    /// Mutably iterate over all input operands for this instruction.
    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand>;

    /// Return the destination SSA name if the instruction produces a result.
    fn destination(&self) -> Option<Name>;

    /// Type of the produced value, if any.
    fn destination_type(&self) -> Option<Type>;

    /// Convenience iterator over referenced SSA names.
    fn name_dependencies(&self) -> impl Iterator<Item = Name> {
        self.operands().filter_map(|op| match op {
            Operand::Reg(reg) => Some(*reg),
            _ => None,
        })
    }

    /// Whether the instruction can be dropped when its result is unused.
    #[inline]
    fn is_removable(&self) -> bool {
        !self.flags().contains(InstructionFlags::SIDE_EFFECT)
            && self.flags().contains(InstructionFlags::SIMPLE)
    }
}

/// Integer binary operators.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IBinOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
}

/// Integer binary operation: `%dest = <op> <ty> <lhs>, <rhs>`
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IBinary {
    pub dest: Name,
    pub op: IBinOp,
    pub ty: IType,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Instruction for IBinary {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::SIMPLE | InstructionFlags::ARITHMETIC
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.lhs, &self.rhs].into_iter()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        [&mut self.lhs, &mut self.rhs].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self) -> Option<Type> {
        Some(self.ty.into())
    }
}

/// Integer comparison predicates.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ICmpPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

/// Integer comparison producing an `i1`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ICmp {
    pub dest: Name,
    pub predicate: ICmpPredicate,
    pub ty: IType,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Instruction for ICmp {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::SIMPLE | InstructionFlags::ARITHMETIC
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.lhs, &self.rhs].into_iter()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        [&mut self.lhs, &mut self.rhs].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self) -> Option<Type> {
        Some(IType::I1.into())
    }
}

/// Stack allocation of one value of type `ty`. Produces a pointer.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MAlloca {
    pub dest: Name,
    pub ty: Type,
}

impl Instruction for MAlloca {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::SIMPLE
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::empty()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::empty()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self) -> Option<Type> {
        Some(Type::Ptr)
    }
}

/// Load a value of type `ty` from `addr`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MLoad {
    pub dest: Name,
    pub ty: Type,
    pub addr: Operand,
    pub volatile: bool,
}

impl Instruction for MLoad {
    fn flags(&self) -> InstructionFlags {
        if self.volatile {
            InstructionFlags::MEMORY | InstructionFlags::SIDE_EFFECT
        } else {
            InstructionFlags::MEMORY
        }
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.addr)
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.addr)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self) -> Option<Type> {
        Some(self.ty)
    }
}

/// Store `value` of type `ty` at `addr`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MStore {
    pub ty: Type,
    pub value: Operand,
    pub addr: Operand,
    pub volatile: bool,
}

impl Instruction for MStore {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::MEMORY | InstructionFlags::SIDE_EFFECT
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.value, &self.addr].into_iter()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        [&mut self.value, &mut self.addr].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        None
    }

    fn destination_type(&self) -> Option<Type> {
        None
    }
}

/// Function call instruction
///
/// `function` is usually an [`Operand::Func`], but any pointer operand is
/// accepted to allow indirect calls. The call carries its own calling
/// convention, which must match the one of the callee.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Invoke {
    pub function: Operand,

    /// The argument operands with their types.
    pub args: SmallVec<[(Type, Operand); 4]>,

    /// The destination SSA name for the return value, if any.
    pub dest: Option<Name>,

    /// The return type of the callee. `None` for `void` functions.
    pub ty: Option<Type>,

    pub cconv: CallingConvention,
}

impl Invoke {
    /// A call to a `void ()` callee: no argument, no result.
    pub fn void_call(function: impl Into<Operand>, cconv: CallingConvention) -> Self {
        Self {
            function: function.into(),
            args: SmallVec::new(),
            dest: None,
            ty: None,
            cconv,
        }
    }
}

impl Instruction for Invoke {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::MEMORY | InstructionFlags::SIDE_EFFECT
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.function).chain(self.args.iter().map(|(_, op)| op))
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.function).chain(self.args.iter_mut().map(|(_, op)| op))
    }

    fn destination(&self) -> Option<Name> {
        self.dest
    }

    fn destination_type(&self) -> Option<Type> {
        self.ty
    }
}

/// Discriminated union covering all instruction kinds.
#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(KtInstrKind))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KtInstr {
    IBinary(IBinary),
    ICmp(ICmp),
    MAlloca(MAlloca),
    MLoad(MLoad),
    MStore(MStore),
    Invoke(Invoke),
}

macro_rules! define_instr_any_instr {
    (
        $($variant:ident),* $(,)?
    ) => {
        impl Instruction for KtInstr {
            fn flags(&self) -> InstructionFlags {
                match self {
                    $(
                        KtInstr::$variant(instr) => instr.flags(),
                    )*
                }
            }

            #[auto_enum(Iterator)]
            fn operands(&self) -> impl Iterator<Item = &Operand> {
                match self {
                    $(
                        KtInstr::$variant(instr) => instr.operands(),
                    )*
                }
            }

            #[auto_enum(Iterator)]
            fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
                match self {
                    $(
                        KtInstr::$variant(instr) => instr.operands_mut(),
                    )*
                }
            }

            fn destination(&self) -> Option<Name> {
                match self {
                    $(
                        KtInstr::$variant(instr) => instr.destination(),
                    )*
                }
            }

            fn destination_type(&self) -> Option<Type> {
                match self {
                    $(
                        KtInstr::$variant(instr) => instr.destination_type(),
                    )*
                }
            }
        }

        $(
            impl From<$variant> for KtInstr {
                fn from(inst: $variant) -> Self {
                    KtInstr::$variant(inst)
                }
            }
        )*
    };
}

define_instr_any_instr!(IBinary, ICmp, MAlloca, MLoad, MStore, Invoke);
