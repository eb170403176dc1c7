use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::modules::{
    CallingConvention,
    operand::{Label, Name},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// A symbol lookup was performed with an empty name.
    #[error("Symbol names cannot be empty.")]
    EmptySymbolName,

    /// A symbol exists under the requested name but with another type.
    #[error("Symbol `@{name}` already exists with type `{found}`, which is incompatible with `{expected}`.")]
    SymbolTypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    /// Two globals share the same name within one module.
    #[error("Symbol `@{name}` is defined more than once within the module.")]
    DuplicateSymbol { name: String },

    /// A symbol handle does not point into the module.
    #[error("Symbol handle `{handle}` does not refer to a symbol of this module.")]
    DanglingSymbolHandle { handle: String },

    /// An operand refers to a name that has not been defined.
    #[error(
        "Multiple operations with shared destination target violate SSA requirements. The name `{duplicate}` is defined more than once within function `{function}`."
    )]
    DuplicateSSAName { function: String, duplicate: Name },

    /// An operand refers to an unresolved name.
    #[error("A operand of function `{function}` refers to an undefined name: `{undefined}`.")]
    UndefinedSSAName { function: String, undefined: Name },

    /// A block has not been closed by a terminator.
    #[error("Basic block `{block}` of function `{function}` has no terminator.")]
    MissingTerminator { function: String, block: Label },

    /// A basic block with the given label already exists in the function.
    #[error("A basic block with label `{label}` already exists in function `{function}`.")]
    BlockLabelAlreadyExists { function: String, label: Label },

    /// The basic block referenced cannot be found within the function.
    #[error(
        "The basic block `{label}` referenced in function `{function}` is not defined within the function."
    )]
    UndefinedBasicBlock { function: String, label: Label },

    /// A call site refers to a function that is not part of the module.
    #[error("An instruction of function `{function}` calls a function that is not declared within the module.")]
    UndefinedCallee { function: String },

    /// A call site passes a different number of arguments than the callee declares.
    #[error(
        "Call to `@{callee}` in function `{function}` passes {found} arguments, but the callee expects {expected}."
    )]
    CallArityMismatch {
        function: String,
        callee: String,
        expected: usize,
        found: usize,
    },

    /// Caller and callee disagree on the calling convention.
    #[error(
        "Call to `@{callee}` in function `{function}` uses calling convention `{call_site}`, but the callee is declared with `{callee_cconv}`."
    )]
    CallingConventionMismatch {
        function: String,
        callee: String,
        call_site: CallingConvention,
        callee_cconv: CallingConvention,
    },

    /// The textual representation could not be parsed.
    #[error("Failed to parse module: {message}")]
    Parse { message: String },

    /// A `%name` used in the textual representation was never defined.
    #[error("Unknown value `%{name}` in function `{function}`.")]
    UnknownValueName { function: String, name: String },

    /// A block label used in the textual representation was never defined.
    #[error("Unknown block `%{name}` in function `{function}`.")]
    UnknownBlockName { function: String, name: String },

    /// A `@symbol` used in the textual representation was never declared.
    #[error("Unknown symbol `@{name}`.")]
    UnknownSymbol { name: String },
}

pub type Result<T> = std::result::Result<T, Error>;
