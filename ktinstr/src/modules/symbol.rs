//! Handles to the global symbols of a module.
//!
//! Functions and global variables are identified by a UUID that is stable for
//! the lifetime of the module. Handles stay valid across mutations of other
//! symbols, which is what lets a pass resolve a callee once and keep using it
//! while it rewrites a different function.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumDiscriminants;
use uuid::Uuid;

/// A reference to a function (defined or only declared) of a module.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionRef(pub Uuid);

/// A reference to a global variable of a module.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlobalRef(pub Uuid);

/// Anything that owns a name in the module symbol table.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, EnumDiscriminants)]
#[strum_discriminants(name(SymbolKind))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SymbolRef {
    Function(FunctionRef),
    Global(GlobalRef),
}

impl SymbolRef {
    /// Get the UUID of the symbol, regardless of its kind.
    pub fn uuid(&self) -> Uuid {
        match self {
            SymbolRef::Function(FunctionRef(uuid)) => *uuid,
            SymbolRef::Global(GlobalRef(uuid)) => *uuid,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Function => write!(f, "function"),
            SymbolKind::Global => write!(f, "global variable"),
        }
    }
}
