//! Types module
//!
//! The type universe of a module is deliberately small: first-class values are
//! integers, floating-point numbers and opaque pointers. Functions carry a
//! [`FunctionType`] which is what symbol resolution compares when a name is
//! looked up with an expected signature.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::types::primary::{FType, IType};

pub mod primary;

/// A first-class value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// Integer types (eg., `i1`, `i32`, `i64`)
    Int(IType),
    /// Floating-point types (eg., `float`, `double`)
    Float(FType),
    /// Opaque pointer.
    Ptr,
}

impl From<IType> for Type {
    fn from(value: IType) -> Self {
        Type::Int(value)
    }
}

impl From<FType> for Type {
    fn from(value: FType) -> Self {
        Type::Float(value)
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int(ity) => ity.fmt(f),
            Type::Float(fty) => fty.fmt(f),
            Type::Ptr => write!(f, "ptr"),
        }
    }
}

/// The signature of a function: its parameter types and optional return type.
///
/// `ret == None` denotes a `void` function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Option<Type>,
    pub variadic: bool,
}

impl FunctionType {
    /// Builds a function type from its parts.
    pub fn new(ret: Option<Type>, params: impl IntoIterator<Item = Type>, variadic: bool) -> Self {
        Self {
            params: params.into_iter().collect(),
            ret,
            variadic,
        }
    }

    /// `void ()`: no parameters, no return value.
    pub fn void() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for FunctionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.ret {
            Some(ty) => write!(f, "{} (", ty)?,
            None => write!(f, "void (")?,
        }
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        if self.variadic {
            if self.params.is_empty() {
                write!(f, "...")?;
            } else {
                write!(f, ", ...")?;
            }
        }
        write!(f, ")")
    }
}
