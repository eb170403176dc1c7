//! Declaration of the hook symbol.
use ktinstr::{
    modules::{CallingConvention, Module, symbol::FunctionRef},
    types::FunctionType,
    utils::Error,
};
use log::debug;

use crate::error::{HookError, HookResult};

/// A hook function available in the module being instrumented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle {
    pub function: FunctionRef,
    pub cconv: CallingConvention,
}

/// Type every hook has: no parameter, no return value.
pub fn hook_type() -> FunctionType {
    FunctionType::void()
}

/// Returns the hook called `name`, declaring it when the module does not
/// know it yet, and gives it the calling convention `cconv`.
///
/// Resolving the same name twice yields the same function. On failure the
/// module is left untouched.
pub fn resolve(module: &mut Module, name: &str, cconv: CallingConvention) -> HookResult<HookHandle> {
    let function = module
        .get_or_insert_function(name, &hook_type())
        .map_err(|err| match err {
            Error::SymbolTypeMismatch { .. } => HookError::SignatureConflict {
                name: name.to_string(),
                source: err,
            },
            Error::EmptySymbolName => HookError::InvalidConfig("hook name is empty".to_string()),
            other => HookError::Ir(other),
        })?;

    let hook = module.function_mut(function).ok_or_else(|| HookError::NullSymbol {
        name: name.to_string(),
    })?;
    if hook.cconv != cconv {
        debug!("hook `@{}` now uses the {} calling convention", name, cconv);
        hook.cconv = cconv;
    }

    Ok(HookHandle { function, cconv })
}
