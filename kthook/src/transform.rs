//! The module transformation shared by both pass managers.
use ktinstr::modules::{InsertPoint, Module, symbol::FunctionRef};
use log::{debug, warn};

use crate::{
    config::HookConfig,
    error::{HookError, HookResult},
    instrument, locator, resolver,
};

/// What a run did to the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// A call to `hook` was inserted in `target` before `anchor`.
    Instrumented {
        target: FunctionRef,
        hook: FunctionRef,
        anchor: InsertPoint,
    },
    /// The module has no function with the configured name.
    TargetNotFound,
    /// The target has no body, or its first block is empty.
    EmptyFunctionBody { target: FunctionRef },
}

impl HookOutcome {
    /// Whether the module was modified.
    pub fn changed(&self) -> bool {
        matches!(self, HookOutcome::Instrumented { .. })
    }
}

/// Inserts a call to the configured hook on entry of the configured function.
#[derive(Debug, Clone, Copy)]
pub struct HookTransform<'c> {
    config: &'c HookConfig,
}

impl<'c> HookTransform<'c> {
    pub fn new(config: &'c HookConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'c HookConfig {
        self.config
    }

    /// Runs over `module`.
    ///
    /// The module is only modified when the outcome is
    /// [`HookOutcome::Instrumented`]; every other outcome and every error
    /// leave it as it was.
    pub fn run(&self, module: &mut Module) -> HookResult<HookOutcome> {
        let HookConfig {
            hook_name,
            target_name,
            cconv,
        } = self.config;

        if hook_name == target_name {
            return Err(HookError::SelfInstrumentation {
                name: target_name.clone(),
            });
        }

        let Some(target) = locator::locate(module, target_name) else {
            return Ok(HookOutcome::TargetNotFound);
        };
        let has_anchor = module
            .function(target)
            .and_then(instrument::anchor)
            .is_some();
        if !has_anchor {
            debug!("`@{}` has nothing to anchor a call on", target_name);
            return Ok(HookOutcome::EmptyFunctionBody { target });
        }

        let hook = resolver::resolve(module, hook_name, *cconv)?;
        let function = module.function_mut(target).ok_or_else(|| HookError::NullSymbol {
            name: target_name.clone(),
        })?;
        let Some(anchor) = instrument::instrument(function, &hook)? else {
            return Ok(HookOutcome::EmptyFunctionBody { target });
        };

        debug!(
            "inserted a call to `@{}` in `@{}` of module `{}`",
            hook_name, target_name, module.name
        );
        Ok(HookOutcome::Instrumented {
            target,
            hook: hook.function,
            anchor,
        })
    }

    /// Like [`HookTransform::run`], reporting errors as "unchanged".
    pub fn run_or_unchanged(&self, module: &mut Module) -> bool {
        match self.run(module) {
            Ok(outcome) => outcome.changed(),
            Err(err) => {
                warn!("module `{}` left unchanged: {}", module.name, err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktinstr::modules::parser::parse_module;

    #[test]
    fn outcomes() {
        let config = HookConfig::new("beta", "alpha");
        let transform = HookTransform::new(&config);

        let mut absent = parse_module("m", "declare void @gamma()").unwrap();
        assert_eq!(transform.run(&mut absent).unwrap(), HookOutcome::TargetNotFound);

        let mut declared = parse_module("m", "declare void @alpha()").unwrap();
        let before = declared.clone();
        let outcome = transform.run(&mut declared).unwrap();
        assert!(matches!(outcome, HookOutcome::EmptyFunctionBody { .. }));
        assert!(!outcome.changed());
        assert_eq!(declared, before);
    }

    #[test]
    fn self_instrumentation_is_refused() {
        let config = HookConfig {
            hook_name: "alpha".to_string(),
            ..HookConfig::new("", "alpha")
        };
        let mut module = parse_module("m", "define void @alpha() {\nentry:\n ret void\n}").unwrap();

        assert!(
            HookTransform::new(&config)
                .run(&mut module)
                .unwrap_err()
                .is_self_instrumentation()
        );
        assert!(!HookTransform::new(&config).run_or_unchanged(&mut module));
        assert_eq!(module.functions[0].instruction_count(), 1);
    }
}
