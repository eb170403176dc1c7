//! Binding to the legacy pass manager.
//!
//! The pass is registered under [`LEGACY_PASS_ARGUMENT`] and added
//! automatically at the end of the per-module optimizations (or in the `-O0`
//! pipeline, which has no optimizations) and at the end of the full link-time
//! optimizations.
use ktinstr::modules::Module;
use ktpass::legacy::ModulePass;

use crate::{
    config::HookConfig,
    magic::{LEGACY_PASS_ARGUMENT, PASS_DESCRIPTION},
    transform::HookTransform,
};

/// Legacy pass running the hook transformation.
///
/// Without an explicit configuration, the process-wide one is used.
#[derive(Debug, Clone, Default)]
pub struct LegacyHookPass {
    config: Option<HookConfig>,
}

impl LegacyHookPass {
    pub fn new(config: HookConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    pub fn argument(&self) -> &'static str {
        LEGACY_PASS_ARGUMENT
    }

    fn config(&self) -> &HookConfig {
        self.config.as_ref().unwrap_or_else(|| HookConfig::global())
    }
}

impl ModulePass for LegacyHookPass {
    fn pass_name(&self) -> &str {
        PASS_DESCRIPTION
    }

    fn run_on_module(&mut self, module: &mut Module) -> bool {
        HookTransform::new(self.config()).run_or_unchanged(module)
    }
}

ktpass::register_legacy_pass!(LegacyHookPass, LEGACY_PASS_ARGUMENT, PASS_DESCRIPTION, false, false);

ktpass::register_standard_passes!(OptimizerLast, |_, pm| {
    pm.add(Box::new(LegacyHookPass::default()))
});

ktpass::register_standard_passes!(FullLinkTimeOptimizationLast, |_, pm| {
    pm.add(Box::new(LegacyHookPass::default()))
});

ktpass::register_standard_passes!(EnabledOnOptLevel0, |_, pm| {
    pm.add(Box::new(LegacyHookPass::default()))
});
