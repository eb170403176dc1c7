//! Binding to the new pass manager.
use ktinstr::modules::Module;
use ktpass::{
    analysis::{ModuleAnalysisManager, PreservedAnalyses},
    magic::PLUGIN_API_VERSION,
    modern::{ModulePass, PassBuilder},
    plugin::PassPluginLibraryInfo,
};

use crate::{
    config::HookConfig,
    magic::{HOST_REQUIREMENT, PIPELINE_NAME, PLUGIN_NAME},
    transform::HookTransform,
};

/// Pass running the hook transformation, named [`PIPELINE_NAME`] in pipelines.
///
/// Without an explicit configuration, the process-wide one is used.
#[derive(Debug, Clone, Default)]
pub struct HookPass {
    config: Option<HookConfig>,
}

impl HookPass {
    pub fn new(config: HookConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    fn config(&self) -> &HookConfig {
        self.config.as_ref().unwrap_or_else(|| HookConfig::global())
    }
}

impl ModulePass for HookPass {
    fn name(&self) -> &str {
        PIPELINE_NAME
    }

    fn run(&mut self, module: &mut Module, _: &mut ModuleAnalysisManager) -> PreservedAnalyses {
        if HookTransform::new(self.config()).run_or_unchanged(module) {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::all()
        }
    }
}

/// Adds the pass at the end of the per-module and full link-time
/// optimization pipelines, and makes it available as [`PIPELINE_NAME`].
pub fn register_pass_builder_callbacks(pb: &mut PassBuilder) {
    pb.register_optimizer_last_ep_callback(|mpm, _| mpm.add_pass(HookPass::default()));
    pb.register_full_lto_last_ep_callback(|mpm, _| mpm.add_pass(HookPass::default()));
    pb.register_pipeline_parsing_callback(|name, mpm, inner| {
        if name == PIPELINE_NAME && inner.is_empty() {
            mpm.add_pass(HookPass::default());
            return true;
        }
        false
    });
}

pub fn plugin_info() -> PassPluginLibraryInfo {
    PassPluginLibraryInfo {
        api_version: PLUGIN_API_VERSION,
        plugin_name: PLUGIN_NAME,
        plugin_version: env!("CARGO_PKG_VERSION"),
        host_requirement: HOST_REQUIREMENT,
        register_pass_builder_callbacks,
    }
}
