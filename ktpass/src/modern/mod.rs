//! The new pass manager.
//!
//! Passes do not register themselves. A [`PassBuilder`] owns callbacks that
//! plugins install through
//! [`PassPluginLibraryInfo::register_pass_builder_callbacks`](crate::plugin::PassPluginLibraryInfo):
//! extension-point callbacks are invoked while the default pipelines are
//! built, and pipeline-parsing callbacks turn pass names found in a textual
//! pipeline into passes.
use std::sync::Arc;

use ktinstr::modules::Module;
use libloading::Library;
use log::{debug, trace};
use strum::{Display, EnumIter, EnumString};

use crate::{
    analysis::{ModuleAnalysisManager, PreservedAnalyses},
    magic::{MODULE_PIPELINE_NAME, NO_OP_MODULE_PASS_NAME, VERIFY_PASS_NAME},
    passes::{NoOpModulePass, VerifierLog, VerifierPass},
    utils::error::{PassError, PassResult},
};

pub mod pipeline;

pub use pipeline::PipelineElement;

/// A transformation over a whole module.
pub trait ModulePass {
    /// Name of the pass, as used in pipeline descriptions.
    fn name(&self) -> &str;

    /// Runs the pass and reports which analyses are still valid.
    fn run(&mut self, module: &mut Module, mam: &mut ModuleAnalysisManager) -> PreservedAnalyses;
}

/// Sequence of module passes.
#[derive(Default)]
pub struct ModulePassManager {
    passes: Vec<Box<dyn ModulePass>>,
    /// SAFETY: `passes` may run code of these libraries; they must be dropped
    /// after it.
    ///
    /// DO NOT CHANGE THE ORDER OF FIELDS!
    libraries: Vec<Arc<Library>>,
}

impl ModulePassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass<P: ModulePass + 'static>(&mut self, pass: P) {
        trace!("adding pass `{}`", pass.name());
        self.passes.push(Box::new(pass));
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Plugin libraries kept loaded for as long as the passes live.
    pub fn libraries(&self) -> &[Arc<Library>] {
        &self.libraries
    }

    fn retain_libraries(&mut self, libraries: &[Arc<Library>]) {
        for library in libraries {
            if !self.libraries.iter().any(|kept| Arc::ptr_eq(kept, library)) {
                self.libraries.push(library.clone());
            }
        }
    }

    /// Runs every pass in order, invalidating analyses after each of them.
    /// Returns what the whole sequence preserved.
    pub fn run(&mut self, module: &mut Module, mam: &mut ModuleAnalysisManager) -> PreservedAnalyses {
        let mut preserved = PreservedAnalyses::all();
        for pass in &mut self.passes {
            let pa = pass.run(module, mam);
            debug!(
                "pass `{}` on module `{}`: {}",
                pass.name(),
                module.name,
                if pa.are_all_preserved() { "unchanged" } else { "changed" }
            );
            mam.invalidate(&pa);
            preserved.intersect(pa);
        }
        preserved
    }
}

/// Optimization level of the default pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
pub enum OptimizationLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
    Os,
    Oz,
}

impl OptimizationLevel {
    /// 0 to 3.
    pub fn speedup_level(&self) -> u32 {
        match self {
            OptimizationLevel::O0 => 0,
            OptimizationLevel::O1 => 1,
            OptimizationLevel::O2 | OptimizationLevel::Os | OptimizationLevel::Oz => 2,
            OptimizationLevel::O3 => 3,
        }
    }

    /// 0 to 2.
    pub fn size_level(&self) -> u32 {
        match self {
            OptimizationLevel::Os => 1,
            OptimizationLevel::Oz => 2,
            _ => 0,
        }
    }

    pub fn is_optimizing_for_speed(&self) -> bool {
        self.size_level() == 0 && self.speedup_level() > 0
    }
}

/// Callback invoked when a default pipeline reaches an extension point.
pub type ExtensionPointCallback = Box<dyn Fn(&mut ModulePassManager, OptimizationLevel)>;

/// Callback offered every pass name the builder does not know about.
/// Returns `true` when it handled the name.
pub type PipelineParsingCallback = Box<dyn Fn(&str, &mut ModulePassManager, &[PipelineElement]) -> bool>;

/// Builds pass managers from default pipelines or textual descriptions.
#[derive(Default)]
pub struct PassBuilder {
    optimizer_last: Vec<ExtensionPointCallback>,
    full_lto_last: Vec<ExtensionPointCallback>,
    pipeline_parsing: Vec<PipelineParsingCallback>,
    verifier_log: VerifierLog,
    /// SAFETY: the callbacks may point into these libraries; they must be
    /// dropped first.
    ///
    /// DO NOT CHANGE THE ORDER OF FIELDS!
    libraries: Vec<Arc<Library>>,
}

impl PassBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log shared by every `verify` pass this builder creates.
    pub fn verifier_log(&self) -> &VerifierLog {
        &self.verifier_log
    }

    /// Keeps `library` loaded while this builder, or any pass manager it
    /// builds or fills, is alive.
    pub fn retain_library(&mut self, library: Arc<Library>) {
        if !self.libraries.iter().any(|kept| Arc::ptr_eq(kept, &library)) {
            self.libraries.push(library);
        }
    }

    pub fn libraries(&self) -> &[Arc<Library>] {
        &self.libraries
    }

    /// Called at the end of the per-module optimization pipeline.
    pub fn register_optimizer_last_ep_callback(
        &mut self,
        callback: impl Fn(&mut ModulePassManager, OptimizationLevel) + 'static,
    ) {
        self.optimizer_last.push(Box::new(callback));
    }

    /// Called at the end of the full link-time optimization pipeline.
    pub fn register_full_lto_last_ep_callback(
        &mut self,
        callback: impl Fn(&mut ModulePassManager, OptimizationLevel) + 'static,
    ) {
        self.full_lto_last.push(Box::new(callback));
    }

    pub fn register_pipeline_parsing_callback(
        &mut self,
        callback: impl Fn(&str, &mut ModulePassManager, &[PipelineElement]) -> bool + 'static,
    ) {
        self.pipeline_parsing.push(Box::new(callback));
    }

    /// Per-module optimization pipeline for `level`.
    ///
    /// The optimizer-last callbacks run at every level, `O0` included.
    pub fn build_per_module_default_pipeline(&self, level: OptimizationLevel) -> ModulePassManager {
        let mut mpm = ModulePassManager::new();
        mpm.retain_libraries(&self.libraries);
        for callback in &self.optimizer_last {
            callback(&mut mpm, level);
        }
        mpm
    }

    /// Full link-time optimization pipeline for `level`.
    pub fn build_lto_default_pipeline(&self, level: OptimizationLevel) -> ModulePassManager {
        let mut mpm = ModulePassManager::new();
        mpm.retain_libraries(&self.libraries);
        for callback in &self.full_lto_last {
            callback(&mut mpm, level);
        }
        mpm
    }

    /// Appends the passes described by `text` to `mpm`.
    ///
    /// `mpm` is left untouched when the description is invalid.
    pub fn parse_pass_pipeline(&self, mpm: &mut ModulePassManager, text: &str) -> PassResult<()> {
        let elements = pipeline::parse_pipeline(text)?;
        let mut parsed = ModulePassManager::new();
        for element in &elements {
            self.parse_module_pass(&mut parsed, element)?;
        }

        mpm.retain_libraries(&self.libraries);
        mpm.passes.append(&mut parsed.passes);
        Ok(())
    }

    fn parse_module_pass(&self, mpm: &mut ModulePassManager, element: &PipelineElement) -> PassResult<()> {
        let reject_nested = || {
            if element.inner.is_empty() {
                Ok(())
            } else {
                Err(PassError::UnexpectedNestedPipeline {
                    name: element.name.clone(),
                })
            }
        };

        match element.name.as_str() {
            MODULE_PIPELINE_NAME => {
                for inner in &element.inner {
                    self.parse_module_pass(mpm, inner)?;
                }
                Ok(())
            }
            VERIFY_PASS_NAME => {
                reject_nested()?;
                mpm.add_pass(VerifierPass::new(self.verifier_log.clone()));
                Ok(())
            }
            NO_OP_MODULE_PASS_NAME => {
                reject_nested()?;
                mpm.add_pass(NoOpModulePass);
                Ok(())
            }
            name => {
                if self
                    .pipeline_parsing
                    .iter()
                    .any(|callback| callback(name, mpm, element.inner.as_slice()))
                {
                    Ok(())
                } else {
                    Err(PassError::UnknownPassName(name.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;

    struct Rename(&'static str);

    impl ModulePass for Rename {
        fn name(&self) -> &str {
            "rename"
        }

        fn run(&mut self, module: &mut Module, _: &mut ModuleAnalysisManager) -> PreservedAnalyses {
            module.name = self.0.to_string();
            PreservedAnalyses::none()
        }
    }

    #[test]
    fn builtin_and_registered_names() {
        let mut pb = PassBuilder::new();
        pb.register_pipeline_parsing_callback(|name, mpm, _| {
            if name == "rename" {
                mpm.add_pass(Rename("renamed"));
                return true;
            }
            false
        });

        let mut mpm = ModulePassManager::new();
        pb.parse_pass_pipeline(&mut mpm, "module(no-op-module,rename,verify)")
            .unwrap();
        assert_eq!(mpm.pass_names(), vec!["no-op-module", "rename", "verify"]);

        let mut module = Module::new("m");
        let mut mam = ModuleAnalysisManager::new();
        let pa = mpm.run(&mut module, &mut mam);
        assert!(!pa.are_all_preserved());
        assert_eq!(module.name, "renamed");
        assert!(pb.verifier_log().is_clean());
    }

    #[test]
    fn invalid_pipelines_leave_the_manager_untouched() {
        let pb = PassBuilder::new();
        let mut mpm = ModulePassManager::new();

        assert!(matches!(
            pb.parse_pass_pipeline(&mut mpm, "verify,unknown"),
            Err(PassError::UnknownPassName(name)) if name == "unknown"
        ));
        assert!(matches!(
            pb.parse_pass_pipeline(&mut mpm, "verify(no-op-module)"),
            Err(PassError::UnexpectedNestedPipeline { .. })
        ));
        assert!(mpm.is_empty());
    }

    #[test]
    fn extension_points_see_the_level() {
        let seen = Rc::new(Cell::new(None));
        let mut pb = PassBuilder::new();
        let recorded = seen.clone();
        pb.register_optimizer_last_ep_callback(move |mpm, level| {
            recorded.set(Some(level));
            mpm.add_pass(NoOpModulePass);
        });

        assert_eq!(pb.build_per_module_default_pipeline(OptimizationLevel::O0).len(), 1);
        assert_eq!(seen.get(), Some(OptimizationLevel::O0));
        assert_eq!(pb.build_per_module_default_pipeline(OptimizationLevel::Oz).len(), 1);
        assert_eq!(seen.get(), Some(OptimizationLevel::Oz));
        assert!(pb.build_lto_default_pipeline(OptimizationLevel::O2).is_empty());
    }
}
