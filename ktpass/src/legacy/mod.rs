//! The legacy pass manager.
//!
//! Passes register themselves statically: [`RegisterPass`] binds a pass to
//! the argument under which it can be requested by name, and
//! [`RegisterStandardPasses`] attaches a callback to an [`ExtensionPoint`] of
//! the standard pipelines assembled by [`PassManagerBuilder`]. Both are
//! collected with `inventory`, so a plugin linked into the host contributes
//! its entries without any explicit call.
use std::fmt;

use ktinstr::modules::Module;
use log::{debug, trace};
use strum::{Display, EnumString};

use crate::{
    analysis::{ModuleAnalysisManager, PreservedAnalyses},
    passes::{VerifierLog, VerifierPass},
};

/// A transformation over a whole module.
pub trait ModulePass {
    /// Human readable name.
    fn pass_name(&self) -> &str;

    /// Runs the pass. Returns `true` if the module was modified.
    fn run_on_module(&mut self, module: &mut Module) -> bool;
}

/// Static registration of a legacy pass under its command-line argument.
pub struct RegisterPass {
    /// Name used to request the pass, e.g. `-legacy-kthook`.
    pub argument: &'static str,
    pub name: &'static str,
    /// The pass only looks at the CFG without modifying it.
    pub cfg_only: bool,
    pub is_analysis: bool,
    pub constructor: fn() -> Box<dyn ModulePass>,
}

inventory::collect!(RegisterPass);

impl fmt::Debug for RegisterPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterPass")
            .field("argument", &self.argument)
            .field("name", &self.name)
            .field("cfg_only", &self.cfg_only)
            .field("is_analysis", &self.is_analysis)
            .finish()
    }
}

/// Registers a legacy pass under an argument name.
///
/// The pass type must implement [`Default`] and [`ModulePass`].
#[macro_export]
macro_rules! register_legacy_pass {
    (
        $pass:ty, $argument:expr, $name:expr, $cfg_only:expr, $is_analysis:expr
    ) => {
        $crate::inventory::submit! {
            $crate::legacy::RegisterPass {
                argument: $argument,
                name: $name,
                cfg_only: $cfg_only,
                is_analysis: $is_analysis,
                constructor: || -> Box<dyn $crate::legacy::ModulePass> {
                    Box::new(<$pass as Default>::default())
                },
            }
        }
    };
}

/// Every pass registered with [`register_legacy_pass!`].
pub fn registered_passes() -> impl Iterator<Item = &'static RegisterPass> {
    inventory::iter::<RegisterPass>.into_iter()
}

/// Instantiates the pass registered under `argument`.
pub fn create_pass(argument: &str) -> Option<Box<dyn ModulePass>> {
    registered_passes()
        .find(|entry| entry.argument == argument)
        .map(|entry| (entry.constructor)())
}

/// Points of the standard pipelines where extensions can add passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum ExtensionPoint {
    /// Before any other transformation.
    EarlyAsPossible,
    /// Start of the module optimizations.
    ModuleOptimizerEarly,
    /// After every other optimization of the per-module pipeline.
    OptimizerLast,
    /// The only extension point honoured at `-O0`.
    EnabledOnOptLevel0,
    /// Start of the full link-time optimization pipeline.
    FullLinkTimeOptimizationEarly,
    /// End of the full link-time optimization pipeline.
    FullLinkTimeOptimizationLast,
}

/// Callback attaching passes at an extension point.
pub type ExtensionFn = fn(&PassManagerBuilder, &mut PassManager);

/// Static registration of an extension.
pub struct RegisterStandardPasses {
    pub extension_point: ExtensionPoint,
    pub callback: ExtensionFn,
}

inventory::collect!(RegisterStandardPasses);

/// Registers a callback at an extension point of the standard pipelines.
#[macro_export]
macro_rules! register_standard_passes {
    (
        $point:ident, $callback:expr
    ) => {
        $crate::inventory::submit! {
            $crate::legacy::RegisterStandardPasses {
                extension_point: $crate::legacy::ExtensionPoint::$point,
                callback: $callback,
            }
        }
    };
}

/// Sequence of passes run in order over a module.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn ModulePass>>,
    analyses: ModuleAnalysisManager,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pass: Box<dyn ModulePass>) {
        trace!("adding legacy pass `{}`", pass.pass_name());
        self.passes.push(pass);
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.pass_name()).collect()
    }

    pub fn analyses(&self) -> &ModuleAnalysisManager {
        &self.analyses
    }

    pub fn analyses_mut(&mut self) -> &mut ModuleAnalysisManager {
        &mut self.analyses
    }

    /// Runs every pass over `module`. Returns `true` if any of them changed it.
    ///
    /// Cached analyses are dropped after each pass that reports a change.
    pub fn run(&mut self, module: &mut Module) -> bool {
        let mut changed = false;
        for pass in &mut self.passes {
            let modified = pass.run_on_module(module);
            debug!(
                "legacy pass `{}` on module `{}`: {}",
                pass.pass_name(),
                module.name,
                if modified { "changed" } else { "unchanged" }
            );
            if modified {
                self.analyses.invalidate(&PreservedAnalyses::none());
            }
            changed |= modified;
        }
        changed
    }
}

/// Assembles the standard pipelines and lets registered extensions hook into them.
#[derive(Debug, Clone, Default)]
pub struct PassManagerBuilder {
    /// 0 to 3.
    pub opt_level: u32,
    /// 0 to 2, `-Os` and `-Oz`.
    pub size_level: u32,
    /// Verify the module before the link-time pipeline.
    pub verify_input: bool,
    /// Verify the module after the link-time pipeline.
    pub verify_output: bool,
    pub verifier_log: VerifierLog,
}

impl PassManagerBuilder {
    pub fn new(opt_level: u32) -> Self {
        Self {
            opt_level,
            ..Default::default()
        }
    }

    fn add_extensions(&self, point: ExtensionPoint, pm: &mut PassManager) {
        for ext in inventory::iter::<RegisterStandardPasses> {
            if ext.extension_point == point {
                trace!("running extensions registered at {}", point);
                (ext.callback)(self, pm);
            }
        }
    }

    /// Per-module optimization pipeline.
    pub fn populate_module_pass_manager(&self, pm: &mut PassManager) {
        self.add_extensions(ExtensionPoint::EarlyAsPossible, pm);

        if self.opt_level == 0 {
            self.add_extensions(ExtensionPoint::EnabledOnOptLevel0, pm);
            return;
        }

        self.add_extensions(ExtensionPoint::ModuleOptimizerEarly, pm);
        self.add_extensions(ExtensionPoint::OptimizerLast, pm);
    }

    /// Full link-time optimization pipeline.
    pub fn populate_lto_pass_manager(&self, pm: &mut PassManager) {
        if self.verify_input {
            pm.add(Box::new(VerifierPass::new(self.verifier_log.clone())));
        }

        self.add_extensions(ExtensionPoint::FullLinkTimeOptimizationEarly, pm);
        self.add_extensions(ExtensionPoint::FullLinkTimeOptimizationLast, pm);

        if self.verify_output {
            pm.add(Box::new(VerifierPass::new(self.verifier_log.clone())));
        }
    }
}
