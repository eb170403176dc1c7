//! Passes built into the host, usable from both pass-manager generations.
use std::sync::Arc;

use ktinstr::{modules::Module, utils::Error};
use log::{debug, error};
use parking_lot::Mutex;

use crate::{
    analysis::{ModuleAnalysisManager, PreservedAnalyses},
    legacy, modern,
    magic::{NO_OP_MODULE_PASS_NAME, VERIFY_PASS_NAME},
    utils::error::{PassError, PassResult},
};

/// Shared record of verification failures.
///
/// Passes cannot fail, so the verifier appends what it finds here; the
/// embedder inspects the log once the pipeline has run. Clones share the same
/// storage.
#[derive(Debug, Clone, Default)]
pub struct VerifierLog {
    failures: Arc<Mutex<Vec<(String, Error)>>>,
}

impl VerifierLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures recorded so far, as `(module name, error)` pairs.
    pub fn failures(&self) -> Vec<(String, Error)> {
        self.failures.lock().clone()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.lock().is_empty()
    }

    /// Fails with the first recorded failure, if any.
    pub fn check(&self) -> PassResult<()> {
        match self.failures.lock().first() {
            Some((_, err)) => Err(PassError::Verification(err.clone())),
            None => Ok(()),
        }
    }

    fn record(&self, module: &Module, err: Error) {
        error!("module `{}` failed verification: {}", module.name, err);
        self.failures.lock().push((module.name.clone(), err));
    }
}

/// Checks the structural well-formedness of the module. Never modifies it.
#[derive(Debug, Clone, Default)]
pub struct VerifierPass {
    log: VerifierLog,
}

impl VerifierPass {
    pub fn new(log: VerifierLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &VerifierLog {
        &self.log
    }

    fn verify(&self, module: &Module) {
        match module.verify() {
            Ok(()) => debug!("module `{}` verified", module.name),
            Err(err) => self.log.record(module, err),
        }
    }
}

impl legacy::ModulePass for VerifierPass {
    fn pass_name(&self) -> &str {
        "Module Verifier"
    }

    fn run_on_module(&mut self, module: &mut Module) -> bool {
        self.verify(module);
        false
    }
}

impl modern::ModulePass for VerifierPass {
    fn name(&self) -> &str {
        VERIFY_PASS_NAME
    }

    fn run(&mut self, module: &mut Module, _: &mut ModuleAnalysisManager) -> PreservedAnalyses {
        self.verify(module);
        PreservedAnalyses::all()
    }
}

/// Does nothing. Handy to check pipeline plumbing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpModulePass;

impl legacy::ModulePass for NoOpModulePass {
    fn pass_name(&self) -> &str {
        "No-op Module Pass"
    }

    fn run_on_module(&mut self, _: &mut Module) -> bool {
        false
    }
}

impl modern::ModulePass for NoOpModulePass {
    fn name(&self) -> &str {
        NO_OP_MODULE_PASS_NAME
    }

    fn run(&mut self, _: &mut Module, _: &mut ModuleAnalysisManager) -> PreservedAnalyses {
        PreservedAnalyses::all()
    }
}

crate::register_legacy_pass!(VerifierPass, VERIFY_PASS_NAME, "Module Verifier", false, true);
crate::register_legacy_pass!(NoOpModulePass, NO_OP_MODULE_PASS_NAME, "No-op Module Pass", true, false);

#[cfg(test)]
mod tests {
    use super::*;
    use ktinstr::modules::{BasicBlock, Function, operand::Label};
    use ktinstr::types::FunctionType;

    fn broken_module() -> Module {
        let mut module = Module::new("broken");
        let mut function = Function::declaration("f", &FunctionType::void());
        function.body.push(BasicBlock::new(Label::NIL));
        module.add_function(function).unwrap();
        module
    }

    #[test]
    fn verifier_records_failures_in_shared_log() {
        let log = VerifierLog::new();
        let mut pass = VerifierPass::new(log.clone());
        let mut module = broken_module();

        assert!(!legacy::ModulePass::run_on_module(&mut pass, &mut module));
        assert!(!log.is_clean());
        assert_eq!(log.failures()[0].0, "broken");
        assert!(matches!(log.check(), Err(PassError::Verification(err)) if err.is_missing_terminator()));
    }

    #[test]
    fn verifier_accepts_well_formed_modules() {
        let log = VerifierLog::new();
        let mut pass = VerifierPass::new(log.clone());
        let mut module = Module::new("empty");
        let mut mam = ModuleAnalysisManager::new();

        let pa = modern::ModulePass::run(&mut pass, &mut module, &mut mam);
        assert!(pa.are_all_preserved());
        assert!(log.check().is_ok());
    }
}
