//! Module analyses and their invalidation.
//!
//! Both pass-manager generations cache analysis results between passes. A pass
//! reports what it kept intact through [`PreservedAnalyses`] (the new manager)
//! or through its boolean change flag (the legacy manager, where `true` maps to
//! [`PreservedAnalyses::none`]); the [`ModuleAnalysisManager`] drops every
//! cached result that was not preserved.
use std::{
    any::{Any, TypeId},
    collections::{BTreeMap, HashMap},
};

use bitflags::bitflags;
use ktinstr::modules::{
    Module,
    instructions::KtInstr,
    operand::Operand,
};
use log::trace;

bitflags! {
    /// Families of analyses a pass can declare as preserved.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AnalysisSet: u32 {
        /// Call-site information ([`CallSiteAnalysis`]).
        const CALL_SITES = 1 << 0;
        /// Symbol table summaries ([`SymbolAnalysis`]).
        const SYMBOLS = 1 << 1;
        /// Control-flow graph shape.
        const CFG = 1 << 2;
    }
}

/// The set of analyses a pass left valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreservedAnalyses {
    preserved: AnalysisSet,
}

impl PreservedAnalyses {
    /// Nothing changed.
    pub fn all() -> Self {
        Self {
            preserved: AnalysisSet::all(),
        }
    }

    /// The module may have changed arbitrarily.
    pub fn none() -> Self {
        Self {
            preserved: AnalysisSet::empty(),
        }
    }

    pub fn preserve(mut self, set: AnalysisSet) -> Self {
        self.preserved |= set;
        self
    }

    pub fn are_all_preserved(&self) -> bool {
        self.preserved == AnalysisSet::all()
    }

    pub fn preserves(&self, set: AnalysisSet) -> bool {
        self.preserved.contains(set)
    }

    /// Keep only what both `self` and `other` preserve.
    pub fn intersect(&mut self, other: PreservedAnalyses) {
        self.preserved &= other.preserved;
    }
}

/// A module-level analysis whose result can be cached.
pub trait ModuleAnalysis: 'static {
    type Result: 'static;

    /// Family this analysis belongs to.
    const KIND: AnalysisSet;

    fn run(module: &Module) -> Self::Result;
}

/// Counts direct call sites per callee name.
pub struct CallSiteAnalysis;

impl ModuleAnalysis for CallSiteAnalysis {
    type Result = BTreeMap<String, usize>;
    const KIND: AnalysisSet = AnalysisSet::CALL_SITES;

    fn run(module: &Module) -> Self::Result {
        let mut counts = BTreeMap::new();
        let calls = module
            .functions
            .iter()
            .flat_map(|func| func.body.iter())
            .flat_map(|bb| bb.instructions.iter())
            .filter_map(|instr| match instr {
                KtInstr::Invoke(call) => Some(call),
                _ => None,
            });

        for call in calls {
            if let Operand::Func(fref) = &call.function {
                if let Some(callee) = module.function(*fref) {
                    *counts.entry(callee.name.clone()).or_insert(0) += 1;
                }
            }
        }
        counts
    }
}

/// Summary of the symbol table of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymbolSummary {
    pub definitions: usize,
    pub declarations: usize,
    pub globals: usize,
}

pub struct SymbolAnalysis;

impl ModuleAnalysis for SymbolAnalysis {
    type Result = SymbolSummary;
    const KIND: AnalysisSet = AnalysisSet::SYMBOLS;

    fn run(module: &Module) -> Self::Result {
        let declarations = module.functions.iter().filter(|f| f.is_declaration()).count();
        SymbolSummary {
            definitions: module.functions.len() - declarations,
            declarations,
            globals: module.globals.len(),
        }
    }
}

struct CachedResult {
    kind: AnalysisSet,
    result: Box<dyn Any + Send>,
}

/// Cache of module analysis results.
#[derive(Default)]
pub struct ModuleAnalysisManager {
    cache: HashMap<TypeId, CachedResult>,
    computations: usize,
}

impl ModuleAnalysisManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result of `A`, computing it first if needed.
    pub fn get_result<A: ModuleAnalysis>(&mut self, module: &Module) -> &A::Result
    where
        A::Result: Send,
    {
        let entry = self.cache.entry(TypeId::of::<A>()).or_insert_with(|| {
            trace!("computing analysis `{}`", std::any::type_name::<A>());
            self.computations += 1;
            CachedResult {
                kind: A::KIND,
                result: Box::new(A::run(module)),
            }
        });

        entry
            .result
            .downcast_ref::<A::Result>()
            .expect("analysis cache is keyed by the analysis type")
    }

    /// Returns the cached result of `A` without computing it.
    pub fn get_cached_result<A: ModuleAnalysis>(&self) -> Option<&A::Result> {
        self.cache
            .get(&TypeId::of::<A>())
            .and_then(|cached| cached.result.downcast_ref::<A::Result>())
    }

    /// Drops every result whose family is not preserved.
    pub fn invalidate(&mut self, preserved: &PreservedAnalyses) {
        if preserved.are_all_preserved() {
            return;
        }
        self.cache.retain(|_, cached| preserved.preserves(cached.kind));
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Number of analysis runs since creation.
    pub fn computations(&self) -> usize {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktinstr::modules::parser::parse_module;

    const SOURCE: &str = r#"
        declare void @log()
        define void @f() {
        entry:
          call void @log()
          call void @log()
          ret void
        }
    "#;

    #[test]
    fn results_are_cached_until_invalidated() {
        let module = parse_module("m", SOURCE).unwrap();
        let mut mam = ModuleAnalysisManager::new();

        assert_eq!(mam.get_result::<CallSiteAnalysis>(&module)["log"], 2);
        assert_eq!(mam.get_result::<SymbolAnalysis>(&module).declarations, 1);
        assert_eq!(mam.computations(), 2);

        mam.invalidate(&PreservedAnalyses::all());
        mam.get_result::<CallSiteAnalysis>(&module);
        assert_eq!(mam.computations(), 2);

        mam.invalidate(&PreservedAnalyses::none().preserve(AnalysisSet::SYMBOLS));
        assert!(mam.get_cached_result::<CallSiteAnalysis>().is_none());
        assert!(mam.get_cached_result::<SymbolAnalysis>().is_some());
    }
}
