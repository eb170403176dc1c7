use ktinstr::{
    modules::{Module, parser::parse_module},
    types::FunctionType,
};
use ktpass::{
    analysis::{CallSiteAnalysis, ModuleAnalysisManager, PreservedAnalyses, SymbolAnalysis},
    legacy::{self, PassManager, PassManagerBuilder},
    modern::{self, ModulePassManager, OptimizationLevel, PassBuilder},
    plugin::{PassPlugin, PassPluginLibraryInfo},
};

const SOURCE: &str = r#"
declare void @log()

define void @main() {
entry:
    call void @log()
    ret void
}
"#;

/// Declares `@extra` once; a second run finds it and reports no change.
#[derive(Default)]
struct DeclareExtra;

impl DeclareExtra {
    fn apply(module: &mut Module) -> bool {
        let before = module.functions.len();
        module
            .get_or_insert_function("extra", &FunctionType::void())
            .is_ok_and(|_| module.functions.len() != before)
    }
}

impl legacy::ModulePass for DeclareExtra {
    fn pass_name(&self) -> &str {
        "Declare Extra"
    }

    fn run_on_module(&mut self, module: &mut Module) -> bool {
        Self::apply(module)
    }
}

impl modern::ModulePass for DeclareExtra {
    fn name(&self) -> &str {
        "declare-extra"
    }

    fn run(&mut self, module: &mut Module, _: &mut ModuleAnalysisManager) -> PreservedAnalyses {
        if Self::apply(module) {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::all()
        }
    }
}

ktpass::register_legacy_pass!(DeclareExtra, "declare-extra", "Declare Extra", false, false);
ktpass::register_standard_passes!(OptimizerLast, |_, pm| pm.add(Box::new(DeclareExtra)));

fn register(pb: &mut PassBuilder) {
    pb.register_optimizer_last_ep_callback(|mpm, _| mpm.add_pass(DeclareExtra));
    pb.register_pipeline_parsing_callback(|name, mpm, _| {
        if name == "declare-extra" {
            mpm.add_pass(DeclareExtra);
            return true;
        }
        false
    });
}

fn plugin() -> PassPlugin {
    PassPlugin::from_info(PassPluginLibraryInfo {
        api_version: ktpass::magic::PLUGIN_API_VERSION,
        plugin_name: "declare-extra",
        plugin_version: "0.0.1",
        host_requirement: "*",
        register_pass_builder_callbacks: register,
    })
    .unwrap()
}

#[test]
fn both_generations_reach_the_same_module() {
    let mut by_legacy = parse_module("m", SOURCE).unwrap();
    let mut pm = PassManager::new();
    PassManagerBuilder::new(2).populate_module_pass_manager(&mut pm);
    assert!(pm.run(&mut by_legacy));

    let mut by_modern = parse_module("m", SOURCE).unwrap();
    let mut pb = PassBuilder::new();
    plugin().register_pass_builder_callbacks(&mut pb);
    let mut mpm = pb.build_per_module_default_pipeline(OptimizationLevel::O2);
    let mut mam = ModuleAnalysisManager::new();
    assert!(!mpm.run(&mut by_modern, &mut mam).are_all_preserved());

    assert_eq!(by_legacy.to_string(), by_modern.to_string());
    assert_eq!(by_modern.declaration_count("extra"), 1);
}

#[test]
fn unchanged_runs_keep_cached_analyses() {
    let mut module = parse_module("m", SOURCE).unwrap();
    let mut pb = PassBuilder::new();
    plugin().register_pass_builder_callbacks(&mut pb);
    let mut mpm = ModulePassManager::new();
    pb.parse_pass_pipeline(&mut mpm, "module(declare-extra,verify)").unwrap();

    let mut mam = ModuleAnalysisManager::new();
    assert_eq!(mam.get_result::<CallSiteAnalysis>(&module)["log"], 1);

    mpm.run(&mut module, &mut mam);
    assert!(mam.get_cached_result::<CallSiteAnalysis>().is_none());
    assert_eq!(mam.get_result::<SymbolAnalysis>(&module).declarations, 2);

    mpm.run(&mut module, &mut mam);
    assert!(mam.get_cached_result::<SymbolAnalysis>().is_some());
    assert!(pb.verifier_log().check().is_ok());
}

#[test]
fn legacy_passes_are_requested_by_argument() {
    let mut module = parse_module("m", SOURCE).unwrap();
    let mut pm = PassManager::new();
    pm.add(legacy::create_pass("declare-extra").unwrap());
    pm.add(legacy::create_pass("verify").unwrap());

    assert_eq!(pm.pass_names(), vec!["Declare Extra", "Module Verifier"]);
    assert!(pm.run(&mut module));
    assert!(!pm.run(&mut module));
}
