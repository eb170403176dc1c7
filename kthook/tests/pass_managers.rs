use ktinstr::modules::{Module, parser::parse_module};
use kthook::{HookConfig, adapters};
use ktpass::{
    analysis::{CallSiteAnalysis, ModuleAnalysisManager},
    legacy::{self, PassManager, PassManagerBuilder},
    modern::{ModulePassManager, OptimizationLevel, PassBuilder},
    plugin::PassPlugin,
    utils::error::PassError,
};

const TARGET_SOURCE: &str = r#"
define i32 @alpha(i32 %x) {
entry:
    %y = mul i32 %x, 2
    ret i32 %y
}

define void @caller() {
entry:
    %r = call i32 @alpha(i32 1)
    ret void
}
"#;

fn setup() {
    // Every test of this binary installs the same configuration; only the
    // first call succeeds.
    let _ = HookConfig::install(HookConfig::new("beta", "alpha"));
    assert_eq!(HookConfig::global(), &HookConfig::new("beta", "alpha"));
}

fn target_module() -> Module {
    parse_module("target", TARGET_SOURCE).expect("failed to parse target module")
}

fn pass_builder() -> PassBuilder {
    let plugin = PassPlugin::from_info(adapters::modern::plugin_info()).unwrap();
    let mut pb = PassBuilder::new();
    plugin.register_pass_builder_callbacks(&mut pb);
    pb
}

fn beta_calls(module: &Module) -> usize {
    let beta = match module.get_function("beta") {
        Some(beta) => beta,
        None => return 0,
    };
    module
        .functions
        .iter()
        .flat_map(|func| func.body.iter())
        .map(|bb| bb.calls_to(beta).count())
        .sum()
}

#[test]
fn both_generations_instrument_identically() {
    setup();

    let mut by_legacy = target_module();
    let mut pm = PassManager::new();
    PassManagerBuilder::new(2).populate_module_pass_manager(&mut pm);
    assert!(pm.pass_names().contains(&"Kernel Tools Hook Pass"));
    assert!(pm.run(&mut by_legacy));

    let mut by_modern = target_module();
    let mut mpm = pass_builder().build_per_module_default_pipeline(OptimizationLevel::O2);
    assert_eq!(mpm.pass_names(), vec!["kthook"]);
    let pa = mpm.run(&mut by_modern, &mut ModuleAnalysisManager::new());
    assert!(!pa.are_all_preserved());

    assert_eq!(beta_calls(&by_legacy), 1);
    assert_eq!(by_legacy.to_string(), by_modern.to_string());
    by_modern.verify().unwrap();
}

#[test]
fn link_time_pipelines_instrument_too() {
    setup();

    let mut by_legacy = target_module();
    let builder = PassManagerBuilder {
        opt_level: 2,
        verify_output: true,
        ..Default::default()
    };
    let mut pm = PassManager::new();
    builder.populate_lto_pass_manager(&mut pm);
    assert!(pm.run(&mut by_legacy));
    assert!(builder.verifier_log.is_clean());

    let mut by_modern = target_module();
    let mut mpm = pass_builder().build_lto_default_pipeline(OptimizationLevel::O3);
    mpm.run(&mut by_modern, &mut ModuleAnalysisManager::new());

    assert_eq!(beta_calls(&by_legacy), 1);
    assert_eq!(beta_calls(&by_modern), 1);
}

#[test]
fn optimization_level_zero_matches_across_generations() {
    setup();

    let mut by_legacy = target_module();
    let mut pm = PassManager::new();
    PassManagerBuilder::new(0).populate_module_pass_manager(&mut pm);
    assert_eq!(pm.pass_names(), vec!["Kernel Tools Hook Pass"]);
    assert!(pm.run(&mut by_legacy));

    let mut by_modern = target_module();
    let mut mpm = pass_builder().build_per_module_default_pipeline(OptimizationLevel::O0);
    assert!(!mpm.run(&mut by_modern, &mut ModuleAnalysisManager::new()).are_all_preserved());

    assert_eq!(beta_calls(&by_legacy), 1);
    assert_eq!(beta_calls(&by_modern), 1);
    assert_eq!(by_legacy.to_string(), by_modern.to_string());
    assert!(by_legacy.to_string().contains("call fastcc void @beta()"));
}

#[test]
fn legacy_pipeline_adds_the_hook_once_per_level() {
    setup();

    for opt_level in 0..=3 {
        let mut pm = PassManager::new();
        PassManagerBuilder::new(opt_level).populate_module_pass_manager(&mut pm);
        let hooks = pm
            .pass_names()
            .into_iter()
            .filter(|name| *name == "Kernel Tools Hook Pass")
            .count();
        assert_eq!(hooks, 1, "at -O{}", opt_level);
    }
}

#[test]
fn pass_requested_by_name() {
    setup();

    let mut module = target_module();
    let mut pm = PassManager::new();
    pm.add(legacy::create_pass("legacy-kthook").unwrap());
    assert!(pm.run(&mut module));
    assert_eq!(beta_calls(&module), 1);

    let pb = pass_builder();
    let mut mpm = ModulePassManager::new();
    pb.parse_pass_pipeline(&mut mpm, "module(kthook,verify)").unwrap();
    assert_eq!(mpm.pass_names(), vec!["kthook", "verify"]);

    let mut module = target_module();
    mpm.run(&mut module, &mut ModuleAnalysisManager::new());
    assert_eq!(beta_calls(&module), 1);
    assert!(pb.verifier_log().check().is_ok());

    assert!(matches!(
        pb.parse_pass_pipeline(&mut ModulePassManager::new(), "kthook(verify)"),
        Err(PassError::UnknownPassName(name)) if name == "kthook"
    ));
}

#[test]
fn change_flag_drives_analysis_invalidation() {
    setup();

    let pb = pass_builder();
    let mut mpm = ModulePassManager::new();
    pb.parse_pass_pipeline(&mut mpm, "kthook").unwrap();
    let mut mam = ModuleAnalysisManager::new();

    let mut untouched = parse_module("untouched", "declare void @delta()").unwrap();
    mam.get_result::<CallSiteAnalysis>(&untouched);
    assert!(mpm.run(&mut untouched, &mut mam).are_all_preserved());
    assert!(mam.get_cached_result::<CallSiteAnalysis>().is_some());

    let mut module = target_module();
    mam.clear();
    assert_eq!(mam.get_result::<CallSiteAnalysis>(&module).get("beta"), None);
    assert!(!mpm.run(&mut module, &mut mam).are_all_preserved());
    assert!(mam.get_cached_result::<CallSiteAnalysis>().is_none());
    assert_eq!(mam.get_result::<CallSiteAnalysis>(&module)["beta"], 1);
}

#[test]
fn exported_plugin_entry_point() {
    let info = kthook::ktpGetPassPluginInfo();
    assert_eq!(info.plugin_name, "kthook");
    assert_eq!(info.api_version, ktpass::magic::PLUGIN_API_VERSION);
    assert!(PassPlugin::from_info(info).is_ok());
}

#[test]
fn process_wide_configuration_is_set_once() {
    setup();

    let err = HookConfig::install(HookConfig::new("gamma", "alpha")).unwrap_err();
    assert!(err.is_config_already_installed());
    assert_eq!(HookConfig::global(), &HookConfig::new("beta", "alpha"));
}
