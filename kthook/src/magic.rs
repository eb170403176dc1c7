/// Hook called when `--template-hook` is not given.
pub const DEFAULT_HOOK_NAME: &str = "kernel_tools_hook_test";

/// Function instrumented when `--template-function` is not given.
pub const DEFAULT_TARGET_NAME: &str = "__x64_sys_newuname";

/// Whitespace separated options read by [`crate::config::HookConfig::global`],
/// e.g. `--template-hook=my_hook --template-function=my_function`.
pub const ENV_OPTIONS: &str = "KTHOOK_OPTIONS";

/// Path of a TOML configuration file, used when [`ENV_OPTIONS`] is not set.
pub const ENV_CONFIG_PATH: &str = "KTHOOK_CONFIG";

/// Name of the pass in textual pipelines of the new pass manager.
pub const PIPELINE_NAME: &str = "kthook";

/// Argument of the pass in the legacy pass manager.
pub const LEGACY_PASS_ARGUMENT: &str = "legacy-kthook";

pub const PASS_DESCRIPTION: &str = "Kernel Tools Hook Pass";

pub const PLUGIN_NAME: &str = "kthook";

/// Versions of the pass host this plugin can be loaded into.
pub const HOST_REQUIREMENT: &str = "^0.1";
