/// Name of the symbol every pass plugin exports (see [`crate::define_pass_plugin`]).
pub const PLUGIN_INFO_FN_NAME: &str = "ktpGetPassPluginInfo";

/// Version of the plugin ABI. Bumped whenever [`crate::plugin::PassPluginLibraryInfo`]
/// or the callback signatures of [`crate::modern::PassBuilder`] change.
pub const PLUGIN_API_VERSION: u32 = 1;

/// Version of this host, matched against the requirement declared by plugins.
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pipeline names of the passes built into the host.
pub const VERIFY_PASS_NAME: &str = "verify";
pub const NO_OP_MODULE_PASS_NAME: &str = "no-op-module";

/// Transparent wrapper accepted around a module pipeline, as in `module(a,b)`.
pub const MODULE_PIPELINE_NAME: &str = "module";
