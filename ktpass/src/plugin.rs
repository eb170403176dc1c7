//! Pass plugins for the new pass manager.
//!
//! A plugin is a dynamic library exporting [`PLUGIN_INFO_FN_NAME`], which
//! returns a [`PassPluginLibraryInfo`]. The host checks the plugin API version
//! and the host version requirement before handing the plugin a
//! [`PassBuilder`] to register its callbacks into.
use std::{fmt, path::Path, sync::Arc};

use libloading::Library;
use log::info;
use semver::{Version, VersionReq};

use crate::{
    magic::{HOST_VERSION, PLUGIN_API_VERSION, PLUGIN_INFO_FN_NAME},
    modern::PassBuilder,
    utils::error::{PassError, PassResult},
};

/// Description of a pass plugin.
#[derive(Clone, Copy)]
pub struct PassPluginLibraryInfo {
    /// Must equal [`PLUGIN_API_VERSION`].
    pub api_version: u32,
    pub plugin_name: &'static str,
    pub plugin_version: &'static str,
    /// Semver requirement on the host version, e.g. `^0.1`.
    pub host_requirement: &'static str,
    pub register_pass_builder_callbacks: fn(&mut PassBuilder),
}

impl fmt::Debug for PassPluginLibraryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassPluginLibraryInfo")
            .field("api_version", &self.api_version)
            .field("plugin_name", &self.plugin_name)
            .field("plugin_version", &self.plugin_version)
            .field("host_requirement", &self.host_requirement)
            .finish_non_exhaustive()
    }
}

/// Prototype of the function exported under [`PLUGIN_INFO_FN_NAME`].
pub type PluginInfoFn = unsafe fn() -> PassPluginLibraryInfo;

/// Exports the entry point of a pass plugin.
#[macro_export]
macro_rules! define_pass_plugin {
    (
        $info:expr
    ) => {
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub fn ktpGetPassPluginInfo() -> $crate::plugin::PassPluginLibraryInfo {
            $info
        }
    };
}

/// A plugin accepted by the host.
pub struct PassPlugin {
    info: PassPluginLibraryInfo,
    /// SAFETY: `info` points into the library; it must be dropped first.
    ///
    /// DO NOT CHANGE THE ORDER OF FIELDS!
    _lib: Option<Arc<Library>>,
}

impl PassPlugin {
    /// Loads the plugin library at `path`.
    pub fn load(path: impl AsRef<Path>) -> PassResult<Self> {
        let path = path.as_ref();
        let file = path.display().to_string();

        unsafe {
            let library = Library::new(path).map_err(|e| PassError::PluginLoad {
                source: e,
                file: file.clone(),
            })?;

            let info_fn: libloading::Symbol<PluginInfoFn> = library
                .get(PLUGIN_INFO_FN_NAME.as_bytes())
                .map_err(|e| PassError::PluginLoad { source: e, file })?;
            let info = info_fn();

            let mut plugin = Self::from_info(info)?;
            plugin._lib = Some(Arc::new(library));
            Ok(plugin)
        }
    }

    /// Accepts a plugin that is statically linked into the host.
    pub fn from_info(info: PassPluginLibraryInfo) -> PassResult<Self> {
        if info.api_version != PLUGIN_API_VERSION {
            return Err(PassError::IncompatiblePluginApi {
                name: info.plugin_name.to_string(),
                found: info.api_version,
                expected: PLUGIN_API_VERSION,
            });
        }

        let invalid = |source| PassError::InvalidHostRequirement {
            name: info.plugin_name.to_string(),
            source,
        };
        let req = VersionReq::parse(info.host_requirement).map_err(invalid)?;
        let version = Version::parse(HOST_VERSION).map_err(invalid)?;
        if !req.matches(&version) {
            return Err(PassError::CompatibilityCheckFailed {
                name: info.plugin_name.to_string(),
                version,
                req,
            });
        }

        info!("loaded pass plugin `{}` {}", info.plugin_name, info.plugin_version);
        Ok(Self { info, _lib: None })
    }

    pub fn name(&self) -> &str {
        self.info.plugin_name
    }

    pub fn version(&self) -> &str {
        self.info.plugin_version
    }

    pub fn info(&self) -> &PassPluginLibraryInfo {
        &self.info
    }

    /// Lets the plugin install its callbacks into `pb`. The library stays
    /// loaded as long as `pb` and the pass managers it fills.
    pub fn register_pass_builder_callbacks(&self, pb: &mut PassBuilder) {
        if let Some(library) = &self._lib {
            pb.retain_library(library.clone());
        }
        (self.info.register_pass_builder_callbacks)(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::NoOpModulePass;

    fn register(pb: &mut PassBuilder) {
        pb.register_pipeline_parsing_callback(|name, mpm, _| {
            if name == "plugin-no-op" {
                mpm.add_pass(NoOpModulePass);
                return true;
            }
            false
        });
    }

    fn info() -> PassPluginLibraryInfo {
        PassPluginLibraryInfo {
            api_version: PLUGIN_API_VERSION,
            plugin_name: "test-plugin",
            plugin_version: "1.0.0",
            host_requirement: "*",
            register_pass_builder_callbacks: register,
        }
    }

    #[test]
    fn accepted_plugin_registers_its_callbacks() {
        let plugin = PassPlugin::from_info(info()).unwrap();
        let mut pb = PassBuilder::new();
        plugin.register_pass_builder_callbacks(&mut pb);

        let mut mpm = crate::modern::ModulePassManager::new();
        pb.parse_pass_pipeline(&mut mpm, "plugin-no-op").unwrap();
        assert_eq!(mpm.len(), 1);
        assert_eq!(plugin.name(), "test-plugin");
    }

    #[test]
    fn mismatching_plugins_are_rejected() {
        let stale = PassPluginLibraryInfo {
            api_version: PLUGIN_API_VERSION + 1,
            ..info()
        };
        assert!(matches!(
            PassPlugin::from_info(stale),
            Err(PassError::IncompatiblePluginApi { found, .. }) if found == PLUGIN_API_VERSION + 1
        ));

        let future = PassPluginLibraryInfo {
            host_requirement: ">=99.0.0",
            ..info()
        };
        assert!(matches!(
            PassPlugin::from_info(future),
            Err(PassError::CompatibilityCheckFailed { .. })
        ));

        let garbage = PassPluginLibraryInfo {
            host_requirement: "not a version",
            ..info()
        };
        assert!(matches!(
            PassPlugin::from_info(garbage),
            Err(PassError::InvalidHostRequirement { .. })
        ));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn library_outlives_the_plugin() {
        let library = Arc::new(unsafe { Library::new("libc.so.6") }.unwrap());
        let mut plugin = PassPlugin::from_info(info()).unwrap();
        plugin._lib = Some(library.clone());

        let mut pb = PassBuilder::new();
        plugin.register_pass_builder_callbacks(&mut pb);
        plugin.register_pass_builder_callbacks(&mut pb);
        drop(plugin);
        assert_eq!(pb.libraries().len(), 1);
        assert_eq!(Arc::strong_count(&library), 2);

        let mut mpm = crate::modern::ModulePassManager::new();
        pb.parse_pass_pipeline(&mut mpm, "plugin-no-op").unwrap();
        let lto = pb.build_lto_default_pipeline(crate::modern::OptimizationLevel::O2);
        drop(pb);
        assert!(Arc::ptr_eq(&mpm.libraries()[0], &library));
        assert_eq!(lto.libraries().len(), 1);
        assert_eq!(Arc::strong_count(&library), 3);

        drop(lto);
        drop(mpm);
        assert_eq!(Arc::strong_count(&library), 1);
    }

    #[test]
    fn missing_library_is_reported() {
        assert!(matches!(
            PassPlugin::load("/nonexistent/libkthook.so"),
            Err(PassError::PluginLoad { .. })
        ));
    }
}
