//! Configuration of the hook pass.
//!
//! A [`HookConfig`] names the hook to call and the function to instrument. It
//! is built once, before any module is processed, from command-line style
//! options, a TOML file or the defaults, and then only read. Passes created by
//! the pass managers read the process-wide value returned by
//! [`HookConfig::global`].
use std::{ffi::OsString, path::Path};

use clap::Parser;
use ktinstr::modules::CallingConvention;
use log::{debug, warn};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::{
    error::{HookError, HookResult},
    magic::{DEFAULT_HOOK_NAME, DEFAULT_TARGET_NAME, ENV_CONFIG_PATH, ENV_OPTIONS},
};

static GLOBAL: OnceCell<HookConfig> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HookConfig {
    /// Function the inserted call targets.
    pub hook_name: String,
    /// Function receiving the call.
    pub target_name: String,
    /// Calling convention the hook is declared with. Must match the one of
    /// the hook definition.
    pub cconv: CallingConvention,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            hook_name: DEFAULT_HOOK_NAME.to_string(),
            target_name: DEFAULT_TARGET_NAME.to_string(),
            cconv: CallingConvention::FastC,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "kthook", no_binary_name = true)]
struct HookOptions {
    /// Specify the function that the hook should call.
    #[arg(long = "template-hook", default_value = DEFAULT_HOOK_NAME)]
    hook: String,

    /// Specify the function where the hook should be inserted.
    #[arg(long = "template-function", default_value = DEFAULT_TARGET_NAME)]
    function: String,
}

impl HookConfig {
    pub fn new(hook_name: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            hook_name: hook_name.into(),
            target_name: target_name.into(),
            ..Default::default()
        }
    }

    /// Builds a configuration from `--template-hook` / `--template-function`
    /// options. `args` must not start with a program name.
    pub fn from_args<I, T>(args: I) -> HookResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let options = HookOptions::try_parse_from(args)?;
        let config = Self::new(options.hook, options.function);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(source: &str) -> HookResult<Self> {
        Self::parse_toml(source, "<string>")
    }

    pub fn from_file(path: impl AsRef<Path>) -> HookResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| HookError::ConfigRead {
            source: e,
            file: path.display().to_string(),
        })?;
        Self::parse_toml(&source, &path.display().to_string())
    }

    fn parse_toml(source: &str, file: &str) -> HookResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| HookError::ConfigParse {
            source: e,
            file: file.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads [`ENV_OPTIONS`], then [`ENV_CONFIG_PATH`]; falls back to the
    /// defaults when neither is set.
    pub fn from_env() -> HookResult<Self> {
        if let Ok(options) = std::env::var(ENV_OPTIONS) {
            debug!("reading hook options from ${}", ENV_OPTIONS);
            return Self::from_args(options.split_whitespace());
        }
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            debug!("reading hook configuration from `{}`", path);
            return Self::from_file(path);
        }
        Ok(Self::default())
    }

    /// Rejects configurations the transformation cannot honour.
    pub fn validate(&self) -> HookResult<()> {
        if self.hook_name.is_empty() {
            return Err(HookError::InvalidConfig("hook name is empty".to_string()));
        }
        if self.target_name.is_empty() {
            return Err(HookError::InvalidConfig("target function name is empty".to_string()));
        }
        if self.hook_name == self.target_name {
            return Err(HookError::SelfInstrumentation {
                name: self.target_name.clone(),
            });
        }
        Ok(())
    }

    /// Sets the process-wide configuration. Fails if it was already set, or
    /// already read through [`HookConfig::global`].
    ///
    /// Only reaches a statically linked pass. A copy of this crate loaded as a
    /// plugin library has its own process-wide value, initialised from
    /// [`ENV_OPTIONS`] or [`ENV_CONFIG_PATH`].
    pub fn install(config: HookConfig) -> HookResult<()> {
        config.validate()?;
        GLOBAL.set(config).map_err(|_| HookError::ConfigAlreadyInstalled)
    }

    /// The process-wide configuration.
    ///
    /// Initialised on first use from the environment (see
    /// [`HookConfig::from_env`]). An invalid environment is reported and
    /// replaced by the defaults.
    pub fn global() -> &'static HookConfig {
        GLOBAL.get_or_init(|| {
            Self::from_env().unwrap_or_else(|err| {
                warn!("ignoring hook configuration from the environment: {}", err);
                Self::default()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HookConfig::from_args(Vec::<String>::new()).unwrap();
        assert_eq!(config, HookConfig::default());
        assert_eq!(config.hook_name, "kernel_tools_hook_test");
        assert_eq!(config.target_name, "__x64_sys_newuname");
        assert_eq!(config.cconv, CallingConvention::FastC);
    }

    #[test]
    fn options_override_defaults() {
        let config = HookConfig::from_args(["--template-hook=beta", "--template-function", "alpha"]).unwrap();
        assert_eq!(config, HookConfig::new("beta", "alpha"));

        assert!(HookConfig::from_args(["--template-hook"]).unwrap_err().is_options());
        assert!(HookConfig::from_args(["--unknown=1"]).unwrap_err().is_options());
    }

    #[test]
    fn toml_configuration() {
        let config = HookConfig::from_toml_str(
            r#"
            hook_name = "beta"
            cconv = "ColdC"
            "#,
        )
        .unwrap();
        assert_eq!(config.hook_name, "beta");
        assert_eq!(config.target_name, DEFAULT_TARGET_NAME);
        assert_eq!(config.cconv, CallingConvention::ColdC);

        assert!(
            HookConfig::from_toml_str("hook = \"beta\"")
                .unwrap_err()
                .is_config_parse()
        );
    }

    #[test]
    fn invalid_configurations() {
        assert!(HookConfig::new("", "alpha").validate().unwrap_err().is_invalid_config());
        assert!(
            HookConfig::from_args(["--template-hook=alpha", "--template-function=alpha"])
                .unwrap_err()
                .is_self_instrumentation()
        );
        assert!(
            HookConfig::from_file("/nonexistent/kthook.toml")
                .unwrap_err()
                .is_config_read()
        );
    }
}
