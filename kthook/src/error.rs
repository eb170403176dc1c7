use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, Error, EnumIs)]
pub enum HookError {
    #[error("Hook symbol '{name}' is already bound to an incompatible symbol: {source}")]
    SignatureConflict {
        name: String,
        source: ktinstr::utils::Error,
    },

    #[error("Module returned no usable function for hook symbol '{name}'")]
    NullSymbol { name: String },

    #[error("Function '{name}' cannot be instrumented with a call to itself")]
    SelfInstrumentation { name: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("A configuration has already been installed for this process")]
    ConfigAlreadyInstalled,

    #[error("Failed to read configuration file '{file}': {source}")]
    ConfigRead {
        source: std::io::Error,
        file: String,
    },

    #[error("Failed to parse configuration '{file}': {source}")]
    ConfigParse {
        source: toml::de::Error,
        file: String,
    },

    #[error("Invalid hook options: {0}")]
    Options(#[from] clap::Error),

    #[error("IR error: {0}")]
    Ir(#[from] ktinstr::utils::Error),
}

pub type HookResult<T> = Result<T, HookError>;
