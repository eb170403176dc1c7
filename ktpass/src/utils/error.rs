use semver::{Version, VersionReq};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PassError {
    #[error("Unknown pass name '{0}' in pipeline description")]
    UnknownPassName(String),

    #[error("Pass '{name}' does not accept nested pipeline elements")]
    UnexpectedNestedPipeline { name: String },

    #[error("Invalid pipeline description '{pipeline}': {message}")]
    PipelineSyntax { pipeline: String, message: String },

    #[error("Failed to load pass plugin from file '{file}': {source}")]
    PluginLoad {
        source: libloading::Error,
        file: String,
    },

    #[error("Plugin '{name}' uses plugin API version {found}, but the host expects version {expected}")]
    IncompatiblePluginApi {
        name: String,
        found: u32,
        expected: u32,
    },

    #[error(
        "Compatibility check failed for plugin '{name}'. Required host version: {req}, found: {version}"
    )]
    CompatibilityCheckFailed {
        name: String,
        version: Version,
        req: VersionReq,
    },

    #[error("Plugin '{name}' declares an invalid host requirement: {source}")]
    InvalidHostRequirement {
        name: String,
        source: semver::Error,
    },

    #[error("Module verification failed: {0}")]
    Verification(#[from] ktinstr::utils::Error),
}

pub type PassResult<T> = Result<T, PassError>;
