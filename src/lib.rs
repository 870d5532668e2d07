// kiln - Library module
// Container-based project pipelines behind a per-language SDK surface

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod sdk;
pub mod template;

// Re-export main types for easier access
pub use config::SdkConfig;
pub use error::{
    exit_codes, DiscoveryError, KilnError, ManifestError, Result, RuntimeError, TemplateError,
    ToolError,
};
pub use logging::{ColorConfig, LogConfig, LogFormat};
pub use runtime::{
    Container, ContainerId, ContainerRuntime, ContainerSpec, DockerCliRuntime, ExecOutput,
    ExecSpec, ProjectArtifact,
};
pub use sdk::{
    Language, Platform, ProjectProperties, PythonSdk, Sdk, SdkDispatch, SdkRegistry,
};
pub use template::{
    RenderedTemplate, TemplateDescriptor, TemplateMapping, TemplateSet, TemplateValue,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

// Build information (set by build script)
pub const BUILD_DATE: &str = env!("BUILD_DATE");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const GIT_BRANCH: &str = env!("GIT_BRANCH");
pub const RUST_VERSION: &str = env!("RUST_VERSION");

/// Get formatted version string with build information
pub fn version_info() -> String {
    format!(
        "{NAME} {VERSION} (commit: {GIT_COMMIT}, branch: {GIT_BRANCH}, built: {BUILD_DATE}, rustc: {RUST_VERSION})"
    )
}
