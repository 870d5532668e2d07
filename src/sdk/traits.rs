// Core Sdk trait: the uniform operation surface every language handler
// implements.

use async_trait::async_trait;
use std::path::Path;
use std::str::FromStr;

use crate::error::{DiscoveryError, Result};
use crate::runtime::ProjectArtifact;

/// Supported project languages. The member set is the compile-time
/// registration table; adding a language means adding a variant here
/// and registering its handler in `SdkRegistry::with_builtin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Language {
    #[default]
    Python,
}

impl Language {
    pub const ALL: &'static [Language] = &[Language::Python];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
        }
    }

    /// Capitalized form, matching the handler type's declared name
    pub fn capitalized(&self) -> &'static str {
        match self {
            Language::Python => "Python",
        }
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|l| l.as_str().to_string()).collect()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" => Ok(Language::Python),
            other => Err(DiscoveryError::UnknownLanguage {
                name: other.to_string(),
                available_languages: Language::names(),
            }),
        }
    }
}

/// Target platform as an "os/arch" string, passed through to the
/// container engine unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform(String);

impl Platform {
    pub fn new(spec: impl Into<String>) -> Self {
        Self(spec.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self("linux/amd64".to_string())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Platform {
    fn from(spec: &str) -> Self {
        Self::new(spec)
    }
}

/// Project name and version recovered from the manifest.
/// Both start empty until a manifest is found; `version` is the
/// packaging tool's stdout captured verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectProperties {
    pub name: String,
    pub version: String,
}

/// The per-language capability set.
///
/// Each operation composes a fresh container pipeline: environment
/// setup, dependency install, then the operation's toolchain commands.
/// The first failing command aborts the pipeline; there are no partial
/// successes. Borrowed `project` trees are read-only at this boundary.
#[async_trait]
pub trait Sdk: Send + Sync + std::fmt::Debug {
    fn language(&self) -> Language;

    /// Produce a populated project tree: version control, standard
    /// metadata files and language-specific scaffolding.
    async fn init(&self, project_name: &str, platform: &Platform) -> Result<ProjectArtifact>;

    /// Run the language's build toolchain; distributables land under
    /// `dist/<platform>` in the returned tree.
    async fn build(&self, project: &Path, platform: &Platform) -> Result<ProjectArtifact>;

    /// Run the static type checker; returns a success sentinel or fails
    /// with the tool's output.
    async fn check(&self, project: &Path, platform: &Platform) -> Result<String>;

    /// Run the linter in check mode (no mutation)
    async fn lint(&self, project: &Path, platform: &Platform) -> Result<String>;

    /// Run the linter in fix mode and return the modified tree
    async fn lint_fix(&self, project: &Path, platform: &Platform) -> Result<ProjectArtifact>;

    /// Build, install the artifact into a clean offline environment,
    /// then uninstall it, verifying the round trip.
    async fn test_install(&self, project: &Path, platform: &Platform) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_round_trip() {
        for language in Language::ALL {
            assert_eq!(
                language.as_str().parse::<Language>().unwrap(),
                *language
            );
        }
    }

    #[test]
    fn test_language_case_normalized() {
        assert_eq!("PyThOn".parse::<Language>().unwrap(), Language::Python);
    }

    #[test]
    fn test_unknown_language_lists_available() {
        let err = "cobol".parse::<Language>().unwrap_err();
        match err {
            DiscoveryError::UnknownLanguage {
                name,
                available_languages,
            } => {
                assert_eq!(name, "cobol");
                assert_eq!(available_languages, vec!["python".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Language::default(), Language::Python);
        assert_eq!(Platform::default().as_str(), "linux/amd64");
    }
}
