// Dispatch facade: resolves the selected language handler and forwards
// each operation, defaulting unspecified language and platform.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::runtime::ProjectArtifact;

use super::registry::SdkRegistry;
use super::traits::{Language, Platform, Sdk};

/// Public operation surface over the handler registry
pub struct SdkDispatch {
    registry: Arc<SdkRegistry>,
    language: Language,
    default_platform: Platform,
}

impl SdkDispatch {
    pub fn new(registry: Arc<SdkRegistry>) -> Self {
        Self {
            registry,
            language: Language::default(),
            default_platform: Platform::default(),
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_default_platform(mut self, platform: Platform) -> Self {
        self.default_platform = platform;
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    fn handler(&self) -> Result<Arc<dyn Sdk>> {
        self.registry.resolve(self.language)
    }

    fn platform(&self, platform: Option<Platform>) -> Platform {
        platform.unwrap_or_else(|| self.default_platform.clone())
    }

    pub async fn init(
        &self,
        project_name: &str,
        platform: Option<Platform>,
    ) -> Result<ProjectArtifact> {
        self.handler()?
            .init(project_name, &self.platform(platform))
            .await
    }

    pub async fn build(
        &self,
        project: &Path,
        platform: Option<Platform>,
    ) -> Result<ProjectArtifact> {
        self.handler()?.build(project, &self.platform(platform)).await
    }

    pub async fn check(&self, project: &Path, platform: Option<Platform>) -> Result<String> {
        self.handler()?.check(project, &self.platform(platform)).await
    }

    pub async fn lint(&self, project: &Path, platform: Option<Platform>) -> Result<String> {
        self.handler()?.lint(project, &self.platform(platform)).await
    }

    pub async fn lint_fix(
        &self,
        project: &Path,
        platform: Option<Platform>,
    ) -> Result<ProjectArtifact> {
        self.handler()?
            .lint_fix(project, &self.platform(platform))
            .await
    }

    pub async fn test_install(
        &self,
        project: &Path,
        platform: Option<Platform>,
    ) -> Result<String> {
        self.handler()?
            .test_install(project, &self.platform(platform))
            .await
    }

    /// Run `lint` and `check` concurrently and join their reports in
    /// fixed order, regardless of completion order. Fails fast if
    /// either sub-operation fails. The two pipelines share no state;
    /// each composes its own environment.
    pub async fn quality(&self, project: &Path, platform: Option<Platform>) -> Result<String> {
        let handler = self.handler()?;
        let platform = self.platform(platform);
        let (lint_report, check_report) = tokio::try_join!(
            handler.lint(project, &platform),
            handler.check(project, &platform),
        )?;
        Ok(format!("{lint_report}\n{check_report}"))
    }
}
