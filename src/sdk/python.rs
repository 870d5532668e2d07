// Python language handler: uv-based environment composition and the
// build/check/lint/test-install pipelines.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::info;

use crate::config::SdkConfig;
use crate::error::{ManifestError, Result};
use crate::runtime::{Container, ContainerRuntime, ProjectArtifact};
use crate::template::{TemplateDescriptor, TemplateMapping, TemplateSet};

use super::base;
use super::traits::{Language, Platform, ProjectProperties, Sdk};

/// Success sentinels returned by the report-producing operations
pub const CHECK_SUCCESS: &str = "Check successful";
pub const LINT_SUCCESS: &str = "Lint successful";
pub const TEST_INSTALL_SUCCESS: &str = "Test install successful";

const LINT_CACHE_FOLDER: &str = ".ruff_cache";
const MANIFEST_FILE: &str = "pyproject.toml";

fn python_templates() -> &'static TemplateSet {
    static SET: OnceLock<TemplateSet> = OnceLock::new();
    SET.get_or_init(|| {
        TemplateSet::new(&[
            (
                "pyproject.toml",
                include_str!("templates/python/pyproject.toml.template"),
            ),
            (
                "py.typed",
                include_str!("templates/python/py.typed.template"),
            ),
            (
                "mypy.ini",
                include_str!("templates/python/mypy.ini.template"),
            ),
            (
                "ruff.toml",
                include_str!("templates/python/ruff.toml.template"),
            ),
        ])
    })
}

/// Python handler over the shared container runtime
#[derive(Debug)]
pub struct PythonSdk {
    runtime: Arc<dyn ContainerRuntime>,
    config: SdkConfig,
}

impl PythonSdk {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: SdkConfig) -> Self {
        Self { runtime, config }
    }

    /// Files and folders excluded from version control
    fn vcs_exclude(&self) -> Vec<String> {
        vec![
            "/.venv/".to_string(),
            "__pycache__/".to_string(),
            format!("/{LINT_CACHE_FOLDER}/"),
            format!("/{}/", self.config.dist_folder),
        ]
    }

    fn manifest_descriptor(&self) -> TemplateDescriptor {
        TemplateDescriptor::new(MANIFEST_FILE, &self.config.project_root)
    }

    /// Compose the Python environment: package-manager bootstrap,
    /// isolated virtualenv, mounted project, manifest-derived project
    /// properties and declared dependencies.
    ///
    /// `init_name` is the scaffold name used when no manifest supplies
    /// one (the `init` operation).
    async fn python_env(
        &self,
        container: &mut Container,
        project: Option<&Path>,
        init_name: Option<&str>,
    ) -> Result<ProjectProperties> {
        container.run(["apt", "update"]).await?;
        container
            .run([
                "apt",
                "install",
                "--assume-yes",
                "--no-install-recommends",
                "pipx",
            ])
            .await?;
        container.run(["apt", "autoremove"]).await?;
        container.run(["apt", "clean"]).await?;
        container.run(["pipx", "ensurepath"]).await?;
        container.set_env("PATH", "/root/.local/bin:${PATH}");
        container.set_env("UV_LINK_MODE", "copy");
        container.run(["pipx", "install", "uv"]).await?;

        let venv_path = self.config.venv_path.display().to_string();
        container.set_env("VIRTUAL_ENV", &venv_path);
        container.run(["uv", "venv", venv_path.as_str()]).await?;
        container.set_env("PATH", "${VIRTUAL_ENV}/bin:${PATH}");

        if let Some(project) = project {
            container.mount(project, &self.config.project_root).await?;
        }

        let mut properties = ProjectProperties::default();
        let manifest = self.manifest_descriptor();
        if container.has_file(&manifest).await? {
            let contents = container.read_file(&manifest.output_path()).await?;
            properties.name = self.parse_manifest_name(&contents)?;
            container.run(["uv", "pip", "install", "hatch"]).await?;
            // Captured verbatim, trailing newline included; the
            // install-verification spec in test_install composes it
            // unchanged.
            properties.version = container.run(["hatch", "version"]).await?.to_string();
        }

        let scaffold_name = if properties.name.is_empty() {
            init_name.unwrap_or_default().to_string()
        } else {
            properties.name.clone()
        };
        base::scaffold_common(container, &self.config, &scaffold_name, &self.vcs_exclude())
            .await?;
        self.scaffold_python(container, &scaffold_name).await?;

        container
            .run([
                "uv",
                "pip",
                "install",
                "--no-sources",
                "--requirement",
                MANIFEST_FILE,
            ])
            .await?;
        Ok(properties)
    }

    fn parse_manifest_name(&self, contents: &str) -> Result<String> {
        let manifest_path = self.manifest_descriptor().output_path();
        let value: toml::Value =
            toml::from_str(contents).map_err(|e| ManifestError::InvalidSyntax {
                path: manifest_path.clone(),
                message: e.to_string(),
            })?;
        value
            .get("project")
            .and_then(|project| project.get("name"))
            .and_then(|name| name.as_str())
            .map(|name| name.to_string())
            .ok_or_else(|| {
                ManifestError::MissingField {
                    path: manifest_path,
                    field: "project.name".to_string(),
                }
                .into()
            })
    }

    /// Language scaffold: package manifest and type marker
    async fn scaffold_python(&self, container: &mut Container, project_name: &str) -> Result<()> {
        let templates = python_templates();

        let mut manifest_mapping = TemplateMapping::new();
        manifest_mapping.insert("project_name".to_string(), project_name.into());
        let manifest = templates.render(&self.manifest_descriptor(), &manifest_mapping)?;
        container.ensure_file(&manifest).await?;

        let py_typed = templates.render(
            &TemplateDescriptor::new(
                "py.typed",
                self.config.project_source_path().join(project_name),
            ),
            &TemplateMapping::new(),
        )?;
        container.ensure_file(&py_typed).await?;
        Ok(())
    }

    /// Type-checker configuration
    async fn scaffold_check(&self, container: &mut Container) -> Result<()> {
        let mut mapping = TemplateMapping::new();
        mapping.insert(
            "project_folders".to_string(),
            self.config.source_folder.clone().into(),
        );
        let mypy_ini = python_templates().render(
            &TemplateDescriptor::new("mypy.ini", &self.config.project_root),
            &mapping,
        )?;
        container.ensure_file(&mypy_ini).await?;
        Ok(())
    }

    /// Linter configuration
    async fn scaffold_lint(&self, container: &mut Container) -> Result<()> {
        let mut mapping = TemplateMapping::new();
        mapping.insert("cache_folder".to_string(), LINT_CACHE_FOLDER.into());
        let ruff_toml = python_templates().render(
            &TemplateDescriptor::new("ruff.toml", &self.config.project_root),
            &mapping,
        )?;
        container.ensure_file(&ruff_toml).await?;
        Ok(())
    }

    /// Environment + build tooling + distributable build
    async fn build_pipeline(
        &self,
        container: &mut Container,
        project: &Path,
        platform: &Platform,
    ) -> Result<ProjectProperties> {
        let properties = self.python_env(container, Some(project), None).await?;
        container
            .run(["uv", "pip", "install", "build", "twine"])
            .await?;
        let outdir = self.config.project_dist_path(platform.as_str());
        container
            .run([
                "python".to_string(),
                "-m".to_string(),
                "build".to_string(),
                "--installer=uv".to_string(),
                format!("--outdir={}", outdir.display()),
            ])
            .await?;
        Ok(properties)
    }

    async fn lint_pipeline(
        &self,
        container: &mut Container,
        project: &Path,
        fix: bool,
    ) -> Result<()> {
        self.python_env(container, Some(project), None).await?;
        self.scaffold_lint(container).await?;
        container.run(["uv", "pip", "install", "ruff"]).await?;

        let mut check_command = vec![
            "ruff".to_string(),
            "check".to_string(),
            "--show-fixes".to_string(),
            "--config=ruff.toml".to_string(),
            ".".to_string(),
        ];
        let mut format_command = vec![
            "ruff".to_string(),
            "format".to_string(),
            "--config=ruff.toml".to_string(),
            ".".to_string(),
        ];
        if fix {
            check_command.push("--fix".to_string());
        } else {
            format_command.push("--diff".to_string());
        }
        container.run(check_command).await?;
        container.run(format_command).await?;
        Ok(())
    }
}

#[async_trait]
impl Sdk for PythonSdk {
    fn language(&self) -> Language {
        Language::Python
    }

    async fn init(&self, project_name: &str, platform: &Platform) -> Result<ProjectArtifact> {
        info!(project_name, %platform, "python init");
        let mut container =
            base::project_env(self.runtime.clone(), &self.config, platform).await?;
        let result: Result<ProjectArtifact> = async {
            self.python_env(&mut container, None, Some(project_name))
                .await?;
            self.scaffold_check(&mut container).await?;
            self.scaffold_lint(&mut container).await?;
            container.export(&self.config.project_root).await
        }
        .await;
        container.remove().await;
        result
    }

    async fn build(&self, project: &Path, platform: &Platform) -> Result<ProjectArtifact> {
        info!(project = %project.display(), %platform, "python build");
        let mut container =
            base::project_env(self.runtime.clone(), &self.config, platform).await?;
        let result: Result<ProjectArtifact> = async {
            self.build_pipeline(&mut container, project, platform).await?;
            container.export(&self.config.project_root).await
        }
        .await;
        container.remove().await;
        result
    }

    async fn check(&self, project: &Path, platform: &Platform) -> Result<String> {
        info!(project = %project.display(), %platform, "python check");
        let mut container =
            base::project_env(self.runtime.clone(), &self.config, platform).await?;
        let result: Result<String> = async {
            self.python_env(&mut container, Some(project), None).await?;
            self.scaffold_check(&mut container).await?;
            container.run(["uv", "pip", "install", "mypy"]).await?;
            container.run(["mypy", "--config-file=mypy.ini"]).await?;
            Ok(CHECK_SUCCESS.to_string())
        }
        .await;
        container.remove().await;
        result
    }

    async fn lint(&self, project: &Path, platform: &Platform) -> Result<String> {
        info!(project = %project.display(), %platform, "python lint");
        let mut container =
            base::project_env(self.runtime.clone(), &self.config, platform).await?;
        let result: Result<String> = async {
            self.lint_pipeline(&mut container, project, false).await?;
            Ok(LINT_SUCCESS.to_string())
        }
        .await;
        container.remove().await;
        result
    }

    async fn lint_fix(&self, project: &Path, platform: &Platform) -> Result<ProjectArtifact> {
        info!(project = %project.display(), %platform, "python lint fix");
        let mut container =
            base::project_env(self.runtime.clone(), &self.config, platform).await?;
        let result: Result<ProjectArtifact> = async {
            self.lint_pipeline(&mut container, project, true).await?;
            container.export(&self.config.project_root).await
        }
        .await;
        container.remove().await;
        result
    }

    async fn test_install(&self, project: &Path, platform: &Platform) -> Result<String> {
        info!(project = %project.display(), %platform, "python test install");
        let mut container =
            base::project_env(self.runtime.clone(), &self.config, platform).await?;
        let result: Result<String> = async {
            let properties = self.build_pipeline(&mut container, project, platform).await?;
            let find_links = format!(
                "--find-links={}",
                self.config.project_dist_path(platform.as_str()).display()
            );
            // name==version with the version string exactly as captured
            let install_spec = format!("{}=={}", properties.name, properties.version);
            container
                .run([
                    "uv".to_string(),
                    "pip".to_string(),
                    "install".to_string(),
                    "--no-build-isolation".to_string(),
                    "--no-index".to_string(),
                    find_links,
                    install_spec,
                ])
                .await?;
            container
                .run(["uv", "pip", "uninstall", properties.name.as_str()])
                .await?;
            Ok(TEST_INSTALL_SUCCESS.to_string())
        }
        .await;
        container.remove().await;
        result
    }
}
