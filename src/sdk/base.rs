// Shared environment prelude and common project scaffolding, consumed
// by every concrete handler. Composable helpers, not an inheritance
// chain.

use std::sync::Arc;
use std::sync::OnceLock;

use crate::config::SdkConfig;
use crate::error::Result;
use crate::runtime::{Container, ContainerRuntime, ContainerSpec};
use crate::template::{TemplateDescriptor, TemplateMapping, TemplateSet};

use super::traits::Platform;

/// Templates shared by every handler family
pub fn common_templates() -> &'static TemplateSet {
    static SET: OnceLock<TemplateSet> = OnceLock::new();
    SET.get_or_init(|| {
        TemplateSet::new(&[
            (
                "README.md",
                include_str!("templates/common/README.md.template"),
            ),
            (
                "CHANGELOG.md",
                include_str!("templates/common/CHANGELOG.md.template"),
            ),
            (".gitignore", include_str!("templates/common/gitignore.template")),
        ])
    })
}

/// Start the base project environment: minimal pinned OS image for the
/// requested platform, dependency cache volume, version control
/// bootstrap, project directory as the working directory.
///
/// Idempotent with respect to the caller's project tree; nothing is
/// mounted here.
pub async fn project_env(
    runtime: Arc<dyn ContainerRuntime>,
    config: &SdkConfig,
    platform: &Platform,
) -> Result<Container> {
    let spec = ContainerSpec::new(&config.base_image, platform.as_str())
        .with_workdir(&config.project_root)
        .with_cache_volume(&config.cache_volume, &config.cache_mount_path);

    let mut container = Container::start(runtime, &spec).await?;
    let project_root = config.project_root.display().to_string();
    container
        .run(["mkdir", "--parents", project_root.as_str()])
        .await?;
    container.run(["apt", "update"]).await?;
    container
        .run([
            "apt",
            "install",
            "--assume-yes",
            "--no-install-recommends",
            "git",
        ])
        .await?;
    container.run(["apt", "autoremove"]).await?;
    container.run(["apt", "clean"]).await?;
    Ok(container)
}

/// First character uppercased, as used for the README heading
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Write the language-independent scaffold: README, CHANGELOG, version
/// control init, source directory and ignore rules. Every file write is
/// create-if-absent, so re-running against an initialized project never
/// overwrites user edits.
pub async fn scaffold_common(
    container: &mut Container,
    config: &SdkConfig,
    project_name: &str,
    vcs_exclude: &[String],
) -> Result<()> {
    let templates = common_templates();

    let mut readme_mapping = TemplateMapping::new();
    readme_mapping.insert("project_name".to_string(), capitalize(project_name).into());
    let readme = templates.render(
        &TemplateDescriptor::new("README.md", &config.project_root),
        &readme_mapping,
    )?;
    container.ensure_file(&readme).await?;

    let changelog = templates.render(
        &TemplateDescriptor::new("CHANGELOG.md", &config.project_root),
        &TemplateMapping::new(),
    )?;
    container.ensure_file(&changelog).await?;

    container
        .run(["git", "init", "--initial-branch", "main"])
        .await?;
    let source_path = config.project_source_path().display().to_string();
    container
        .run(["mkdir", "--parents", source_path.as_str()])
        .await?;

    let mut gitignore_mapping = TemplateMapping::new();
    gitignore_mapping.insert("exclude".to_string(), vcs_exclude.to_vec().into());
    let gitignore = templates.render(
        &TemplateDescriptor::new(".gitignore", &config.project_root),
        &gitignore_mapping,
    )?;
    container.ensure_file(&gitignore).await?;

    Ok(())
}
