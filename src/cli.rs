// CLI surface over the dispatch facade using clap

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use walkdir::WalkDir;

use crate::config::SdkConfig;
use crate::error::Result;
use crate::logging::{init_logging, LogConfig};
use crate::runtime::{DockerCliRuntime, ProjectArtifact};
use crate::sdk::{Language, Platform, SdkDispatch, SdkRegistry};

#[derive(Parser)]
#[command(
    name = "kiln",
    about = "Container-based project pipelines: init, build, lint, type-check and test-install",
    version = crate::VERSION
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project language
    #[arg(short, long, global = true, default_value = "python")]
    pub language: String,

    /// Target platform as os/arch (e.g. linux/amd64)
    #[arg(short, long, global = true)]
    pub platform: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "kiln.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Control color output (auto, always, never)
    #[arg(long, global = true, value_name = "WHEN")]
    pub color: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new project scaffold
    Init {
        /// Project name
        name: String,

        /// Directory to write the initialized project to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build distributable artifacts
    Build {
        /// Project directory
        #[arg(default_value = ".")]
        project: PathBuf,

        /// Directory to write the built project to
        #[arg(short, long, default_value = "kiln-out")]
        output: PathBuf,
    },

    /// Run the static type checker
    Check {
        #[arg(default_value = ".")]
        project: PathBuf,
    },

    /// Run the linter in check mode
    Lint {
        #[arg(default_value = ".")]
        project: PathBuf,
    },

    /// Run the linter in fix mode and write the fixed tree
    LintFix {
        #[arg(default_value = ".")]
        project: PathBuf,

        #[arg(short, long, default_value = "kiln-out")]
        output: PathBuf,
    },

    /// Run lint and type checks concurrently
    Quality {
        #[arg(default_value = ".")]
        project: PathBuf,
    },

    /// Build, then install and uninstall the artifact offline
    TestInstall {
        #[arg(default_value = ".")]
        project: PathBuf,
    },
}

impl Cli {
    pub async fn run(self) -> Result<i32> {
        init_logging(LogConfig::from_cli(self.verbose, self.quiet, self.color.clone()))?;

        let config = if self.config.exists() {
            SdkConfig::from_file(&self.config)?
        } else {
            SdkConfig::default()
        };

        let language: Language = self.language.parse()?;
        let platform = self.platform.as_deref().map(Platform::from);

        let runtime = Arc::new(DockerCliRuntime::new(&config)?);
        let registry = Arc::new(SdkRegistry::with_builtin(runtime, &config));
        let dispatch = SdkDispatch::new(registry)
            .with_language(language)
            .with_default_platform(Platform::new(&config.default_platform));

        match self.command {
            Commands::Init { name, output } => {
                let artifact = dispatch.init(&name, platform).await?;
                let dest = output.unwrap_or_else(|| PathBuf::from(&name));
                persist_artifact(artifact, &dest)?;
                info!(dest = %dest.display(), "project initialized");
            }
            Commands::Build { project, output } => {
                let artifact = dispatch.build(&project, platform).await?;
                persist_artifact(artifact, &output)?;
                info!(dest = %output.display(), "build artifacts written");
            }
            Commands::Check { project } => {
                println!("{}", dispatch.check(&project, platform).await?);
            }
            Commands::Lint { project } => {
                println!("{}", dispatch.lint(&project, platform).await?);
            }
            Commands::LintFix { project, output } => {
                let artifact = dispatch.lint_fix(&project, platform).await?;
                persist_artifact(artifact, &output)?;
                info!(dest = %output.display(), "fixed tree written");
            }
            Commands::Quality { project } => {
                println!("{}", dispatch.quality(&project, platform).await?);
            }
            Commands::TestInstall { project } => {
                println!("{}", dispatch.test_install(&project, platform).await?);
            }
        }

        Ok(crate::error::exit_codes::SUCCESS)
    }
}

/// Copy an exported artifact tree to its destination directory
fn persist_artifact(artifact: ProjectArtifact, dest: &Path) -> Result<()> {
    copy_tree(artifact.path(), dest)?;
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_copy_tree_round_trip() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("src")).unwrap();
        std::fs::write(src.path().join("src/app.py"), "print()\n").unwrap();
        std::fs::write(src.path().join("README.md"), "# Demo\n").unwrap();

        let dest = tempfile::tempdir().unwrap();
        copy_tree(src.path(), dest.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dest.path().join("src/app.py")).unwrap(),
            "print()\n"
        );
        assert_eq!(
            std::fs::read_to_string(dest.path().join("README.md")).unwrap(),
            "# Demo\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_follows_directory_symlinks() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("real")).unwrap();
        std::fs::write(src.path().join("real/mod.py"), "x = 1\n").unwrap();
        std::os::unix::fs::symlink(src.path().join("real"), src.path().join("linked")).unwrap();

        let dest = tempfile::tempdir().unwrap();
        copy_tree(src.path(), dest.path()).unwrap();
        // The link is materialized as a real directory with its contents
        assert!(dest.path().join("linked").is_dir());
        assert_eq!(
            std::fs::read_to_string(dest.path().join("linked/mod.py")).unwrap(),
            "x = 1\n"
        );
    }
}
