// Container engine boundary: the trait the SDK pipelines run against,
// plus the Docker CLI implementation used in production.
//
// The engine owns container lifecycles and the shared dependency cache
// volume; this module only composes commands and moves file trees in
// and out. Project trees are always copied into the container, never
// mutated in place at the source.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::config::SdkConfig;
use crate::error::{Result, RuntimeError, ToolError};
use crate::template::{RenderedTemplate, TemplateDescriptor};

/// Opaque engine-assigned container identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Specification for a new container
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    /// "os/arch" string, passed through to the engine unvalidated
    pub platform: String,
    pub workdir: Option<PathBuf>,
    /// Named cache volumes: (volume name, mount path)
    pub cache_volumes: Vec<(String, PathBuf)>,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            platform: platform.into(),
            workdir: None,
            cache_volumes: Vec::new(),
        }
    }

    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn with_cache_volume(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.cache_volumes.push((name.into(), path.into()));
        self
    }
}

/// A single command execution inside a container.
///
/// Environment values may reference container-side variables with
/// `${NAME}`; they are expanded by the container's shell, not the host.
#[derive(Debug, Clone)]
pub struct ExecSpec {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ExecSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            env: Vec::new(),
        }
    }

    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

/// Captured result of one container command
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// The external container engine surface the SDK pipelines need.
///
/// Kept deliberately small: create, exec, file placement and tree
/// transfer. Everything heavier (scheduling, caching, network) belongs
/// to the engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + std::fmt::Debug {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerId>;

    /// Run a command; a non-zero exit is reported in the output, not as
    /// an engine error.
    async fn exec(&self, id: &ContainerId, spec: &ExecSpec) -> Result<ExecOutput>;

    /// Atomic create-if-absent: writes `contents` to `path` unless a
    /// file (or directory) of that exact name already exists. Returns
    /// whether the file was written.
    async fn write_file_if_absent(
        &self,
        id: &ContainerId,
        path: &Path,
        contents: &str,
    ) -> Result<bool>;

    async fn read_file(&self, id: &ContainerId, path: &Path) -> Result<String>;

    /// Entry names directly under `dir` (created if missing)
    async fn entries(&self, id: &ContainerId, dir: &Path) -> Result<Vec<String>>;

    /// Copy a host directory tree into the container at `dest`
    async fn copy_in(&self, id: &ContainerId, host_src: &Path, dest: &Path) -> Result<()>;

    /// Copy a container directory tree out to an existing host directory
    async fn export(&self, id: &ContainerId, src: &Path, host_dest: &Path) -> Result<()>;

    async fn remove(&self, id: &ContainerId) -> Result<()>;
}

/// Atomic create-if-absent as one shell step. The noclobber redirect
/// fails iff the open does; the marker on stdout tells "written" apart
/// from "already present", and anything else (failed mkdir, dead
/// container, docker-exec errors) exits non-zero.
const WRITE_IF_ABSENT_SCRIPT: &str = r#"mkdir -p "$(dirname "$1")" && if { set -C; printf '%s' "$2" > "$1"; } 2>/dev/null; then printf written; elif [ -e "$1" ]; then printf exists; else exit 1; fi"#;

fn write_outcome(output: ExecOutput) -> Result<bool> {
    if !output.success() {
        return Err(RuntimeError::OperationFailed {
            operation: "write file".to_string(),
            stderr: if output.stderr.is_empty() {
                output.stdout
            } else {
                output.stderr
            },
        }
        .into());
    }
    Ok(output.stdout == "written")
}

/// Docker CLI-backed runtime. Containers are kept alive with a long
/// sleep and driven step by step through `docker exec` / `docker cp`.
#[derive(Debug)]
pub struct DockerCliRuntime {
    docker_path: PathBuf,
    exec_timeout: Duration,
}

impl DockerCliRuntime {
    pub fn new(config: &SdkConfig) -> Result<Self> {
        let docker_path = which::which(&config.engine_command).map_err(|_| {
            RuntimeError::EngineNotFound {
                command: config.engine_command.clone(),
                suggestion: Some(format!(
                    "Install {} and ensure it's in your PATH",
                    config.engine_command
                )),
            }
        })?;
        Ok(Self {
            docker_path,
            exec_timeout: config.exec_timeout(),
        })
    }

    async fn docker(&self, operation: &str, args: &[String]) -> Result<ExecOutput> {
        debug!(operation = %operation, args = ?args, "engine command");
        let mut cmd = TokioCommand::new(&self.docker_path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.output();
        let output = tokio::time::timeout(self.exec_timeout, child)
            .await
            .map_err(|_| RuntimeError::OperationFailed {
                operation: operation.to_string(),
                stderr: format!("timed out after {:?}", self.exec_timeout),
            })?
            .map_err(|e| RuntimeError::SpawnFailed {
                command: self.docker_path.display().to_string(),
                error: e.to_string(),
            })?;

        Ok(ExecOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn docker_checked(&self, operation: &str, args: &[String]) -> Result<ExecOutput> {
        let output = self.docker(operation, args).await?;
        if !output.success() {
            return Err(RuntimeError::OperationFailed {
                operation: operation.to_string(),
                stderr: output.stderr,
            }
            .into());
        }
        Ok(output)
    }
}

#[async_trait]
impl ContainerRuntime for DockerCliRuntime {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let mut args = vec![
            "run".to_string(),
            "--detach".to_string(),
            "--platform".to_string(),
            spec.platform.clone(),
        ];
        for (volume, mount_path) in &spec.cache_volumes {
            args.push("--volume".to_string());
            args.push(format!("{}:{}", volume, mount_path.display()));
        }
        if let Some(ref workdir) = spec.workdir {
            args.push("--workdir".to_string());
            args.push(workdir.display().to_string());
        }
        args.push(spec.image.clone());
        args.extend(["sleep".to_string(), "infinity".to_string()]);

        let output = self.docker_checked("create container", &args).await?;
        Ok(ContainerId(output.stdout.trim().to_string()))
    }

    async fn exec(&self, id: &ContainerId, spec: &ExecSpec) -> Result<ExecOutput> {
        let mut args = vec!["exec".to_string(), id.0.clone()];
        if spec.env.is_empty() {
            args.extend(spec.argv.iter().cloned());
        } else {
            // Route through a container shell so ${VAR} references in
            // environment values expand against the container, not the
            // host.
            let exports: String = spec
                .env
                .iter()
                .map(|(key, value)| format!("export {key}=\"{value}\"; "))
                .collect();
            args.push("sh".to_string());
            args.push("-c".to_string());
            args.push(format!("{exports}exec \"$@\"",));
            args.push("sh".to_string());
            args.extend(spec.argv.iter().cloned());
        }
        self.docker("exec", &args).await
    }

    async fn write_file_if_absent(
        &self,
        id: &ContainerId,
        path: &Path,
        contents: &str,
    ) -> Result<bool> {
        let args = vec![
            "exec".to_string(),
            id.0.clone(),
            "sh".to_string(),
            "-c".to_string(),
            WRITE_IF_ABSENT_SCRIPT.to_string(),
            "sh".to_string(),
            path.display().to_string(),
            contents.to_string(),
        ];
        let output = self.docker("write file", &args).await?;
        write_outcome(output)
    }

    async fn read_file(&self, id: &ContainerId, path: &Path) -> Result<String> {
        let args = vec![
            "exec".to_string(),
            id.0.clone(),
            "cat".to_string(),
            path.display().to_string(),
        ];
        let output = self.docker_checked("read file", &args).await?;
        Ok(output.stdout)
    }

    async fn entries(&self, id: &ContainerId, dir: &Path) -> Result<Vec<String>> {
        let args = vec![
            "exec".to_string(),
            id.0.clone(),
            "sh".to_string(),
            "-c".to_string(),
            r#"mkdir -p "$1" && ls -1A "$1""#.to_string(),
            "sh".to_string(),
            dir.display().to_string(),
        ];
        let output = self.docker_checked("list directory", &args).await?;
        Ok(output
            .stdout
            .lines()
            .map(|line| line.to_string())
            .collect())
    }

    async fn copy_in(&self, id: &ContainerId, host_src: &Path, dest: &Path) -> Result<()> {
        let mkdir = ExecSpec::new(["mkdir", "--parents", &dest.display().to_string()]);
        let output = self.exec(id, &mkdir).await?;
        if !output.success() {
            return Err(RuntimeError::OperationFailed {
                operation: "prepare mount path".to_string(),
                stderr: output.stderr,
            }
            .into());
        }
        let args = vec![
            "cp".to_string(),
            format!("{}/.", host_src.display()),
            format!("{}:{}", id.0, dest.display()),
        ];
        self.docker_checked("copy into container", &args).await?;
        Ok(())
    }

    async fn export(&self, id: &ContainerId, src: &Path, host_dest: &Path) -> Result<()> {
        let args = vec![
            "cp".to_string(),
            format!("{}:{}/.", id.0, src.display()),
            host_dest.display().to_string(),
        ];
        self.docker_checked("export from container", &args).await?;
        Ok(())
    }

    async fn remove(&self, id: &ContainerId) -> Result<()> {
        let args = vec!["rm".to_string(), "--force".to_string(), id.0.clone()];
        self.docker_checked("remove container", &args).await?;
        Ok(())
    }
}

/// An exported project tree on the host, backed by an owned temporary
/// directory.
#[derive(Debug)]
pub struct ProjectArtifact {
    dir: TempDir,
}

impl ProjectArtifact {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Eager pipeline handle over one container: accumulated environment
/// variables, fail-fast command execution and scaffolding helpers.
pub struct Container {
    runtime: Arc<dyn ContainerRuntime>,
    id: ContainerId,
    env: Vec<(String, String)>,
    last_stdout: String,
}

impl Container {
    pub async fn start(runtime: Arc<dyn ContainerRuntime>, spec: &ContainerSpec) -> Result<Self> {
        let id = runtime.create(spec).await?;
        debug!(container = %id, image = %spec.image, platform = %spec.platform, "container started");
        Ok(Self {
            runtime,
            id,
            env: Vec::new(),
            last_stdout: String::new(),
        })
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Add an environment variable applied to every subsequent command.
    /// Values may reference earlier container variables with `${NAME}`.
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run one pipeline step. A non-zero exit aborts the pipeline with
    /// the tool's captured output as the error payload.
    pub async fn run<I, S>(&mut self, argv: I) -> Result<&str>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = ExecSpec::new(argv);
        spec.env = self.env.clone();
        debug!(container = %self.id, command = %spec.command_line(), "pipeline step");

        let output = self.runtime.exec(&self.id, &spec).await?;
        if !output.success() {
            return Err(ToolError::CommandFailed {
                command: spec.command_line(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            }
            .into());
        }
        self.last_stdout = output.stdout;
        Ok(&self.last_stdout)
    }

    /// Standard output of the most recent successful step
    pub fn last_stdout(&self) -> &str {
        &self.last_stdout
    }

    /// Whether a file named exactly `descriptor.file_name()` exists
    /// directly under its output directory. A same-named directory is
    /// indistinguishable from the file under this check.
    pub async fn has_file(&self, descriptor: &TemplateDescriptor) -> Result<bool> {
        let entries = self
            .runtime
            .entries(&self.id, descriptor.output_directory())
            .await?;
        Ok(entries.iter().any(|entry| entry == descriptor.file_name()))
    }

    /// Place a rendered template unless the target already exists.
    /// Returns whether the file was written. Idempotent.
    pub async fn ensure_file(&self, rendered: &RenderedTemplate) -> Result<bool> {
        let path = rendered.descriptor.output_path();
        let written = self
            .runtime
            .write_file_if_absent(&self.id, &path, &rendered.contents)
            .await?;
        if written {
            debug!(container = %self.id, path = %path.display(), "scaffolded file");
        }
        Ok(written)
    }

    pub async fn read_file(&self, path: &Path) -> Result<String> {
        self.runtime.read_file(&self.id, path).await
    }

    /// Copy a host project tree into the container (the source is never
    /// mutated)
    pub async fn mount(&self, host_src: &Path, dest: &Path) -> Result<()> {
        self.runtime.copy_in(&self.id, host_src, dest).await
    }

    /// Export a container directory as a host artifact
    pub async fn export(&self, src: &Path) -> Result<ProjectArtifact> {
        let dir = TempDir::new()?;
        self.runtime.export(&self.id, src, dir.path()).await?;
        Ok(ProjectArtifact { dir })
    }

    /// Best-effort teardown; the engine reaps anything we miss
    pub async fn remove(self) {
        if let Err(error) = self.runtime.remove(&self.id).await {
            debug!(container = %self.id, %error, "container removal failed");
        }
    }
}
