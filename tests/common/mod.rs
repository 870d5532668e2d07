// Shared test support: an in-memory container runtime with a scripted
// command table, so pipelines run without a container engine.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use kiln::error::{Result, RuntimeError};
use kiln::runtime::{ContainerId, ContainerRuntime, ContainerSpec, ExecOutput, ExecSpec};

#[derive(Debug, Default, Clone)]
struct ContainerFs {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
}

impl ContainerFs {
    fn add_dir(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.dirs.insert(current.clone());
        }
    }

    fn add_file(&mut self, path: PathBuf, contents: String) {
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.insert(path, contents);
    }

    fn entry_names(&self, dir: &Path) -> Vec<String> {
        let mut names = BTreeSet::new();
        for path in self.files.keys().chain(self.dirs.iter()) {
            if path.parent() == Some(dir) {
                if let Some(name) = path.file_name() {
                    names.insert(name.to_string_lossy().to_string());
                }
            }
        }
        names.into_iter().collect()
    }
}

#[derive(Debug, Default)]
struct StubState {
    next_id: u64,
    containers: HashMap<String, ContainerFs>,
}

/// Rule matched against the front of an exec argv
#[derive(Debug)]
struct CommandRule {
    prefix: Vec<String>,
    stdout: String,
    exit_code: i32,
    stderr: String,
}

/// In-memory [`ContainerRuntime`]: every command succeeds with empty
/// output unless a rule says otherwise; `mkdir` is emulated so the
/// directory listing used by scaffolding behaves.
#[derive(Debug, Default)]
pub struct StubRuntime {
    state: Mutex<StubState>,
    rules: Mutex<Vec<CommandRule>>,
    exec_log: Mutex<Vec<Vec<String>>>,
    created_specs: Mutex<Vec<ContainerSpec>>,
}

impl StubRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script stdout for commands starting with `prefix`
    pub fn on_command_stdout(&self, prefix: &[&str], stdout: &str) {
        self.rules.lock().unwrap().push(CommandRule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            stdout: stdout.to_string(),
            exit_code: 0,
            stderr: String::new(),
        });
    }

    /// Script a failure for commands starting with `prefix`
    pub fn on_command_failure(&self, prefix: &[&str], stdout: &str, stderr: &str) {
        self.rules.lock().unwrap().push(CommandRule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            stdout: stdout.to_string(),
            exit_code: 1,
            stderr: stderr.to_string(),
        });
    }

    /// Every command executed so far, across all containers
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.exec_log.lock().unwrap().clone()
    }

    pub fn ran_command(&self, prefix: &[&str]) -> bool {
        self.commands()
            .iter()
            .any(|argv| starts_with(argv, prefix))
    }

    /// Find the first executed command starting with `prefix`
    pub fn find_command(&self, prefix: &[&str]) -> Option<Vec<String>> {
        self.commands()
            .into_iter()
            .find(|argv| starts_with(argv, prefix))
    }

    pub fn created_platforms(&self) -> Vec<String> {
        self.created_specs
            .lock()
            .unwrap()
            .iter()
            .map(|spec| spec.platform.clone())
            .collect()
    }

    /// Containers created but not yet removed
    pub fn live_containers(&self) -> usize {
        self.state.lock().unwrap().containers.len()
    }

    fn with_fs<T>(&self, id: &ContainerId, f: impl FnOnce(&mut ContainerFs) -> T) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        let fs = state
            .containers
            .get_mut(&id.0)
            .ok_or_else(|| RuntimeError::UnknownContainer { id: id.0.clone() })?;
        Ok(f(fs))
    }
}

fn starts_with(argv: &[String], prefix: &[&str]) -> bool {
    argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| a == p)
}

fn rule_matches(argv: &[String], prefix: &[String]) -> bool {
    argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| a == p)
}

#[async_trait]
impl ContainerRuntime for StubRuntime {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        self.created_specs.lock().unwrap().push(spec.clone());
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("stub-{}", state.next_id);
        let mut fs = ContainerFs::default();
        if let Some(ref workdir) = spec.workdir {
            fs.add_dir(workdir);
        }
        state.containers.insert(id.clone(), fs);
        Ok(ContainerId(id))
    }

    async fn exec(&self, id: &ContainerId, spec: &ExecSpec) -> Result<ExecOutput> {
        self.exec_log.lock().unwrap().push(spec.argv.clone());

        if let Some(rule) = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| rule_matches(&spec.argv, &rule.prefix))
        {
            return Ok(ExecOutput {
                exit_code: Some(rule.exit_code),
                stdout: rule.stdout.clone(),
                stderr: rule.stderr.clone(),
            });
        }

        if spec.argv.first().map(String::as_str) == Some("mkdir") {
            self.with_fs(id, |fs| {
                for arg in spec.argv.iter().skip(1) {
                    if !arg.starts_with('-') {
                        fs.add_dir(Path::new(arg));
                    }
                }
            })?;
        }

        Ok(ExecOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn write_file_if_absent(
        &self,
        id: &ContainerId,
        path: &Path,
        contents: &str,
    ) -> Result<bool> {
        self.with_fs(id, |fs| {
            if fs.files.contains_key(path) || fs.dirs.contains(path) {
                false
            } else {
                fs.add_file(path.to_path_buf(), contents.to_string());
                true
            }
        })
    }

    async fn read_file(&self, id: &ContainerId, path: &Path) -> Result<String> {
        let contents = self.with_fs(id, |fs| fs.files.get(path).cloned())?;
        contents.ok_or_else(|| {
            RuntimeError::OperationFailed {
                operation: "read file".to_string(),
                stderr: format!("no such file: {}", path.display()),
            }
            .into()
        })
    }

    async fn entries(&self, id: &ContainerId, dir: &Path) -> Result<Vec<String>> {
        self.with_fs(id, |fs| {
            fs.add_dir(dir);
            fs.entry_names(dir)
        })
    }

    async fn copy_in(&self, id: &ContainerId, host_src: &Path, dest: &Path) -> Result<()> {
        fn walk(
            fs: &mut ContainerFs,
            host: &Path,
            dest: &Path,
        ) -> std::io::Result<()> {
            fs.add_dir(dest);
            for entry in std::fs::read_dir(host)? {
                let entry = entry?;
                let target = dest.join(entry.file_name());
                if entry.file_type()?.is_dir() {
                    walk(fs, &entry.path(), &target)?;
                } else {
                    let contents = std::fs::read_to_string(entry.path())?;
                    fs.add_file(target, contents);
                }
            }
            Ok(())
        }
        self.with_fs(id, |fs| walk(fs, host_src, dest))??;
        Ok(())
    }

    async fn export(&self, id: &ContainerId, src: &Path, host_dest: &Path) -> Result<()> {
        let snapshot = self.with_fs(id, |fs| fs.clone())?;
        for (path, contents) in &snapshot.files {
            if let Ok(relative) = path.strip_prefix(src) {
                let target = host_dest.join(relative);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(target, contents)?;
            }
        }
        Ok(())
    }

    async fn remove(&self, id: &ContainerId) -> Result<()> {
        self.state.lock().unwrap().containers.remove(&id.0);
        Ok(())
    }
}
