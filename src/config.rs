// SDK configuration: engine command, container layout and defaults
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ManifestError, Result};

/// Top-level configuration, loadable from `kiln.toml`.
///
/// Every field has a default so an absent config file yields a fully
/// usable configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SdkConfig {
    /// Container engine binary name (resolved through PATH)
    pub engine_command: String,
    /// Base OS image for every pipeline environment
    pub base_image: String,
    /// Named cache volume shared by concurrent invocations
    pub cache_volume: String,
    /// Mount point of the dependency cache inside the container
    pub cache_mount_path: PathBuf,
    /// Fixed absolute path the project tree is mounted at
    pub project_root: PathBuf,
    /// Source folder name under the project root
    pub source_folder: String,
    /// Distributable artifact folder name under the project root
    pub dist_folder: String,
    /// Isolated dependency environment path inside the container
    pub venv_path: PathBuf,
    /// Default target platform ("os/arch"), passed through unvalidated
    pub default_platform: String,
    /// Per-command execution timeout in seconds
    pub exec_timeout_secs: u64,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            engine_command: "docker".to_string(),
            base_image: "debian:trixie-slim".to_string(),
            cache_volume: "kiln-uv-debian-trixie-slim".to_string(),
            cache_mount_path: PathBuf::from("/root/.cache/uv"),
            project_root: PathBuf::from("/project"),
            source_folder: "src".to_string(),
            dist_folder: "dist".to_string(),
            venv_path: PathBuf::from("/opt/venv_kiln"),
            default_platform: "linux/amd64".to_string(),
            exec_timeout_secs: 600,
        }
    }
}

impl SdkConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SdkConfig =
            toml::from_str(&contents).map_err(|e| ManifestError::InvalidSyntax {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(config)
    }

    /// Load `kiln.toml` from the current directory if present, else defaults
    pub fn load_or_default() -> Result<Self> {
        let path = Path::new("kiln.toml");
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Project source path inside the container
    pub fn project_source_path(&self) -> PathBuf {
        self.project_root.join(&self.source_folder)
    }

    /// Distributable output path inside the container, partitioned by platform
    pub fn project_dist_path(&self, platform: &str) -> PathBuf {
        self.project_root.join(&self.dist_folder).join(platform)
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = SdkConfig::default();
        assert_eq!(config.project_root, PathBuf::from("/project"));
        assert_eq!(config.project_source_path(), PathBuf::from("/project/src"));
        assert_eq!(
            config.project_dist_path("linux/amd64"),
            PathBuf::from("/project/dist/linux/amd64")
        );
        assert_eq!(config.default_platform, "linux/amd64");
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: SdkConfig =
            toml::from_str("engine_command = \"podman\"\nexec_timeout_secs = 30").unwrap();
        assert_eq!(config.engine_command, "podman");
        assert_eq!(config.exec_timeout(), Duration::from_secs(30));
        // Untouched fields keep their defaults
        assert_eq!(config.base_image, "debian:trixie-slim");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed: std::result::Result<SdkConfig, _> = toml::from_str("no_such_field = 1");
        assert!(parsed.is_err());
    }
}
