// Error handling framework for kiln
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KilnError>;

/// Main error type for kiln
#[derive(Debug, Error)]
pub enum KilnError {
    #[error("Language discovery failed: {0}")]
    Discovery(#[from] Box<DiscoveryError>),

    #[error("Tool invocation failed: {0}")]
    Tool(#[from] Box<ToolError>),

    #[error("Template error: {0}")]
    Template(#[from] Box<TemplateError>),

    #[error("Manifest error: {0}")]
    Manifest(#[from] Box<ManifestError>),

    #[error("Container runtime error: {0}")]
    Runtime(#[from] Box<RuntimeError>),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Registry construction errors. These are configuration-time defects:
/// discovery aborts rather than producing a partial registry.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Unknown language: {name}")]
    UnknownLanguage {
        name: String,
        available_languages: Vec<String>,
    },

    #[error("No handler registered for language: {language}")]
    HandlerNotRegistered {
        language: String,
        available_languages: Vec<String>,
    },

    #[error("Invalid handler root directory: {path}")]
    InvalidRoot { path: PathBuf },
}

/// A toolchain command inside the container exited non-zero.
/// The captured output is surfaced verbatim so operators can diagnose
/// from the engine's own error surface.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Command failed: {command}\n{stdout}{stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// Template resource errors
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template resource not found: {name}")]
    NotFound { name: String },

    #[error("Unresolved template variable '{variable}' in {template}")]
    UnresolvedVariable { template: String, variable: String },
}

/// Project metadata file errors
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Invalid manifest syntax in {path}: {message}")]
    InvalidSyntax { path: PathBuf, message: String },

    #[error("Missing required field in {path}: {field}")]
    MissingField { path: PathBuf, field: String },
}

/// Container engine errors (engine missing, container lifecycle)
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Container engine not found: {command}")]
    EngineNotFound {
        command: String,
        suggestion: Option<String>,
    },

    #[error("Failed to spawn engine command: {command}")]
    SpawnFailed { command: String, error: String },

    #[error("Engine operation failed: {operation}")]
    OperationFailed { operation: String, stderr: String },

    #[error("Unknown container: {id}")]
    UnknownContainer { id: String },
}

impl From<DiscoveryError> for KilnError {
    fn from(err: DiscoveryError) -> Self {
        KilnError::Discovery(Box::new(err))
    }
}

impl From<ToolError> for KilnError {
    fn from(err: ToolError) -> Self {
        KilnError::Tool(Box::new(err))
    }
}

impl From<TemplateError> for KilnError {
    fn from(err: TemplateError) -> Self {
        KilnError::Template(Box::new(err))
    }
}

impl From<ManifestError> for KilnError {
    fn from(err: ManifestError) -> Self {
        KilnError::Manifest(Box::new(err))
    }
}

impl From<RuntimeError> for KilnError {
    fn from(err: RuntimeError) -> Self {
        KilnError::Runtime(Box::new(err))
    }
}

/// Exit codes used by the CLI surface
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

impl KilnError {
    /// Map an error to a process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            KilnError::Discovery(_) | KilnError::Template(_) | KilnError::Manifest(_) => {
                exit_codes::CONFIG_ERROR
            }
            _ => exit_codes::FAILURE,
        }
    }
}
