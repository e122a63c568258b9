//! Kiln Configuration System
//!
//! Loads the project description (`kiln.toml`) and turns it into the
//! immutable [`kiln_plan::PlanSettings`] of a configuration pass.
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones:
//! 1. Project config (`kiln.toml`, found by walking up from the start directory)
//! 2. Environment variables (`KILN_*`)
//! 3. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use kiln_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod arch;
pub mod loader;
pub mod project;

use kiln_plan::PlanError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error(transparent)]
    Plan(#[from] PlanError),
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use arch::gather_arch_list;
pub use loader::{Config, ConfigLoader, CONFIG_FILE_NAME};
pub use project::{
    AcceleratorConfig, ExecutableConfig, LibraryConfig, LibraryKind, ProjectConfig, RuntimeConfig,
    ToolchainConfig,
};
