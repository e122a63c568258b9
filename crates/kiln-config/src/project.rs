//! Project Configuration (kiln.toml)
//!
//! Handles the project description stored in `kiln.toml` at the project root:
//! toolchain choices, the accelerator backend, the runtime libraries every
//! executable links against, and the libraries and executables to plan.

use crate::{ConfigError, ConfigResult};
use kiln_plan::{BuildType, Platform, TargetKind, Vendor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Project configuration from kiln.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Compiler and build type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<ToolchainConfig>,

    /// GPU backend selection and settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<AcceleratorConfig>,

    /// Libraries linked into every executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeConfig>,

    /// Declared libraries, in declaration order
    #[serde(default, rename = "library")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<LibraryConfig>,

    /// Declared executables, in declaration order
    #[serde(default, rename = "executable")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub executables: Vec<ExecutableConfig>,
}

/// Toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Compiler vendor (default: the platform's native compiler)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Vendor>,

    /// Target platform (default: host)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Build type (default: release)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_type: Option<BuildType>,

    /// Address sanitizer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitize: Option<bool>,

    /// Treat warnings as errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub werror: Option<bool>,

    /// MSVC: embed debug info in object files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_debug_info: Option<bool>,

    /// The math library uses the multi-threaded OpenMP runtime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threaded_math_runtime: Option<bool>,
}

/// Accelerator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct AcceleratorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_cuda: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_rocm: Option<bool>,

    /// Accelerator runtime include directories
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_dirs: Vec<PathBuf>,

    /// Extra compile options for accelerated targets
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compile_options: Vec<String>,

    /// GPU architectures to generate code for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch_list: Option<Vec<String>>,

    /// Deprecated spelling of `arch_list`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch_name: Option<String>,
}

/// Runtime libraries configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Core runtime library (default: kiln_runtime)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_library: Option<String>,

    /// Extra libraries linked after the core library, in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
}

/// Kind of a declared library
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    #[default]
    Static,
    Shared,
}

impl LibraryKind {
    pub fn target_kind(&self) -> TargetKind {
        match self {
            Self::Static => TargetKind::StaticLibrary,
            Self::Shared => TargetKind::SharedLibrary,
        }
    }
}

/// A `[[library]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    pub name: String,

    #[serde(default)]
    pub kind: LibraryKind,

    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// Include directories exposed to consumers
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_dirs: Vec<PathBuf>,

    /// Compile definitions exposed to consumers
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<String>,

    /// Libraries this library links against privately
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    /// Libraries this library links against and passes on to consumers
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub public_links: Vec<String>,

    /// Also create an interface proxy (`<name>_library`)
    #[serde(default)]
    pub wrap: bool,

    /// Build with the active accelerator backend
    #[serde(default)]
    pub accelerated: bool,
}

/// An `[[executable]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutableConfig {
    /// Target name; defaults to the stem of the only source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub sources: Vec<PathBuf>,

    /// Build with the active accelerator backend
    #[serde(default)]
    pub accelerated: bool,
}

impl ExecutableConfig {
    /// Arguments in executable-creation form: a lone source, or a name
    /// followed by sources
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.sources.len() + 1);
        if let Some(name) = &self.name {
            args.push(name.clone());
        }
        args.extend(self.sources.iter().map(|s| s.to_string_lossy().into_owned()));
        args
    }
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let mut names = HashSet::new();

        for lib in &self.libraries {
            if lib.name.is_empty() {
                return Err(ConfigError::invalid_value(
                    "library.name",
                    "name cannot be empty",
                ));
            }
            if !names.insert(lib.name.as_str()) {
                return Err(ConfigError::invalid_value(
                    "library.name",
                    format!("'{}' is declared more than once", lib.name),
                ));
            }
        }

        for exe in &self.executables {
            if exe.sources.is_empty() {
                return Err(ConfigError::invalid_value(
                    "executable.sources",
                    "an executable needs at least one source file",
                ));
            }
            if exe.name.is_none() && exe.sources.len() > 1 {
                return Err(ConfigError::invalid_value(
                    "executable.name",
                    "a name is required when there is more than one source file",
                ));
            }
        }

        if let Some(runtime) = &self.runtime {
            if runtime.core_library.as_deref() == Some("") {
                return Err(ConfigError::invalid_value(
                    "runtime.core_library",
                    "name cannot be empty",
                ));
            }
        }

        Ok(())
    }

    /// Get the toolchain section, creating it if absent
    pub fn toolchain_mut(&mut self) -> &mut ToolchainConfig {
        self.toolchain.get_or_insert_with(Default::default)
    }

    /// Get the accelerator section, creating it if absent
    pub fn accelerator_mut(&mut self) -> &mut AcceleratorConfig {
        self.accelerator.get_or_insert_with(Default::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(content: &str) -> ConfigResult<ProjectConfig> {
        let config: ProjectConfig = toml::from_str(content).map_err(|e| {
            ConfigError::TomlParseError {
                file: PathBuf::from("kiln.toml"),
                error: e,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_empty_config() {
        let config = parse("").unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
[toolchain]
vendor = "msvc"
platform = "windows"
build_type = "relwithdebinfo"
threaded_math_runtime = true

[accelerator]
use_rocm = true
include_dirs = ["/opt/rocm/include"]
arch_list = ["gfx90a", "gfx942"]

[runtime]
core_library = "core_library"
modules = ["vision", "audio"]

[[library]]
name = "core"
sources = ["core.cc"]
public_links = ["support"]
wrap = true

[[library]]
name = "ops"
kind = "shared"
sources = ["ops.hip"]
accelerated = true

[[executable]]
sources = ["tools/convert.cc"]

[[executable]]
name = "bench"
sources = ["bench.cc", "timer.cc"]
accelerated = true
"#,
        )
        .unwrap();

        let toolchain = config.toolchain.as_ref().unwrap();
        assert_eq!(toolchain.vendor, Some(Vendor::Msvc));
        assert_eq!(toolchain.platform, Some(Platform::Windows));
        assert_eq!(toolchain.build_type, Some(BuildType::RelWithDebInfo));

        assert_eq!(config.libraries.len(), 2);
        assert_eq!(config.libraries[0].kind, LibraryKind::Static);
        assert!(config.libraries[0].wrap);
        assert_eq!(config.libraries[1].kind.target_kind(), TargetKind::SharedLibrary);

        assert_eq!(config.executables[0].to_args(), vec!["tools/convert.cc"]);
        assert_eq!(
            config.executables[1].to_args(),
            vec!["bench", "bench.cc", "timer.cc"]
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse("[toolchain]\noptimize = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
    }

    #[test]
    fn test_unknown_vendor_rejected() {
        let err = parse("[toolchain]\nvendor = \"icc\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
    }

    #[test]
    fn test_duplicate_library_rejected() {
        let err = parse(
            r#"
[[library]]
name = "core"

[[library]]
name = "core"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("declared more than once"));
    }

    #[test]
    fn test_executable_without_sources_rejected() {
        let err = parse("[[executable]]\nname = \"tool\"\nsources = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_unnamed_multi_source_executable_rejected() {
        let err = parse("[[executable]]\nsources = [\"a.cc\", \"b.cc\"]\n").unwrap_err();
        assert!(err.to_string().contains("executable.name"));
    }
}
