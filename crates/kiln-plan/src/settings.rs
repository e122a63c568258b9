//! Settings shared by every step of a configuration pass
//!
//! A [`PlanSettings`] value is built once, before any target is created, and
//! is only read afterwards.

use crate::accel::{AcceleratorBackend, ArchFlagResolver};
use crate::toolchain::Toolchain;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the core runtime library every executable links against
pub const DEFAULT_CORE_LIBRARY: &str = "kiln_runtime";

/// Ordered list of extra libraries every executable links against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleSet(Vec<String>);

impl ModuleSet {
    pub fn new(modules: Vec<String>) -> Self {
        Self(modules)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for ModuleSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Accelerator compile options and include path, supplied from outside
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceleratorSettings {
    /// Include directories of the accelerator runtime; empty when not configured
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    /// Compile options for accelerator sources
    #[serde(default)]
    pub compile_options: Vec<String>,
}

impl AcceleratorSettings {
    /// Append the codegen flags `resolver` produces for `architectures`
    pub fn with_codegen_flags(
        mut self,
        resolver: &dyn ArchFlagResolver,
        backend: AcceleratorBackend,
        architectures: &[String],
    ) -> Self {
        if backend.is_active() && !architectures.is_empty() {
            self.compile_options
                .extend(resolver.codegen_flags(backend, architectures));
        }
        self
    }

    pub fn has_include_dirs(&self) -> bool {
        !self.include_dirs.is_empty()
    }
}

/// Immutable inputs of a configuration pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSettings {
    pub toolchain: Toolchain,
    pub backend: AcceleratorBackend,
    pub core_library: String,
    pub modules: Option<ModuleSet>,
    pub accelerator: AcceleratorSettings,
}

impl PlanSettings {
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            backend: AcceleratorBackend::None,
            core_library: DEFAULT_CORE_LIBRARY.to_string(),
            modules: None,
            accelerator: AcceleratorSettings::default(),
        }
    }

    pub fn with_backend(mut self, backend: AcceleratorBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_core_library(mut self, name: impl Into<String>) -> Self {
        self.core_library = name.into();
        self
    }

    pub fn with_modules(mut self, modules: ModuleSet) -> Self {
        self.modules = Some(modules);
        self
    }

    pub fn with_accelerator(mut self, accelerator: AcceleratorSettings) -> Self {
        self.accelerator = accelerator;
        self
    }
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self::new(Toolchain::default())
    }
}
