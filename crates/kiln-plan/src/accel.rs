//! Accelerator backend dispatch
//!
//! Callers create accelerated libraries and executables through
//! [`AcceleratorMultiplexer`] without knowing which GPU stack is active. The
//! multiplexer switches on the [`AcceleratorBackend`] it was built with and
//! hands the request to exactly one creation routine:
//!
//! - ROCm owns the accelerator flag set: executables come from the
//!   [`BinaryTargetFactory`] and then receive the accelerator options and
//!   include directories; libraries come from the ROCm toolkit.
//! - CUDA: the CUDA toolkit creates both.
//! - No backend: nothing is created.

use crate::error::{PlanError, PlanResult};
use crate::factory::{finish_target, resolve_executable_args, BinaryTargetFactory, BINARY_DESTINATION};
use crate::plan::BuildPlan;
use crate::settings::PlanSettings;
use crate::targets::{Scope, Target, TargetKind};
use crate::toolchain::Toolchain;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// GPU compute stack selected for a configuration pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceleratorBackend {
    #[default]
    None,
    Cuda,
    Rocm,
}

impl AcceleratorBackend {
    /// Build the backend from the two external on/off switches
    pub fn from_selectors(use_cuda: bool, use_rocm: bool) -> PlanResult<Self> {
        match (use_cuda, use_rocm) {
            (true, true) => Err(PlanError::ConflictingBackends),
            (true, false) => Ok(Self::Cuda),
            (false, true) => Ok(Self::Rocm),
            (false, false) => Ok(Self::None),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Cuda => "cuda",
            Self::Rocm => "rocm",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for AcceleratorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Turns GPU architecture names into backend codegen flags
pub trait ArchFlagResolver {
    fn codegen_flags(&self, backend: AcceleratorBackend, architectures: &[String]) -> Vec<String>;
}

/// Backend-specific target creation routine
pub trait AcceleratorToolkit {
    fn add_executable(
        &self,
        plan: &mut BuildPlan,
        name: &str,
        sources: &[PathBuf],
    ) -> PlanResult<()>;

    fn add_library(
        &self,
        plan: &mut BuildPlan,
        name: &str,
        kind: TargetKind,
        sources: &[PathBuf],
    ) -> PlanResult<()>;
}

/// Toolkit that registers device targets with a fixed set of codegen options
#[derive(Debug, Clone)]
pub struct DeviceToolkit {
    toolchain: Toolchain,
    codegen_options: Vec<String>,
}

impl DeviceToolkit {
    pub fn new(toolchain: Toolchain, codegen_options: Vec<String>) -> Self {
        Self {
            toolchain,
            codegen_options,
        }
    }

    fn register(&self, plan: &mut BuildPlan, mut target: Target) -> PlanResult<()> {
        for option in &self.codegen_options {
            target.add_compile_option(Scope::Private, option.clone());
        }
        finish_target(&mut target, &self.toolchain);
        plan.add_target(target)?;
        Ok(())
    }
}

impl AcceleratorToolkit for DeviceToolkit {
    fn add_executable(
        &self,
        plan: &mut BuildPlan,
        name: &str,
        sources: &[PathBuf],
    ) -> PlanResult<()> {
        let mut target =
            Target::new(name, TargetKind::Executable).with_sources(sources.to_vec());
        target.install_destination = Some(BINARY_DESTINATION.to_string());
        self.register(plan, target)
    }

    fn add_library(
        &self,
        plan: &mut BuildPlan,
        name: &str,
        kind: TargetKind,
        sources: &[PathBuf],
    ) -> PlanResult<()> {
        if !kind.is_library() {
            return Err(PlanError::InvalidTarget(format!(
                "accelerated library '{}' must be static or shared, not {}",
                name, kind
            )));
        }
        self.register(plan, Target::new(name, kind).with_sources(sources.to_vec()))
    }
}

/// Backend-agnostic creation of accelerated targets
pub struct AcceleratorMultiplexer<'a> {
    settings: &'a PlanSettings,
    cuda: &'a dyn AcceleratorToolkit,
    rocm: &'a dyn AcceleratorToolkit,
}

impl<'a> AcceleratorMultiplexer<'a> {
    pub fn new(
        settings: &'a PlanSettings,
        cuda: &'a dyn AcceleratorToolkit,
        rocm: &'a dyn AcceleratorToolkit,
    ) -> Self {
        Self {
            settings,
            cuda,
            rocm,
        }
    }

    pub fn backend(&self) -> AcceleratorBackend {
        self.settings.backend
    }

    /// Create an accelerated executable.
    ///
    /// `args` follows the executable convention: a single source file, or a
    /// name followed by sources. Returns the created target's name, or `None`
    /// when no backend is active.
    pub fn create_accelerated_executable<S: AsRef<str>>(
        &self,
        plan: &mut BuildPlan,
        args: &[S],
    ) -> PlanResult<Option<String>> {
        match self.settings.backend {
            AcceleratorBackend::Rocm => {
                let factory = BinaryTargetFactory::new(self.settings);
                let target = factory.create_executable(plan, args)?;
                let accelerator = &self.settings.accelerator;
                for option in &accelerator.compile_options {
                    target.add_compile_option(Scope::Private, option.clone());
                }
                // the factory already published these; only add what is missing
                for dir in &accelerator.include_dirs {
                    if !target.include_directories.iter().any(|d| &d.value == dir) {
                        target.add_include_directory(Scope::Private, dir.clone());
                    }
                }
                Ok(Some(target.name.clone()))
            }
            AcceleratorBackend::Cuda => {
                let (name, sources) = resolve_executable_args(args)?;
                self.cuda.add_executable(plan, &name, &sources)?;
                Ok(Some(name))
            }
            AcceleratorBackend::None => {
                tracing::debug!("no accelerator backend; skipping accelerated executable");
                Ok(None)
            }
        }
    }

    /// Create an accelerated library with the active backend's toolkit.
    /// Returns `None` when no backend is active.
    pub fn create_accelerated_library<S: AsRef<str>>(
        &self,
        plan: &mut BuildPlan,
        name: &str,
        kind: TargetKind,
        sources: &[S],
    ) -> PlanResult<Option<String>> {
        let toolkit = match self.settings.backend {
            AcceleratorBackend::Rocm => self.rocm,
            AcceleratorBackend::Cuda => self.cuda,
            AcceleratorBackend::None => {
                tracing::debug!(name, "no accelerator backend; skipping accelerated library");
                return Ok(None);
            }
        };
        let sources: Vec<PathBuf> = sources.iter().map(|s| PathBuf::from(s.as_ref())).collect();
        toolkit.add_library(plan, name, kind, &sources)?;
        Ok(Some(name.to_string()))
    }
}
