//! Configuration Loader
//!
//! Finds and loads kiln.toml, applies environment overrides and produces the
//! [`PlanSettings`] for a configuration pass.

use crate::arch::gather_arch_list;
use crate::project::ProjectConfig;
use crate::ConfigResult;
use kiln_plan::{
    AcceleratorBackend, AcceleratorSettings, ArchFlagResolver, BuildType, CompilerIdentity,
    ModuleSet, PlanSettings, Platform, Toolchain, Vendor,
};
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

/// Configuration loader
///
/// Precedence, lowest first:
/// 1. Project config (kiln.toml)
/// 2. Environment variables (KILN_*)
/// 3. CLI flags (handled by caller)
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration, with environment overrides applied
    pub project: ProjectConfig,

    /// Project root directory (where kiln.toml was found)
    pub project_root: Option<PathBuf>,

    /// GPU architectures to generate code for
    pub arch_list: Vec<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find kiln.toml. Without one, the
    /// defaults apply.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        self.finish(project_config, project_root)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project_root = config_path.parent().map(|p| p.to_path_buf());
        self.finish(project_config, project_root)
    }

    fn finish(
        &self,
        project: ProjectConfig,
        project_root: Option<PathBuf>,
    ) -> ConfigResult<Config> {
        let project = self.apply_env_overrides(project)?;
        let arch_list = gather_arch_list(project.accelerator.as_ref());

        tracing::debug!(
            root = ?project_root,
            libraries = project.libraries.len(),
            executables = project.executables.len(),
            "loaded configuration"
        );

        Ok(Config {
            project,
            project_root,
            arch_list,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides to project config
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(build_type) = env::var("KILN_BUILD_TYPE") {
            config.toolchain_mut().build_type = Some(BuildType::from_str(&build_type)?);
        }

        if let Some(werror) = env_flag("KILN_WERROR") {
            config.toolchain_mut().werror = Some(werror);
        }

        if let Some(sanitize) = env_flag("KILN_SANITIZE") {
            config.toolchain_mut().sanitize = Some(sanitize);
        }

        if let Some(use_cuda) = env_flag("KILN_USE_CUDA") {
            config.accelerator_mut().use_cuda = Some(use_cuda);
        }

        if let Some(use_rocm) = env_flag("KILN_USE_ROCM") {
            config.accelerator_mut().use_rocm = Some(use_rocm);
        }

        Ok(config)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has kiln.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Effective toolchain
    pub fn toolchain(&self) -> Toolchain {
        let section = self.project.toolchain.clone().unwrap_or_default();
        let platform = section.platform.unwrap_or_else(Platform::host);
        let vendor = section.vendor.unwrap_or_else(|| Vendor::native(platform));

        let identity = CompilerIdentity::new(vendor, platform)
            .with_build_type(section.build_type.unwrap_or_default())
            .with_sanitizer(section.sanitize.unwrap_or(false))
            .with_warnings_as_errors(section.werror.unwrap_or(false))
            .with_embedded_debug_info(section.embedded_debug_info.unwrap_or(false));

        Toolchain::new(identity)
            .with_threaded_math_runtime(section.threaded_math_runtime.unwrap_or(false))
    }

    /// Effective accelerator backend
    pub fn backend(&self) -> ConfigResult<AcceleratorBackend> {
        let section = self.project.accelerator.clone().unwrap_or_default();
        let backend = AcceleratorBackend::from_selectors(
            section.use_cuda.unwrap_or(false),
            section.use_rocm.unwrap_or(false),
        )?;
        Ok(backend)
    }

    /// Build the settings of a configuration pass
    pub fn to_settings(&self, resolver: &dyn ArchFlagResolver) -> ConfigResult<PlanSettings> {
        let backend = self.backend()?;
        let mut settings = PlanSettings::new(self.toolchain()).with_backend(backend);

        if let Some(runtime) = &self.project.runtime {
            if let Some(core) = &runtime.core_library {
                settings = settings.with_core_library(core.clone());
            }
            if let Some(modules) = &runtime.modules {
                settings = settings.with_modules(ModuleSet::new(modules.clone()));
            }
        }

        if let Some(section) = &self.project.accelerator {
            let accelerator = AcceleratorSettings {
                include_dirs: section.include_dirs.clone(),
                compile_options: section.compile_options.clone(),
            }
            .with_codegen_flags(resolver, backend, &self.arch_list);
            settings = settings.with_accelerator(accelerator);
        }

        Ok(settings)
    }
}
