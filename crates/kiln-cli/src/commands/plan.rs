//! Plan command - turn kiln.toml into a resolved build plan

use crate::codegen::CodegenFlags;
use anyhow::{Context, Result};
use kiln_config::{Config, ConfigLoader, LibraryConfig, ProjectConfig};
use kiln_plan::{
    finish_target, wrap, AcceleratorMultiplexer, BinaryTargetFactory, BuildPlan, DeviceToolkit,
    LinkItem, PlanSettings, Scope, Target,
};
use std::fs;
use std::path::PathBuf;

/// Plan command arguments
pub struct PlanArgs {
    /// Directory to start the kiln.toml search from
    pub project_dir: PathBuf,
    /// Explicit config file
    pub config_path: Option<PathBuf>,
    /// Output file (stdout when absent)
    pub output: Option<PathBuf>,
    /// Print the build order instead of the full plan
    pub order_only: bool,
}

/// Run the plan command
pub fn run(args: PlanArgs) -> Result<()> {
    let loader = ConfigLoader::new();
    let config: Config = match &args.config_path {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => loader
            .load_from_directory(&args.project_dir)
            .context("Failed to load project configuration")?,
    };

    let settings = config
        .to_settings(&CodegenFlags)
        .context("Invalid project configuration")?;

    let mut plan = BuildPlan::new();
    populate(&mut plan, &config.project, &settings)?;

    let resolved = plan
        .resolve(settings.toolchain.identity.platform)
        .context("Failed to resolve build plan")?;

    let rendered = if args.order_only {
        resolved.build_order.join("\n")
    } else {
        resolved.to_json()?
    };

    match &args.output {
        Some(path) => {
            fs::write(path, rendered + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), targets = resolved.targets.len(), "wrote plan");
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// Create every library and executable the project declares
pub fn populate(plan: &mut BuildPlan, project: &ProjectConfig, settings: &PlanSettings) -> Result<()> {
    let toolkit = DeviceToolkit::new(settings.toolchain, settings.accelerator.compile_options.clone());
    let mux = AcceleratorMultiplexer::new(settings, &toolkit, &toolkit);
    let factory = BinaryTargetFactory::new(settings);

    for lib in &project.libraries {
        let kind = lib.kind.target_kind();

        if lib.accelerated {
            let sources: Vec<String> = lib
                .sources
                .iter()
                .map(|s| s.to_string_lossy().into_owned())
                .collect();
            if mux
                .create_accelerated_library(plan, &lib.name, kind, &sources)?
                .is_none()
            {
                tracing::warn!(library = %lib.name, "no accelerator backend, library skipped");
                continue;
            }
        } else {
            let mut target = Target::new(&lib.name, kind).with_sources(lib.sources.clone());
            finish_target(&mut target, &settings.toolchain);
            plan.add_target(target)?;
        }

        apply_usage(plan.target_mut(&lib.name)?, lib);

        if lib.wrap {
            wrap(plan, &lib.name, &settings.toolchain.identity)
                .with_context(|| format!("Failed to wrap library '{}'", lib.name))?;
        }
    }

    for exe in &project.executables {
        let args = exe.to_args();
        if exe.accelerated {
            if mux.create_accelerated_executable(plan, &args)?.is_none() {
                tracing::warn!(args = ?args, "no accelerator backend, executable skipped");
            }
        } else {
            factory.create_executable(plan, &args)?;
        }
    }

    Ok(())
}

fn apply_usage(target: &mut Target, lib: &LibraryConfig) {
    for dir in &lib.include_dirs {
        target.add_include_directory(Scope::Public, dir.clone());
    }
    for definition in &lib.definitions {
        target.add_compile_definition(Scope::Public, definition.clone());
    }
    for name in &lib.links {
        target.link(Scope::Private, LinkItem::target(name));
    }
    for name in &lib.public_links {
        target.link(Scope::Public, LinkItem::target(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::{ExecutableConfig, LibraryKind};
    use kiln_plan::{AcceleratorBackend, CompilerIdentity, Platform, TargetKind, Toolchain, Vendor};

    fn library(name: &str) -> LibraryConfig {
        LibraryConfig {
            name: name.to_string(),
            kind: LibraryKind::Static,
            sources: vec![PathBuf::from(format!("{}.cc", name))],
            include_dirs: Vec::new(),
            definitions: Vec::new(),
            links: Vec::new(),
            public_links: Vec::new(),
            wrap: false,
            accelerated: false,
        }
    }

    fn gnu_settings() -> PlanSettings {
        PlanSettings::new(Toolchain::new(CompilerIdentity::new(Vendor::Gnu, Platform::Linux)))
            .with_core_library("core_library")
    }

    #[test]
    fn test_wrapped_library_is_linked_whole() {
        let mut core = library("core");
        core.wrap = true;
        core.links = vec!["pthread".to_string()];
        let project = ProjectConfig {
            libraries: vec![core],
            executables: vec![ExecutableConfig {
                name: None,
                sources: vec![PathBuf::from("app.cc")],
                accelerated: false,
            }],
            ..Default::default()
        };

        let mut plan = BuildPlan::new();
        populate(&mut plan, &project, &gnu_settings()).unwrap();
        let resolved = plan.resolve(Platform::Linux).unwrap();

        assert_eq!(
            resolved.get("app").unwrap().link_line,
            vec![
                "-Wl,--whole-archive",
                "lib/libcore.a",
                "-Wl,--no-whole-archive",
                "pthread",
            ]
        );
    }

    #[test]
    fn test_accelerated_targets_skipped_without_backend() {
        let mut ops = library("ops");
        ops.accelerated = true;
        let project = ProjectConfig {
            libraries: vec![ops],
            executables: vec![ExecutableConfig {
                name: None,
                sources: vec![PathBuf::from("kernels.cu")],
                accelerated: true,
            }],
            ..Default::default()
        };

        let mut plan = BuildPlan::new();
        populate(&mut plan, &project, &gnu_settings()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_accelerated_library_with_cuda() {
        let mut ops = library("ops");
        ops.accelerated = true;
        ops.kind = LibraryKind::Shared;
        ops.include_dirs = vec![PathBuf::from("include/ops")];
        let project = ProjectConfig {
            libraries: vec![ops],
            ..Default::default()
        };

        let settings = gnu_settings().with_backend(AcceleratorBackend::Cuda);
        let mut plan = BuildPlan::new();
        populate(&mut plan, &project, &settings).unwrap();

        let target = plan.get("ops").unwrap();
        assert_eq!(target.kind, TargetKind::SharedLibrary);
        assert_eq!(target.include_directories[0].scope, Scope::Public);
    }
}
