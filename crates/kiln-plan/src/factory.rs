//! Executable target creation
use crate::error::{PlanError, PlanResult};
use crate::flags::compute_flags;
use crate::normalize::normalize;
use crate::plan::BuildPlan;
use crate::settings::PlanSettings;
use crate::targets::{LinkItem, Scope, Target, TargetKind};
use crate::toolchain::Toolchain;
use std::path::PathBuf;

/// Install destination of every executable
pub const BINARY_DESTINATION: &str = "bin";

/// Split executable arguments into a target name and its sources.
///
/// A single argument is a source file and the name is its stem
/// (`"tools/foo.cc"` becomes `foo`). With more arguments the first is the
/// name and the rest are sources.
pub fn resolve_executable_args<S: AsRef<str>>(args: &[S]) -> PlanResult<(String, Vec<PathBuf>)> {
    match args {
        [] => Err(PlanError::InvalidArguments(
            "expected a source file, or a target name followed by source files".to_string(),
        )),
        [source] => {
            let source = PathBuf::from(source.as_ref());
            let name = source
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    PlanError::InvalidArguments(format!(
                        "cannot derive a target name from '{}'",
                        source.display()
                    ))
                })?
                .to_string();
            Ok((name, vec![source]))
        }
        [name, sources @ ..] => Ok((
            name.as_ref().to_string(),
            sources.iter().map(|s| PathBuf::from(s.as_ref())).collect(),
        )),
    }
}

/// Compute toolchain flags and apply linkage overrides to a target
pub fn finish_target(target: &mut Target, toolchain: &Toolchain) {
    target.flag_profile = Some(compute_flags(target, &toolchain.identity));
    normalize(target, toolchain);
}

/// Creates executables wired to the core runtime and module libraries
#[derive(Debug, Clone, Copy)]
pub struct BinaryTargetFactory<'s> {
    settings: &'s PlanSettings,
}

impl<'s> BinaryTargetFactory<'s> {
    pub fn new(settings: &'s PlanSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &'s PlanSettings {
        self.settings
    }

    /// Create an executable from `args` (see [`resolve_executable_args`])
    pub fn create_executable<'p, S: AsRef<str>>(
        &self,
        plan: &'p mut BuildPlan,
        args: &[S],
    ) -> PlanResult<&'p mut Target> {
        let (name, sources) = resolve_executable_args(args)?;
        self.create(plan, name, sources)
    }

    fn create<'p>(
        &self,
        plan: &'p mut BuildPlan,
        name: String,
        sources: Vec<PathBuf>,
    ) -> PlanResult<&'p mut Target> {
        let mut target = Target::new(name, TargetKind::Executable).with_sources(sources);

        target.link(
            Scope::Private,
            LinkItem::target(&self.settings.core_library),
        );
        if let Some(modules) = &self.settings.modules {
            for module in modules.iter() {
                target.link(Scope::Private, LinkItem::target(module));
            }
        }
        for dir in &self.settings.accelerator.include_dirs {
            target.add_include_directory(Scope::Public, dir.clone());
        }
        target.install_destination = Some(BINARY_DESTINATION.to_string());

        finish_target(&mut target, &self.settings.toolchain);

        tracing::debug!(
            target = %target.name,
            sources = target.sources.len(),
            "created executable"
        );
        plan.add_target(target)
    }
}
