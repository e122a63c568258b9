//! Toolchain-specific linkage overrides

use crate::targets::Target;
use crate::toolchain::{BuildType, Toolchain, Vendor};

/// OpenMP runtime that MSVC links by default
const DEFAULT_OPENMP_RUNTIME: &str = "vcomp";

/// Apply linkage overrides required by `toolchain` to `target`.
///
/// With MSVC and the multi-threaded math runtime, the compiler's own OpenMP
/// runtime must not be linked in any configuration. Debug builds name the
/// debug variant of the library. Every other toolchain is left untouched.
///
/// The per-configuration flags are replaced, so applying this more than once
/// leaves the target unchanged.
pub fn normalize(target: &mut Target, toolchain: &Toolchain) {
    if toolchain.identity.vendor != Vendor::Msvc || !toolchain.threaded_math_runtime {
        return;
    }

    for build_type in BuildType::ALL {
        let library = if build_type == BuildType::Debug {
            format!("{}d", DEFAULT_OPENMP_RUNTIME)
        } else {
            DEFAULT_OPENMP_RUNTIME.to_string()
        };
        target
            .config_link_flags
            .insert(build_type, vec![format!("/NODEFAULTLIB:{}", library)]);
    }

    tracing::debug!(target = %target.name, "suppressed default OpenMP runtime");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::TargetKind;
    use crate::toolchain::{CompilerIdentity, Platform};
    use pretty_assertions::assert_eq;

    fn msvc_threaded() -> Toolchain {
        Toolchain::new(CompilerIdentity::new(Vendor::Msvc, Platform::Windows))
            .with_threaded_math_runtime(true)
    }

    #[test]
    fn test_suppresses_runtime_for_every_build_type() {
        let mut target = Target::new("core", TargetKind::SharedLibrary);
        normalize(&mut target, &msvc_threaded());

        assert_eq!(target.config_link_flags.len(), 4);
        for build_type in [
            BuildType::Release,
            BuildType::MinSizeRel,
            BuildType::RelWithDebInfo,
        ] {
            assert_eq!(
                target.config_link_flags[&build_type],
                vec!["/NODEFAULTLIB:vcomp".to_string()]
            );
        }
        assert_eq!(
            target.config_link_flags[&BuildType::Debug],
            vec!["/NODEFAULTLIB:vcompd".to_string()]
        );
    }

    #[test]
    fn test_noop_without_threaded_runtime() {
        let toolchain = Toolchain::new(CompilerIdentity::new(Vendor::Msvc, Platform::Windows));
        let mut target = Target::new("core", TargetKind::SharedLibrary);
        let before = target.clone();
        normalize(&mut target, &toolchain);
        assert_eq!(target, before);
    }

    #[test]
    fn test_noop_on_other_vendors() {
        let toolchain = Toolchain::new(CompilerIdentity::new(Vendor::Clang, Platform::Windows))
            .with_threaded_math_runtime(true);
        let mut target = Target::new("core", TargetKind::SharedLibrary);
        normalize(&mut target, &toolchain);
        assert!(target.config_link_flags.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let mut once = Target::new("core", TargetKind::StaticLibrary);
        normalize(&mut once, &msvc_threaded());

        let mut twice = once.clone();
        normalize(&mut twice, &msvc_threaded());
        assert_eq!(once, twice);
    }
}
