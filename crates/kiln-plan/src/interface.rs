//! Interface proxy libraries
//!
//! A proxy is a sourceless target that consumers link against instead of a
//! real library. Linking the proxy keeps every symbol of the library on the
//! final link line, even symbols the consumer never references directly
//! (static registration objects, for example), and carries the library's own
//! link dependencies along with it.
//!
//! How symbols are retained depends on the linker:
//!
//! | source | toolchain            | link entries                                              |
//! |--------|----------------------|-----------------------------------------------------------|
//! | static | Apple platforms      | `-Wl,-force_load,<archive>`                               |
//! | static | MSVC                 | `<archive>` plus link option `-WHOLEARCHIVE:<archive>`    |
//! | static | everything else      | `-Wl,--whole-archive <archive> -Wl,--no-whole-archive`    |
//! | shared | GNU                  | `-Wl,--no-as-needed <library> -Wl,--as-needed`            |
//! | shared | everything else      | plain reference to the library                            |
//!
//! The proxy's compile definitions, options and include directories are not
//! copied: the proxy stores the source's name and [`BuildPlan::resolve`]
//! reads the source's properties when the plan is evaluated.

use crate::error::{PlanError, PlanResult};
use crate::plan::BuildPlan;
use crate::targets::{LinkItem, Scope, Target, TargetKind};
use crate::toolchain::{CompilerIdentity, Vendor};

/// How a static archive is kept whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveRetention {
    /// `-force_load` with the archive path
    ForceLoad,
    /// MSVC `/WHOLEARCHIVE:` link option
    WholeArchiveOption,
    /// `--whole-archive` switched on for this archive only
    WholeArchiveBracket,
}

impl ArchiveRetention {
    pub fn for_identity(identity: &CompilerIdentity) -> Self {
        if identity.platform.is_apple() {
            Self::ForceLoad
        } else if identity.vendor == Vendor::Msvc {
            Self::WholeArchiveOption
        } else {
            Self::WholeArchiveBracket
        }
    }
}

/// How a shared library reference survives as-needed pruning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedRetention {
    /// `--no-as-needed` switched on for this library only
    NoAsNeededBracket,
    /// The linker does not prune by default
    Plain,
}

impl SharedRetention {
    pub fn for_identity(identity: &CompilerIdentity) -> Self {
        if identity.vendor == Vendor::Gnu {
            Self::NoAsNeededBracket
        } else {
            Self::Plain
        }
    }
}

/// Conventional proxy name for a library
pub fn proxy_name(source: &str) -> String {
    format!("{}_library", source)
}

/// Create a proxy for `source` named after it (see [`proxy_name`])
pub fn wrap<'p>(
    plan: &'p mut BuildPlan,
    source: &str,
    identity: &CompilerIdentity,
) -> PlanResult<&'p Target> {
    let name = proxy_name(source);
    wrap_as(plan, source, &name, identity)
}

/// Create a proxy named `proxy` for the library `source`.
///
/// Fails without registering anything when `source` is not a static or
/// shared library.
pub fn wrap_as<'p>(
    plan: &'p mut BuildPlan,
    source: &str,
    proxy: &str,
    identity: &CompilerIdentity,
) -> PlanResult<&'p Target> {
    let kind = plan.target(source)?.kind;

    let mut target = Target::new(proxy, TargetKind::InterfaceProxy);
    target.proxy_source = Some(source.to_string());
    target.add_dependency(source);

    match kind {
        TargetKind::StaticLibrary => {
            retain_archive(&mut target, source, ArchiveRetention::for_identity(identity));
            // resolved later: the archive's own dependencies may still change
            target.link(Scope::Interface, LinkItem::LinkLibrariesOf(source.to_string()));
        }
        TargetKind::SharedLibrary => match SharedRetention::for_identity(identity) {
            SharedRetention::NoAsNeededBracket => {
                target.link(Scope::Interface, LinkItem::flag("-Wl,--no-as-needed"));
                target.link(Scope::Interface, LinkItem::target_file(source));
                target.link(Scope::Interface, LinkItem::flag("-Wl,--as-needed"));
                target.link(
                    Scope::Interface,
                    LinkItem::InterfaceLinkLibrariesOf(source.to_string()),
                );
            }
            // a target reference already carries the interface link libraries
            SharedRetention::Plain => target.link(Scope::Interface, LinkItem::target(source)),
        },
        other => return Err(PlanError::unsupported_proxy_source(source, other)),
    }

    tracing::debug!(proxy, source, kind = %kind, "created interface proxy");
    let target = plan.add_target(target)?;
    Ok(target)
}

fn retain_archive(target: &mut Target, source: &str, retention: ArchiveRetention) {
    match retention {
        ArchiveRetention::ForceLoad => {
            target.link(
                Scope::Interface,
                LinkItem::prefixed_target_file("-Wl,-force_load,", source),
            );
        }
        ArchiveRetention::WholeArchiveOption => {
            target.link(Scope::Interface, LinkItem::target_file(source));
            target.add_link_option(
                Scope::Interface,
                LinkItem::prefixed_target_file("-WHOLEARCHIVE:", source),
            );
        }
        ArchiveRetention::WholeArchiveBracket => {
            target.link(Scope::Interface, LinkItem::flag("-Wl,--whole-archive"));
            target.link(Scope::Interface, LinkItem::target_file(source));
            target.link(Scope::Interface, LinkItem::flag("-Wl,--no-whole-archive"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::Platform;
    use pretty_assertions::assert_eq;

    fn plan_with(kind: TargetKind) -> BuildPlan {
        let mut plan = BuildPlan::new();
        plan.add_target(Target::new("core", kind)).unwrap();
        plan
    }

    #[test]
    fn test_retention_selection() {
        let linux = CompilerIdentity::new(Vendor::Gnu, Platform::Linux);
        let mac = CompilerIdentity::new(Vendor::AppleClang, Platform::MacOs);
        let windows = CompilerIdentity::new(Vendor::Msvc, Platform::Windows);
        let clang = CompilerIdentity::new(Vendor::Clang, Platform::Linux);

        assert_eq!(
            ArchiveRetention::for_identity(&linux),
            ArchiveRetention::WholeArchiveBracket
        );
        assert_eq!(ArchiveRetention::for_identity(&mac), ArchiveRetention::ForceLoad);
        assert_eq!(
            ArchiveRetention::for_identity(&windows),
            ArchiveRetention::WholeArchiveOption
        );
        assert_eq!(
            SharedRetention::for_identity(&linux),
            SharedRetention::NoAsNeededBracket
        );
        assert_eq!(SharedRetention::for_identity(&clang), SharedRetention::Plain);
    }

    #[test]
    fn test_proxy_depends_on_source() {
        let mut plan = plan_with(TargetKind::StaticLibrary);
        let proxy = wrap(&mut plan, "core", &CompilerIdentity::default()).unwrap();

        assert_eq!(proxy.name, "core_library");
        assert_eq!(proxy.kind, TargetKind::InterfaceProxy);
        assert_eq!(proxy.dependencies, vec!["core".to_string()]);
        assert_eq!(proxy.proxy_source.as_deref(), Some("core"));
        assert!(proxy.sources.is_empty());
    }

    #[test]
    fn test_static_bracket_entries() {
        let mut plan = plan_with(TargetKind::StaticLibrary);
        let proxy = wrap(&mut plan, "core", &CompilerIdentity::default()).unwrap();
        let items: Vec<_> = proxy.link_libraries.iter().map(|s| s.value.clone()).collect();

        assert_eq!(
            items,
            vec![
                LinkItem::flag("-Wl,--whole-archive"),
                LinkItem::target_file("core"),
                LinkItem::flag("-Wl,--no-whole-archive"),
                LinkItem::LinkLibrariesOf("core".to_string()),
            ]
        );
        assert!(proxy
            .link_libraries
            .iter()
            .all(|s| s.scope == Scope::Interface));
    }

    #[test]
    fn test_msvc_uses_link_option() {
        let mut plan = plan_with(TargetKind::StaticLibrary);
        let identity = CompilerIdentity::new(Vendor::Msvc, Platform::Windows);
        let proxy = wrap(&mut plan, "core", &identity).unwrap();

        assert_eq!(
            proxy.link_options[0].value,
            LinkItem::prefixed_target_file("-WHOLEARCHIVE:", "core")
        );
        assert_eq!(proxy.link_libraries[0].value, LinkItem::target_file("core"));
    }

    #[test]
    fn test_shared_plain_reference() {
        let mut plan = plan_with(TargetKind::SharedLibrary);
        let identity = CompilerIdentity::new(Vendor::Clang, Platform::Linux);
        let proxy = wrap(&mut plan, "core", &identity).unwrap();

        assert_eq!(proxy.link_libraries.len(), 1);
        assert_eq!(proxy.link_libraries[0].value, LinkItem::target("core"));
    }

    #[test]
    fn test_unsupported_kind_registers_nothing() {
        let mut plan = plan_with(TargetKind::Executable);
        let err = wrap(&mut plan, "core", &CompilerIdentity::default()).unwrap_err();

        assert_eq!(
            err,
            PlanError::UnsupportedProxySource {
                target: "core".to_string(),
                kind: TargetKind::Executable,
            }
        );
        assert!(err.to_string().contains("'core'"));
        assert!(err.to_string().contains("executable"));
        assert!(!plan.contains("core_library"));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_proxy_of_proxy_is_rejected() {
        let mut plan = plan_with(TargetKind::StaticLibrary);
        wrap(&mut plan, "core", &CompilerIdentity::default()).unwrap();
        let err = wrap(&mut plan, "core_library", &CompilerIdentity::default()).unwrap_err();

        assert!(matches!(
            err,
            PlanError::UnsupportedProxySource {
                kind: TargetKind::InterfaceProxy,
                ..
            }
        ));
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_missing_source() {
        let mut plan = BuildPlan::new();
        let err = wrap(&mut plan, "ghost", &CompilerIdentity::default()).unwrap_err();
        assert!(matches!(err, PlanError::TargetNotFound { .. }));
    }

    #[test]
    fn test_wrap_twice_is_duplicate() {
        let mut plan = plan_with(TargetKind::SharedLibrary);
        wrap(&mut plan, "core", &CompilerIdentity::default()).unwrap();
        let err = wrap(&mut plan, "core", &CompilerIdentity::default()).unwrap_err();
        assert!(matches!(err, PlanError::DuplicateTarget { .. }));
    }
}
