/// Build target types and their properties
use crate::flags::FlagProfile;
use crate::toolchain::{BuildType, Platform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Kind of build target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// Static archive
    StaticLibrary,
    /// Shared (dynamic) library
    SharedLibrary,
    /// Sourceless proxy that re-exposes another library
    InterfaceProxy,
    /// Executable program
    Executable,
}

impl TargetKind {
    /// Get the conventional output directory name for this target kind
    pub fn output_dir_name(&self) -> Option<&'static str> {
        match self {
            Self::StaticLibrary | Self::SharedLibrary => Some("lib"),
            Self::Executable => Some("bin"),
            Self::InterfaceProxy => None,
        }
    }

    /// Whether this kind produces a linkable library artifact
    pub fn is_library(&self) -> bool {
        matches!(self, Self::StaticLibrary | Self::SharedLibrary)
    }

    /// Whether targets of this kind compile their own sources
    pub fn has_compile_step(&self) -> bool {
        !matches!(self, Self::InterfaceProxy)
    }

    /// File name of the artifact a target of this kind produces on `platform`
    pub fn artifact_file_name(&self, name: &str, platform: Platform) -> Option<String> {
        let file = match (self, platform) {
            (Self::InterfaceProxy, _) => return None,
            (Self::StaticLibrary, Platform::Windows) => format!("{}.lib", name),
            (Self::StaticLibrary, _) => format!("lib{}.a", name),
            (Self::SharedLibrary, Platform::Windows) => format!("{}.dll", name),
            (Self::SharedLibrary, Platform::MacOs) => format!("lib{}.dylib", name),
            (Self::SharedLibrary, Platform::Linux) => format!("lib{}.so", name),
            (Self::Executable, Platform::Windows) => format!("{}.exe", name),
            (Self::Executable, _) => name.to_string(),
        };
        Some(file)
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaticLibrary => write!(f, "static library"),
            Self::SharedLibrary => write!(f, "shared library"),
            Self::InterfaceProxy => write!(f, "interface proxy"),
            Self::Executable => write!(f, "executable"),
        }
    }
}

/// Who a usage requirement applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The target itself only
    Private,
    /// The target and its consumers
    Public,
    /// Consumers only
    Interface,
}

impl Scope {
    pub fn applies_to_self(&self) -> bool {
        matches!(self, Self::Private | Self::Public)
    }

    pub fn visible_to_consumers(&self) -> bool {
        matches!(self, Self::Public | Self::Interface)
    }
}

/// A property value tagged with its scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoped<T> {
    pub scope: Scope,
    pub value: T,
}

impl<T> Scoped<T> {
    pub fn new(scope: Scope, value: T) -> Self {
        Self { scope, value }
    }
}

/// One entry on a link line
///
/// Target references are resolved when the plan is resolved, not when the
/// entry is added, so they may name targets that are declared later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum LinkItem {
    /// A plan target, or an external library when no such target exists
    Target(String),
    /// The artifact path of a target, with an optional flag prefix glued on
    TargetFile { target: String, prefix: String },
    /// A literal linker flag
    Flag(String),
    /// Every library the named target links against
    LinkLibrariesOf(String),
    /// The libraries the named target exposes to its consumers
    InterfaceLinkLibrariesOf(String),
}

impl LinkItem {
    pub fn target(name: impl Into<String>) -> Self {
        Self::Target(name.into())
    }

    pub fn flag(flag: impl Into<String>) -> Self {
        Self::Flag(flag.into())
    }

    pub fn target_file(target: impl Into<String>) -> Self {
        Self::TargetFile {
            target: target.into(),
            prefix: String::new(),
        }
    }

    pub fn prefixed_target_file(prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self::TargetFile {
            target: target.into(),
            prefix: prefix.into(),
        }
    }

    /// Name of the target this item refers to, if any
    pub fn referenced_target(&self) -> Option<&str> {
        match self {
            Self::Target(name)
            | Self::TargetFile { target: name, .. }
            | Self::LinkLibrariesOf(name)
            | Self::InterfaceLinkLibrariesOf(name) => Some(name),
            Self::Flag(_) => None,
        }
    }
}

/// A build target specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Target name
    pub name: String,
    /// Target kind
    pub kind: TargetKind,
    /// Source files to compile
    pub sources: Vec<PathBuf>,
    /// Build-order dependencies (target names)
    pub dependencies: Vec<String>,
    pub compile_definitions: Vec<Scoped<String>>,
    pub compile_options: Vec<Scoped<String>>,
    pub include_directories: Vec<Scoped<PathBuf>>,
    pub system_include_directories: Vec<Scoped<PathBuf>>,
    /// Link line entries
    pub link_libraries: Vec<Scoped<LinkItem>>,
    /// Linker options that are not libraries
    pub link_options: Vec<Scoped<LinkItem>>,
    /// Extra link flags per build type
    pub config_link_flags: BTreeMap<BuildType, Vec<String>>,
    /// Toolchain flags computed for this target
    pub flag_profile: Option<FlagProfile>,
    /// Installation destination (relative)
    pub install_destination: Option<String>,
    /// Name of the library an interface proxy stands in for
    pub proxy_source: Option<String>,
}

impl Target {
    /// Create a new build target
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sources: Vec::new(),
            dependencies: Vec::new(),
            compile_definitions: Vec::new(),
            compile_options: Vec::new(),
            include_directories: Vec::new(),
            system_include_directories: Vec::new(),
            link_libraries: Vec::new(),
            link_options: Vec::new(),
            config_link_flags: BTreeMap::new(),
            flag_profile: None,
            install_destination: None,
            proxy_source: None,
        }
    }

    /// Add source files
    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    /// Add build-order dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn add_compile_definition(&mut self, scope: Scope, definition: impl Into<String>) {
        self.compile_definitions
            .push(Scoped::new(scope, definition.into()));
    }

    pub fn add_compile_option(&mut self, scope: Scope, option: impl Into<String>) {
        self.compile_options.push(Scoped::new(scope, option.into()));
    }

    pub fn add_include_directory(&mut self, scope: Scope, dir: impl Into<PathBuf>) {
        self.include_directories.push(Scoped::new(scope, dir.into()));
    }

    pub fn add_system_include_directory(&mut self, scope: Scope, dir: impl Into<PathBuf>) {
        self.system_include_directories
            .push(Scoped::new(scope, dir.into()));
    }

    /// Append an entry to the link line
    pub fn link(&mut self, scope: Scope, item: LinkItem) {
        self.link_libraries.push(Scoped::new(scope, item));
    }

    pub fn add_link_option(&mut self, scope: Scope, item: LinkItem) {
        self.link_options.push(Scoped::new(scope, item));
    }

    /// Add a build-order dependency if it is not already present
    pub fn add_dependency(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
    }

    pub fn is_proxy(&self) -> bool {
        self.kind == TargetKind::InterfaceProxy
    }

    /// Get the artifact file name for this target
    pub fn artifact_file_name(&self, platform: Platform) -> Option<String> {
        self.kind.artifact_file_name(&self.name, platform)
    }

    /// Path of the artifact inside the build tree, always `/`-separated
    pub fn artifact_path(&self, platform: Platform) -> Option<String> {
        let dir = self.kind.output_dir_name()?;
        let file = self.artifact_file_name(platform)?;
        Some(format!("{}/{}", dir, file))
    }

    /// Validate the target configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Target name cannot be empty".to_string());
        }

        if self.is_proxy() {
            if !self.sources.is_empty() {
                return Err(format!(
                    "Interface proxy '{}' cannot have source files",
                    self.name
                ));
            }
            if self.proxy_source.is_none() {
                return Err(format!(
                    "Interface proxy '{}' does not name a source library",
                    self.name
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_target_kind_output_dir() {
        assert_eq!(TargetKind::StaticLibrary.output_dir_name(), Some("lib"));
        assert_eq!(TargetKind::SharedLibrary.output_dir_name(), Some("lib"));
        assert_eq!(TargetKind::Executable.output_dir_name(), Some("bin"));
        assert_eq!(TargetKind::InterfaceProxy.output_dir_name(), None);
    }

    #[rstest]
    #[case(TargetKind::StaticLibrary, Platform::Linux, "libcore.a")]
    #[case(TargetKind::StaticLibrary, Platform::MacOs, "libcore.a")]
    #[case(TargetKind::StaticLibrary, Platform::Windows, "core.lib")]
    #[case(TargetKind::SharedLibrary, Platform::Linux, "libcore.so")]
    #[case(TargetKind::SharedLibrary, Platform::MacOs, "libcore.dylib")]
    #[case(TargetKind::SharedLibrary, Platform::Windows, "core.dll")]
    #[case(TargetKind::Executable, Platform::Linux, "core")]
    #[case(TargetKind::Executable, Platform::Windows, "core.exe")]
    fn test_artifact_file_names(
        #[case] kind: TargetKind,
        #[case] platform: Platform,
        #[case] expected: &str,
    ) {
        assert_eq!(
            kind.artifact_file_name("core", platform).as_deref(),
            Some(expected)
        );
    }

    #[test]
    fn test_proxy_has_no_artifact() {
        let proxy = Target::new("core_library", TargetKind::InterfaceProxy);
        assert_eq!(proxy.artifact_path(Platform::Linux), None);
    }

    #[test]
    fn test_artifact_path_uses_output_dir() {
        let target = Target::new("core", TargetKind::StaticLibrary);
        assert_eq!(
            target.artifact_path(Platform::Linux).as_deref(),
            Some("lib/libcore.a")
        );
    }

    #[test]
    fn test_scope_visibility() {
        assert!(Scope::Private.applies_to_self());
        assert!(!Scope::Private.visible_to_consumers());
        assert!(Scope::Public.applies_to_self());
        assert!(Scope::Public.visible_to_consumers());
        assert!(!Scope::Interface.applies_to_self());
        assert!(Scope::Interface.visible_to_consumers());
    }

    #[test]
    fn test_validation_empty_name() {
        let target = Target::new("", TargetKind::StaticLibrary);
        assert!(target.validate().is_err());
    }

    #[test]
    fn test_validation_proxy_rules() {
        let mut proxy = Target::new("p", TargetKind::InterfaceProxy);
        assert!(proxy.validate().is_err());

        proxy.proxy_source = Some("core".to_string());
        assert!(proxy.validate().is_ok());

        let proxy = proxy.with_sources(vec![PathBuf::from("x.cc")]);
        assert!(proxy.validate().is_err());
    }

    #[test]
    fn test_add_dependency_deduplicates() {
        let mut target = Target::new("app", TargetKind::Executable);
        target.add_dependency("core");
        target.add_dependency("core");
        assert_eq!(target.dependencies, vec!["core".to_string()]);
    }

    #[test]
    fn test_referenced_target() {
        assert_eq!(LinkItem::target("a").referenced_target(), Some("a"));
        assert_eq!(
            LinkItem::prefixed_target_file("-Wl,-force_load,", "b").referenced_target(),
            Some("b")
        );
        assert_eq!(
            LinkItem::LinkLibrariesOf("c".into()).referenced_target(),
            Some("c")
        );
        assert_eq!(LinkItem::flag("-lm").referenced_target(), None);
    }

    #[test]
    fn test_target_kind_display_format() {
        assert_eq!(TargetKind::StaticLibrary.to_string(), "static library");
        assert_eq!(TargetKind::SharedLibrary.to_string(), "shared library");
        assert_eq!(TargetKind::InterfaceProxy.to_string(), "interface proxy");
        assert_eq!(TargetKind::Executable.to_string(), "executable");
    }
}
