//! Flag profile resolution
//!
//! Maps a target and a [`CompilerIdentity`] to the compile flags, link flags and
//! default symbol visibility it is built with. Flags come from one static table
//! per vendor and are assembled in a fixed precedence:
//!
//! 1. base warning set
//! 2. vendor-specific warning adjustments
//! 3. sanitizer overrides
//! 4. debug information
//! 5. optimization level (release-type configurations only)
//! 6. warnings-as-errors (when requested and the vendor supports it)
//!
//! Resolution is a pure function; the same inputs always produce the same lists.

use crate::targets::Target;
use crate::toolchain::{CompilerIdentity, Platform, Vendor};
use serde::{Deserialize, Serialize};

/// Default visibility of symbols in compiled objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolVisibility {
    /// Only explicitly exported symbols are visible
    Hidden,
    /// Everything is visible
    Default,
}

/// Toolchain flags for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagProfile {
    pub compile_flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub visibility: SymbolVisibility,
}

impl FlagProfile {
    /// Profile for targets that are never compiled
    pub fn empty() -> Self {
        Self {
            compile_flags: Vec::new(),
            link_flags: Vec::new(),
            visibility: SymbolVisibility::Default,
        }
    }
}

/// Per-vendor flag table
struct VendorFlags {
    base_warnings: &'static [&'static str],
    warning_adjustments: &'static [&'static str],
    sanitizer_compile: &'static [&'static str],
    sanitizer_link: &'static [&'static str],
    debug_info: &'static str,
    embedded_debug_info: &'static str,
    optimize: &'static str,
    /// Empty when the vendor cannot treat warnings as errors
    warnings_as_errors: &'static [&'static str],
    hidden_visibility: Option<&'static str>,
}

const GCC_STYLE_WARNINGS: &[&str] = &[
    "-Wall",
    "-Wextra",
    "-Wdeprecated",
    "-Wno-unused-parameter",
    "-Wno-missing-field-initializers",
    "-Wno-type-limits",
    "-Wno-array-bounds",
    "-Wno-unknown-pragmas",
    "-Wno-strict-overflow",
    "-Wno-strict-aliasing",
];

const GCC_STYLE_SANITIZER: &[&str] = &["-fsanitize=address", "-fno-omit-frame-pointer"];

const GNU_FLAGS: VendorFlags = VendorFlags {
    base_warnings: GCC_STYLE_WARNINGS,
    // maybe-uninitialized is too noisy to be useful
    warning_adjustments: &["-Wredundant-move", "-Wno-maybe-uninitialized"],
    sanitizer_compile: GCC_STYLE_SANITIZER,
    sanitizer_link: &["-fsanitize=address"],
    debug_info: "-g",
    embedded_debug_info: "-g",
    optimize: "-O2",
    warnings_as_errors: &[
        "-Werror",
        "-Werror=unused-function",
        "-Werror=unused-variable",
        "-Werror=pedantic",
    ],
    hidden_visibility: Some("-fvisibility=hidden"),
};

const CLANG_FLAGS: VendorFlags = VendorFlags {
    base_warnings: GCC_STYLE_WARNINGS,
    warning_adjustments: &["-Wextra-semi", "-Wno-error=extra-semi", "-Wmove"],
    sanitizer_compile: GCC_STYLE_SANITIZER,
    sanitizer_link: &["-fsanitize=address"],
    debug_info: "-g",
    embedded_debug_info: "-g",
    optimize: "-O2",
    warnings_as_errors: &[
        "-Werror",
        "-Werror=inconsistent-missing-override",
        "-Werror=inconsistent-missing-destructor-override",
        "-Werror=unused-function",
        "-Werror=unused-variable",
        "-Werror=pedantic",
    ],
    hidden_visibility: Some("-fvisibility=hidden"),
};

const MSVC_FLAGS: VendorFlags = VendorFlags {
    base_warnings: &["/EHsc", "/bigobj"],
    warning_adjustments: &["/wd4624", "/wd4068"],
    sanitizer_compile: &["/fsanitize=address"],
    sanitizer_link: &[],
    debug_info: "/Zi",
    embedded_debug_info: "/Z7",
    optimize: "/O2",
    warnings_as_errors: &[],
    hidden_visibility: None,
};

fn vendor_flags(vendor: Vendor) -> &'static VendorFlags {
    match vendor {
        Vendor::Gnu => &GNU_FLAGS,
        Vendor::Clang | Vendor::AppleClang => &CLANG_FLAGS,
        Vendor::Msvc => &MSVC_FLAGS,
    }
}

/// Default symbol visibility for an identity.
///
/// Windows has no visibility control, and sanitizer reports need every
/// symbol visible.
pub fn default_visibility(identity: &CompilerIdentity) -> SymbolVisibility {
    if identity.platform == Platform::Windows || identity.sanitizer {
        SymbolVisibility::Default
    } else {
        SymbolVisibility::Hidden
    }
}

/// Compute the flag profile for `target` under `identity`
pub fn compute_flags(target: &Target, identity: &CompilerIdentity) -> FlagProfile {
    if !target.kind.has_compile_step() {
        return FlagProfile::empty();
    }

    let table = vendor_flags(identity.vendor);
    let mut compile = FlagList::default();
    let mut link = FlagList::default();

    compile.extend(table.base_warnings);
    compile.extend(table.warning_adjustments);

    if identity.sanitizer {
        compile.extend(table.sanitizer_compile);
        link.extend(table.sanitizer_link);
    }

    if identity.build_type.has_debug_info() {
        if identity.embedded_debug_info {
            compile.push(table.embedded_debug_info);
        } else {
            compile.push(table.debug_info);
        }
    }

    if identity.build_type.is_release_like() {
        compile.push(table.optimize);
    }

    if identity.warnings_as_errors {
        compile.extend(table.warnings_as_errors);
    }

    let visibility = default_visibility(identity);
    if visibility == SymbolVisibility::Hidden {
        if let Some(flag) = table.hidden_visibility {
            compile.push(flag);
        }
    }

    FlagProfile {
        compile_flags: compile.0,
        link_flags: link.0,
        visibility,
    }
}

/// Ordered flag list that drops repeated flags
#[derive(Default)]
struct FlagList(Vec<String>);

impl FlagList {
    fn push(&mut self, flag: &str) {
        if !self.0.iter().any(|f| f == flag) {
            self.0.push(flag.to_string());
        }
    }

    fn extend(&mut self, flags: &[&str]) {
        for flag in flags {
            self.push(flag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::TargetKind;
    use crate::toolchain::BuildType;

    fn library() -> Target {
        Target::new("core", TargetKind::StaticLibrary)
    }

    fn position(profile: &FlagProfile, flag: &str) -> usize {
        profile
            .compile_flags
            .iter()
            .position(|f| f == flag)
            .unwrap_or_else(|| panic!("{} missing from {:?}", flag, profile.compile_flags))
    }

    #[test]
    fn test_gnu_release_profile() {
        let identity = CompilerIdentity::new(Vendor::Gnu, Platform::Linux);
        let profile = compute_flags(&library(), &identity);

        assert_eq!(profile.compile_flags[0], "-Wall");
        assert!(profile.compile_flags.contains(&"-Wno-maybe-uninitialized".to_string()));
        assert!(profile.compile_flags.contains(&"-O2".to_string()));
        assert!(!profile.compile_flags.contains(&"-g".to_string()));
        assert!(profile.link_flags.is_empty());
        assert_eq!(profile.visibility, SymbolVisibility::Hidden);
        assert_eq!(profile.compile_flags.last().unwrap(), "-fvisibility=hidden");
    }

    #[test]
    fn test_precedence_order() {
        let identity = CompilerIdentity::new(Vendor::Clang, Platform::Linux)
            .with_build_type(BuildType::RelWithDebInfo)
            .with_sanitizer(true)
            .with_warnings_as_errors(true);
        let profile = compute_flags(&library(), &identity);

        let base = position(&profile, "-Wall");
        let vendor = position(&profile, "-Wextra-semi");
        let sanitizer = position(&profile, "-fsanitize=address");
        let debug = position(&profile, "-g");
        let optimize = position(&profile, "-O2");
        let werror = position(&profile, "-Werror");
        assert!(base < vendor);
        assert!(vendor < sanitizer);
        assert!(sanitizer < debug);
        assert!(debug < optimize);
        assert!(optimize < werror);
    }

    #[test]
    fn test_sanitizer_forces_default_visibility() {
        let identity = CompilerIdentity::new(Vendor::Gnu, Platform::Linux).with_sanitizer(true);
        let profile = compute_flags(&library(), &identity);

        assert_eq!(profile.visibility, SymbolVisibility::Default);
        assert!(!profile.compile_flags.contains(&"-fvisibility=hidden".to_string()));
        assert_eq!(profile.link_flags, vec!["-fsanitize=address".to_string()]);
    }

    #[test]
    fn test_windows_has_default_visibility() {
        let identity = CompilerIdentity::new(Vendor::Clang, Platform::Windows);
        assert_eq!(default_visibility(&identity), SymbolVisibility::Default);
    }

    #[test]
    fn test_msvc_ignores_warnings_as_errors() {
        let identity =
            CompilerIdentity::new(Vendor::Msvc, Platform::Windows).with_warnings_as_errors(true);
        let profile = compute_flags(&library(), &identity);

        assert!(profile.compile_flags.iter().all(|f| !f.contains("Werror")));
        assert!(profile.compile_flags.iter().all(|f| f != "/WX"));
    }

    #[test]
    fn test_msvc_debug_info_format() {
        let identity = CompilerIdentity::new(Vendor::Msvc, Platform::Windows)
            .with_build_type(BuildType::Debug);
        let pdb = compute_flags(&library(), &identity);
        assert!(pdb.compile_flags.contains(&"/Zi".to_string()));
        assert!(!pdb.compile_flags.contains(&"/O2".to_string()));

        let embedded = compute_flags(&library(), &identity.with_embedded_debug_info(true));
        assert!(embedded.compile_flags.contains(&"/Z7".to_string()));
        assert!(!embedded.compile_flags.contains(&"/Zi".to_string()));
    }

    #[test]
    fn test_min_size_release_has_no_optimize_flag() {
        let identity = CompilerIdentity::new(Vendor::Gnu, Platform::Linux)
            .with_build_type(BuildType::MinSizeRel);
        let profile = compute_flags(&library(), &identity);
        assert!(!profile.compile_flags.contains(&"-O2".to_string()));
    }

    #[test]
    fn test_proxy_profile_is_empty() {
        let proxy = Target::new("core_library", TargetKind::InterfaceProxy);
        let profile = compute_flags(&proxy, &CompilerIdentity::default());
        assert_eq!(profile, FlagProfile::empty());
    }

    #[test]
    fn test_no_duplicate_flags() {
        for vendor in [Vendor::Gnu, Vendor::Clang, Vendor::AppleClang, Vendor::Msvc] {
            let identity = CompilerIdentity::new(vendor, Platform::Linux)
                .with_build_type(BuildType::Debug)
                .with_sanitizer(true)
                .with_warnings_as_errors(true);
            let profile = compute_flags(&library(), &identity);
            let mut seen = std::collections::HashSet::new();
            for flag in &profile.compile_flags {
                assert!(seen.insert(flag), "duplicate flag {} for {}", flag, vendor);
            }
        }
    }
}
