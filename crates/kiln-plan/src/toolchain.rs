//! Toolchain identity
//!
//! Describes the compiler vendor, host platform and build type a plan is
//! computed for. These values are lookup keys for the flag tables and linker
//! strategies; nothing in the planner mutates them once a pass has started.

use crate::error::{PlanError, PlanResult};
use serde::{Deserialize, Serialize};

/// Compiler vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// GNU Compiler Collection
    Gnu,
    /// LLVM clang
    Clang,
    /// Apple's clang distribution
    AppleClang,
    /// Microsoft Visual C++
    Msvc,
}

impl Vendor {
    /// Parse vendor from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> PlanResult<Self> {
        match s.to_lowercase().as_str() {
            "gnu" | "gcc" => Ok(Self::Gnu),
            "clang" => Ok(Self::Clang),
            "appleclang" => Ok(Self::AppleClang),
            "msvc" => Ok(Self::Msvc),
            other => Err(PlanError::unknown_setting("compiler vendor", other)),
        }
    }

    /// Get vendor name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gnu => "gnu",
            Self::Clang => "clang",
            Self::AppleClang => "appleclang",
            Self::Msvc => "msvc",
        }
    }

    /// The compiler a platform ships with
    pub fn native(platform: Platform) -> Self {
        match platform {
            Platform::Linux => Self::Gnu,
            Platform::MacOs => Self::AppleClang,
            Platform::Windows => Self::Msvc,
        }
    }

    /// Whether the vendor accepts GCC-style command lines
    pub fn is_gcc_like(&self) -> bool {
        !matches!(self, Self::Msvc)
    }

    /// Whether the vendor is a clang flavour
    pub fn is_clang(&self) -> bool {
        matches!(self, Self::Clang | Self::AppleClang)
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Target platform family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Parse platform from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> PlanResult<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" | "apple" => Ok(Self::MacOs),
            "windows" | "win32" => Ok(Self::Windows),
            other => Err(PlanError::unknown_setting("platform", other)),
        }
    }

    /// Get platform name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
        }
    }

    /// Platform of the running process
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    pub fn is_apple(&self) -> bool {
        matches!(self, Self::MacOs)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Build configuration variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Unoptimized build with debug information
    Debug,
    /// Optimized build (default)
    Release,
    /// Optimized build with debug information
    RelWithDebInfo,
    /// Size-optimized build
    MinSizeRel,
}

impl BuildType {
    /// Every build type, in the order per-configuration properties are emitted
    pub const ALL: [BuildType; 4] = [
        Self::Release,
        Self::MinSizeRel,
        Self::RelWithDebInfo,
        Self::Debug,
    ];

    /// Parse build type from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> PlanResult<Self> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "release" => Ok(Self::Release),
            "relwithdebinfo" => Ok(Self::RelWithDebInfo),
            "minsizerel" => Ok(Self::MinSizeRel),
            other => Err(PlanError::unknown_setting("build type", other)),
        }
    }

    /// Get build type name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
            Self::RelWithDebInfo => "relwithdebinfo",
            Self::MinSizeRel => "minsizerel",
        }
    }

    /// Whether objects carry debug information
    pub fn has_debug_info(&self) -> bool {
        matches!(self, Self::Debug | Self::RelWithDebInfo)
    }

    /// Whether the speed-optimization flag applies
    pub fn is_release_like(&self) -> bool {
        matches!(self, Self::Release | Self::RelWithDebInfo)
    }
}

#[allow(clippy::derivable_impls)]
impl Default for BuildType {
    fn default() -> Self {
        Self::Release
    }
}

impl std::fmt::Display for BuildType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Key for flag resolution: who compiles, for what, and how
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilerIdentity {
    pub vendor: Vendor,
    pub platform: Platform,
    pub build_type: BuildType,
    /// Address sanitizer instrumentation
    pub sanitizer: bool,
    pub warnings_as_errors: bool,
    /// MSVC only: embed debug info in objects (/Z7) instead of a PDB (/Zi)
    pub embedded_debug_info: bool,
}

impl CompilerIdentity {
    /// Create an identity for a release build without sanitizers
    pub fn new(vendor: Vendor, platform: Platform) -> Self {
        Self {
            vendor,
            platform,
            build_type: BuildType::Release,
            sanitizer: false,
            warnings_as_errors: false,
            embedded_debug_info: false,
        }
    }

    pub fn with_build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: bool) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_warnings_as_errors(mut self, werror: bool) -> Self {
        self.warnings_as_errors = werror;
        self
    }

    pub fn with_embedded_debug_info(mut self, embedded: bool) -> Self {
        self.embedded_debug_info = embedded;
        self
    }

    pub fn is_debug_build(&self) -> bool {
        self.build_type == BuildType::Debug
    }
}

impl Default for CompilerIdentity {
    fn default() -> Self {
        Self::new(Vendor::Gnu, Platform::Linux)
    }
}

/// Compiler identity plus the runtime choices that affect linkage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Toolchain {
    pub identity: CompilerIdentity,
    /// The math library links against the multi-threaded OpenMP runtime,
    /// which conflicts with the compiler's default one.
    pub threaded_math_runtime: bool,
}

impl Toolchain {
    pub fn new(identity: CompilerIdentity) -> Self {
        Self {
            identity,
            threaded_math_runtime: false,
        }
    }

    pub fn with_threaded_math_runtime(mut self, enabled: bool) -> Self {
        self.threaded_math_runtime = enabled;
        self
    }
}
