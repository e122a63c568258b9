//! Kiln build plan
//!
//! Computes the declarative plan an external build engine executes:
//! - Targets and their scoped usage requirements
//! - Toolchain flag profiles per vendor, platform and build type
//! - Toolchain-specific linkage overrides
//! - Interface proxies that keep whole libraries on the link line
//! - Executables wired to the core runtime and module libraries
//! - Accelerator backend dispatch for GPU targets
//! - Plan resolution: configuration order, link lines, inherited properties
//!
//! Nothing here compiles or links; a configuration pass only records targets
//! in a [`BuildPlan`] and [`BuildPlan::resolve`] evaluates them.

pub mod accel;
pub mod build_order;
pub mod error;
pub mod factory;
pub mod flags;
pub mod interface;
pub mod normalize;
pub mod plan;
pub mod settings;
pub mod targets;
pub mod toolchain;

// Re-export main types
pub use accel::{
    AcceleratorBackend, AcceleratorMultiplexer, AcceleratorToolkit, ArchFlagResolver,
    DeviceToolkit,
};
pub use build_order::{BuildGraph, TargetNode};
pub use error::{PlanError, PlanResult};
pub use factory::{finish_target, resolve_executable_args, BinaryTargetFactory, BINARY_DESTINATION};
pub use flags::{compute_flags, default_visibility, FlagProfile, SymbolVisibility};
pub use interface::{proxy_name, wrap, wrap_as, ArchiveRetention, SharedRetention};
pub use normalize::normalize;
pub use plan::{BuildPlan, Requirements, ResolvedPlan, ResolvedTarget};
pub use settings::{AcceleratorSettings, ModuleSet, PlanSettings, DEFAULT_CORE_LIBRARY};
pub use targets::{LinkItem, Scope, Scoped, Target, TargetKind};
pub use toolchain::{BuildType, CompilerIdentity, Platform, Toolchain, Vendor};
