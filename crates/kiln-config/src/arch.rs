//! GPU architecture list gathering
//!
//! Sources, first match wins:
//! 1. `accelerator.arch_list` in kiln.toml
//! 2. `KILN_GPU_ARCH_LIST`
//! 3. `GPU_ARCH_LIST` (deprecated)
//! 4. `accelerator.arch_name` in kiln.toml (deprecated)
//!
//! Deprecated sources are still adopted, with a warning.

use crate::project::AcceleratorConfig;
use std::env;

pub const ARCH_LIST_ENV: &str = "KILN_GPU_ARCH_LIST";
pub const LEGACY_ARCH_LIST_ENV: &str = "GPU_ARCH_LIST";

/// Gather the architecture list from the config section and the environment
pub fn gather_arch_list(accelerator: Option<&AcceleratorConfig>) -> Vec<String> {
    select_arch_list(
        accelerator,
        env::var(ARCH_LIST_ENV).ok(),
        env::var(LEGACY_ARCH_LIST_ENV).ok(),
    )
}

fn select_arch_list(
    accelerator: Option<&AcceleratorConfig>,
    env_list: Option<String>,
    legacy_env_list: Option<String>,
) -> Vec<String> {
    if let Some(list) = accelerator.and_then(|a| a.arch_list.as_ref()) {
        return list.clone();
    }

    if let Some(value) = env_list {
        return split_arch_list(&value);
    }

    if let Some(value) = legacy_env_list {
        tracing::warn!(
            "{} is deprecated and will become an error in a future version, use {} instead",
            LEGACY_ARCH_LIST_ENV,
            ARCH_LIST_ENV
        );
        return split_arch_list(&value);
    }

    if let Some(value) = accelerator.and_then(|a| a.arch_name.as_deref()) {
        tracing::warn!(
            "accelerator.arch_name is deprecated and will become an error in a future version, \
             use accelerator.arch_list instead"
        );
        return split_arch_list(value);
    }

    Vec::new()
}

/// Split a `;`, `,` or whitespace separated architecture list
fn split_arch_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
