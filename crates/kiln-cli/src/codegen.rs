//! GPU architecture codegen flags

use kiln_plan::{AcceleratorBackend, ArchFlagResolver};

/// Maps architecture names to nvcc `--generate-code` and clang
/// `--offload-arch` flags
#[derive(Debug, Clone, Copy, Default)]
pub struct CodegenFlags;

impl ArchFlagResolver for CodegenFlags {
    fn codegen_flags(&self, backend: AcceleratorBackend, architectures: &[String]) -> Vec<String> {
        match backend {
            AcceleratorBackend::Cuda => architectures
                .iter()
                .map(|arch| {
                    // "8.6" and "86" both name sm_86
                    let sm = arch.replace('.', "");
                    format!("--generate-code=arch=compute_{sm},code=sm_{sm}")
                })
                .collect(),
            AcceleratorBackend::Rocm => architectures
                .iter()
                .map(|arch| format!("--offload-arch={}", arch))
                .collect(),
            AcceleratorBackend::None => Vec::new(),
        }
    }
}
