use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

mod codegen;
mod commands;
mod logging;

/// Kiln build planner.
///
/// Reads a project description (kiln.toml) and computes the build plan an
/// external build engine executes: targets, toolchain flags, link lines and
/// install destinations. Nothing is compiled.
///
/// EXAMPLES:
///     kiln plan                         Print the resolved plan as JSON
///     kiln plan -o plan.json            Write the plan to a file
///     kiln flags --vendor clang         Show the flags clang targets get
///
/// ENVIRONMENT VARIABLES:
///     KILN_LOG             Log filter (e.g. 'debug', 'kiln_plan=trace')
///     KILN_BUILD_TYPE      Override toolchain.build_type
///     KILN_WERROR          Override toolchain.werror
///     KILN_SANITIZE        Override toolchain.sanitize
///     KILN_USE_CUDA        Override accelerator.use_cuda
///     KILN_USE_ROCM        Override accelerator.use_rocm
///     KILN_GPU_ARCH_LIST   GPU architectures, ';' separated
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and print the build plan
    ///
    /// Loads kiln.toml from the project directory (or the nearest parent
    /// that has one), creates every declared library and executable and
    /// prints the resolved plan as JSON.
    ///
    /// EXAMPLES:
    ///     kiln plan                        Plan the current project
    ///     kiln plan --dir path/to/project  Plan another project
    ///     kiln plan --config ci.toml       Use a specific config file
    ///     kiln plan -o plan.json           Write the plan to a file
    #[command(visible_alias = "p")]
    Plan {
        /// Project directory
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
        /// Config file to use instead of searching for kiln.toml
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Write the plan to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Print the build order only
        #[arg(long)]
        order: bool,
    },

    /// Show the toolchain flags a target receives
    ///
    /// EXAMPLES:
    ///     kiln flags                                 Flags for this host
    ///     kiln flags --vendor msvc --platform windows
    ///     kiln flags --build-type debug --sanitize
    ///     kiln flags --json                          Output as JSON
    Flags {
        /// Compiler vendor (gnu, clang, appleclang, msvc)
        #[arg(long)]
        vendor: Option<String>,
        /// Target platform (linux, macos, windows)
        #[arg(long)]
        platform: Option<String>,
        /// Build type (debug, release, relwithdebinfo, minsizerel)
        #[arg(long, default_value = "release")]
        build_type: String,
        /// Address sanitizer
        #[arg(long)]
        sanitize: bool,
        /// Treat warnings as errors
        #[arg(long)]
        werror: bool,
        /// Output the profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     kiln completions bash > ~/.local/share/bash-completion/completions/kiln
    ///     kiln completions zsh > ~/.zfunc/_kiln
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Plan {
            dir,
            config,
            output,
            order,
        } => {
            let args = commands::plan::PlanArgs {
                project_dir: match dir {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                },
                config_path: config,
                output,
                order_only: order,
            };
            commands::plan::run(args)?;
        }
        Commands::Flags {
            vendor,
            platform,
            build_type,
            sanitize,
            werror,
            json,
        } => {
            let args = commands::flags::FlagsArgs {
                vendor,
                platform,
                build_type,
                sanitize,
                werror,
                json,
            };
            commands::flags::run(args)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}
