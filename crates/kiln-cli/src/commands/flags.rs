//! Flags command - show the toolchain flag profile for a compiler identity

use anyhow::{Context, Result};
use kiln_plan::{compute_flags, BuildType, CompilerIdentity, Platform, Target, TargetKind, Vendor};

/// Flags command arguments
pub struct FlagsArgs {
    pub vendor: Option<String>,
    pub platform: Option<String>,
    pub build_type: String,
    pub sanitize: bool,
    pub werror: bool,
    pub json: bool,
}

/// Run the flags command
pub fn run(args: FlagsArgs) -> Result<()> {
    let identity = identity_from_args(&args)?;
    let profile = compute_flags(&Target::new("probe", TargetKind::StaticLibrary), &identity);

    if args.json {
        let json = serde_json::to_string_pretty(&profile).context("Failed to serialize flags")?;
        println!("{}", json);
        return Ok(());
    }

    println!("compile: {}", profile.compile_flags.join(" "));
    println!("link: {}", profile.link_flags.join(" "));
    println!(
        "visibility: {}",
        match profile.visibility {
            kiln_plan::SymbolVisibility::Hidden => "hidden",
            kiln_plan::SymbolVisibility::Default => "default",
        }
    );
    Ok(())
}

fn identity_from_args(args: &FlagsArgs) -> Result<CompilerIdentity> {
    let platform = match &args.platform {
        Some(name) => Platform::from_str(name)?,
        None => Platform::host(),
    };
    let vendor = match &args.vendor {
        Some(name) => Vendor::from_str(name)?,
        None => Vendor::native(platform),
    };

    Ok(CompilerIdentity::new(vendor, platform)
        .with_build_type(BuildType::from_str(&args.build_type)?)
        .with_sanitizer(args.sanitize)
        .with_warnings_as_errors(args.werror))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(vendor: &str, platform: &str) -> FlagsArgs {
        FlagsArgs {
            vendor: Some(vendor.to_string()),
            platform: Some(platform.to_string()),
            build_type: "debug".to_string(),
            sanitize: false,
            werror: true,
            json: false,
        }
    }

    #[test]
    fn test_identity_from_args() {
        let identity = identity_from_args(&args("gcc", "linux")).unwrap();
        assert_eq!(identity.vendor, Vendor::Gnu);
        assert_eq!(identity.build_type, BuildType::Debug);
        assert!(identity.warnings_as_errors);
    }

    #[test]
    fn test_unknown_vendor() {
        let err = identity_from_args(&args("icc", "linux")).unwrap_err();
        assert!(err.to_string().contains("icc"));
    }

    #[test]
    fn test_default_vendor_follows_platform() {
        let mut a = args("msvc", "windows");
        a.vendor = None;
        assert_eq!(identity_from_args(&a).unwrap().vendor, Vendor::Msvc);
    }
}
