//! Developer tool over `framexr_core`.
//!
//! # Responsibility
//! - Validate project settings and apply automatic fixes.
//! - Run the package build hooks and write `boot.config` / `AndroidManifest.xml`.
//! - Dump the controller action map and check headset names.
//!
//! # Invariants
//! - Machine-readable output goes to stdout as JSON; diagnostics go to stderr.
//! - Exit code is non-zero whenever a command fails or validation errors remain.

use clap::{Parser, Subcommand};
use framexr_core::feature::system_info::{
    headset_name_matches, parse_headset_name, STEAMVR_FAMILY_KEY, STEAM_FRAME_DRIVER_KEY,
};
use framexr_core::input::controller_profile::{
    action_map, USER_PATH_LEFT_HAND, USER_PATH_RIGHT_HAND,
};
use framexr_core::validation::is_buildable;
use framexr_core::{
    apply_automatic_fixes, core_version, default_log_level, init_logging, validate, BuildOutputs,
    BuildPipeline, BuildTarget, FeatureRegistry, ProjectSettings,
};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Steam Frame OpenXR feature tooling", long_about = None)]
struct Cli {
    /// Absolute directory for rolling log files; logging stays off without it
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the core version
    Version,
    /// Check project settings against the enabled features' rules
    Validate {
        /// Project settings JSON
        #[arg(short, long)]
        settings: PathBuf,
        /// standalone|android|wsa
        #[arg(short, long, value_parser = parse_target, default_value = "android")]
        target: BuildTarget,
        /// Apply automatic fixes and save the settings file
        #[arg(long)]
        fix: bool,
    },
    /// Run the build hooks and write their outputs
    Build {
        #[arg(short, long)]
        settings: PathBuf,
        #[arg(short, long, value_parser = parse_target, default_value = "android")]
        target: BuildTarget,
        /// Directory receiving boot.config and AndroidManifest.xml
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List package features and the extensions enabled ones request
    Features {
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Dump the frame controller action map
    Profile {
        /// Only print the effective bindings for `left` or `right`
        #[arg(long)]
        hand: Option<String>,
    },
    /// Check whether a system name identifies a Steam Frame
    CheckHeadset {
        /// System name as reported by xrGetSystemProperties
        name: String,
    },
}

fn parse_target(value: &str) -> Result<BuildTarget, String> {
    BuildTarget::parse(value).ok_or_else(|| {
        format!("unknown build target `{value}`; expected standalone|android|wsa")
    })
}

fn print_json(value: &impl Serialize) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn load_settings(path: &Path) -> Result<ProjectSettings, String> {
    ProjectSettings::load(path).map_err(|err| err.to_string())
}

#[derive(Serialize)]
struct ValidateOutput {
    target: BuildTarget,
    fixed: usize,
    buildable: bool,
    issues: Vec<framexr_core::ValidationIssue>,
}

fn run_validate(settings_path: &Path, target: BuildTarget, fix: bool) -> Result<bool, String> {
    let mut settings = load_settings(settings_path)?;
    let fixed = if fix {
        let fixed = apply_automatic_fixes(&mut settings, target);
        if fixed > 0 {
            settings.save(settings_path).map_err(|err| err.to_string())?;
        }
        fixed
    } else {
        0
    };
    let issues = validate(&settings, target);
    let output = ValidateOutput {
        target,
        fixed,
        buildable: is_buildable(&issues),
        issues,
    };
    print_json(&output)?;
    Ok(output.buildable)
}

fn run_build(settings_path: &Path, target: BuildTarget, out: &Path) -> Result<(), String> {
    let mut settings = load_settings(settings_path)?;
    let mut outputs = BuildOutputs::default();
    let report = BuildPipeline::new()
        .run(&mut settings, target, &mut outputs)
        .map_err(|err| match err {
            framexr_core::BuildError::Validation(issues) => {
                let messages: Vec<&str> = issues
                    .iter()
                    .filter(|issue| issue.error)
                    .map(|issue| issue.message)
                    .collect();
                format!("build blocked:\n  {}", messages.join("\n  "))
            }
            other => other.to_string(),
        })?;
    let written = outputs
        .write_to(out, target)
        .map_err(|err| err.to_string())?;
    for path in &written {
        eprintln!("wrote {}", path.display());
    }
    print_json(&report)
}

#[derive(Serialize)]
struct FeatureRow<'a> {
    id: &'a str,
    name: &'a str,
    version: &'a str,
    enabled: bool,
    extensions: &'a [String],
}

#[derive(Serialize)]
struct FeaturesOutput<'a> {
    features: Vec<FeatureRow<'a>>,
    required_extensions: Vec<String>,
}

fn run_features(settings_path: Option<&Path>) -> Result<(), String> {
    let settings = match settings_path {
        Some(path) => load_settings(path)?,
        None => ProjectSettings::default(),
    };
    let registry = FeatureRegistry::with_package_features().map_err(|err| err.to_string())?;
    let output = FeaturesOutput {
        features: registry
            .iter()
            .map(|descriptor| FeatureRow {
                id: &descriptor.id,
                name: &descriptor.ui_name,
                version: &descriptor.version,
                enabled: settings.is_feature_enabled(&descriptor.id),
                extensions: &descriptor.openxr_extensions,
            })
            .collect(),
        required_extensions: registry.required_extensions(&settings),
    };
    print_json(&output)
}

fn run_profile(hand: Option<&str>) -> Result<(), String> {
    let map = action_map();
    map.validate().map_err(|err| err.to_string())?;
    match hand {
        None => print_json(&map),
        Some(hand) => {
            let user_path = match hand.trim().to_ascii_lowercase().as_str() {
                "left" => USER_PATH_LEFT_HAND,
                "right" => USER_PATH_RIGHT_HAND,
                other => return Err(format!("unknown hand `{other}`; expected left|right")),
            };
            print_json(&map.bindings_for(user_path))
        }
    }
}

#[derive(Serialize)]
struct HeadsetOutput<'a> {
    name: &'a str,
    family: Option<&'a str>,
    driver: Option<&'a str>,
    steam_frame: bool,
}

fn run_check_headset(name: &str) -> Result<bool, String> {
    let parsed = parse_headset_name(name);
    let output = HeadsetOutput {
        name,
        family: parsed.map(|(family, _)| family),
        driver: parsed.map(|(_, driver)| driver),
        steam_frame: headset_name_matches(name, STEAMVR_FAMILY_KEY, STEAM_FRAME_DRIVER_KEY),
    };
    print_json(&output)?;
    Ok(output.steam_frame)
}

fn start_logging(cli: &Cli) -> Result<(), String> {
    let Some(log_dir) = &cli.log_dir else {
        return Ok(());
    };
    let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
    let log_dir = log_dir
        .to_str()
        .ok_or_else(|| format!("log directory `{}` is not UTF-8", log_dir.display()))?;
    init_logging(level, log_dir).map_err(|err| err.to_string())
}

fn run(cli: &Cli) -> Result<bool, String> {
    match &cli.command {
        Commands::Version => {
            println!("framexr_core version={}", core_version());
            Ok(true)
        }
        Commands::Validate {
            settings,
            target,
            fix,
        } => run_validate(settings, *target, *fix),
        Commands::Build {
            settings,
            target,
            out,
        } => run_build(settings, *target, out).map(|()| true),
        Commands::Features { settings } => run_features(settings.as_deref()).map(|()| true),
        Commands::Profile { hand } => run_profile(hand.as_deref()).map(|()| true),
        Commands::CheckHeadset { name } => run_check_headset(name),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(message) = start_logging(&cli) {
        eprintln!("error: {message}");
        return ExitCode::FAILURE;
    }
    match run(&cli) {
        Ok(true) => {
            info!("event=cli_run module=cli status=ok");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            info!("event=cli_run module=cli status=failed");
            ExitCode::FAILURE
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
