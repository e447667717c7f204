//! # relbuild
//!
//! Command-line driver that produces a release build of a CMake-based native
//! library and ships the resulting shared library into the project's JNI
//! resource directory.
//!
//! ## Overview
//!
//! Running `relbuild` with no arguments from anywhere inside the project:
//!
//! 1. Removes `build_release/` under the project root if it exists
//! 2. Recreates it and runs `cmake -DCMAKE_BUILD_TYPE=Release ..` inside it
//! 3. Runs `make -j8`
//! 4. Copies `build_release/jni/libJNIBoofCPP.<so|dylib>` into
//!    `jni/src/main/resources/natives/`
//!
//! Any failure prints the reason followed by a `BUILD FAILED` banner and exits
//! with status 1.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `build` | Clean, configure, build and ship (the default) |
//! | `clean` | Remove the build directory |
//! | `init` | Write a starter `relbuild.toml` |
//!
//! ## CLI Flags
//!
//! Global flags available on all commands:
//!
//! - **`--dry-run`** - Preview what would be done without making changes
//! - **`--verbose` / `-v`** - Echo every command and enable debug logging
//! - **`--project-root`** - Build a project other than the discovered one
//! - **`--config`** - Use an explicit configuration file
//!
//! ## Modules
//!
//! - [`config`] - Configuration file support for `relbuild.toml`

use anyhow::{Context, Result, bail};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use relbuild_sdk::{BuildError, BuildProfile, ReleaseBuilder, ReleasePlan, SystemRunner};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub mod config;

use config::{ConfigResolver, RelbuildConfig};

/// Release build driver for native JNI libraries.
#[derive(Parser, Debug)]
#[command(name = "relbuild", author, version, about = "Clean, configure, build and ship a native JNI library", long_about = None)]
pub struct Cli {
    /// Print what would be done without actually doing it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print verbose output including all commands
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Project root (default: directory of relbuild.toml, else the current directory)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Configuration file (default: discovered relbuild.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean, configure, build and copy the library into resources (default).
    Build(BuildArgs),
    /// Remove the build directory.
    Clean {
        #[arg(long, value_enum)]
        profile: Option<ProfileArg>,
        #[arg(long, help = "Build directory name under the project root")]
        build_dir: Option<String>,
    },
    /// Scaffold a relbuild.toml config file.
    Init {
        #[arg(long, default_value = config::CONFIG_FILE_NAME)]
        output: PathBuf,
        #[arg(long, default_value = "JNIBoofCPP", help = "Library name passed to add_library()")]
        library: String,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct BuildArgs {
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,
    #[arg(long, short = 'j', help = "Parallel jobs for the build tool")]
    jobs: Option<u32>,
    #[arg(long, help = "Build directory name under the project root")]
    build_dir: Option<String>,
    #[arg(long, help = "Write a JSON build summary to this path")]
    summary_json: Option<PathBuf>,
    #[arg(long, help = "Capture tool output instead of streaming it; stderr is shown on failure")]
    capture_output: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
#[clap(rename_all = "lowercase")]
enum ProfileArg {
    Release,
    Debug,
}

impl From<ProfileArg> for BuildProfile {
    fn from(profile: ProfileArg) -> Self {
        match profile {
            ProfileArg::Release => BuildProfile::Release,
            ProfileArg::Debug => BuildProfile::Debug,
        }
    }
}

/// Parses the command line, sets up logging and runs the selected command.
pub fn run() -> Result<()> {
    let Some(cli) = parse_args(std::env::args_os())? else {
        return Ok(());
    };
    init_logging(cli.verbose);
    execute(cli)
}

/// Parses arguments, printing `--help`/`--version` output itself.
///
/// Returns `Ok(None)` when there is nothing left to run. Usage errors are
/// returned so they take the same failure path as a failed build.
pub fn parse_args<I, T>(args: I) -> Result<Option<Cli>>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print().context("Failed to print help")?;
            Ok(None)
        }
        Err(err) => Err(anyhow::Error::new(err).context("Invalid command line")),
    }
}

/// Runs an already parsed command line.
pub fn execute(cli: Cli) -> Result<()> {
    let resolver = load_config(cli.config.as_deref(), cli.project_root.as_deref())?;
    if let Some(config_path) = &resolver.config_path {
        println!("Using config file: {:?}", config_path);
    }

    match cli.command {
        None => cmd_build(
            &resolver,
            cli.project_root.as_deref(),
            BuildArgs::default(),
            cli.dry_run,
            cli.verbose,
        ),
        Some(Command::Build(args)) => cmd_build(
            &resolver,
            cli.project_root.as_deref(),
            args,
            cli.dry_run,
            cli.verbose,
        ),
        Some(Command::Clean { profile, build_dir }) => cmd_clean(
            &resolver,
            cli.project_root.as_deref(),
            profile,
            build_dir,
            cli.dry_run,
        ),
        Some(Command::Init {
            output,
            library,
            force,
        }) => cmd_init(
            cli.project_root.as_deref(),
            &output,
            &library,
            force,
            cli.dry_run,
        ),
    }
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the level.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(explicit: Option<&Path>, project_root: Option<&Path>) -> Result<ConfigResolver> {
    if let Some(path) = explicit {
        tracing::debug!(path = %path.display(), "loading explicit config");
        return ConfigResolver::from_file(path);
    }
    match project_root {
        Some(root) => ConfigResolver::discover_from(root),
        None => ConfigResolver::new(),
    }
}

/// Merges CLI flags over configuration into a release plan.
fn resolve_plan(
    resolver: &ConfigResolver,
    project_root: Option<&Path>,
    profile: Option<ProfileArg>,
    build_dir: Option<String>,
    jobs: Option<u32>,
) -> Result<ReleasePlan> {
    let root = resolver.project_root(project_root)?;
    let mut config = resolver.config();

    config.project.profile = resolver.resolve(
        profile.map(BuildProfile::from),
        |c| Some(c.project.profile),
        BuildProfile::Release,
    );
    if build_dir.is_some() {
        config.project.build_dir = build_dir;
    }
    config.build.jobs = resolver.resolve(jobs, |c| Some(c.build.jobs), ReleasePlan::DEFAULT_JOBS);

    let plan = config.to_plan(root);
    tracing::debug!(?plan, "resolved release plan");
    plan.validate()?;
    Ok(plan)
}

fn cmd_build(
    resolver: &ConfigResolver,
    project_root: Option<&Path>,
    args: BuildArgs,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let plan = resolve_plan(resolver, project_root, args.profile, args.build_dir, args.jobs)?;

    println!("Building native release artifact...");
    println!("  Project root: {}", plan.project_root.display());
    println!("  Profile: {}", plan.profile.as_str());
    println!("  Build directory: {}", plan.build_dir);
    if dry_run {
        println!("  Mode: dry-run (no changes will be made)");
    }

    let mut runner = if args.capture_output {
        SystemRunner::capturing()
    } else {
        SystemRunner::new()
    };
    let report = ReleaseBuilder::new(plan)
        .verbose(verbose)
        .dry_run(dry_run)
        .build(&mut runner)?;

    if dry_run {
        println!("\n[dry-run] Build simulation completed. No changes were made.");
        return Ok(());
    }

    if let Some(path) = &args.summary_json {
        let json = report.to_json()?;
        write_file(path, json.as_bytes())?;
        println!("JSON summary written to {:?}", path);
    }

    println!(
        "\n✓ Release build completed in {:.1}s",
        report.elapsed_ms as f64 / 1000.0
    );
    println!("  Artifact: {}", report.destination.display());
    Ok(())
}

fn cmd_clean(
    resolver: &ConfigResolver,
    project_root: Option<&Path>,
    profile: Option<ProfileArg>,
    build_dir: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let plan = resolve_plan(resolver, project_root, profile, build_dir, None)?;
    let removed = ReleaseBuilder::new(plan.clone()).dry_run(dry_run).clean()?;

    match removed {
        Some(_) if dry_run => {}
        Some(path) => println!("✓ Removed {}", path.display()),
        None => println!("Nothing to clean: {} does not exist", plan.build_dir),
    }
    Ok(())
}

fn cmd_init(
    project_root: Option<&Path>,
    output: &Path,
    library: &str,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let path = match project_root {
        Some(root) if output.is_relative() => root.join(output),
        _ => output.to_path_buf(),
    };

    if dry_run {
        println!("[dry-run] Would write starter config to {:?}", path);
        return Ok(());
    }
    if !force {
        ensure_can_write(&path)?;
    }

    let contents = RelbuildConfig::generate_starter_toml(library);
    write_file(&path, contents.as_bytes())?;
    println!("✓ Wrote starter config to {:?}", path);
    Ok(())
}

fn ensure_can_write(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("refusing to overwrite existing file: {:?} (use --force)", path);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory {:?}", parent))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("writing file {:?}", path))
}

/// Text printed above the failure banner.
///
/// Pipeline errors already name what failed and why, so only their own
/// message is used; other errors get their full context chain.
pub fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<BuildError>() {
        Some(build_err) => build_err.to_string(),
        None => format!("{:#}", err),
    }
}
