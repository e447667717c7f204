//! Core types for relbuild-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`BuildError`] - Error types for every step of the release pipeline
//! - [`BuildProfile`] - Optimization profile handed to the generator
//! - [`ArtifactSpec`] - Which produced library to ship and where it goes
//! - [`ReleasePlan`] - Everything the pipeline needs to run
//! - [`Step`] / [`BuildReport`] - Output from build operations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Component, Path, PathBuf};

/// Error types for relbuild-sdk operations.
///
/// Every variant maps to one step of the pipeline and carries the path or
/// command line that failed, so the message alone is enough to diagnose it.
///
/// # Example
///
/// ```ignore
/// use relbuild_sdk::{BuildError, ReleaseBuilder, SystemRunner};
///
/// match builder.build(&mut SystemRunner::new()) {
///     Ok(report) => println!("Shipped {:?}", report.destination),
///     Err(BuildError::CommandFailed { command, .. }) => {
///         eprintln!("'{}' did not succeed", command);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The project root could not be resolved to an absolute path.
    #[error("Failed to resolve project root '{path}': {source}")]
    ProjectRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The previous build directory could not be removed.
    ///
    /// Usually a file inside it is locked or not writable.
    #[error("Failed to remove '{path}': {source}")]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The build path exists but is not a directory, so it is left alone.
    #[error("Failed to remove '{path}': path exists but is not a directory")]
    NotADirectory { path: PathBuf },

    /// The fresh build directory could not be created.
    #[error("Failed to create '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Changing into the build directory failed.
    #[error("Failed to cd into '{path}': {source}")]
    EnterDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Changing back to the original working directory failed.
    #[error("Failed to cd into '{path}': {source}")]
    RestoreDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external command could not be started at all.
    ///
    /// The tool is most likely not installed or not on PATH.
    #[error("Failed to execute '{command}': {source}. Ensure the tool is installed and on PATH")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command ran and exited unsuccessfully.
    #[error("Failed to execute '{command}' ({status}){}", stderr_tail(.stderr))]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The build finished but the expected library is not where it should be.
    #[error(
        "Artifact not found at '{path}'. Check that the build produces it or set [artifact] in relbuild.toml"
    )]
    ArtifactMissing { path: PathBuf },

    /// Copying the library into the resource directory failed.
    #[error("Failed to copy '{from}' to '{to}': {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The plan itself is invalid (bad build directory name, zero jobs, ...).
    #[error("configuration error: {0}. Check relbuild.toml or CLI flags")]
    Config(String),

    /// Writing the JSON summary failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(20);
    format!("\n\nStderr:\n{}", lines[start..].join("\n"))
}

/// Build profile controlling optimization and debug info.
///
/// # Example
///
/// ```
/// use relbuild_sdk::BuildProfile;
///
/// assert_eq!(BuildProfile::Release.as_str(), "release");
/// assert_eq!(BuildProfile::Release.cmake_build_type(), "Release");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    /// Debug build with debug symbols and no optimizations.
    Debug,
    /// Release build with optimizations enabled.
    #[default]
    Release,
}

impl BuildProfile {
    /// Returns the string representation of the profile.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "debug",
            BuildProfile::Release => "release",
        }
    }

    /// Value passed as `-DCMAKE_BUILD_TYPE`.
    pub fn cmake_build_type(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "Debug",
            BuildProfile::Release => "Release",
        }
    }

    /// Default build directory name for this profile (`build_release`, `build_debug`).
    pub fn default_build_dir(&self) -> String {
        format!("build_{}", self.as_str())
    }
}

/// The shared library produced by the native build and where it ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    /// Library base name as given to CMake's `add_library` (e.g. `JNIBoofCPP`).
    pub library: String,
    /// Directory inside the build directory that holds the library.
    pub subdir: PathBuf,
    /// Destination directory, relative to the project root.
    pub destination: PathBuf,
    /// Explicit file name, overriding the host naming convention.
    pub file_name: Option<String>,
}

impl Default for ArtifactSpec {
    fn default() -> Self {
        Self {
            library: "JNIBoofCPP".to_string(),
            subdir: PathBuf::from("jni"),
            destination: PathBuf::from("jni/src/main/resources/natives"),
            file_name: None,
        }
    }
}

impl ArtifactSpec {
    /// Resolves the library file name for the host platform.
    pub fn file_name(&self) -> Result<String, BuildError> {
        match &self.file_name {
            Some(name) => Ok(name.clone()),
            None => host_library_file_name(&self.library, env::consts::OS),
        }
    }
}

/// Returns the shared-library file name the native toolchain produces on `os`.
///
/// `os` uses the values of [`std::env::consts::OS`].
pub fn host_library_file_name(library: &str, os: &str) -> Result<String, BuildError> {
    match os {
        "macos" | "ios" => Ok(format!("lib{}.dylib", library)),
        "windows" => Ok(format!("{}.dll", library)),
        "linux" | "android" | "freebsd" | "netbsd" | "openbsd" | "dragonfly" => {
            Ok(format!("lib{}.so", library))
        }
        other => Err(BuildError::Config(format!(
            "unsupported host OS for native library naming: {}. Set [artifact] file_name explicitly",
            other
        ))),
    }
}

/// Everything the release pipeline needs.
///
/// Relative paths in the plan are interpreted against `project_root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    /// Directory the build is anchored at.
    pub project_root: PathBuf,
    /// Name of the build directory created under the project root.
    pub build_dir: String,
    /// Optimization profile.
    pub profile: BuildProfile,
    /// Build-system generator (`cmake`).
    pub configure_program: String,
    /// Extra `-D<key>=<value>` definitions for the generator.
    pub configure_defines: BTreeMap<String, String>,
    /// Extra generator arguments placed before the source directory.
    pub configure_args: Vec<String>,
    /// Build tool (`make`).
    pub build_program: String,
    /// Parallel job count handed to the build tool.
    pub jobs: u32,
    /// Extra build tool arguments.
    pub build_args: Vec<String>,
    /// Library to ship.
    pub artifact: ArtifactSpec,
}

impl ReleasePlan {
    /// Default job count for the parallel build.
    pub const DEFAULT_JOBS: u32 = 8;

    /// Creates a release plan with default tools and artifact for `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let profile = BuildProfile::Release;
        Self {
            project_root: project_root.into(),
            build_dir: profile.default_build_dir(),
            profile,
            configure_program: "cmake".to_string(),
            configure_defines: BTreeMap::new(),
            configure_args: Vec::new(),
            build_program: "make".to_string(),
            jobs: Self::DEFAULT_JOBS,
            build_args: Vec::new(),
            artifact: ArtifactSpec::default(),
        }
    }

    /// Checks invariants that must hold before anything on disk is touched.
    pub fn validate(&self) -> Result<(), BuildError> {
        validate_build_dir_name(&self.build_dir)?;
        if self.jobs == 0 {
            return Err(BuildError::Config(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.configure_program.trim().is_empty() {
            return Err(BuildError::Config(
                "configure program must not be empty".to_string(),
            ));
        }
        if self.build_program.trim().is_empty() {
            return Err(BuildError::Config(
                "build program must not be empty".to_string(),
            ));
        }
        if self.artifact.destination.is_absolute() {
            return Err(BuildError::Config(format!(
                "artifact destination must be relative to the project root, got {}",
                self.artifact.destination.display()
            )));
        }
        Ok(())
    }
}

/// The build directory must be a single plain component directly under the root.
///
/// This keeps the generator's `..` source argument pointing at the project
/// root and confines cleaning to a child of the root.
pub fn validate_build_dir_name(name: &str) -> Result<(), BuildError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(BuildError::Config(format!(
            "build directory must be a plain directory name under the project root, got '{}'",
            name
        ))),
    }
}

/// One step of the release pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    ResolveRoot,
    Clean,
    CreateBuildDir,
    EnterBuildDir,
    Configure,
    Build,
    RestoreWorkdir,
    CopyArtifact,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ResolveRoot => "resolve-root",
            Step::Clean => "clean",
            Step::CreateBuildDir => "create-build-dir",
            Step::EnterBuildDir => "enter-build-dir",
            Step::Configure => "configure",
            Step::Build => "build",
            Step::RestoreWorkdir => "restore-workdir",
            Step::CopyArtifact => "copy-artifact",
        }
    }
}

/// Result of a successful pipeline run.
///
/// Serialized as the `--summary-json` output of the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Canonical project root.
    pub project_root: PathBuf,
    /// Build directory that was (re)created.
    pub build_dir: PathBuf,
    /// Profile the generator was configured with.
    pub profile: BuildProfile,
    /// Library inside the build directory.
    pub artifact: PathBuf,
    /// Where the library was copied to.
    pub destination: PathBuf,
    /// Steps that completed, in order.
    pub steps: Vec<Step>,
    /// Wall-clock duration of the whole run.
    pub elapsed_ms: u64,
    /// RFC 3339 time the run finished.
    pub finished_at: String,
    /// `true` when nothing was executed.
    pub dry_run: bool,
}

impl BuildReport {
    /// Pretty JSON form of the report.
    pub fn to_json(&self) -> Result<String, BuildError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
