//! Configuration file support for relbuild.
//!
//! This module provides support for `relbuild.toml` configuration files that
//! pin the tools, build directory and artifact location of a project so the
//! driver can be run with no arguments.
//!
//! ## Configuration File Location
//!
//! The configuration file is searched for in the following order:
//! 1. Current working directory (`./relbuild.toml`)
//! 2. Parent directories (up to the repository root or filesystem root)
//!
//! The directory holding the file becomes the default project root.
//!
//! ## Example Configuration
//!
//! ```toml
//! [project]
//! profile = "release"
//! build_dir = "build_release"
//!
//! [configure]
//! program = "cmake"
//! defines = { BUILD_TESTING = "OFF" }
//!
//! [build]
//! program = "make"
//! jobs = 8
//!
//! [artifact]
//! library = "JNIBoofCPP"
//! subdir = "jni"
//! destination = "jni/src/main/resources/natives"
//! ```

use anyhow::{Context, Result};
use relbuild_sdk::{ArtifactSpec, BuildProfile, ReleasePlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "relbuild.toml";

/// Root configuration structure for `relbuild.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelbuildConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,

    /// Build-system generator configuration.
    pub configure: ConfigureConfig,

    /// Build tool configuration.
    pub build: BuildToolConfig,

    /// Shipped library configuration.
    pub artifact: ArtifactConfig,
}

/// Project-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Optimization profile. Defaults to release.
    pub profile: BuildProfile,

    /// Build directory name under the project root.
    ///
    /// Defaults to `build_<profile>` if not specified.
    pub build_dir: Option<String>,
}

/// Build-system generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigureConfig {
    /// Generator executable. Defaults to `cmake`.
    pub program: String,

    /// Extra `-D` definitions.
    pub defines: BTreeMap<String, String>,

    /// Extra arguments placed before the source directory.
    pub args: Vec<String>,
}

impl Default for ConfigureConfig {
    fn default() -> Self {
        Self {
            program: "cmake".to_string(),
            defines: BTreeMap::new(),
            args: Vec::new(),
        }
    }
}

/// Build tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildToolConfig {
    /// Build executable. Defaults to `make`.
    pub program: String,

    /// Parallel jobs. Defaults to 8.
    pub jobs: u32,

    /// Extra arguments.
    pub args: Vec<String>,
}

impl Default for BuildToolConfig {
    fn default() -> Self {
        Self {
            program: "make".to_string(),
            jobs: ReleasePlan::DEFAULT_JOBS,
            args: Vec::new(),
        }
    }
}

/// Shipped library configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Library base name (`lib<library>.so` / `.dylib`, `<library>.dll`).
    pub library: String,

    /// Directory inside the build directory that holds the library.
    pub subdir: PathBuf,

    /// Destination directory relative to the project root.
    pub destination: PathBuf,

    /// Explicit file name, bypassing the host naming convention.
    pub file_name: Option<String>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        let spec = ArtifactSpec::default();
        Self {
            library: spec.library,
            subdir: spec.subdir,
            destination: spec.destination,
            file_name: spec.file_name,
        }
    }
}

impl RelbuildConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: RelbuildConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration starting from the current directory.
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Attempts to find and load configuration starting from the specified directory.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Builds a release plan rooted at `project_root`.
    pub fn to_plan(&self, project_root: PathBuf) -> ReleasePlan {
        let profile = self.project.profile;
        ReleasePlan {
            project_root,
            build_dir: self
                .project
                .build_dir
                .clone()
                .unwrap_or_else(|| profile.default_build_dir()),
            profile,
            configure_program: self.configure.program.clone(),
            configure_defines: self.configure.defines.clone(),
            configure_args: self.configure.args.clone(),
            build_program: self.build.program.clone(),
            jobs: self.build.jobs,
            build_args: self.build.args.clone(),
            artifact: ArtifactSpec {
                library: self.artifact.library.clone(),
                subdir: self.artifact.subdir.clone(),
                destination: self.artifact.destination.clone(),
                file_name: self.artifact.file_name.clone(),
            },
        }
    }

    /// Generates a starter configuration file as a formatted TOML string.
    ///
    /// This includes comments explaining each option.
    pub fn generate_starter_toml(library: &str) -> String {
        format!(
            r#"# relbuild configuration file
# CLI flags override these settings when provided.

[project]
# Optimization profile: "release" or "debug"
profile = "release"

# Build directory under the project root (default: build_<profile>)
# build_dir = "build_release"

[configure]
# Build-system generator, run as: <program> -DCMAKE_BUILD_TYPE=<Profile> [defines] [args] ..
program = "cmake"

# Extra -D definitions
# defines = {{ BUILD_TESTING = "OFF" }}

[build]
# Build tool, run as: <program> -j<jobs> [args]
program = "make"
jobs = {jobs}

[artifact]
# Library name as passed to add_library()
library = "{library}"

# Directory inside the build directory that holds the library
subdir = "jni"

# Where the library is copied to, relative to the project root
destination = "jni/src/main/resources/natives"

# Exact file name (default: lib{library}.so / lib{library}.dylib / {library}.dll for the host)
# file_name = "lib{library}.dylib"
"#,
            library = library,
            jobs = ReleasePlan::DEFAULT_JOBS,
        )
    }
}

/// Configuration resolver that merges config file values with CLI arguments.
///
/// CLI arguments always take precedence over config file values.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration, if any.
    pub config: Option<RelbuildConfig>,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Creates a resolver by discovering configuration from the current directory.
    pub fn new() -> Result<Self> {
        Ok(Self::from_discovery(RelbuildConfig::discover()?))
    }

    /// Creates a resolver by discovering configuration from `start_dir` upwards.
    pub fn discover_from(start_dir: &Path) -> Result<Self> {
        Ok(Self::from_discovery(RelbuildConfig::discover_from(start_dir)?))
    }

    /// Creates a resolver from an explicit config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = RelbuildConfig::load_from_file(path)?;
        Ok(Self {
            config: Some(config),
            config_path: Some(path.to_path_buf()),
        })
    }

    fn from_discovery(found: Option<(RelbuildConfig, PathBuf)>) -> Self {
        match found {
            Some((config, path)) => Self {
                config: Some(config),
                config_path: Some(path),
            },
            None => Self::default(),
        }
    }

    /// Returns the loaded configuration or defaults.
    pub fn config(&self) -> RelbuildConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Resolves the project root.
    ///
    /// An explicit root wins, then the directory holding the config file,
    /// then the current directory.
    pub fn project_root(&self, cli_root: Option<&Path>) -> Result<PathBuf> {
        if let Some(root) = cli_root {
            return Ok(root.to_path_buf());
        }
        if let Some(dir) = self.config_path.as_deref().and_then(Path::parent)
            && !dir.as_os_str().is_empty()
        {
            return Ok(dir.to_path_buf());
        }
        std::env::current_dir().context("Failed to get current directory")
    }

    /// Resolves a CLI value, using config as fallback.
    pub fn resolve<T, F>(&self, cli_value: Option<T>, config_getter: F, default: T) -> T
    where
        F: FnOnce(&RelbuildConfig) -> Option<T>,
    {
        cli_value
            .or_else(|| self.config.as_ref().and_then(config_getter))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RelbuildConfig::default();
        assert_eq!(config.project.profile, BuildProfile::Release);
        assert_eq!(config.project.build_dir, None);
        assert_eq!(config.configure.program, "cmake");
        assert_eq!(config.build.program, "make");
        assert_eq!(config.build.jobs, 8);
        assert_eq!(config.artifact.library, "JNIBoofCPP");
        assert_eq!(
            config.artifact.destination,
            PathBuf::from("jni/src/main/resources/natives")
        );
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

        let toml_content = r#"
[project]
profile = "debug"

[configure]
program = "cmake3"
defines = { BUILD_TESTING = "OFF" }

[build]
program = "ninja"
jobs = 4
args = ["JNIBoofCPP"]

[artifact]
library = "boofcpp"
subdir = "lib"
destination = "resources/natives"
file_name = "libboofcpp.so"
"#;

        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = RelbuildConfig::load_from_file(&config_path).unwrap();

        assert_eq!(config.project.profile, BuildProfile::Debug);
        assert_eq!(config.configure.program, "cmake3");
        assert_eq!(
            config.configure.defines.get("BUILD_TESTING").map(String::as_str),
            Some("OFF")
        );
        assert_eq!(config.build.program, "ninja");
        assert_eq!(config.build.jobs, 4);
        assert_eq!(config.build.args, vec!["JNIBoofCPP".to_string()]);
        assert_eq!(config.artifact.library, "boofcpp");
        assert_eq!(config.artifact.file_name, Some("libboofcpp.so".to_string()));

        let plan = config.to_plan(temp_dir.path().to_path_buf());
        assert_eq!(plan.build_dir, "build_debug");
        assert_eq!(plan.jobs, 4);
        assert_eq!(plan.artifact.subdir, PathBuf::from("lib"));
    }

    #[test]
    fn test_load_rejects_unknown_profile() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[project]\nprofile = \"fast\"\n").unwrap();

        let err = RelbuildConfig::load_from_file(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_discover_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[build]\njobs = 2\n").unwrap();
        let nested = temp_dir.path().join("jni/src");
        std::fs::create_dir_all(&nested).unwrap();

        let result = RelbuildConfig::discover_from(&nested).unwrap();
        assert!(result.is_some());

        let (config, path) = result.unwrap();
        assert_eq!(config.build.jobs, 2);
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_no_config() {
        let temp_dir = TempDir::new().unwrap();
        // Create a .git directory to stop the search
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let result = RelbuildConfig::discover_from(temp_dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_project_root_precedence() {
        let resolver = ConfigResolver {
            config: Some(RelbuildConfig::default()),
            config_path: Some(PathBuf::from("/work/boofcpp/relbuild.toml")),
        };

        assert_eq!(
            resolver.project_root(Some(Path::new("/elsewhere"))).unwrap(),
            PathBuf::from("/elsewhere")
        );
        assert_eq!(
            resolver.project_root(None).unwrap(),
            PathBuf::from("/work/boofcpp")
        );

        let empty = ConfigResolver::default();
        assert_eq!(
            empty.project_root(None).unwrap(),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn test_config_resolver() {
        let mut config = RelbuildConfig::default();
        config.build.jobs = 16;
        let resolver = ConfigResolver {
            config: Some(config),
            config_path: None,
        };

        // CLI value takes precedence
        let result = resolver.resolve(Some(2), |c| Some(c.build.jobs), 8);
        assert_eq!(result, 2);

        // Config value used when CLI is None
        let result: u32 = resolver.resolve(None, |c| Some(c.build.jobs), 8);
        assert_eq!(result, 16);

        // Default used when neither is set
        let result = ConfigResolver::default().resolve(None, |c| Some(c.build.jobs), 8);
        assert_eq!(result, 8);
    }

    #[test]
    fn test_generate_starter_toml_parses() {
        let toml = RelbuildConfig::generate_starter_toml("JNIBoofCPP");
        assert!(toml.contains("library = \"JNIBoofCPP\""));
        assert!(toml.contains("jobs = 8"));

        let config: RelbuildConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config.artifact.library, "JNIBoofCPP");
        assert_eq!(config.build.jobs, 8);
        assert_eq!(config.configure.program, "cmake");
    }
}
