//! Release build automation
//!
//! This module drives an out-of-tree native build: it recreates the build
//! directory, runs the build-system generator and the parallel build tool
//! inside it, and ships the produced shared library into the project's
//! resource directory.

use std::path::{Path, PathBuf};
use std::time::Instant;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::common;
use crate::runner::{CommandRunner, Invocation};
use crate::types::{BuildError, BuildReport, ReleasePlan, Step};
use crate::workdir::ScopedDir;

/// Release builder that handles the complete pipeline
#[derive(Debug, Clone)]
pub struct ReleaseBuilder {
    /// What to build and where to put it
    plan: ReleasePlan,
    /// Whether to echo every command
    verbose: bool,
    /// Whether to only report what would happen
    dry_run: bool,
}

impl ReleaseBuilder {
    /// Creates a new release builder for `plan`
    pub fn new(plan: ReleasePlan) -> Self {
        Self {
            plan,
            verbose: false,
            dry_run: false,
        }
    }

    /// Enables verbose output
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Reports every step without touching the filesystem or spawning processes
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn plan(&self) -> &ReleasePlan {
        &self.plan
    }

    /// Generator command, run from inside the build directory.
    ///
    /// `cmake -DCMAKE_BUILD_TYPE=Release [-DKEY=VALUE ...] [args ...] ..`
    pub fn configure_invocation(&self) -> Invocation {
        Invocation::new(&self.plan.configure_program)
            .arg(format!(
                "-DCMAKE_BUILD_TYPE={}",
                self.plan.profile.cmake_build_type()
            ))
            .args(
                self.plan
                    .configure_defines
                    .iter()
                    .map(|(key, value)| format!("-D{}={}", key, value)),
            )
            .args(self.plan.configure_args.iter().cloned())
            .arg("..")
    }

    /// Parallel build command, e.g. `make -j8`.
    pub fn build_invocation(&self) -> Invocation {
        Invocation::new(&self.plan.build_program)
            .arg(format!("-j{}", self.plan.jobs))
            .args(self.plan.build_args.iter().cloned())
    }

    /// Runs the release pipeline
    ///
    /// This performs the following steps:
    /// 1. Resolve the project root
    /// 2. Remove a previous build directory
    /// 3. Create a fresh build directory
    /// 4. Enter it
    /// 5. Run the generator
    /// 6. Run the parallel build
    /// 7. Return to the previous working directory
    /// 8. Copy the library into the resource directory
    ///
    /// The working directory is restored on every exit path, including
    /// failures in steps 5 and 6.
    ///
    /// # Returns
    ///
    /// * `Ok(BuildReport)` describing what was shipped
    /// * `Err(BuildError)` for the first step that failed
    pub fn build<R: CommandRunner + ?Sized>(
        &self,
        runner: &mut R,
    ) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        self.plan.validate()?;
        let file_name = self.plan.artifact.file_name()?;
        let mut steps = Vec::with_capacity(8);

        // Step 1: Resolve project root
        let root = common::resolve_project_root(&self.plan.project_root)?;
        self.record(&mut steps, Step::ResolveRoot);
        if self.verbose {
            println!("  Project root: {}", root.display());
        }

        let build_dir = root.join(&self.plan.build_dir);
        let artifact = build_dir.join(&self.plan.artifact.subdir).join(&file_name);
        let dest_dir = root.join(&self.plan.artifact.destination);

        // Step 2: Remove stale build directory
        self.clean_build_dir(&build_dir)?;
        self.record(&mut steps, Step::Clean);

        // Step 3: Create build directory
        if self.dry_run {
            println!("[dry-run] Would create {}", build_dir.display());
        } else {
            common::create_build_dir(&build_dir)?;
        }
        self.record(&mut steps, Step::CreateBuildDir);

        // Step 4: Enter build directory
        let guard = if self.dry_run {
            println!("[dry-run] Would cd into {}", build_dir.display());
            None
        } else {
            Some(ScopedDir::enter(&build_dir)?)
        };
        self.record(&mut steps, Step::EnterBuildDir);

        // Step 5: Configure
        println!(
            "Configuring {} build with {}...",
            self.plan.profile.as_str(),
            self.plan.configure_program
        );
        self.execute(runner, &self.configure_invocation())?;
        self.record(&mut steps, Step::Configure);

        // Step 6: Build
        println!(
            "Building with {} ({} jobs)...",
            self.plan.build_program, self.plan.jobs
        );
        self.execute(runner, &self.build_invocation())?;
        self.record(&mut steps, Step::Build);

        // Step 7: Restore working directory
        if let Some(guard) = guard {
            guard.restore()?;
        }
        self.record(&mut steps, Step::RestoreWorkdir);

        // Step 8: Copy artifact
        let destination = if self.dry_run {
            let dest = dest_dir.join(&file_name);
            println!(
                "[dry-run] Would copy {} -> {}",
                artifact.display(),
                dest.display()
            );
            dest
        } else {
            println!("Copying {} to resources...", file_name);
            let dest = common::copy_artifact(&artifact, &dest_dir)?;
            if self.verbose {
                println!("  Copied {} -> {}", artifact.display(), dest.display());
            }
            dest
        };
        self.record(&mut steps, Step::CopyArtifact);

        Ok(BuildReport {
            project_root: root,
            build_dir,
            profile: self.plan.profile,
            artifact,
            destination,
            steps,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            finished_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            dry_run: self.dry_run,
        })
    }

    /// Removes the build directory without building anything
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` if a build directory was (or, in dry-run mode, would be) removed
    /// * `Ok(None)` if there was nothing to remove
    pub fn clean(&self) -> Result<Option<PathBuf>, BuildError> {
        self.plan.validate()?;
        let root = common::resolve_project_root(&self.plan.project_root)?;
        let build_dir = root.join(&self.plan.build_dir);
        Ok(self.clean_build_dir(&build_dir)?.then_some(build_dir))
    }

    fn clean_build_dir(&self, build_dir: &Path) -> Result<bool, BuildError> {
        if self.dry_run {
            let exists = common::build_dir_present(build_dir)?;
            if exists {
                println!("[dry-run] Would remove {}", build_dir.display());
            }
            return Ok(exists);
        }

        let removed = common::remove_build_dir(build_dir)?;
        if removed {
            println!("Removed previous build directory {}", build_dir.display());
        }
        Ok(removed)
    }

    fn execute<R: CommandRunner + ?Sized>(
        &self,
        runner: &mut R,
        invocation: &Invocation,
    ) -> Result<(), BuildError> {
        if self.dry_run {
            println!("[dry-run] Would run: {}", invocation);
            return Ok(());
        }
        if self.verbose {
            println!("  Running: {}", invocation);
        }
        common::run_checked(runner, invocation)?;
        Ok(())
    }

    fn record(&self, steps: &mut Vec<Step>, step: Step) {
        tracing::info!(step = step.as_str(), dry_run = self.dry_run, "step complete");
        steps.push(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::test_support::cwd_lock;
    use crate::types::BuildProfile;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    struct PanicRunner;

    impl CommandRunner for PanicRunner {
        fn run(&mut self, invocation: &Invocation) -> Result<CommandOutput, BuildError> {
            panic!("dry run must not spawn {}", invocation);
        }
    }

    #[test]
    fn test_release_builder_creation() {
        let builder = ReleaseBuilder::new(ReleasePlan::new("/tmp/test-project"));
        assert!(!builder.verbose);
        assert!(!builder.dry_run);
    }

    #[test]
    fn test_release_builder_flags() {
        let builder = ReleaseBuilder::new(ReleasePlan::new("/tmp/test-project"))
            .verbose(true)
            .dry_run(true);
        assert!(builder.verbose);
        assert!(builder.dry_run);
    }

    #[test]
    fn test_default_invocations() {
        let builder = ReleaseBuilder::new(ReleasePlan::new("/tmp/test-project"));
        assert_eq!(
            builder.configure_invocation().to_string(),
            "cmake -DCMAKE_BUILD_TYPE=Release .."
        );
        assert_eq!(builder.build_invocation().to_string(), "make -j8");
    }

    #[test]
    fn test_customized_invocations() {
        let mut defines = BTreeMap::new();
        defines.insert("BUILD_TESTING".to_string(), "OFF".to_string());
        defines.insert("ANDROID".to_string(), "ON".to_string());
        let plan = ReleasePlan {
            profile: BuildProfile::Debug,
            configure_program: "/opt/cmake/bin/cmake".to_string(),
            configure_defines: defines,
            configure_args: vec!["-GUnix Makefiles".to_string()],
            build_program: "ninja".to_string(),
            jobs: 2,
            build_args: vec!["JNIBoofCPP".to_string()],
            ..ReleasePlan::new("/tmp/test-project")
        };
        let builder = ReleaseBuilder::new(plan);
        assert_eq!(
            builder.configure_invocation().to_string(),
            "/opt/cmake/bin/cmake -DCMAKE_BUILD_TYPE=Debug -DANDROID=ON -DBUILD_TESTING=OFF '-GUnix Makefiles' .."
        );
        assert_eq!(builder.build_invocation().to_string(), "ninja -j2 JNIBoofCPP");
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let _lock = cwd_lock();
        let temp = TempDir::new().unwrap();
        let stale = temp.path().join("build_release");
        fs::create_dir(&stale).unwrap();
        fs::write(stale.join("CMakeCache.txt"), b"old").unwrap();

        let builder = ReleaseBuilder::new(ReleasePlan::new(temp.path())).dry_run(true);
        let report = builder.build(&mut PanicRunner).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.steps.len(), 8);
        assert!(stale.join("CMakeCache.txt").exists());
        assert!(!temp.path().join("jni").exists());
    }

    #[test]
    fn test_dry_run_refuses_file_build_path() {
        let _lock = cwd_lock();
        let temp = TempDir::new().unwrap();
        let build = temp.path().join("build_release");
        fs::write(&build, b"not a dir").unwrap();

        let plan = ReleasePlan::new(temp.path());
        let dry = ReleaseBuilder::new(plan.clone())
            .dry_run(true)
            .build(&mut PanicRunner)
            .unwrap_err();
        let real = ReleaseBuilder::new(plan).build(&mut PanicRunner).unwrap_err();

        assert!(matches!(dry, BuildError::NotADirectory { .. }));
        assert_eq!(dry.to_string(), real.to_string());
        assert!(build.is_file());
    }

    #[test]
    fn test_invalid_plan_rejected_before_mutation() {
        let _lock = cwd_lock();
        let temp = TempDir::new().unwrap();
        let plan = ReleasePlan {
            build_dir: "..".to_string(),
            ..ReleasePlan::new(temp.path())
        };
        let err = ReleaseBuilder::new(plan).build(&mut PanicRunner).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
        assert!(temp.path().exists());
    }

    #[test]
    fn test_clean_only() {
        let temp = TempDir::new().unwrap();
        let build_dir = temp.path().join("build_debug");
        fs::create_dir_all(build_dir.join("jni")).unwrap();

        let plan = ReleasePlan {
            profile: BuildProfile::Debug,
            build_dir: BuildProfile::Debug.default_build_dir(),
            ..ReleasePlan::new(temp.path())
        };
        let builder = ReleaseBuilder::new(plan);

        let removed = builder.clean().unwrap();
        assert_eq!(
            removed,
            Some(temp.path().canonicalize().unwrap().join("build_debug"))
        );
        assert!(!build_dir.exists());
        assert_eq!(builder.clean().unwrap(), None);
    }
}
