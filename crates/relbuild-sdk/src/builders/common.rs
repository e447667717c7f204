//! Filesystem and process helpers used by the release builder.
//!
//! All functions here return [`BuildError`] values whose messages name the
//! path or command that failed, so the fatal-failure path can print them
//! verbatim.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::runner::{CommandOutput, CommandRunner, Invocation};
use crate::types::BuildError;

/// Resolves the project root to an absolute, canonical path.
pub fn resolve_project_root(path: &Path) -> Result<PathBuf, BuildError> {
    let root = path.canonicalize().map_err(|source| BuildError::ProjectRoot {
        path: path.to_path_buf(),
        source,
    })?;
    if !root.is_dir() {
        return Err(BuildError::ProjectRoot {
            path: path.to_path_buf(),
            source: io::Error::other("not a directory"),
        });
    }
    Ok(root)
}

/// Checks whether a previous build directory is present.
///
/// A path that exists but is not a directory is an error, so a dry run and a
/// real run refuse the same layouts.
pub fn build_dir_present(build_dir: &Path) -> Result<bool, BuildError> {
    match fs::symlink_metadata(build_dir) {
        Ok(metadata) if metadata.is_dir() => Ok(true),
        Ok(_) => Err(BuildError::NotADirectory {
            path: build_dir.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(BuildError::Clean {
            path: build_dir.to_path_buf(),
            source,
        }),
    }
}

/// Removes a previous build directory.
///
/// Returns `Ok(false)` when there was nothing to remove. A path that exists
/// but is not a directory is refused rather than deleted.
pub fn remove_build_dir(build_dir: &Path) -> Result<bool, BuildError> {
    if !build_dir_present(build_dir)? {
        return Ok(false);
    }

    fs::remove_dir_all(build_dir).map_err(|source| BuildError::Clean {
        path: build_dir.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Creates the fresh build directory.
pub fn create_build_dir(build_dir: &Path) -> Result<(), BuildError> {
    fs::create_dir_all(build_dir).map_err(|source| BuildError::CreateDir {
        path: build_dir.to_path_buf(),
        source,
    })
}

/// Runs an external command and fails unless it exits successfully.
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &mut R,
    invocation: &Invocation,
) -> Result<CommandOutput, BuildError> {
    runner.run(invocation)?.check(invocation)
}

/// Copies the produced library into `dest_dir`, creating it if needed.
///
/// Returns the full destination path.
pub fn copy_artifact(src: &Path, dest_dir: &Path) -> Result<PathBuf, BuildError> {
    if !src.is_file() {
        return Err(BuildError::ArtifactMissing {
            path: src.to_path_buf(),
        });
    }

    let file_name = src.file_name().ok_or_else(|| BuildError::ArtifactMissing {
        path: src.to_path_buf(),
    })?;
    let dest = dest_dir.join(file_name);

    fs::create_dir_all(dest_dir).map_err(|source| BuildError::Copy {
        from: src.to_path_buf(),
        to: dest.clone(),
        source,
    })?;
    fs::copy(src, &dest).map_err(|source| BuildError::Copy {
        from: src.to_path_buf(),
        to: dest.clone(),
        source,
    })?;
    Ok(dest)
}
