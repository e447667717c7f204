//! Scoped working-directory changes.
//!
//! The process working directory is global state. [`ScopedDir`] changes it
//! for the duration of a scope and puts it back on every exit path,
//! including early returns through `?`.

use std::env;
use std::path::{Path, PathBuf};

use crate::types::BuildError;

/// Guard that restores the previous working directory.
#[derive(Debug)]
#[must_use = "the previous working directory is restored when the guard is dropped"]
pub struct ScopedDir {
    previous: PathBuf,
    restored: bool,
}

impl ScopedDir {
    /// Changes into `path`, remembering the current directory.
    pub fn enter(path: &Path) -> Result<Self, BuildError> {
        let previous = env::current_dir().map_err(|source| BuildError::EnterDir {
            path: path.to_path_buf(),
            source,
        })?;
        env::set_current_dir(path).map_err(|source| BuildError::EnterDir {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(from = %previous.display(), to = %path.display(), "entered directory");
        Ok(Self {
            previous,
            restored: false,
        })
    }

    /// Directory that will be restored.
    pub fn previous(&self) -> &Path {
        &self.previous
    }

    /// Changes back to the previous directory, reporting failure.
    pub fn restore(mut self) -> Result<(), BuildError> {
        self.restored = true;
        env::set_current_dir(&self.previous).map_err(|source| BuildError::RestoreDir {
            path: self.previous.clone(),
            source,
        })?;
        tracing::debug!(to = %self.previous.display(), "restored directory");
        Ok(())
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = env::set_current_dir(&self.previous) {
            tracing::warn!(
                path = %self.previous.display(),
                error = %e,
                "failed to restore working directory"
            );
        }
    }
}
