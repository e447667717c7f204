//! Release build SDK for native JNI libraries
//!
//! `relbuild-sdk` drives an out-of-tree CMake build of a native library and
//! ships the produced shared library into a JNI resource directory, so that a
//! jar built afterwards bundles it.
//!
//! # Pipeline
//!
//! ```text
//! resolve root -> clean -> create -> enter -> configure -> build -> restore -> copy
//! ```
//!
//! Any failing step aborts the run with a [`BuildError`]; nothing is retried
//! and completed steps are not rolled back.
//!
//! # Architecture
//!
//! - **Builders**: The [`ReleaseBuilder`] pipeline and its filesystem helpers
//! - **Runner**: The [`CommandRunner`] capability for external tools
//! - **Workdir**: [`ScopedDir`], a guard over the process working directory
//! - **Failure**: The banner and exit status every failed run ends with
//!
//! # Example
//!
//! ```ignore
//! use relbuild_sdk::{ReleaseBuilder, ReleasePlan, SystemRunner};
//!
//! fn main() -> Result<(), relbuild_sdk::BuildError> {
//!     let report = ReleaseBuilder::new(ReleasePlan::new("."))
//!         .build(&mut SystemRunner::new())?;
//!     println!("Copied to {}", report.destination.display());
//!     Ok(())
//! }
//! ```

pub mod builders;
pub mod failure;
pub mod runner;
pub mod types;
pub mod workdir;

pub use builders::ReleaseBuilder;
pub use failure::{FAILURE_BANNER, FAILURE_EXIT_CODE, write_failure};
pub use runner::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use types::{
    ArtifactSpec, BuildError, BuildProfile, BuildReport, ReleasePlan, Step,
    host_library_file_name, validate_build_dir_name,
};
pub use workdir::ScopedDir;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
