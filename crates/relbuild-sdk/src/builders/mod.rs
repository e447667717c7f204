//! Build automation for native release artifacts.
//!
//! ## Overview
//!
//! The release builder handles the complete pipeline:
//!
//! 1. **Clean** - Remove the previous out-of-tree build directory
//! 2. **Configure** - Run the build-system generator (`cmake`) in a fresh one
//! 3. **Build** - Run the parallel build tool (`make -j8`)
//! 4. **Ship** - Copy the shared library into the JNI resource directory
//!
//! ## Common Utilities
//!
//! The `common` module provides the individual filesystem and process steps,
//! each returning a [`crate::BuildError`] that names the failing path or
//! command.
//!
//! ## Builder Options
//!
//! - **`verbose(bool)`** - Echo every command before running it
//! - **`dry_run(bool)`** - Preview build steps without making changes
//!
//! ## Example
//!
//! ```ignore
//! use relbuild_sdk::builders::ReleaseBuilder;
//! use relbuild_sdk::{ReleasePlan, SystemRunner};
//!
//! let report = ReleaseBuilder::new(ReleasePlan::new("."))
//!     .verbose(true)
//!     .build(&mut SystemRunner::new())?;
//! println!("Shipped {}", report.destination.display());
//! # Ok::<(), relbuild_sdk::BuildError>(())
//! ```

pub mod common;
pub mod release;

pub use release::ReleaseBuilder;
